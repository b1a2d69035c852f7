// ==========================================
// 车辆夜间入段排产系统 - Stage 2 入段作业排程
// ==========================================
// 职责: 为入段 (ibl) 车辆分配股道与夜间作业时段
// 规则: 股道轮转分配；同股道作业从夜间起点顺排，每项作业后留缓冲
//       人工调整转入段的车辆追加在所选股道最后一项作业之后
// 红线: 每辆入段车辆都必须排入；同股道时段不得重叠
//       超出夜间窗口只告警，不丢弃
// ==========================================

use crate::config::PlannerSettings;
use crate::domain::alert::AlertNotice;
use crate::domain::features::VehicleFeatures;
use crate::domain::types::{AlertCode, CleaningType};
use crate::domain::yard::YardOccupancy;
use crate::engine::bay_pool::BayPool;
use crate::engine::error::{EngineError, EngineResult};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, instrument};

/// 非清洁作业的类型标记
pub const MAINTENANCE_JOB: &str = "maintenance";

// ==========================================
// YardSchedule - Stage 2 输出
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct YardSchedule {
    pub occupancies: Vec<YardOccupancy>,
    pub alerts: Vec<AlertNotice>,
}

// ==========================================
// YardScheduler - 入段作业排程器
// ==========================================
#[derive(Debug, Clone)]
pub struct YardScheduler {
    night_start: NaiveDateTime,
    night_end: NaiveDateTime,
    buffer: Duration,
    default_maintenance_minutes: u32,
}

impl YardScheduler {
    pub fn new(
        night_window: (NaiveDateTime, NaiveDateTime),
        buffer_minutes: u32,
        default_maintenance_minutes: u32,
    ) -> Self {
        Self {
            night_start: night_window.0,
            night_end: night_window.1,
            buffer: Duration::minutes(buffer_minutes as i64),
            default_maintenance_minutes,
        }
    }

    pub fn from_settings(settings: &PlannerSettings, plan_date: NaiveDate) -> Self {
        Self::new(
            settings.night_window(plan_date),
            settings.yard_job_buffer_minutes,
            settings.default_maintenance_minutes,
        )
    }

    /// 作业时长（分钟）
    ///
    /// # 规则
    /// - deep 3h / light 1.8h / scheduled 2h
    /// - 无清洁需求或缺少特征 → 默认检修时长
    pub fn job_minutes(&self, features: Option<&VehicleFeatures>) -> i64 {
        self.minutes_for(cleaning_of(features))
    }

    pub fn minutes_for(&self, cleaning: CleaningType) -> i64 {
        match cleaning {
            CleaningType::Deep => 180,
            CleaningType::Light => 108,
            CleaningType::Scheduled => 120,
            CleaningType::None => self.default_maintenance_minutes as i64,
        }
    }

    fn job_type(cleaning: CleaningType) -> String {
        match cleaning {
            CleaningType::None => MAINTENANCE_JOB.to_string(),
            other => other.to_db_str().to_string(),
        }
    }

    /// 在指定股道的 from_ts 处排入一项作业，超出夜间窗口时附带告警
    fn place(
        &self,
        plan_id: &str,
        vehicle_id: &str,
        bay_id: &str,
        from_ts: NaiveDateTime,
        cleaning: CleaningType,
        schedule: &mut YardSchedule,
    ) -> NaiveDateTime {
        let to_ts = from_ts + Duration::minutes(self.minutes_for(cleaning));

        if to_ts > self.night_end {
            schedule.alerts.push(AlertNotice::warning(
                AlertCode::YardWindowOverrun,
                format!("车辆{}在股道{}的作业结束于{}，超出夜间窗口", vehicle_id, bay_id, to_ts),
                json!({
                    "vehicle_id": vehicle_id,
                    "bay_id": bay_id,
                    "to_ts": to_ts.to_string(),
                    "night_end": self.night_end.to_string(),
                }),
            ));
        }

        schedule.occupancies.push(YardOccupancy {
            occupancy_id: uuid::Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            bay_id: bay_id.to_string(),
            vehicle_id: vehicle_id.to_string(),
            from_ts,
            to_ts,
            job_type: Self::job_type(cleaning),
        });
        to_ts
    }

    /// 排程
    ///
    /// # 参数
    /// - plan_id: 所属计划
    /// - yard_vehicles: 入段车辆（内部按 vehicle_id 排序）
    /// - pool: 可用股道池
    /// - features: 车辆特征
    #[instrument(skip_all, fields(plan_id = %plan_id, vehicles = yard_vehicles.len(), bays = pool.len()))]
    pub fn schedule(
        &self,
        plan_id: &str,
        yard_vehicles: &[String],
        pool: &BayPool,
        features: &BTreeMap<String, VehicleFeatures>,
    ) -> YardSchedule {
        let mut vehicles: Vec<&String> = yard_vehicles.iter().collect();
        vehicles.sort();
        vehicles.dedup();

        let mut next_free: HashMap<&str, NaiveDateTime> = HashMap::new();
        let mut schedule = YardSchedule::default();

        for (n, vehicle_id) in vehicles.into_iter().enumerate() {
            let bay = pool.round_robin(n);
            let cleaning = cleaning_of(features.get(vehicle_id.as_str()));

            let from_ts = *next_free.get(bay.bay_id.as_str()).unwrap_or(&self.night_start);
            let to_ts = self.place(plan_id, vehicle_id, &bay.bay_id, from_ts, cleaning, &mut schedule);
            next_free.insert(bay.bay_id.as_str(), to_ts + self.buffer);
        }

        info!(
            jobs = schedule.occupancies.len(),
            overruns = schedule.alerts.len(),
            "Stage 2 入段排程完成"
        );
        schedule
    }

    /// 追加单车作业（人工调整转入段时使用）
    ///
    /// # 参数
    /// - vehicle_id: 转入段的车辆（其原有占用不参与计算）
    /// - cleaning: 清洁类型（None 按检修处理）
    /// - pool: 可用股道池
    /// - existing: 本计划已有的股道占用
    /// - bay_id: 指定股道；None 时沿用轮转顺序取下一股道
    ///
    /// # 返回
    /// - Ok(YardSchedule): 恰含一项作业，起点不早于该股道最后一项作业结束 + 缓冲
    /// - Err(InvalidInput): 指定股道不在可用股道池中
    pub fn append_job(
        &self,
        plan_id: &str,
        vehicle_id: &str,
        cleaning: CleaningType,
        pool: &BayPool,
        existing: &[YardOccupancy],
        bay_id: Option<&str>,
    ) -> EngineResult<YardSchedule> {
        let others: Vec<&YardOccupancy> = existing.iter().filter(|o| o.vehicle_id != vehicle_id).collect();

        let bay = match bay_id {
            Some(id) => pool
                .get(id)
                .ok_or_else(|| EngineError::InvalidInput(format!("股道{}不存在或未启用", id)))?,
            None => pool.round_robin(others.len()),
        };

        let from_ts = others
            .iter()
            .filter(|o| o.bay_id == bay.bay_id)
            .map(|o| o.to_ts + self.buffer)
            .max()
            .map_or(self.night_start, |t| t.max(self.night_start));

        let mut schedule = YardSchedule::default();
        self.place(plan_id, vehicle_id, &bay.bay_id, from_ts, cleaning, &mut schedule);
        Ok(schedule)
    }
}

fn cleaning_of(features: Option<&VehicleFeatures>) -> CleaningType {
    features
        .filter(|f| f.needs_cleaning)
        .map(|f| f.cleaning_type)
        .unwrap_or(CleaningType::None)
}
