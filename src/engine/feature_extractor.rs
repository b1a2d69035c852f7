// ==========================================
// 车辆夜间入段排产系统 - 特征提取引擎
// ==========================================
// 职责: 按计划日为每辆车派生 VehicleFeatures
// 输入: FleetDataProvider（只读）+ PlannerSettings
// 输出: BTreeMap<vehicle_id, VehicleFeatures>（确定性顺序）
// 红线: 单车失败不影响批次，失败车辆按不合格处理并携带错误文本
// ==========================================

use crate::config::PlannerSettings;
use crate::domain::features::VehicleFeatures;
use crate::domain::fleet::Vehicle;
use crate::domain::types::CleaningType;
use crate::engine::error::EngineResult;
use crate::engine::feature_core::FeatureCore;
use crate::repository::error::RepositoryResult;
use crate::repository::fleet_repo::FleetDataProvider;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

// ==========================================
// FeatureExtractor - 特征提取引擎
// ==========================================
// 红线: 不写库，只计算
pub struct FeatureExtractor {
    provider: Arc<dyn FleetDataProvider>,
}

impl FeatureExtractor {
    /// 创建新的 FeatureExtractor 实例
    pub fn new(provider: Arc<dyn FleetDataProvider>) -> Self {
        Self { provider }
    }

    /// 批量提取特征
    ///
    /// # 参数
    /// - plan_date: 计划日
    /// - vehicle_ids: 指定车辆（None 表示全部在册车辆）
    /// - as_of: 判断待清洁档期的基准时刻
    /// - settings: 参数快照
    ///
    /// # 返回
    /// - Ok(map): 每辆车一条记录（含失败记录）
    /// - Err: 车辆清单或车队里程均值无法读取
    #[instrument(skip_all, fields(plan_date = %plan_date))]
    pub fn extract(
        &self,
        plan_date: NaiveDate,
        vehicle_ids: Option<&[String]>,
        as_of: NaiveDateTime,
        settings: &PlannerSettings,
    ) -> EngineResult<BTreeMap<String, VehicleFeatures>> {
        let fleet = self.provider.list_vehicles()?;

        // 车队均值每批次只计算一次
        let totals = self.provider.cumulative_km_by_vehicle()?;
        let fleet_mean = FeatureCore::fleet_mean(totals.values());

        let targets: Vec<Result<Vehicle, String>> = match vehicle_ids {
            None => fleet.into_iter().map(Ok).collect(),
            Some(ids) => {
                let by_id: BTreeMap<&str, &Vehicle> =
                    fleet.iter().map(|v| (v.vehicle_id.as_str(), v)).collect();
                ids.iter()
                    .map(|id| {
                        by_id
                            .get(id.as_str())
                            .map(|v| (*v).clone())
                            .ok_or_else(|| id.clone())
                    })
                    .collect()
            }
        };

        let mut out = BTreeMap::new();
        let mut failed = 0usize;
        for target in targets {
            let features = match target {
                Ok(vehicle) => {
                    let cum_km = totals.get(&vehicle.vehicle_id).copied().unwrap_or(0.0);
                    match self.extract_one(&vehicle, plan_date, as_of, settings, cum_km, fleet_mean) {
                        Ok(f) => f,
                        Err(e) => {
                            warn!(vehicle_id = %vehicle.vehicle_id, error = %e, "单车特征提取失败，按不合格处理");
                            failed += 1;
                            VehicleFeatures::failed(&vehicle.vehicle_id, e.to_string())
                        }
                    }
                }
                Err(unknown_id) => {
                    warn!(vehicle_id = %unknown_id, "车辆不在册，按不合格处理");
                    failed += 1;
                    VehicleFeatures::failed(&unknown_id, "车辆不在册".to_string())
                }
            };
            out.insert(features.vehicle_id.clone(), features);
        }

        info!(
            vehicle_count = out.len(),
            failed_count = failed,
            fleet_mean_km = ?fleet_mean,
            "特征提取完成"
        );
        Ok(out)
    }

    /// 单车特征
    fn extract_one(
        &self,
        vehicle: &Vehicle,
        plan_date: NaiveDate,
        as_of: NaiveDateTime,
        settings: &PlannerSettings,
        cumulative_km: f64,
        fleet_mean: Option<f64>,
    ) -> RepositoryResult<VehicleFeatures> {
        let vehicle_id = vehicle.vehicle_id.as_str();
        let mut notes = BTreeMap::new();

        // === 步骤 1: 技术证书 ===
        let (service_start, service_end) = settings.service_window(plan_date);
        let certificates = self.provider.certificates_for(vehicle_id)?;
        let fitness = FeatureCore::evaluate_fitness(&certificates, service_start, service_end);
        notes.insert("fitness".to_string(), fitness.note.clone());

        // === 步骤 2: 工单 ===
        let orders = self.provider.work_orders_for(vehicle_id)?;
        let wo = FeatureCore::evaluate_work_orders(&orders);
        notes.insert("work_orders".to_string(), wo.note.clone());

        // === 步骤 3: 广告曝光 ===
        let (campaign_id, daily_target, deficit) =
            match self.provider.active_campaign_for(vehicle_id, plan_date)? {
                Some(campaign) => {
                    let window_days = campaign
                        .rolling_window_days
                        .unwrap_or(settings.branding_window_days);
                    let from = plan_date - Duration::days(window_days as i64);
                    let exposure = self.provider.exposure_hours(vehicle_id, from, plan_date)?;
                    let (daily, deficit) =
                        FeatureCore::branding_deficit(campaign.weekly_target_hours, window_days, exposure);
                    notes.insert(
                        "branding".to_string(),
                        format!(
                            "广告{}: 日目标{:.1}h, {}天曝光{:.1}h, 缺口{:.1}h",
                            campaign.campaign_id, daily, window_days, exposure, deficit
                        ),
                    );
                    (Some(campaign.campaign_id), daily, deficit)
                }
                None => (None, 0.0, 0.0),
            };

        // === 步骤 4: 里程 ===
        let deviation = FeatureCore::mileage_deviation(cumulative_km, fleet_mean);
        notes.insert(
            "mileage".to_string(),
            format!("累计{:.0}km, 相对均值偏差{:+.0}km", cumulative_km, deviation),
        );

        // === 步骤 5: 股道与清洁 ===
        let mut exit_cost = 0;
        let mut cleaning_type = CleaningType::None;
        if let Some(bay_id) = vehicle.current_bay_id.as_deref() {
            match self.provider.find_bay(bay_id)? {
                Some(bay) => exit_cost = bay.exit_cost_seconds(),
                None => {
                    notes.insert("bay".to_string(), format!("股道{}不存在", bay_id));
                }
            }
            if let Some(slot) = self.provider.next_cleaning_slot(bay_id, as_of)? {
                cleaning_type = CleaningType::from_slot_type(&slot.clean_type);
                notes.insert(
                    "cleaning".to_string(),
                    format!("待清洁档期{} ({})", slot.slot_id, cleaning_type),
                );
            }
        }
        let (cleaning_minutes, skill) = FeatureCore::cleaning_profile(cleaning_type);

        debug!(
            vehicle_id = vehicle_id,
            fitness_ok = fitness.fitness_ok,
            blocking = wo.blocking,
            needs_cleaning = cleaning_type != CleaningType::None,
            "单车特征"
        );

        Ok(VehicleFeatures {
            vehicle_id: vehicle_id.to_string(),
            fitness_ok: fitness.fitness_ok,
            fitness_buffer_hours: fitness.buffer_hours,
            work_order_blocking: wo.blocking,
            critical_work_order_count: wo.critical_count,
            total_work_order_count: wo.total_count,
            active_campaign_id: campaign_id,
            daily_branding_target_hours: daily_target,
            branding_rolling_deficit_hours: deficit,
            cumulative_km,
            expected_km_if_active: settings.expected_km_if_active(),
            mileage_deviation: deviation,
            needs_cleaning: cleaning_type != CleaningType::None,
            cleaning_type,
            cleaning_duration_minutes: cleaning_minutes,
            skill_requirement: skill,
            current_bay_id: vehicle.current_bay_id.clone(),
            yard_exit_cost_seconds: exit_cost,
            extraction_error: None,
            notes,
        })
    }
}
