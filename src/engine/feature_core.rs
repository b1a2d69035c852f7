// ==========================================
// 车辆夜间入段排产系统 - 特征规则纯函数库
// ==========================================
// 职责: 证书适用性、工单阻断、广告缺口、里程偏差、清洁档位的纯逻辑
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::fleet::{FitnessCertificate, WorkOrder};
use crate::domain::types::{CleaningType, SkillLevel};
use chrono::NaiveDateTime;

/// 证书判定结果
#[derive(Debug, Clone, PartialEq)]
pub struct FitnessVerdict {
    pub fitness_ok: bool,
    pub buffer_hours: f64,
    pub note: String,
}

/// 工单判定结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrderVerdict {
    pub blocking: bool,
    pub critical_count: u32,
    pub total_count: u32,
    pub note: String,
}

// ==========================================
// FeatureCore - 纯函数工具类
// ==========================================
pub struct FeatureCore;

impl FeatureCore {
    /// 技术证书适用性
    ///
    /// # 规则
    /// - 仅考虑 valid / expiring 状态证书
    /// - 全部证书覆盖运营窗口 → 合格，缓冲 = min(valid_to - 运营结束) 小时，下限 0
    /// - 无证书 → 不合格，缓冲 +∞
    /// - 任一证书未覆盖 → 不合格，缓冲 0
    pub fn evaluate_fitness(
        certificates: &[FitnessCertificate],
        service_start: NaiveDateTime,
        service_end: NaiveDateTime,
    ) -> FitnessVerdict {
        let considered: Vec<&FitnessCertificate> =
            certificates.iter().filter(|c| c.is_considered()).collect();

        if considered.is_empty() {
            return FitnessVerdict {
                fitness_ok: false,
                buffer_hours: f64::INFINITY,
                note: "无有效技术证书".to_string(),
            };
        }

        let uncovered: Vec<&str> = considered
            .iter()
            .filter(|c| c.valid_from > service_start || c.valid_to < service_end)
            .map(|c| c.department.as_str())
            .collect();

        if !uncovered.is_empty() {
            return FitnessVerdict {
                fitness_ok: false,
                buffer_hours: 0.0,
                note: format!("证书未覆盖运营窗口: {}", uncovered.join(",")),
            };
        }

        let buffer_hours = considered
            .iter()
            .map(|c| (c.valid_to - service_end).num_seconds() as f64 / 3600.0)
            .fold(f64::INFINITY, f64::min)
            .max(0.0);

        FitnessVerdict {
            fitness_ok: true,
            buffer_hours,
            note: format!("证书合格，缓冲{:.1}小时", buffer_hours),
        }
    }

    /// 工单阻断判定
    ///
    /// # 规则
    /// - 仅统计未关闭工单
    /// - 存在关键工单（需入段 且 优先级 ≥ 3）→ 阻断
    pub fn evaluate_work_orders(orders: &[WorkOrder]) -> WorkOrderVerdict {
        let open: Vec<&WorkOrder> = orders.iter().filter(|w| w.is_open()).collect();
        let critical: Vec<&str> = open
            .iter()
            .filter(|w| w.is_critical())
            .map(|w| w.work_order_id.as_str())
            .collect();

        let note = if critical.is_empty() {
            format!("未关闭工单{}项，无阻断", open.len())
        } else {
            format!("关键工单阻断: {}", critical.join(","))
        };

        WorkOrderVerdict {
            blocking: !critical.is_empty(),
            critical_count: critical.len() as u32,
            total_count: open.len() as u32,
            note,
        }
    }

    /// 广告日目标与滚动缺口
    ///
    /// # 返回
    /// - (日目标小时, 缺口小时)，缺口 = max(0, 日目标 × 窗口天数 - 实际曝光)
    pub fn branding_deficit(weekly_target_hours: f64, window_days: u32, exposure_hours: f64) -> (f64, f64) {
        let daily_target = (weekly_target_hours / 7.0).max(0.0);
        let deficit = (daily_target * window_days as f64 - exposure_hours).max(0.0);
        (daily_target, deficit)
    }

    /// 里程偏差（相对车队均值；无均值时为 0）
    pub fn mileage_deviation(cumulative_km: f64, fleet_mean_km: Option<f64>) -> f64 {
        match fleet_mean_km {
            Some(mean) => cumulative_km - mean,
            None => 0.0,
        }
    }

    /// 车队里程均值（每批次只计算一次）
    pub fn fleet_mean<'a>(totals: impl IntoIterator<Item = &'a f64>) -> Option<f64> {
        let (sum, n) = totals
            .into_iter()
            .fold((0.0, 0usize), |(s, n), km| (s + km, n + 1));
        if n == 0 {
            None
        } else {
            Some(sum / n as f64)
        }
    }

    /// 清洁档位: (作业分钟, 技能要求)
    pub fn cleaning_profile(cleaning_type: CleaningType) -> (u32, SkillLevel) {
        match cleaning_type {
            CleaningType::Deep => (120, SkillLevel::Certified),
            CleaningType::Light => (60, SkillLevel::Basic),
            CleaningType::Scheduled => (90, SkillLevel::Basic),
            CleaningType::None => (0, SkillLevel::Basic),
        }
    }
}
