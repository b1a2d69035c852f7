// ==========================================
// 车辆夜间入段排产系统 - 目标函数分项
// ==========================================
// 职责: 风险分、单车分项、单车单决策代价（求解器、回退、what-if 共用）
// 红线: 无状态、无副作用、无 I/O 操作
// ==========================================

use crate::domain::features::VehicleFeatures;
use crate::domain::plan::{PlanWeights, ScoreTerms};
use crate::domain::types::Decision;

/// 证书缓冲满分阈值（小时）
const BUFFER_HORIZON_HOURS: f64 = 24.0;

// ==========================================
// ScoringCore - 纯函数工具类
// ==========================================
pub struct ScoringCore;

impl ScoringCore {
    /// 风险分 ∈ [0, 1]
    ///
    /// # 规则
    /// - 0.7 × max(0, 1 - 缓冲/24)（仅缓冲有限时）
    /// - 0.3 × min(1, 0.3 × 关键工单数)
    pub fn risk_score(features: &VehicleFeatures) -> f64 {
        let buffer = features.fitness_buffer_hours;
        let fitness_part = if buffer.is_finite() {
            0.7 * (1.0 - buffer / BUFFER_HORIZON_HOURS).max(0.0)
        } else {
            0.0
        };
        let wo_part = 0.3 * (0.3 * features.critical_work_order_count as f64).min(1.0);
        fitness_part + wo_part
    }

    /// 单车目标函数分项
    ///
    /// 广告/里程分项按“上线 / 不上线”两种取值预先展开，
    /// 与求解器中松弛变量在最优解处的取值一致。
    pub fn score_terms(features: &VehicleFeatures, service_hours: f64) -> ScoreTerms {
        let target = features.daily_branding_target_hours;
        let dev = features.mileage_deviation;

        ScoreTerms {
            risk_score: Self::risk_score(features),
            brand_deficit_hours: features.branding_rolling_deficit_hours,
            brand_shortfall_if_active: (target - service_hours).max(0.0),
            brand_shortfall_if_idle: target.max(0.0),
            mileage_deviation_km: dev,
            mileage_abs_if_active: (dev + features.expected_km_if_active).abs(),
            mileage_abs_if_idle: dev.abs(),
            needs_cleaning: features.needs_cleaning,
            exit_cost_minutes: features.yard_exit_cost_seconds as f64 / 60.0,
        }
    }

    /// 单车在指定决策下的代价
    pub fn decision_cost(terms: &ScoreTerms, decision: Decision, weights: &PlanWeights) -> f64 {
        let clean = if terms.needs_cleaning { 1.0 } else { 0.0 };
        match decision {
            Decision::Active => {
                weights.risk * terms.risk_score
                    + weights.brand * terms.brand_shortfall_if_active
                    + weights.mileage * terms.mileage_abs_if_active
                    + weights.clean * clean
                    + weights.shunt * terms.exit_cost_minutes
            }
            Decision::Standby => {
                weights.brand * terms.brand_shortfall_if_idle
                    + weights.mileage * terms.mileage_abs_if_idle
                    + weights.clean * clean
            }
            Decision::Ibl => {
                weights.brand * terms.brand_shortfall_if_idle + weights.mileage * terms.mileage_abs_if_idle
            }
        }
    }

    /// 整体代价
    pub fn plan_cost<'a>(
        assignments: impl IntoIterator<Item = (&'a ScoreTerms, Decision)>,
        weights: &PlanWeights,
    ) -> f64 {
        assignments
            .into_iter()
            .map(|(terms, decision)| Self::decision_cost(terms, decision, weights))
            .sum()
    }
}
