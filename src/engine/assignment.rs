// ==========================================
// 车辆夜间入段排产系统 - Stage 1 运营分配求解器
// ==========================================
// 职责: 为每辆车决定 active / standby / ibl
// 主路径: MILP (good_lp + HiGHS，带时间预算)
// 回退: 不可行 / 求解错误 / 解校验失败 / 后端配置为 GREEDY → 确定性规则分配
// 红线: 不合格车辆永不上线；求解不可行不是错误，降级并告警
// ==========================================

mod alerts;
mod greedy;
mod milp;

pub use alerts::fleet_size_alerts;

use crate::config::{FleetLimits, PlannerSettings, SolverBackend};
use crate::domain::alert::AlertNotice;
use crate::domain::features::VehicleFeatures;
use crate::domain::plan::{DecisionCounts, PlanWeights, ScoreTerms, SolverPath};
use crate::domain::types::{AlertCode, Decision};
use crate::engine::scoring::ScoringCore;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// 回退告警文本
pub const FALLBACK_MESSAGE: &str = "Optimization failed, used fallback assignment";

// ==========================================
// AssignmentOutcome - Stage 1 输出
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub decisions: BTreeMap<String, Decision>,
    pub terms: BTreeMap<String, ScoreTerms>,
    pub objective_value: f64,
    pub solver_path: SolverPath,
    pub degraded_reason: Option<String>,
    pub alerts: Vec<AlertNotice>,
    pub solve_millis: u128,
}

impl AssignmentOutcome {
    pub fn counts(&self) -> DecisionCounts {
        DecisionCounts::from_decisions(self.decisions.values())
    }

    pub fn is_degraded(&self) -> bool {
        self.solver_path == SolverPath::Fallback
    }
}

// ==========================================
// AssignmentSolver - 运营分配求解器
// ==========================================
#[derive(Debug, Clone)]
pub struct AssignmentSolver {
    limits: FleetLimits,
    service_hours: f64,
    time_budget_secs: u64,
    backend: SolverBackend,
}

impl AssignmentSolver {
    pub fn new(limits: FleetLimits, service_hours: f64, time_budget_secs: u64, backend: SolverBackend) -> Self {
        Self {
            limits,
            service_hours,
            time_budget_secs,
            backend,
        }
    }

    pub fn from_settings(settings: &PlannerSettings) -> Self {
        Self::new(
            settings.fleet,
            settings.service_hours,
            settings.solver_time_budget_secs,
            settings.solver_backend,
        )
    }

    pub fn limits(&self) -> &FleetLimits {
        &self.limits
    }

    pub fn time_budget_secs(&self) -> u64 {
        self.time_budget_secs
    }

    /// 求解
    ///
    /// # 返回
    /// - 始终返回完整分配（必要时为回退结果）
    #[instrument(skip(self, features, weights), fields(vehicles = features.len(), backend = %self.backend))]
    pub fn solve(&self, features: &BTreeMap<String, VehicleFeatures>, weights: &PlanWeights) -> AssignmentOutcome {
        let started = Instant::now();

        let eligible = features.values().filter(|f| f.is_eligible_for_service()).count();

        let attempt = match self.backend {
            SolverBackend::Greedy => Err("求解后端配置为 GREEDY".to_string()),
            SolverBackend::Milp if eligible < self.limits.active_min => Err(format!(
                "可上线车辆{}辆，不足下限{}辆，模型不可行",
                eligible, self.limits.active_min
            )),
            SolverBackend::Milp => milp::solve_milp(
                features,
                weights,
                &self.limits,
                self.service_hours,
                self.time_budget_secs,
            )
            .and_then(|decisions| self.validate(&decisions, features).map(|_| decisions)),
        };

        let outcome = match attempt {
            Ok(decisions) => self.build_outcome(features, weights, decisions, SolverPath::Optimized, None, started),
            Err(reason) => {
                warn!(reason = %reason, "MILP 未得到可用解，使用规则回退");
                self.fallback(features, weights, &reason)
            }
        };

        let counts = outcome.counts();
        info!(
            active = counts.active,
            standby = counts.standby,
            ibl = counts.ibl,
            objective = outcome.objective_value,
            degraded = outcome.is_degraded(),
            elapsed_ms = outcome.solve_millis,
            "Stage 1 分配完成"
        );
        outcome
    }

    /// 确定性规则回退（含降级告警）
    pub fn fallback(
        &self,
        features: &BTreeMap<String, VehicleFeatures>,
        weights: &PlanWeights,
        reason: &str,
    ) -> AssignmentOutcome {
        let started = Instant::now();
        let decisions = greedy::greedy_assign(features, &self.limits);
        self.build_outcome(
            features,
            weights,
            decisions,
            SolverPath::Fallback,
            Some(reason.to_string()),
            started,
        )
    }

    /// 解校验: 每车恰一决策、上线数量在界内、不合格车辆未上线
    fn validate(
        &self,
        decisions: &BTreeMap<String, Decision>,
        features: &BTreeMap<String, VehicleFeatures>,
    ) -> Result<(), String> {
        if decisions.len() != features.len() {
            return Err(format!("解覆盖{}辆车，应为{}辆", decisions.len(), features.len()));
        }
        let active = decisions.values().filter(|d| **d == Decision::Active).count();
        if active < self.limits.active_min || active > self.limits.active_max {
            return Err(format!("解的上线数量{}越界", active));
        }
        for (vehicle_id, decision) in decisions {
            let eligible = features
                .get(vehicle_id)
                .map(|f| f.is_eligible_for_service())
                .unwrap_or(false);
            if *decision == Decision::Active && !eligible {
                return Err(format!("解将不合格车辆{}安排上线", vehicle_id));
            }
        }
        Ok(())
    }

    fn build_outcome(
        &self,
        features: &BTreeMap<String, VehicleFeatures>,
        weights: &PlanWeights,
        decisions: BTreeMap<String, Decision>,
        solver_path: SolverPath,
        degraded_reason: Option<String>,
        started: Instant,
    ) -> AssignmentOutcome {
        let terms: BTreeMap<String, ScoreTerms> = features
            .iter()
            .map(|(id, f)| (id.clone(), ScoringCore::score_terms(f, self.service_hours)))
            .collect();

        let objective_value = ScoringCore::plan_cost(
            decisions
                .iter()
                .filter_map(|(id, d)| terms.get(id).map(|t| (t, *d))),
            weights,
        );

        let mut alerts = alerts::assignment_alerts(&decisions, features, &self.limits);
        if let Some(reason) = &degraded_reason {
            alerts.push(AlertNotice::warning(
                AlertCode::OptimizationDegraded,
                FALLBACK_MESSAGE,
                json!({ "reason": reason }),
            ));
        }

        AssignmentOutcome {
            decisions,
            terms,
            objective_value,
            solver_path,
            degraded_reason,
            alerts,
            solve_millis: started.elapsed().as_millis(),
        }
    }
}
