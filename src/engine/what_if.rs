// ==========================================
// 车辆夜间入段排产系统 - What-If 情景投影
// ==========================================
// 职责: 在已提交明细上叠加强制决策 / 禁用清单 / 权重增量，投影情景结果
// 红线: 只读投影，不重新求解、不写库
// ==========================================

use crate::config::FleetLimits;
use crate::domain::alert::AlertNotice;
use crate::domain::plan::{DecisionCounts, PlanItem, PlanWeights};
use crate::domain::types::{AlertCode, Decision};
use crate::engine::assignment::fleet_size_alerts;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::scoring::ScoringCore;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

// ==========================================
// WhatIfRequest - 情景输入
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhatIfRequest {
    #[serde(default)]
    pub force: BTreeMap<String, String>, // vehicle_id -> decision
    #[serde(default)]
    pub ban: Vec<String>, // 强制备用
    #[serde(default)]
    pub weight_deltas: BTreeMap<String, f64>,
}

// ==========================================
// DiffSource - 变更来源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffSource {
    Forced,
    Banned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDiff {
    pub vehicle_id: String,
    pub baseline: Decision,
    pub scenario: Decision,
    pub source: DiffSource,
}

// ==========================================
// WhatIfResult - 情景输出
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatIfResult {
    pub baseline: DecisionCounts,
    pub scenario: DecisionCounts,
    pub diffs: Vec<VehicleDiff>,
    pub alerts: Vec<AlertNotice>,
    pub baseline_cost: f64,
    pub scenario_cost: f64, // 含 override 权重 × 变更车辆数
    pub weights: PlanWeights,
}

// ==========================================
// WhatIfProjector - 情景投影器
// ==========================================
pub struct WhatIfProjector;

impl WhatIfProjector {
    /// 投影情景
    ///
    /// # 参数
    /// - items: 已提交明细
    /// - plan_weights: 计划权重
    /// - limits: 车队规模约束
    /// - request: 情景输入
    ///
    /// # 返回
    /// - Err(InvalidInput): 未知车辆、非法决策、强制与禁用冲突、非法权重增量
    pub fn project(
        items: &[PlanItem],
        plan_weights: &PlanWeights,
        limits: &FleetLimits,
        request: &WhatIfRequest,
    ) -> EngineResult<WhatIfResult> {
        let weights = plan_weights
            .with_deltas(&request.weight_deltas)
            .map_err(EngineError::InvalidInput)?;

        let known: BTreeSet<&str> = items.iter().map(|i| i.vehicle_id.as_str()).collect();
        let mut changes: BTreeMap<&str, (Decision, DiffSource)> = BTreeMap::new();

        for (vehicle_id, raw) in &request.force {
            if !known.contains(vehicle_id.as_str()) {
                return Err(EngineError::InvalidInput(format!("计划中不存在车辆: {}", vehicle_id)));
            }
            let decision = Decision::parse(raw)
                .ok_or_else(|| EngineError::InvalidInput(format!("非法决策值: {}", raw)))?;
            changes.insert(vehicle_id.as_str(), (decision, DiffSource::Forced));
        }

        for vehicle_id in &request.ban {
            if !known.contains(vehicle_id.as_str()) {
                return Err(EngineError::InvalidInput(format!("计划中不存在车辆: {}", vehicle_id)));
            }
            if let Some((forced, _)) = changes.get(vehicle_id.as_str()) {
                if *forced != Decision::Standby {
                    return Err(EngineError::InvalidInput(format!(
                        "车辆{}同时被强制为{}与禁用",
                        vehicle_id, forced
                    )));
                }
            }
            changes.insert(vehicle_id.as_str(), (Decision::Standby, DiffSource::Banned));
        }

        let mut baseline = DecisionCounts::default();
        let mut scenario = DecisionCounts::default();
        let mut diffs = Vec::new();
        let mut baseline_cost = 0.0;
        let mut scenario_cost = 0.0;
        let mut alerts = Vec::new();

        for item in items {
            let terms = &item.explanation.terms;
            let next = match changes.get(item.vehicle_id.as_str()) {
                Some((decision, source)) => {
                    if *decision != item.decision {
                        diffs.push(VehicleDiff {
                            vehicle_id: item.vehicle_id.clone(),
                            baseline: item.decision,
                            scenario: *decision,
                            source: *source,
                        });
                    }
                    *decision
                }
                None => item.decision,
            };

            baseline.record(item.decision);
            scenario.record(next);
            baseline_cost += ScoringCore::decision_cost(terms, item.decision, &weights);
            scenario_cost += ScoringCore::decision_cost(terms, next, &weights);

            if next == Decision::Active && !item.explanation.is_safe_for_service() {
                alerts.push(AlertNotice::critical(
                    AlertCode::UnsafeActive,
                    format!("情景中车辆{}不满足上线条件", item.vehicle_id),
                    json!({
                        "vehicle_id": item.vehicle_id,
                        "fitness_ok": item.explanation.fitness_ok,
                        "work_order_blocking": item.explanation.work_order_blocking,
                    }),
                ));
            }
        }
        scenario_cost += weights.override_penalty * diffs.len() as f64;

        let mut all_alerts = fleet_size_alerts(&scenario, limits);
        all_alerts.append(&mut alerts);

        Ok(WhatIfResult {
            baseline,
            scenario,
            diffs,
            alerts: all_alerts,
            baseline_cost,
            scenario_cost,
            weights,
        })
    }
}
