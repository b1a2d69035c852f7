use super::*;
use crate::engine::{WhatIfProjector, WhatIfRequest, WhatIfResult};
use tracing::debug;

impl PlanApi {
    // ==========================================
    // 情景投影接口（只读）
    // ==========================================

    /// 基于已提交明细投影情景（强制 / 禁用 / 权重增量），不重新求解、不写库
    ///
    /// # 返回
    /// - Err(LifecycleViolation): 计划尚无结果
    /// - Err(InvalidInput): 未知车辆、非法决策、强制与禁用冲突
    pub fn what_if(&self, plan_id: &str, request: &WhatIfRequest) -> ApiResult<WhatIfResult> {
        let plan = self.load_plan(plan_id)?;
        if !plan.status.has_results() {
            return Err(Self::lifecycle_violation(&plan, "what_if"));
        }

        let items = self.item_repo.list_by_plan(plan_id)?;
        let settings = self.load_settings()?;
        let result = WhatIfProjector::project(&items, &plan.weights, &settings.fleet, request)?;

        debug!(
            plan_id,
            diffs = result.diffs.len(),
            baseline_cost = result.baseline_cost,
            scenario_cost = result.scenario_cost,
            "情景投影完成"
        );
        Ok(result)
    }
}
