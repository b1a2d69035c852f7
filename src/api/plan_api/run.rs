use super::*;
use crate::engine::PipelineOutput;
use crate::repository::RunCommit;
use tracing::{error, info, warn};

impl PlanApi {
    // ==========================================
    // 运行接口
    // ==========================================

    /// 运行夜间计划（特征提取 → 运营分配 → 入段排程 ∥ 出库排序）
    ///
    /// # 参数
    /// - plan_id: 计划ID
    /// - weight_overrides: 本次运行的权重覆盖（None 沿用计划权重）
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(RunPlanResult): 运行结果包（计划状态为 completed）
    /// - Err(LifecycleViolation): 计划正在运行或已定稿
    /// - Err(RunFailed): 流程失败，计划置为 failed，上一次结果保留
    pub fn run_plan(
        &self,
        plan_id: &str,
        weight_overrides: Option<WeightOverrides>,
        actor: &str,
    ) -> ApiResult<RunPlanResult> {
        if actor.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        let plan = self.load_plan(plan_id)?;
        if !plan.status.is_runnable() {
            return Err(Self::lifecycle_violation(&plan, "run"));
        }

        // 权重校验在状态变更之前
        let weights = match &weight_overrides {
            Some(overrides) => plan.weights.with_overrides(overrides).map_err(ApiError::InvalidInput)?,
            None => plan.weights,
        };

        if !self
            .plan_repo
            .transition_status(plan_id, &PlanStatus::RUNNABLE, PlanStatus::Running, Self::now())?
        {
            return Err(self.lifecycle_violation_now(plan_id, "run"));
        }
        info!(plan_id, plan_date = %plan.plan_date, actor, "夜间计划开始运行");

        let output = match block_on(self.pipeline.execute(plan_id, plan.plan_date, weights, Self::now())) {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(self.fail_run(plan_id, actor, e.to_string())),
            Err(e) => return Err(self.fail_run(plan_id, actor, e.to_string())),
        };

        let result = self.locks.with_plan_lock(plan_id, || self.commit_output(plan_id, actor, &output));
        match result {
            Ok(result) => {
                info!(
                    plan_id,
                    active = result.counts.active,
                    standby = result.counts.standby,
                    ibl = result.counts.ibl,
                    degraded = result.optimization_degraded,
                    duration_ms = result.duration_ms,
                    "夜间计划运行完成"
                );
                Ok(result)
            }
            Err(e) => Err(self.fail_run(plan_id, actor, format!("结果提交失败: {}", e))),
        }
    }

    /// 单事务提交运行结果
    fn commit_output(&self, plan_id: &str, actor: &str, output: &PipelineOutput) -> ApiResult<RunPlanResult> {
        let run_at = Self::now();
        let alerts: Vec<PlanAlert> = output
            .alerts
            .iter()
            .cloned()
            .map(|notice| PlanAlert::from_notice(plan_id, notice, run_at))
            .collect();
        let counts = DecisionCounts::from_decisions(output.items.iter().map(|i| &i.decision));
        let degraded = output.assignment.is_degraded();

        let audit = Self::audit(
            plan_id,
            ActionType::RunPlan,
            actor,
            None,
            Some(serde_json::json!({
                "weights": output.weights,
                "counts": counts,
                "objective_value": output.assignment.objective_value,
                "solver_path": output.assignment.solver_path,
                "degraded_reason": output.assignment.degraded_reason,
                "duration_ms": output.duration_ms,
            })),
            format!(
                "运行完成: active={}, standby={}, ibl={}",
                counts.active, counts.standby, counts.ibl
            ),
        );

        let commit = RunCommit {
            plan_id: plan_id.to_string(),
            weights: output.weights,
            items: output.items.clone(),
            occupancies: output.yard_schedule.occupancies.clone(),
            alerts: alerts.clone(),
            objective_value: output.assignment.objective_value,
            optimization_degraded: degraded,
            run_at,
            duration_ms: output.duration_ms,
            audit,
        };
        self.plan_repo.commit_run(&commit)?;

        Ok(RunPlanResult {
            plan_id: plan_id.to_string(),
            status: PlanStatus::Completed,
            weights: output.weights,
            counts,
            objective_value: output.assignment.objective_value,
            optimization_degraded: degraded,
            items: output.items.clone(),
            yard_schedule: output.yard_schedule.occupancies.clone(),
            turnout: output.turnout.slots.clone(),
            alerts,
            duration_ms: output.duration_ms,
        })
    }

    /// 运行失败: running → failed（上一次提交的结果不动）
    fn fail_run(&self, plan_id: &str, actor: &str, reason: String) -> ApiError {
        error!(plan_id, reason = %reason, "夜间计划运行失败");

        let audit = Self::audit(
            plan_id,
            ActionType::RunFailed,
            actor,
            None,
            Some(serde_json::json!({ "error": reason })),
            format!("运行失败: {}", reason),
        );
        match self.plan_repo.mark_failed(plan_id, &reason, &audit) {
            Ok(true) => {}
            Ok(false) => warn!(plan_id, "计划已不在running状态，未标记失败"),
            Err(e) => warn!(plan_id, error = %e, "标记运行失败时出错"),
        }

        ApiError::RunFailed {
            plan_id: plan_id.to_string(),
            reason,
        }
    }
}
