use super::*;
use crate::domain::types::CleaningType;
use crate::engine::{ItemChanges, OverrideRules, YardScheduler};
use crate::repository::OverrideCommit;
use tracing::{info, warn};

/// 人工调整引起的股道占用变化
struct YardSync {
    release: bool,
    job: Option<YardOccupancy>,
    alerts: Vec<PlanAlert>,
}

impl PlanApi {
    // ==========================================
    // 人工调整接口
    // ==========================================

    /// 调整单车明细
    ///
    /// # 参数
    /// - plan_id: 计划ID
    /// - vehicle_id: 车辆ID
    /// - changes: 调整内容（决策 / 股道 / 出库序号 / 里程目标 / 备注）
    /// - reason: 调整原因（必填）
    /// - actor: 操作人
    ///
    /// # 返回
    /// - Ok(PlanItem): 调整后的明细（计划状态变为 amended）
    /// - Err(InvalidInput): 原因为空 / 序号或股道冲突 / 不满足上线条件的车辆转上线
    /// - Err(LifecycleViolation): 计划不在 completed / amended
    ///
    /// 同一事务内: 其余上线车辆出库序号重排为 1..N，入段车辆的股道占用随决策增删
    pub fn override_item(
        &self,
        plan_id: &str,
        vehicle_id: &str,
        changes: &ItemChanges,
        reason: &str,
        actor: &str,
    ) -> ApiResult<PlanItem> {
        if actor.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        self.locks.with_plan_lock(plan_id, || {
            let plan = self.load_plan(plan_id)?;
            if !plan.status.is_amendable() {
                return Err(Self::lifecycle_violation(&plan, "override"));
            }

            let items = self.item_repo.list_by_plan(plan_id)?;
            let current = items
                .iter()
                .find(|i| i.vehicle_id == vehicle_id)
                .ok_or_else(|| {
                    ApiError::NotFound(format!("计划{}中不存在车辆{}", plan_id, vehicle_id))
                })?;

            let now = Self::now();
            let mut next = OverrideRules::apply(current, &items, changes, reason, actor, now)?;

            let merged: Vec<PlanItem> = items
                .iter()
                .map(|i| if i.vehicle_id == vehicle_id { next.clone() } else { i.clone() })
                .collect();
            let mut renumbered = OverrideRules::compact_turnout_ranks(&merged);
            if let Some(pos) = renumbered.iter().position(|i| i.vehicle_id == vehicle_id) {
                next = renumbered.remove(pos);
            }

            let yard = self.sync_yard(&plan, current, &mut next, changes.bay_id.as_deref(), now)?;
            let placement = next.placement();
            if let Some(record) = next.explanation.overrides.last_mut() {
                record.new = placement;
            }

            let audit = Self::audit(
                plan_id,
                ActionType::Override,
                actor,
                Some(vehicle_id),
                Some(serde_json::json!({
                    "previous": current.placement(),
                    "new": next.placement(),
                    "changes": changes,
                    "reason": reason.trim(),
                    "renumbered": renumbered
                        .iter()
                        .map(|i| serde_json::json!({ "vehicle_id": i.vehicle_id, "turnout_rank": i.turnout_rank }))
                        .collect::<Vec<_>>(),
                    "yard_job": yard.job,
                })),
                format!(
                    "人工调整 {}: {} → {}",
                    vehicle_id, current.decision, next.decision
                ),
            );

            let commit = OverrideCommit {
                item: next.clone(),
                renumbered,
                release_yard: yard.release,
                yard_job: yard.job,
                alerts: yard.alerts,
                audit,
            };
            self.item_repo.save_override(&commit)?;

            info!(
                plan_id,
                vehicle_id,
                actor,
                decision = %next.decision,
                renumbered = commit.renumbered.len(),
                "明细已人工调整"
            );
            Ok(next)
        })
    }

    /// 入段决策变化时同步股道占用
    ///
    /// # 规则
    /// - 转出 ibl: 删除该车占用
    /// - 转入 ibl（或入段车辆改股道）: 删除原占用，在所选股道末项作业之后追加
    fn sync_yard(
        &self,
        plan: &Plan,
        current: &PlanItem,
        next: &mut PlanItem,
        requested_bay: Option<&str>,
        now: NaiveDateTime,
    ) -> ApiResult<YardSync> {
        let bay_changed = requested_bay.map_or(false, |b| current.bay_id.as_deref() != Some(b));
        let entering = next.decision == Decision::Ibl && (current.decision != Decision::Ibl || bay_changed);
        if !entering {
            return Ok(YardSync {
                release: current.decision == Decision::Ibl && next.decision != Decision::Ibl,
                job: None,
                alerts: Vec::new(),
            });
        }

        let settings = self.load_settings()?;
        let pool = self.pipeline.bay_pool()?;
        let existing = self.occupancy_repo.list_by_plan(&plan.plan_id)?;
        let cleaning = if next.explanation.needs_cleaning {
            next.explanation.cleaning_type
        } else {
            CleaningType::None
        };

        let schedule = YardScheduler::from_settings(&settings, plan.plan_date).append_job(
            &plan.plan_id,
            &next.vehicle_id,
            cleaning,
            &pool,
            &existing,
            requested_bay,
        )?;

        let job = schedule.occupancies.into_iter().next();
        if let Some(job) = &job {
            next.bay_id = Some(job.bay_id.clone());
        }
        if !schedule.alerts.is_empty() {
            warn!(plan_id = %plan.plan_id, vehicle_id = %next.vehicle_id, "追加的入段作业超出夜间窗口");
        }

        Ok(YardSync {
            release: true,
            job,
            alerts: schedule
                .alerts
                .into_iter()
                .map(|notice| PlanAlert::from_notice(&plan.plan_id, notice, now))
                .collect(),
        })
    }

    /// 查询计划的人工调整记录（时间升序）
    pub fn list_overrides(&self, plan_id: &str) -> ApiResult<Vec<ActionLog>> {
        self.load_plan(plan_id)?;
        Ok(self
            .action_log_repo
            .list_by_plan(plan_id, Some(ActionType::Override))?)
    }

    /// 查询计划的全部操作日志
    pub fn list_action_logs(&self, plan_id: &str) -> ApiResult<Vec<ActionLog>> {
        self.load_plan(plan_id)?;
        Ok(self.action_log_repo.list_by_plan(plan_id, None)?)
    }
}
