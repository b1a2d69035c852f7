use super::*;
use crate::config::PlannerConfigReader;
use crate::repository::RepositoryError;
use chrono::NaiveDate;
use tracing::info;

impl PlanApi {
    // ==========================================
    // 计划管理接口
    // ==========================================

    /// 创建夜间计划
    ///
    /// # 参数
    /// - plan_date: 计划日（必须晚于今天，且不得重复）
    /// - weights: 权重覆盖（None 使用配置默认权重）
    /// - notes: 备注
    /// - created_by: 创建人
    ///
    /// # 返回
    /// - Ok(String): 计划ID
    pub fn create_plan(
        &self,
        plan_date: NaiveDate,
        weights: Option<WeightOverrides>,
        notes: Option<String>,
        created_by: &str,
    ) -> ApiResult<String> {
        if created_by.trim().is_empty() {
            return Err(ApiError::InvalidInput("创建人不能为空".to_string()));
        }

        let today = chrono::Local::now().date_naive();
        if plan_date <= today {
            return Err(ApiError::PlanDateNotInFuture {
                plan_date: plan_date.to_string(),
                today: today.to_string(),
            });
        }

        if self.plan_repo.find_by_date(plan_date)?.is_some() {
            return Err(ApiError::DuplicatePlanDate(plan_date.to_string()));
        }

        let defaults = block_on(self.config_manager.get_default_weights())?
            .map_err(|e| ApiError::InternalError(format!("默认权重读取失败: {}", e)))?;
        let weights = match &weights {
            Some(overrides) => defaults.with_overrides(overrides).map_err(ApiError::InvalidInput)?,
            None => defaults,
        };

        let plan = Plan::new_draft(
            uuid::Uuid::new_v4().to_string(),
            plan_date,
            weights,
            notes,
            created_by.to_string(),
            Self::now(),
        );
        let audit = Self::audit(
            &plan.plan_id,
            ActionType::CreatePlan,
            created_by,
            None,
            Some(serde_json::json!({
                "plan_date": plan_date.to_string(),
                "weights": weights,
            })),
            format!("创建夜间计划: {}", plan_date),
        );

        match self.plan_repo.create(&plan, &audit) {
            Ok(_) => {}
            // 并发创建同日计划
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Err(ApiError::DuplicatePlanDate(plan_date.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        info!(plan_id = %plan.plan_id, plan_date = %plan_date, created_by, "夜间计划已创建");
        Ok(plan.plan_id)
    }

    /// 查询计划详情（含明细、入段排程、告警）
    pub fn get_plan(&self, plan_id: &str) -> ApiResult<PlanDetail> {
        let plan = self.load_plan(plan_id)?;
        Ok(PlanDetail {
            items: self.item_repo.list_by_plan(plan_id)?,
            yard_schedule: self.occupancy_repo.list_by_plan(plan_id)?,
            alerts: self.alert_repo.list_by_plan(plan_id)?,
            plan,
        })
    }

    /// 按计划日查询计划
    pub fn find_plan_by_date(&self, plan_date: NaiveDate) -> ApiResult<Option<Plan>> {
        Ok(self.plan_repo.find_by_date(plan_date)?)
    }

    /// 查询计划摘要
    pub fn get_plan_summary(&self, plan_id: &str) -> ApiResult<PlanSummary> {
        let plan = self.load_plan(plan_id)?;
        let items = self.item_repo.list_by_plan(plan_id)?;

        Ok(PlanSummary {
            counts: DecisionCounts::from_decisions(items.iter().map(|i| &i.decision)),
            yard_jobs: self.occupancy_repo.list_by_plan(plan_id)?.len(),
            alert_count: self.alert_repo.count_by_plan(plan_id)?,
            override_count: items.iter().filter(|i| i.manual_override).count(),
            plan,
        })
    }

    /// 分页查询计划（按计划日降序）
    ///
    /// # 参数
    /// - limit: 1..=MAX_PAGE_SIZE
    /// - offset: 偏移量
    pub fn list_plans(&self, limit: usize, offset: usize) -> ApiResult<PlanPage> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(ApiError::InvalidInput(format!(
                "分页大小必须在1~{}之间: {}",
                MAX_PAGE_SIZE, limit
            )));
        }

        Ok(PlanPage {
            plans: self.plan_repo.list(limit, offset)?,
            total: self.plan_repo.count()?,
            limit,
            offset,
        })
    }

    /// 定稿
    ///
    /// # 返回
    /// - Ok(true): 已定稿（重复调用同样返回 true，不再写入）
    /// - Err(LifecycleViolation): 计划不在 completed / amended
    pub fn finalize_plan(&self, plan_id: &str, actor: &str) -> ApiResult<bool> {
        if actor.trim().is_empty() {
            return Err(ApiError::InvalidInput("操作人不能为空".to_string()));
        }

        self.locks.with_plan_lock(plan_id, || {
            let plan = self.load_plan(plan_id)?;
            if plan.status == PlanStatus::Finalized {
                return Ok(true);
            }
            if !plan.status.is_amendable() {
                return Err(Self::lifecycle_violation(&plan, "finalize"));
            }

            let audit = Self::audit(
                plan_id,
                ActionType::FinalizePlan,
                actor,
                None,
                None,
                format!("计划定稿: {}", plan.plan_date),
            );
            if !self.plan_repo.finalize(plan_id, &audit)? {
                return Err(self.lifecycle_violation_now(plan_id, "finalize"));
            }

            info!(plan_id, actor, "夜间计划已定稿");
            Ok(true)
        })
    }
}
