// ==========================================
// 车辆夜间入段排产系统 - 夜间计划 API
// ==========================================
// 职责: 计划生命周期（创建 / 运行 / 人工调整 / 定稿）、情景投影、查询
// 红线: PlanApi 是计划数据的唯一写入方
//       同一计划的运行提交 / 调整 / 定稿按计划串行
// ==========================================

mod overrides;
mod plan_management;
mod queries;
mod run;
mod what_if;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::api::plan_lock::PlanLockRegistry;
use crate::config::{ConfigManager, PlannerSettings};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::alert::PlanAlert;
use crate::domain::plan::{DecisionCounts, ItemExplanation, Plan, PlanItem, PlanWeights};
use crate::domain::types::{Decision, PlanStatus};
use crate::domain::yard::{TurnoutSlot, YardOccupancy};
use crate::engine::PlanPipeline;
use crate::repository::{
    ActionLogRepository, AlertRepository, FleetDataProvider, PlanItemRepository, PlanRepository,
    YardOccupancyRepository,
};

/// 分页上限
pub const MAX_PAGE_SIZE: usize = 200;

// ==========================================
// PlanApi - 夜间计划 API
// ==========================================
pub struct PlanApi {
    plan_repo: Arc<PlanRepository>,
    item_repo: Arc<PlanItemRepository>,
    occupancy_repo: Arc<YardOccupancyRepository>,
    alert_repo: Arc<AlertRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    config_manager: Arc<ConfigManager>,
    pipeline: PlanPipeline<ConfigManager>,
    locks: PlanLockRegistry,
}

impl PlanApi {
    /// 创建新的PlanApi实例
    pub fn new(
        plan_repo: Arc<PlanRepository>,
        item_repo: Arc<PlanItemRepository>,
        occupancy_repo: Arc<YardOccupancyRepository>,
        alert_repo: Arc<AlertRepository>,
        action_log_repo: Arc<ActionLogRepository>,
        config_manager: Arc<ConfigManager>,
        fleet_provider: Arc<dyn FleetDataProvider>,
    ) -> Self {
        Self {
            pipeline: PlanPipeline::new(config_manager.clone(), fleet_provider),
            plan_repo,
            item_repo,
            occupancy_repo,
            alert_repo,
            action_log_repo,
            config_manager,
            locks: PlanLockRegistry::new(),
        }
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    /// 读取计划（不存在 → NotFound）
    fn load_plan(&self, plan_id: &str) -> ApiResult<Plan> {
        if plan_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("plan_id不能为空".to_string()));
        }
        self.plan_repo
            .find_by_id(plan_id)?
            .ok_or_else(|| ApiError::NotFound(format!("计划(id={})不存在", plan_id)))
    }

    fn lifecycle_violation(plan: &Plan, operation: &str) -> ApiError {
        ApiError::LifecycleViolation {
            plan_id: plan.plan_id.clone(),
            status: plan.status,
            operation: operation.to_string(),
        }
    }

    /// 条件迁移失败后重新读取状态，给出生命周期错误
    fn lifecycle_violation_now(&self, plan_id: &str, operation: &str) -> ApiError {
        match self.load_plan(plan_id) {
            Ok(plan) => Self::lifecycle_violation(&plan, operation),
            Err(e) => e,
        }
    }

    fn load_settings(&self) -> ApiResult<PlannerSettings> {
        block_on(PlannerSettings::load(&*self.config_manager))?
            .map_err(|e| ApiError::InternalError(format!("配置读取失败: {}", e)))
    }

    fn audit(
        plan_id: &str,
        action_type: ActionType,
        actor: &str,
        target_id: Option<&str>,
        payload: Option<serde_json::Value>,
        detail: String,
    ) -> ActionLog {
        ActionLog::new(Some(plan_id), action_type, actor, target_id, payload, Some(detail))
    }
}

/// 同步接口中执行异步流程
///
/// 已在 tokio 运行时中: block_in_place；否则新建运行时
pub(crate) fn block_on<F: Future>(fut: F) -> ApiResult<F::Output> {
    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        Ok(tokio::task::block_in_place(|| handle.block_on(fut)))
    } else {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::InternalError(format!("无法创建异步运行时: {}", e)))?;
        Ok(rt.block_on(fut))
    }
}

// ==========================================
// 响应类型
// ==========================================

/// 计划摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub plan: Plan,
    pub counts: DecisionCounts,
    pub yard_jobs: usize,
    pub alert_count: usize,
    pub override_count: usize,
}

/// 计划详情
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDetail {
    pub plan: Plan,
    pub items: Vec<PlanItem>,
    pub yard_schedule: Vec<YardOccupancy>,
    pub alerts: Vec<PlanAlert>,
}

/// 分页计划列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanPage {
    pub plans: Vec<Plan>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// 运行结果包
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPlanResult {
    pub plan_id: String,
    pub status: PlanStatus,
    pub weights: PlanWeights,
    pub counts: DecisionCounts,
    pub objective_value: f64,
    pub optimization_degraded: bool,
    pub items: Vec<PlanItem>,
    pub yard_schedule: Vec<YardOccupancy>,
    pub turnout: Vec<TurnoutSlot>,
    pub alerts: Vec<PlanAlert>,
    pub duration_ms: i64,
}

/// 单车解释
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemExplainView {
    pub plan_id: String,
    pub vehicle_id: String,
    pub decision: Decision,
    pub bay_id: Option<String>,
    pub turnout_rank: Option<u32>,
    pub manual_override: bool,
    pub explanation: ItemExplanation,
}

/// 权重覆盖（键: risk / brand / mileage / clean / shunt / override）
pub type WeightOverrides = BTreeMap<String, f64>;
