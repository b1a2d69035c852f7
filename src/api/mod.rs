// ==========================================
// 车辆夜间入段排产系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口（同步调用，内部桥接异步排产流程）
// ==========================================

pub mod error;
pub mod plan_api;
pub mod plan_lock;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use plan_api::{
    ItemExplainView, PlanApi, PlanDetail, PlanPage, PlanSummary, RunPlanResult, WeightOverrides,
    MAX_PAGE_SIZE,
};
pub use plan_lock::PlanLockRegistry;
