// ==========================================
// 车辆夜间入段排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、业务规则接口
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod alert;
pub mod features;
pub mod fleet;
pub mod plan;
pub mod types;
pub mod yard;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use alert::{AlertNotice, PlanAlert};
pub use features::VehicleFeatures;
pub use fleet::{BrandingCampaign, CleaningSlot, ExposureRecord, FitnessCertificate, StablingBay, Vehicle, WorkOrder};
pub use plan::{
    DecisionCounts, ExplainValue, ItemExplanation, ItemPlacement, OverrideRecord, Plan, PlanItem,
    PlanWeights, ScoreTerms, SolverPath,
};
pub use types::{AlertCode, AlertSeverity, CleaningType, Decision, PlanStatus, SkillLevel};
pub use yard::{TurnoutSlot, YardConflict, YardOccupancy};
