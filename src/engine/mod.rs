// ==========================================
// 车辆夜间入段排产系统 - 引擎层
// ==========================================
// 职责: 特征提取、三阶段排产、人工调整与情景投影规则
// 红线: Engine 不拼 SQL（数据经 FleetDataProvider 读取），所有决策必须输出 reason
// ==========================================

pub mod assignment;
pub mod bay_pool;
pub mod error;
pub mod feature_core;
pub mod feature_extractor;
pub mod item_override;
pub mod pipeline;
pub mod scoring;
pub mod turnout;
pub mod what_if;
pub mod yard_scheduler;

// 重导出核心引擎
pub use assignment::{fleet_size_alerts, AssignmentOutcome, AssignmentSolver, FALLBACK_MESSAGE};
pub use bay_pool::BayPool;
pub use error::{EngineError, EngineResult};
pub use feature_core::FeatureCore;
pub use feature_extractor::FeatureExtractor;
pub use item_override::{ItemChanges, OverrideRules};
pub use pipeline::{PipelineOutput, PlanPipeline};
pub use scoring::ScoringCore;
pub use turnout::{TurnoutPlan, TurnoutSequencer};
pub use what_if::{DiffSource, VehicleDiff, WhatIfProjector, WhatIfRequest, WhatIfResult};
pub use yard_scheduler::{YardSchedule, YardScheduler};
