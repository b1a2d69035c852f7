// ==========================================
// 车辆夜间入段排产系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod alert_repo;
pub mod error;
pub mod fleet_repo;
pub mod plan_repo;
pub(crate) mod sql_codec;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use alert_repo::AlertRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use fleet_repo::{FleetDataProvider, FleetRepository};
pub use plan_repo::{OverrideCommit, PlanItemRepository, PlanRepository, RunCommit, YardOccupancyRepository};
