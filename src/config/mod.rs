// ==========================================
// 车辆夜间入段排产系统 - 配置层
// ==========================================
// 职责: 系统配置管理（config_kv 表）与参数快照
// ==========================================

pub mod config_manager;
pub mod planner_config_trait;
pub mod settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use planner_config_trait::{ConfigError, PlannerConfigReader};
pub use settings::{FleetLimits, PlannerSettings, SolverBackend};
