// ==========================================
// 车辆夜间入段排产系统 - 计划数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 红线: 计划相关表只由编排器写入
// ==========================================

mod item;
mod occupancy;
mod plan;

pub use item::{OverrideCommit, PlanItemRepository};
pub use occupancy::YardOccupancyRepository;
pub use plan::{PlanRepository, RunCommit};
