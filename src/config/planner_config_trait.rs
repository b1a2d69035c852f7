// ==========================================
// 车辆夜间入段排产系统 - 排产配置读取 Trait
// ==========================================
// 职责: 定义排产流水线所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::settings::{FleetLimits, SolverBackend};
use crate::domain::plan::PlanWeights;
use async_trait::async_trait;
use chrono::NaiveTime;
use std::error::Error;

/// 配置读取错误
pub type ConfigError = Box<dyn Error + Send + Sync>;

// ==========================================
// PlannerConfigReader Trait
// ==========================================
// 用途: 排产流水线启动时一次性读取，生成 PlannerSettings 快照
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait PlannerConfigReader: Send + Sync {
    // ===== 车队规模 =====

    /// 获取上线数量上下限与备用下限
    ///
    /// # 默认值
    /// - active_min=7, active_max=9, standby_min=1
    async fn get_fleet_limits(&self) -> Result<FleetLimits, ConfigError>;

    // ===== 时间窗口 =====

    /// 获取运营时间窗口 (开始, 结束)
    ///
    /// # 默认值
    /// - 06:00 ~ 22:30
    async fn get_service_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError>;

    /// 获取夜间入段窗口 (开始, 结束)，结束早于开始时视为次日
    ///
    /// # 默认值
    /// - 21:00 ~ 05:30(+1)
    async fn get_night_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError>;

    // ===== 目标函数 =====

    /// 获取默认权重（新建计划时使用）
    async fn get_default_weights(&self) -> Result<PlanWeights, ConfigError>;

    /// 获取广告曝光滚动窗口天数（默认 7）
    async fn get_branding_window_days(&self) -> Result<u32, ConfigError>;

    // ===== 求解器 =====

    /// 获取求解时间预算（秒，默认 30）
    async fn get_solver_time_budget_secs(&self) -> Result<u64, ConfigError>;

    /// 获取求解后端（默认 MILP）
    async fn get_solver_backend(&self) -> Result<SolverBackend, ConfigError>;

    // ===== 里程 =====

    /// 获取日运营小时数（默认 16.5）
    async fn get_service_hours(&self) -> Result<f64, ConfigError>;

    /// 获取平均运行速度 km/h（默认 35）
    async fn get_avg_speed_kmh(&self) -> Result<f64, ConfigError>;

    // ===== 入段作业 =====

    /// 获取默认检修作业时长（分钟，默认 60）
    async fn get_default_maintenance_minutes(&self) -> Result<u32, ConfigError>;

    /// 获取股道作业间隔（分钟，默认 15）
    async fn get_yard_job_buffer_minutes(&self) -> Result<u32, ConfigError>;
}
