// ==========================================
// 车辆夜间入段排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + HiGHS
// 系统定位: 决策支持系统（运营 / 备用 / 入段检修，人工最终控制权）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 特征与三阶段排产
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AlertCode, AlertSeverity, CleaningType, Decision, PlanStatus, SkillLevel};

// 领域实体
pub use domain::{
    ActionLog, ActionType, ItemExplanation, Plan, PlanAlert, PlanItem, PlanWeights,
    TurnoutSlot, VehicleFeatures, YardOccupancy,
};

// 引擎
pub use engine::{
    AssignmentSolver, FeatureExtractor, ItemChanges, PlanPipeline, TurnoutSequencer,
    WhatIfRequest, WhatIfResult, YardScheduler,
};

// API
pub use api::{ApiError, ApiResult, PlanApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "车辆夜间入段排产系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
