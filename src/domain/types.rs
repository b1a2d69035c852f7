// ==========================================
// 车辆夜间入段排产系统 - 领域类型定义
// ==========================================
// 职责: 决策 / 计划状态 / 清洁类型 / 告警等级等枚举
// 序列化格式: 小写 snake_case（与数据库、外部接口一致）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 夜间决策 (Decision)
// ==========================================
// active: 次日投入运营
// standby: 留段备用
// ibl: 入段检修/清洁 (inspection bay line)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Active,
    Standby,
    Ibl,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl Decision {
    pub const ALL: [Decision; 3] = [Decision::Active, Decision::Standby, Decision::Ibl];

    /// 严格解析（未知取值返回 None，由调用方报校验错误）
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(Decision::Active),
            "standby" => Some(Decision::Standby),
            "ibl" => Some(Decision::Ibl),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            Decision::Active => "active",
            Decision::Standby => "standby",
            Decision::Ibl => "ibl",
        }
    }
}

// ==========================================
// 计划状态 (Plan Status)
// ==========================================
// draft → running → {completed | failed}
// completed → amended (人工调整)
// completed/amended → finalized (终态)
// failed 可重跑
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Running,
    Completed,
    Amended,
    Finalized,
    Failed,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl PlanStatus {
    /// 允许发起运行的状态
    pub const RUNNABLE: [PlanStatus; 4] = [
        PlanStatus::Draft,
        PlanStatus::Failed,
        PlanStatus::Completed,
        PlanStatus::Amended,
    ];

    /// 允许人工调整 / 定稿的状态
    pub const AMENDABLE: [PlanStatus; 2] = [PlanStatus::Completed, PlanStatus::Amended];

    /// 从数据库字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Some(PlanStatus::Draft),
            "running" => Some(PlanStatus::Running),
            "completed" => Some(PlanStatus::Completed),
            "amended" => Some(PlanStatus::Amended),
            "finalized" => Some(PlanStatus::Finalized),
            "failed" => Some(PlanStatus::Failed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PlanStatus::Draft => "draft",
            PlanStatus::Running => "running",
            PlanStatus::Completed => "completed",
            PlanStatus::Amended => "amended",
            PlanStatus::Finalized => "finalized",
            PlanStatus::Failed => "failed",
        }
    }

    pub fn is_runnable(&self) -> bool {
        Self::RUNNABLE.contains(self)
    }

    pub fn is_amendable(&self) -> bool {
        Self::AMENDABLE.contains(self)
    }

    /// 是否已有提交的结果（明细可查询 / 可做 what-if）
    pub fn has_results(&self) -> bool {
        matches!(
            self,
            PlanStatus::Completed | PlanStatus::Amended | PlanStatus::Finalized
        )
    }
}

// ==========================================
// 清洁类型 (Cleaning Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningType {
    None,
    Light,
    Deep,
    Scheduled,
}

impl fmt::Display for CleaningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl CleaningType {
    /// 从清洁档期类型解析（未知类型按计划清洁处理）
    pub fn from_slot_type(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "light" => CleaningType::Light,
            "deep" => CleaningType::Deep,
            "none" | "" => CleaningType::None,
            _ => CleaningType::Scheduled,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            CleaningType::None => "none",
            CleaningType::Light => "light",
            CleaningType::Deep => "deep",
            CleaningType::Scheduled => "scheduled",
        }
    }
}

// ==========================================
// 技能要求 (Skill Requirement)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    Basic,
    Certified,
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkillLevel::Basic => write!(f, "basic"),
            SkillLevel::Certified => write!(f, "certified"),
        }
    }
}

// ==========================================
// 告警等级 (Alert Severity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AlertSeverity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Some(AlertSeverity::Info),
            "warning" => Some(AlertSeverity::Warning),
            "critical" => Some(AlertSeverity::Critical),
            _ => None,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "info",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Critical => "critical",
        }
    }
}

// ==========================================
// 告警代码 (Alert Code)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertCode {
    ActiveAtMinimum,
    ActiveAtMaximum,
    ActiveBelowMinimum,
    ActiveAboveMaximum,
    StandbyBelowMinimum,
    UnsafeActive,
    OptimizationDegraded,
    ExtractionFailed,
    YardWindowOverrun,
    StablingCapacityShortfall,
}

impl fmt::Display for AlertCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AlertCode {
    pub fn parse(s: &str) -> Option<Self> {
        let code = match s.trim().to_uppercase().as_str() {
            "ACTIVE_AT_MINIMUM" => AlertCode::ActiveAtMinimum,
            "ACTIVE_AT_MAXIMUM" => AlertCode::ActiveAtMaximum,
            "ACTIVE_BELOW_MINIMUM" => AlertCode::ActiveBelowMinimum,
            "ACTIVE_ABOVE_MAXIMUM" => AlertCode::ActiveAboveMaximum,
            "STANDBY_BELOW_MINIMUM" => AlertCode::StandbyBelowMinimum,
            "UNSAFE_ACTIVE" => AlertCode::UnsafeActive,
            "OPTIMIZATION_DEGRADED" => AlertCode::OptimizationDegraded,
            "EXTRACTION_FAILED" => AlertCode::ExtractionFailed,
            "YARD_WINDOW_OVERRUN" => AlertCode::YardWindowOverrun,
            "STABLING_CAPACITY_SHORTFALL" => AlertCode::StablingCapacityShortfall,
            _ => return None,
        };
        Some(code)
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlertCode::ActiveAtMinimum => "ACTIVE_AT_MINIMUM",
            AlertCode::ActiveAtMaximum => "ACTIVE_AT_MAXIMUM",
            AlertCode::ActiveBelowMinimum => "ACTIVE_BELOW_MINIMUM",
            AlertCode::ActiveAboveMaximum => "ACTIVE_ABOVE_MAXIMUM",
            AlertCode::StandbyBelowMinimum => "STANDBY_BELOW_MINIMUM",
            AlertCode::UnsafeActive => "UNSAFE_ACTIVE",
            AlertCode::OptimizationDegraded => "OPTIMIZATION_DEGRADED",
            AlertCode::ExtractionFailed => "EXTRACTION_FAILED",
            AlertCode::YardWindowOverrun => "YARD_WINDOW_OVERRUN",
            AlertCode::StablingCapacityShortfall => "STABLING_CAPACITY_SHORTFALL",
        }
    }
}
