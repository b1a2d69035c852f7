// ==========================================
// 车辆夜间入段排产系统 - 操作日志领域模型
// ==========================================
// 红线: 所有计划写入必须记录
// 用途: 审计追踪（含人工调整前后值）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub plan_id: Option<String>,
    pub action_type: ActionType,
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub target_id: Option<String>, // 车辆ID等
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    pub fn new(
        plan_id: Option<&str>,
        action_type: ActionType,
        actor: &str,
        target_id: Option<&str>,
        payload_json: Option<JsonValue>,
        detail: Option<String>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            plan_id: plan_id.map(str::to_string),
            action_type,
            action_ts: chrono::Local::now().naive_local(),
            actor: actor.to_string(),
            target_id: target_id.map(str::to_string),
            payload_json,
            detail,
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreatePlan,   // 创建计划
    RunPlan,      // 运行计划
    RunFailed,    // 运行失败
    Override,     // 人工调整
    FinalizePlan, // 定稿
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ActionType {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionType::CreatePlan => "CREATE_PLAN",
            ActionType::RunPlan => "RUN_PLAN",
            ActionType::RunFailed => "RUN_FAILED",
            ActionType::Override => "OVERRIDE",
            ActionType::FinalizePlan => "FINALIZE_PLAN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE_PLAN" => Some(ActionType::CreatePlan),
            "RUN_PLAN" => Some(ActionType::RunPlan),
            "RUN_FAILED" => Some(ActionType::RunFailed),
            "OVERRIDE" => Some(ActionType::Override),
            "FINALIZE_PLAN" => Some(ActionType::FinalizePlan),
            _ => None,
        }
    }
}
