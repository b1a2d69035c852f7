// ==========================================
// 车辆夜间入段排产系统 - 计划告警
// ==========================================
// 红线: 告警只提示，不阻断计划完成
// ==========================================

use crate::domain::types::{AlertCode, AlertSeverity};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// AlertNotice - 引擎产生的告警（尚未落库）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertNotice {
    pub severity: AlertSeverity,
    pub code: AlertCode,
    pub message: String,
    pub data: JsonValue,
}

impl AlertNotice {
    pub fn new(severity: AlertSeverity, code: AlertCode, message: impl Into<String>, data: JsonValue) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            data,
        }
    }

    pub fn info(code: AlertCode, message: impl Into<String>, data: JsonValue) -> Self {
        Self::new(AlertSeverity::Info, code, message, data)
    }

    pub fn warning(code: AlertCode, message: impl Into<String>, data: JsonValue) -> Self {
        Self::new(AlertSeverity::Warning, code, message, data)
    }

    pub fn critical(code: AlertCode, message: impl Into<String>, data: JsonValue) -> Self {
        Self::new(AlertSeverity::Critical, code, message, data)
    }
}

// ==========================================
// PlanAlert - 持久化告警
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanAlert {
    pub alert_id: String,
    pub plan_id: String,
    pub severity: AlertSeverity,
    pub code: AlertCode,
    pub message: String,
    pub data: JsonValue,
    pub resolved: bool,
    pub created_at: NaiveDateTime,
}

impl PlanAlert {
    pub fn from_notice(plan_id: &str, notice: AlertNotice, created_at: NaiveDateTime) -> Self {
        Self {
            alert_id: uuid::Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            severity: notice.severity,
            code: notice.code,
            message: notice.message,
            data: notice.data,
            resolved: false,
            created_at,
        }
    }
}
