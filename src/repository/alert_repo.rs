// ==========================================
// 车辆夜间入段排产系统 - 计划告警仓储
// ==========================================

use crate::domain::alert::PlanAlert;
use crate::domain::types::{AlertCode, AlertSeverity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_codec::{fmt_ts, get_ts, invalid_value};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AlertRepository - 告警仓储
// ==========================================
pub struct AlertRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AlertRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询计划告警（严重程度降序）
    pub fn list_by_plan(&self, plan_id: &str) -> RepositoryResult<Vec<PlanAlert>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT alert_id, plan_id, severity, code, message, data_json, resolved, created_at
               FROM plan_alert
               WHERE plan_id = ?
               ORDER BY CASE severity WHEN 'critical' THEN 0 WHEN 'warning' THEN 1 ELSE 2 END,
                        code, alert_id"#,
        )?;

        let alerts = stmt
            .query_map(params![plan_id], |row| {
                let severity_raw: String = row.get(2)?;
                let code_raw: String = row.get(3)?;
                let data_raw: Option<String> = row.get(5)?;
                Ok(PlanAlert {
                    alert_id: row.get(0)?,
                    plan_id: row.get(1)?,
                    severity: AlertSeverity::parse(&severity_raw)
                        .ok_or_else(|| invalid_value(2, format!("非法告警等级: {}", severity_raw)))?,
                    code: AlertCode::parse(&code_raw)
                        .ok_or_else(|| invalid_value(3, format!("非法告警代码: {}", code_raw)))?,
                    message: row.get(4)?,
                    data: data_raw
                        .and_then(|s| serde_json::from_str(&s).ok())
                        .unwrap_or(serde_json::Value::Null),
                    resolved: row.get::<_, i32>(6)? != 0,
                    created_at: get_ts(row, 7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(alerts)
    }

    /// 告警数量
    pub fn count_by_plan(&self, plan_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM plan_alert WHERE plan_id = ?",
            params![plan_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

/// 写入单条告警（供运行提交事务复用）
pub(crate) fn insert_alert(conn: &Connection, alert: &PlanAlert) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO plan_alert (
            alert_id, plan_id, severity, code, message, data_json, resolved, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &alert.alert_id,
            &alert.plan_id,
            alert.severity.to_db_str(),
            alert.code.to_db_str(),
            &alert.message,
            alert.data.to_string(),
            alert.resolved as i32,
            fmt_ts(&alert.created_at),
        ],
    )?;
    Ok(())
}
