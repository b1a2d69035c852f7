// ==========================================
// 车辆夜间入段排产系统 - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// ==========================================

use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_codec::{fmt_ts, get_ts, invalid_value};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_action_log(&conn, log)?;
        Ok(log.action_id.clone())
    }

    /// 按计划查询日志（时间升序），可按类型过滤
    pub fn list_by_plan(
        &self,
        plan_id: &str,
        action_type: Option<ActionType>,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT action_id, plan_id, action_type, action_ts, actor, target_id, payload_json, detail
               FROM action_log
               WHERE plan_id = ?1 AND (?2 IS NULL OR action_type = ?2)
               ORDER BY action_ts, rowid"#,
        )?;

        let logs = stmt
            .query_map(params![plan_id, action_type.map(|t| t.to_db_str())], |row| {
                let type_raw: String = row.get(2)?;
                let payload_raw: Option<String> = row.get(6)?;
                Ok(ActionLog {
                    action_id: row.get(0)?,
                    plan_id: row.get(1)?,
                    action_type: ActionType::parse(&type_raw)
                        .ok_or_else(|| invalid_value(2, format!("非法操作类型: {}", type_raw)))?,
                    action_ts: get_ts(row, 3)?,
                    actor: row.get(4)?,
                    target_id: row.get(5)?,
                    payload_json: payload_raw.and_then(|s| serde_json::from_str(&s).ok()),
                    detail: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(logs)
    }
}

/// 写入日志（可在事务内复用）
pub(crate) fn insert_action_log(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO action_log (
            action_id, plan_id, action_type, action_ts, actor, target_id, payload_json, detail
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &log.action_id,
            &log.plan_id,
            log.action_type.to_db_str(),
            fmt_ts(&log.action_ts),
            &log.actor,
            &log.target_id,
            log.payload_json.as_ref().map(|v| v.to_string()),
            &log.detail,
        ],
    )?;
    Ok(())
}
