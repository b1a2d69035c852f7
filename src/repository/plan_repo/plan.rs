use crate::domain::action_log::ActionLog;
use crate::domain::alert::PlanAlert;
use crate::domain::plan::{Plan, PlanItem, PlanWeights};
use crate::domain::types::PlanStatus;
use crate::domain::yard::YardOccupancy;
use crate::repository::action_log_repo::insert_action_log;
use crate::repository::alert_repo::insert_alert;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::plan_repo::item::insert_item;
use crate::repository::plan_repo::occupancy::insert_occupancy;
use crate::repository::sql_codec::{fmt_date, fmt_ts, get_date, get_json, get_opt_ts, get_ts, invalid_value};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

const PLAN_COLUMNS: &str = r#"plan_id, plan_date, status, weights_json, notes,
    created_by, created_at, updated_at, finalized_at,
    last_run_at, last_run_duration_ms, objective_value, optimization_degraded, last_error,
    revision"#;

// ==========================================
// RunCommit - 一次运行的全部结果（单事务提交）
// ==========================================
#[derive(Debug, Clone)]
pub struct RunCommit {
    pub plan_id: String,
    pub weights: PlanWeights,
    pub items: Vec<PlanItem>,
    pub occupancies: Vec<YardOccupancy>,
    pub alerts: Vec<PlanAlert>,
    pub objective_value: f64,
    pub optimization_degraded: bool,
    pub run_at: NaiveDateTime,
    pub duration_ms: i64,
    pub audit: ActionLog,
}

// ==========================================
// PlanRepository - 计划仓储
// ==========================================
pub struct PlanRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanRepository {
    /// 创建新的PlanRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建计划（同时写入审计日志）
    ///
    /// # 返回
    /// - `Ok(plan_id)`: 成功
    /// - `Err(UniqueConstraintViolation)`: plan_date 已存在
    pub fn create(&self, plan: &Plan, audit: &ActionLog) -> RepositoryResult<String> {
        let mut conn = self.get_conn()?;
        let weights_json = serde_json::to_string(&plan.weights)
            .map_err(|e| RepositoryError::field("weights_json", e.to_string()))?;

        let tx = conn.transaction()?;
        tx.execute(
            r#"INSERT INTO plan (
                plan_id, plan_date, status, weights_json, notes,
                created_by, created_at, updated_at, revision
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                &plan.plan_id,
                fmt_date(&plan.plan_date),
                plan.status.to_db_str(),
                weights_json,
                &plan.notes,
                &plan.created_by,
                fmt_ts(&plan.created_at),
                fmt_ts(&plan.updated_at),
                plan.revision,
            ],
        )?;
        insert_action_log(&tx, audit)?;
        tx.commit()?;

        Ok(plan.plan_id.clone())
    }

    /// 按plan_id查询计划
    ///
    /// # 返回
    /// - `Ok(Some(Plan))`: 找到
    /// - `Ok(None)`: 未找到
    pub fn find_by_id(&self, plan_id: &str) -> RepositoryResult<Option<Plan>> {
        let conn = self.get_conn()?;

        let plan = conn
            .query_row(
                &format!("SELECT {} FROM plan WHERE plan_id = ?", PLAN_COLUMNS),
                params![plan_id],
                map_plan_row,
            )
            .optional()?;
        Ok(plan)
    }

    /// 按计划日期查询
    pub fn find_by_date(&self, plan_date: NaiveDate) -> RepositoryResult<Option<Plan>> {
        let conn = self.get_conn()?;

        let plan = conn
            .query_row(
                &format!("SELECT {} FROM plan WHERE plan_date = ?", PLAN_COLUMNS),
                params![fmt_date(&plan_date)],
                map_plan_row,
            )
            .optional()?;
        Ok(plan)
    }

    /// 分页查询（按计划日期降序）
    pub fn list(&self, limit: usize, offset: usize) -> RepositoryResult<Vec<Plan>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM plan ORDER BY plan_date DESC LIMIT ?1 OFFSET ?2",
            PLAN_COLUMNS
        ))?;

        let plans = stmt
            .query_map(params![limit as i64, offset as i64], map_plan_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    /// 计划总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM plan", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// 条件状态迁移（compare-and-set）
    ///
    /// # 返回
    /// - `Ok(true)`: 当前状态在 allowed_from 中，已迁移
    /// - `Ok(false)`: 当前状态不允许迁移，未做任何修改
    pub fn transition_status(
        &self,
        plan_id: &str,
        allowed_from: &[PlanStatus],
        to: PlanStatus,
        now: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        transition_with(&conn, plan_id, allowed_from, to, now)
    }

    /// 运行失败：running → failed，记录错误文本
    pub fn mark_failed(&self, plan_id: &str, error: &str, audit: &ActionLog) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"UPDATE plan
               SET status = ?1, last_error = ?2, updated_at = ?3, revision = revision + 1
               WHERE plan_id = ?4 AND status = ?5"#,
            params![
                PlanStatus::Failed.to_db_str(),
                error,
                fmt_ts(&audit.action_ts),
                plan_id,
                PlanStatus::Running.to_db_str(),
            ],
        )?;
        insert_action_log(&tx, audit)?;
        tx.commit()?;

        Ok(rows == 1)
    }

    /// 定稿：completed/amended → finalized
    pub fn finalize(&self, plan_id: &str, audit: &ActionLog) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let at = fmt_ts(&audit.action_ts);
        let rows = tx.execute(
            r#"UPDATE plan
               SET status = ?1, finalized_at = ?2, updated_at = ?2, revision = revision + 1
               WHERE plan_id = ?3 AND status IN (?4, ?5)"#,
            params![
                PlanStatus::Finalized.to_db_str(),
                at,
                plan_id,
                PlanStatus::Completed.to_db_str(),
                PlanStatus::Amended.to_db_str(),
            ],
        )?;
        if rows == 1 {
            insert_action_log(&tx, audit)?;
        }
        tx.commit()?;

        Ok(rows == 1)
    }

    /// 提交一次运行结果
    ///
    /// 单事务: 删除旧明细/占用/告警 → 写入新结果 → running → completed。
    /// 任一步失败整体回滚，不留部分写入。
    pub fn commit_run(&self, commit: &RunCommit) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let status: Option<String> = tx
            .query_row(
                "SELECT status FROM plan WHERE plan_id = ?",
                params![&commit.plan_id],
                |row| row.get(0),
            )
            .optional()?;
        let status = status.ok_or_else(|| RepositoryError::NotFound {
            entity: "Plan".to_string(),
            id: commit.plan_id.clone(),
        })?;
        if status != PlanStatus::Running.to_db_str() {
            return Err(RepositoryError::InvalidStateTransition {
                from: status,
                to: PlanStatus::Completed.to_db_str().to_string(),
            });
        }

        tx.execute("DELETE FROM plan_item WHERE plan_id = ?", params![&commit.plan_id])?;
        tx.execute("DELETE FROM yard_occupancy WHERE plan_id = ?", params![&commit.plan_id])?;
        tx.execute("DELETE FROM plan_alert WHERE plan_id = ?", params![&commit.plan_id])?;

        for item in &commit.items {
            insert_item(&tx, item)?;
        }
        for occupancy in &commit.occupancies {
            insert_occupancy(&tx, occupancy)?;
        }
        for alert in &commit.alerts {
            insert_alert(&tx, alert)?;
        }

        let weights_json = serde_json::to_string(&commit.weights)
            .map_err(|e| RepositoryError::field("weights_json", e.to_string()))?;
        tx.execute(
            r#"UPDATE plan
               SET status = ?1, weights_json = ?2, last_run_at = ?3, last_run_duration_ms = ?4,
                   objective_value = ?5, optimization_degraded = ?6, last_error = NULL,
                   updated_at = ?3, revision = revision + 1
               WHERE plan_id = ?7"#,
            params![
                PlanStatus::Completed.to_db_str(),
                weights_json,
                fmt_ts(&commit.run_at),
                commit.duration_ms,
                commit.objective_value,
                commit.optimization_degraded as i32,
                &commit.plan_id,
            ],
        )?;
        insert_action_log(&tx, &commit.audit)?;

        tx.commit()?;
        Ok(())
    }
}

/// 条件状态迁移（可在事务内复用）
pub(crate) fn transition_with(
    conn: &Connection,
    plan_id: &str,
    allowed_from: &[PlanStatus],
    to: PlanStatus,
    now: NaiveDateTime,
) -> RepositoryResult<bool> {
    if allowed_from.is_empty() {
        return Ok(false);
    }

    let placeholders = vec!["?"; allowed_from.len()].join(", ");
    let sql = format!(
        "UPDATE plan SET status = ?, updated_at = ?, revision = revision + 1 \
         WHERE plan_id = ? AND status IN ({})",
        placeholders
    );

    let mut values: Vec<String> = vec![to.to_db_str().to_string(), fmt_ts(&now), plan_id.to_string()];
    values.extend(allowed_from.iter().map(|s| s.to_db_str().to_string()));

    let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(rows == 1)
}

fn map_plan_row(row: &rusqlite::Row) -> rusqlite::Result<Plan> {
    let status_raw: String = row.get(2)?;
    let status = PlanStatus::parse(&status_raw)
        .ok_or_else(|| invalid_value(2, format!("非法计划状态: {}", status_raw)))?;

    Ok(Plan {
        plan_id: row.get(0)?,
        plan_date: get_date(row, 1)?,
        status,
        weights: get_json(row, 3)?,
        notes: row.get(4)?,
        created_by: row.get(5)?,
        created_at: get_ts(row, 6)?,
        updated_at: get_ts(row, 7)?,
        finalized_at: get_opt_ts(row, 8)?,
        last_run_at: get_opt_ts(row, 9)?,
        last_run_duration_ms: row.get(10)?,
        objective_value: row.get(11)?,
        optimization_degraded: row.get::<_, i32>(12)? != 0,
        last_error: row.get(13)?,
        revision: row.get(14)?,
    })
}
