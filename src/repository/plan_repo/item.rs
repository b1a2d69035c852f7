use crate::domain::action_log::ActionLog;
use crate::domain::alert::PlanAlert;
use crate::domain::plan::PlanItem;
use crate::domain::types::{Decision, PlanStatus};
use crate::domain::yard::YardOccupancy;
use crate::repository::action_log_repo::insert_action_log;
use crate::repository::alert_repo::insert_alert;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::plan_repo::occupancy::insert_occupancy;
use crate::repository::plan_repo::plan::transition_with;
use crate::repository::sql_codec::{fmt_ts, get_json, get_opt_ts, invalid_value};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// OverrideCommit - 一次人工调整的全部写入（单事务提交）
// ==========================================
#[derive(Debug, Clone)]
pub struct OverrideCommit {
    pub item: PlanItem,
    pub renumbered: Vec<PlanItem>, // 出库序号顺延的其他上线明细
    pub release_yard: bool,        // 删除该车原有股道占用
    pub yard_job: Option<YardOccupancy>,
    pub alerts: Vec<PlanAlert>,
    pub audit: ActionLog,
}

const ITEM_COLUMNS: &str = r#"plan_id, vehicle_id, decision, bay_id, turnout_rank, km_target, notes,
    explain_json, manual_override, override_reason, overridden_at"#;

// ==========================================
// PlanItemRepository - 计划明细仓储
// ==========================================
// 红线: 明细只随运行整体替换，或经人工调整更新（含序号顺延）
pub struct PlanItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlanItemRepository {
    /// 创建新的PlanItemRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询计划全部明细（按 vehicle_id 升序）
    pub fn list_by_plan(&self, plan_id: &str) -> RepositoryResult<Vec<PlanItem>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM plan_item WHERE plan_id = ? ORDER BY vehicle_id",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![plan_id], map_item_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// 查询单车明细
    pub fn find(&self, plan_id: &str, vehicle_id: &str) -> RepositoryResult<Option<PlanItem>> {
        let conn = self.get_conn()?;

        let item = conn
            .query_row(
                &format!(
                    "SELECT {} FROM plan_item WHERE plan_id = ? AND vehicle_id = ?",
                    ITEM_COLUMNS
                ),
                params![plan_id, vehicle_id],
                map_item_row,
            )
            .optional()?;
        Ok(item)
    }

    /// 保存人工调整
    ///
    /// 单事务: 更新明细与重排序号 → 同步股道占用与告警 → 计划 completed/amended → amended → 写审计日志。
    ///
    /// # 返回
    /// - `Err(InvalidStateTransition)`: 计划状态已不允许调整（事务回滚）
    pub fn save_override(&self, commit: &OverrideCommit) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        update_item(&tx, &commit.item)?;
        for item in &commit.renumbered {
            update_item(&tx, item)?;
        }

        if commit.release_yard {
            tx.execute(
                "DELETE FROM yard_occupancy WHERE plan_id = ? AND vehicle_id = ?",
                params![&commit.item.plan_id, &commit.item.vehicle_id],
            )?;
        }
        if let Some(job) = &commit.yard_job {
            insert_occupancy(&tx, job)?;
        }
        for alert in &commit.alerts {
            insert_alert(&tx, alert)?;
        }

        let moved = transition_with(
            &tx,
            &commit.item.plan_id,
            &PlanStatus::AMENDABLE,
            PlanStatus::Amended,
            commit.audit.action_ts,
        )?;
        if !moved {
            return Err(RepositoryError::InvalidStateTransition {
                from: "non-amendable".to_string(),
                to: PlanStatus::Amended.to_db_str().to_string(),
            });
        }

        insert_action_log(&tx, &commit.audit)?;
        tx.commit()?;
        Ok(())
    }
}

/// 按主键更新单条明细（不存在 → NotFound）
fn update_item(conn: &Connection, item: &PlanItem) -> RepositoryResult<()> {
    let explain_json = serde_json::to_string(&item.explanation)
        .map_err(|e| RepositoryError::field("explain_json", e.to_string()))?;

    let rows = conn.execute(
        r#"UPDATE plan_item
           SET decision = ?1, bay_id = ?2, turnout_rank = ?3, km_target = ?4, notes = ?5,
               explain_json = ?6, manual_override = ?7, override_reason = ?8, overridden_at = ?9
           WHERE plan_id = ?10 AND vehicle_id = ?11"#,
        params![
            item.decision.to_db_str(),
            &item.bay_id,
            item.turnout_rank,
            item.km_target,
            &item.notes,
            explain_json,
            item.manual_override as i32,
            &item.override_reason,
            item.overridden_at.as_ref().map(fmt_ts),
            &item.plan_id,
            &item.vehicle_id,
        ],
    )?;
    if rows != 1 {
        return Err(RepositoryError::NotFound {
            entity: "PlanItem".to_string(),
            id: format!("{}/{}", item.plan_id, item.vehicle_id),
        });
    }
    Ok(())
}

/// 写入单条明细（供运行提交事务复用）
pub(crate) fn insert_item(conn: &Connection, item: &PlanItem) -> RepositoryResult<()> {
    let explain_json = serde_json::to_string(&item.explanation)
        .map_err(|e| RepositoryError::field("explain_json", e.to_string()))?;

    conn.execute(
        r#"INSERT INTO plan_item (
            plan_id, vehicle_id, decision, bay_id, turnout_rank, km_target, notes,
            explain_json, manual_override, override_reason, overridden_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &item.plan_id,
            &item.vehicle_id,
            item.decision.to_db_str(),
            &item.bay_id,
            item.turnout_rank,
            item.km_target,
            &item.notes,
            explain_json,
            item.manual_override as i32,
            &item.override_reason,
            item.overridden_at.as_ref().map(fmt_ts),
        ],
    )?;
    Ok(())
}

fn map_item_row(row: &rusqlite::Row) -> rusqlite::Result<PlanItem> {
    let decision_raw: String = row.get(2)?;
    let decision = Decision::parse(&decision_raw)
        .ok_or_else(|| invalid_value(2, format!("非法决策取值: {}", decision_raw)))?;

    Ok(PlanItem {
        plan_id: row.get(0)?,
        vehicle_id: row.get(1)?,
        decision,
        bay_id: row.get(3)?,
        turnout_rank: row.get(4)?,
        km_target: row.get(5)?,
        notes: row.get(6)?,
        explanation: get_json(row, 7)?,
        manual_override: row.get::<_, i32>(8)? != 0,
        override_reason: row.get(9)?,
        overridden_at: get_opt_ts(row, 10)?,
    })
}
