use crate::domain::yard::{YardConflict, YardOccupancy};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_codec::{fmt_ts, get_ts};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// YardOccupancyRepository - 股道占用仓储
// ==========================================
pub struct YardOccupancyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl YardOccupancyRepository {
    /// 创建新的YardOccupancyRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询计划的股道占用（按股道、开始时间）
    pub fn list_by_plan(&self, plan_id: &str) -> RepositoryResult<Vec<YardOccupancy>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT occupancy_id, plan_id, bay_id, vehicle_id, from_ts, to_ts, job_type
               FROM yard_occupancy
               WHERE plan_id = ?
               ORDER BY bay_id, from_ts, vehicle_id"#,
        )?;

        let rows = stmt
            .query_map(params![plan_id], |row| map_occupancy(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// 冲突检测: 同一股道内与本计划占用重叠的记录对（含其他计划）
    pub fn find_conflicts(&self, plan_id: &str) -> RepositoryResult<Vec<YardConflict>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT a.occupancy_id, a.plan_id, a.bay_id, a.vehicle_id, a.from_ts, a.to_ts, a.job_type,
                      b.occupancy_id, b.plan_id, b.bay_id, b.vehicle_id, b.from_ts, b.to_ts, b.job_type
               FROM yard_occupancy a
               JOIN yard_occupancy b
                 ON a.bay_id = b.bay_id
                AND a.occupancy_id < b.occupancy_id
                AND a.from_ts < b.to_ts
                AND b.from_ts < a.to_ts
               WHERE a.plan_id = ?1 OR b.plan_id = ?1
               ORDER BY a.bay_id, a.from_ts"#,
        )?;

        let conflicts = stmt
            .query_map(params![plan_id], |row| {
                let first = map_occupancy(row, 0)?;
                let second = map_occupancy(row, 7)?;
                Ok(YardConflict {
                    bay_id: first.bay_id.clone(),
                    first,
                    second,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conflicts)
    }
}

/// 写入单条占用（供运行提交事务复用）
pub(crate) fn insert_occupancy(conn: &Connection, occ: &YardOccupancy) -> RepositoryResult<()> {
    conn.execute(
        r#"INSERT INTO yard_occupancy (
            occupancy_id, plan_id, bay_id, vehicle_id, from_ts, to_ts, job_type
        ) VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        params![
            &occ.occupancy_id,
            &occ.plan_id,
            &occ.bay_id,
            &occ.vehicle_id,
            fmt_ts(&occ.from_ts),
            fmt_ts(&occ.to_ts),
            &occ.job_type,
        ],
    )?;
    Ok(())
}

fn map_occupancy(row: &rusqlite::Row, base: usize) -> rusqlite::Result<YardOccupancy> {
    Ok(YardOccupancy {
        occupancy_id: row.get(base)?,
        plan_id: row.get(base + 1)?,
        bay_id: row.get(base + 2)?,
        vehicle_id: row.get(base + 3)?,
        from_ts: get_ts(row, base + 4)?,
        to_ts: get_ts(row, base + 5)?,
        job_type: row.get(base + 6)?,
    })
}
