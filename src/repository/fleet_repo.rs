// ==========================================
// 车辆夜间入段排产系统 - 车队数据仓储（只读数据源）
// ==========================================
// 职责: 为特征提取提供车辆 / 证书 / 工单 / 广告 / 曝光 / 里程 / 股道 / 清洁档期
// 红线: Repository 不含业务逻辑，排产过程不回写这些表
// ==========================================

use crate::domain::fleet::{BrandingCampaign, CleaningSlot, FitnessCertificate, StablingBay, Vehicle, WorkOrder};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::sql_codec::{fmt_date, fmt_ts, get_ts};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// FleetDataProvider Trait
// ==========================================
// 用途: 特征提取的数据入口；测试可替换为内存实现
pub trait FleetDataProvider: Send + Sync {
    /// 在册车辆（按 vehicle_id 升序）
    fn list_vehicles(&self) -> RepositoryResult<Vec<Vehicle>>;

    fn find_vehicle(&self, vehicle_id: &str) -> RepositoryResult<Option<Vehicle>>;

    fn certificates_for(&self, vehicle_id: &str) -> RepositoryResult<Vec<FitnessCertificate>>;

    fn work_orders_for(&self, vehicle_id: &str) -> RepositoryResult<Vec<WorkOrder>>;

    /// 计划日生效的车身广告（多个时取 campaign_id 最小者）
    fn active_campaign_for(
        &self,
        vehicle_id: &str,
        on_date: NaiveDate,
    ) -> RepositoryResult<Option<BrandingCampaign>>;

    /// 曝光小时合计，区间 [from, to)
    fn exposure_hours(&self, vehicle_id: &str, from: NaiveDate, to: NaiveDate) -> RepositoryResult<f64>;

    /// 各车累计里程（仅含有里程记录的车辆）
    fn cumulative_km_by_vehicle(&self) -> RepositoryResult<BTreeMap<String, f64>>;

    /// 股道列表（按 position_idx, bay_id 升序）
    fn list_bays(&self, active_only: bool) -> RepositoryResult<Vec<StablingBay>>;

    fn find_bay(&self, bay_id: &str) -> RepositoryResult<Option<StablingBay>>;

    /// 股道上 as_of 之后最早开始的清洁档期
    fn next_cleaning_slot(&self, bay_id: &str, as_of: NaiveDateTime) -> RepositoryResult<Option<CleaningSlot>>;
}

// ==========================================
// FleetRepository - SQLite 实现
// ==========================================
pub struct FleetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FleetRepository {
    /// 创建新的FleetRepository实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_vehicle(row: &rusqlite::Row) -> rusqlite::Result<Vehicle> {
        Ok(Vehicle {
            vehicle_id: row.get(0)?,
            fleet_number: row.get(1)?,
            status: row.get(2)?,
            current_bay_id: row.get(3)?,
        })
    }

    fn map_bay(row: &rusqlite::Row) -> rusqlite::Result<StablingBay> {
        Ok(StablingBay {
            bay_id: row.get(0)?,
            position_idx: row.get(1)?,
            electrified: row.get::<_, i32>(2)? != 0,
            length_m: row.get(3)?,
            access_time_min: row.get(4)?,
            is_active: row.get::<_, i32>(5)? != 0,
        })
    }
}

impl FleetDataProvider for FleetRepository {
    fn list_vehicles(&self) -> RepositoryResult<Vec<Vehicle>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT vehicle_id, fleet_number, status, current_bay_id
               FROM vehicle
               WHERE LOWER(status) <> 'retired'
               ORDER BY vehicle_id"#,
        )?;

        let vehicles = stmt
            .query_map([], Self::map_vehicle)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vehicles)
    }

    fn find_vehicle(&self, vehicle_id: &str) -> RepositoryResult<Option<Vehicle>> {
        let conn = self.get_conn()?;

        let vehicle = conn
            .query_row(
                r#"SELECT vehicle_id, fleet_number, status, current_bay_id
                   FROM vehicle WHERE vehicle_id = ?"#,
                params![vehicle_id],
                Self::map_vehicle,
            )
            .optional()?;
        Ok(vehicle)
    }

    fn certificates_for(&self, vehicle_id: &str) -> RepositoryResult<Vec<FitnessCertificate>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT cert_id, vehicle_id, department, valid_from, valid_to, status
               FROM fitness_certificate
               WHERE vehicle_id = ?
               ORDER BY cert_id"#,
        )?;

        let certs = stmt
            .query_map(params![vehicle_id], |row| {
                Ok(FitnessCertificate {
                    cert_id: row.get(0)?,
                    vehicle_id: row.get(1)?,
                    department: row.get(2)?,
                    valid_from: get_ts(row, 3)?,
                    valid_to: get_ts(row, 4)?,
                    status: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(certs)
    }

    fn work_orders_for(&self, vehicle_id: &str) -> RepositoryResult<Vec<WorkOrder>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT work_order_id, vehicle_id, status, priority, yard_induction_required, description
               FROM work_order
               WHERE vehicle_id = ?
               ORDER BY work_order_id"#,
        )?;

        let orders = stmt
            .query_map(params![vehicle_id], |row| {
                Ok(WorkOrder {
                    work_order_id: row.get(0)?,
                    vehicle_id: row.get(1)?,
                    status: row.get(2)?,
                    priority: row.get(3)?,
                    yard_induction_required: row.get::<_, i32>(4)? != 0,
                    description: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(orders)
    }

    fn active_campaign_for(
        &self,
        vehicle_id: &str,
        on_date: NaiveDate,
    ) -> RepositoryResult<Option<BrandingCampaign>> {
        let conn = self.get_conn()?;
        let day = fmt_date(&on_date);

        let campaign = conn
            .query_row(
                r#"SELECT c.campaign_id, c.advertiser, c.weekly_target_hours, c.rolling_window_days
                   FROM vehicle_wrap w
                   JOIN branding_campaign c ON c.campaign_id = w.campaign_id
                   WHERE w.vehicle_id = ?1
                     AND w.active_from <= ?2
                     AND (w.active_to IS NULL OR w.active_to >= ?2)
                   ORDER BY c.campaign_id
                   LIMIT 1"#,
                params![vehicle_id, day],
                |row| {
                    Ok(BrandingCampaign {
                        campaign_id: row.get(0)?,
                        advertiser: row.get(1)?,
                        weekly_target_hours: row.get(2)?,
                        rolling_window_days: row.get::<_, Option<i64>>(3)?.map(|d| d.max(1) as u32),
                    })
                },
            )
            .optional()?;
        Ok(campaign)
    }

    fn exposure_hours(&self, vehicle_id: &str, from: NaiveDate, to: NaiveDate) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;

        let hours: f64 = conn.query_row(
            r#"SELECT COALESCE(SUM(exposure_hours), 0.0)
               FROM exposure_log
               WHERE vehicle_id = ?1 AND exposure_date >= ?2 AND exposure_date < ?3"#,
            params![vehicle_id, fmt_date(&from), fmt_date(&to)],
            |row| row.get(0),
        )?;
        Ok(hours)
    }

    fn cumulative_km_by_vehicle(&self) -> RepositoryResult<BTreeMap<String, f64>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            "SELECT vehicle_id, SUM(km) FROM mileage_log GROUP BY vehicle_id ORDER BY vehicle_id",
        )?;

        let mut totals = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?;
        for row in rows {
            let (vehicle_id, km) = row?;
            totals.insert(vehicle_id, km);
        }
        Ok(totals)
    }

    fn list_bays(&self, active_only: bool) -> RepositoryResult<Vec<StablingBay>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"SELECT bay_id, position_idx, electrified, length_m, access_time_min, is_active
               FROM stabling_bay
               WHERE (?1 = 0 OR is_active = 1)
               ORDER BY position_idx, bay_id"#,
        )?;

        let bays = stmt
            .query_map(params![active_only as i32], Self::map_bay)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bays)
    }

    fn find_bay(&self, bay_id: &str) -> RepositoryResult<Option<StablingBay>> {
        let conn = self.get_conn()?;

        let bay = conn
            .query_row(
                r#"SELECT bay_id, position_idx, electrified, length_m, access_time_min, is_active
                   FROM stabling_bay WHERE bay_id = ?"#,
                params![bay_id],
                Self::map_bay,
            )
            .optional()?;
        Ok(bay)
    }

    fn next_cleaning_slot(&self, bay_id: &str, as_of: NaiveDateTime) -> RepositoryResult<Option<CleaningSlot>> {
        let conn = self.get_conn()?;

        let slot = conn
            .query_row(
                r#"SELECT slot_id, bay_id, start_ts, end_ts, manpower, clean_type
                   FROM cleaning_slot
                   WHERE bay_id = ?1 AND start_ts >= ?2
                   ORDER BY start_ts, slot_id
                   LIMIT 1"#,
                params![bay_id, fmt_ts(&as_of)],
                |row| {
                    Ok(CleaningSlot {
                        slot_id: row.get(0)?,
                        bay_id: row.get(1)?,
                        start_ts: get_ts(row, 2)?,
                        end_ts: get_ts(row, 3)?,
                        manpower: row.get(4)?,
                        clean_type: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(slot)
    }
}
