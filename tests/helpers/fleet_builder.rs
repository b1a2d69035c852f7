// ==========================================
// 车队测试数据构建器 - 用于集成测试
// ==========================================
// 职责: 直接写入只读数据源表（车辆 / 证书 / 工单 / 广告 / 里程 / 股道 / 清洁档期）
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};

const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

/// 车辆证书签发部门
pub const DEPARTMENTS: [&str; 3] = ["rolling_stock", "signalling", "telecom"];

fn ts(t: NaiveDateTime) -> String {
    t.format(TS_FMT).to_string()
}

fn day(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

// ==========================================
// VehicleBuilder - 单车构建器
// ==========================================

pub struct VehicleBuilder {
    vehicle_id: String,
    bay_id: Option<String>,
    status: String,
    cert_valid_to: Option<NaiveDateTime>,
    cert_status: String,
    blocking_work_order: bool,
    open_work_orders: u32,
    cumulative_km: f64,
    campaign: Option<(String, f64)>,
    exposure_hours: f64,
}

impl VehicleBuilder {
    pub fn new(vehicle_id: &str) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            bay_id: None,
            status: "active".to_string(),
            cert_valid_to: None,
            cert_status: "valid".to_string(),
            blocking_work_order: false,
            open_work_orders: 0,
            cumulative_km: 100_000.0,
            campaign: None,
            exposure_hours: 0.0,
        }
    }

    pub fn bay(mut self, bay_id: &str) -> Self {
        self.bay_id = Some(bay_id.to_string());
        self
    }

    pub fn retired(mut self) -> Self {
        self.status = "retired".to_string();
        self
    }

    /// 证书有效期截止（默认计划日 + 30 天）
    pub fn cert_valid_to(mut self, valid_to: NaiveDateTime) -> Self {
        self.cert_valid_to = Some(valid_to);
        self
    }

    pub fn cert_status(mut self, status: &str) -> Self {
        self.cert_status = status.to_string();
        self
    }

    /// 关键工单（需入段、优先级 3、进行中）
    pub fn blocking_work_order(mut self) -> Self {
        self.blocking_work_order = true;
        self
    }

    /// 非关键未关闭工单
    pub fn open_work_orders(mut self, count: u32) -> Self {
        self.open_work_orders = count;
        self
    }

    pub fn km(mut self, km: f64) -> Self {
        self.cumulative_km = km;
        self
    }

    /// 车身广告（周目标小时）
    pub fn campaign(mut self, campaign_id: &str, weekly_target_hours: f64) -> Self {
        self.campaign = Some((campaign_id.to_string(), weekly_target_hours));
        self
    }

    /// 窗口内已曝光小时（计划日前一天记入）
    pub fn exposure(mut self, hours: f64) -> Self {
        self.exposure_hours = hours;
        self
    }

    /// 写入数据库
    pub fn insert(self, conn: &Connection, plan_date: NaiveDate) -> rusqlite::Result<()> {
        conn.execute(
            "INSERT INTO vehicle (vehicle_id, fleet_number, status, current_bay_id) VALUES (?1, ?1, ?2, ?3)",
            params![self.vehicle_id, self.status, self.bay_id],
        )?;

        let valid_from = (plan_date - Duration::days(30)).and_hms_opt(0, 0, 0).unwrap_or_default();
        let valid_to = self.cert_valid_to.unwrap_or_else(|| {
            (plan_date + Duration::days(30)).and_hms_opt(0, 0, 0).unwrap_or_default()
        });
        for dept in DEPARTMENTS {
            conn.execute(
                r#"INSERT INTO fitness_certificate (cert_id, vehicle_id, department, valid_from, valid_to, status)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                params![
                    format!("{}-{}", self.vehicle_id, dept),
                    self.vehicle_id,
                    dept,
                    ts(valid_from),
                    ts(valid_to),
                    self.cert_status,
                ],
            )?;
        }

        if self.blocking_work_order {
            conn.execute(
                r#"INSERT INTO work_order (work_order_id, vehicle_id, status, priority, yard_induction_required, description)
                   VALUES (?1, ?2, 'INPRG', 3, 1, '转向架检修')"#,
                params![format!("WO-{}-C", self.vehicle_id), self.vehicle_id],
            )?;
        }
        for i in 0..self.open_work_orders {
            conn.execute(
                r#"INSERT INTO work_order (work_order_id, vehicle_id, status, priority, yard_induction_required, description)
                   VALUES (?1, ?2, 'APPR', 1, 0, '一般缺陷')"#,
                params![format!("WO-{}-{}", self.vehicle_id, i), self.vehicle_id],
            )?;
        }

        conn.execute(
            "INSERT INTO mileage_log (vehicle_id, log_date, km) VALUES (?1, ?2, ?3)",
            params![self.vehicle_id, day(plan_date - Duration::days(1)), self.cumulative_km],
        )?;

        if let Some((campaign_id, weekly)) = &self.campaign {
            conn.execute(
                r#"INSERT OR IGNORE INTO branding_campaign (campaign_id, advertiser, weekly_target_hours, rolling_window_days)
                   VALUES (?1, 'ACME', ?2, NULL)"#,
                params![campaign_id, weekly],
            )?;
            conn.execute(
                r#"INSERT INTO vehicle_wrap (wrap_id, vehicle_id, campaign_id, active_from, active_to)
                   VALUES (?1, ?2, ?3, ?4, NULL)"#,
                params![
                    format!("WRAP-{}", self.vehicle_id),
                    self.vehicle_id,
                    campaign_id,
                    day(plan_date - Duration::days(14)),
                ],
            )?;
            if self.exposure_hours > 0.0 {
                conn.execute(
                    "INSERT INTO exposure_log (vehicle_id, exposure_date, exposure_hours) VALUES (?1, ?2, ?3)",
                    params![self.vehicle_id, day(plan_date - Duration::days(1)), self.exposure_hours],
                )?;
            }
        }
        Ok(())
    }
}

// ==========================================
// 股道与清洁档期
// ==========================================

/// 写入股道（access_time_min 决定出库代价）
pub fn insert_bay(conn: &Connection, bay_id: &str, position_idx: i32, access_time_min: f64) -> rusqlite::Result<()> {
    conn.execute(
        r#"INSERT INTO stabling_bay (bay_id, position_idx, electrified, length_m, access_time_min, is_active)
           VALUES (?1, ?2, 1, 200.0, ?3, 1)"#,
        params![bay_id, position_idx, access_time_min],
    )?;
    Ok(())
}

/// 停用股道
pub fn deactivate_bay(conn: &Connection, bay_id: &str) -> rusqlite::Result<()> {
    conn.execute("UPDATE stabling_bay SET is_active = 0 WHERE bay_id = ?1", params![bay_id])?;
    Ok(())
}

/// 计划日 21:00 开始的清洁档期
pub fn insert_cleaning_slot(
    conn: &Connection,
    slot_id: &str,
    bay_id: &str,
    plan_date: NaiveDate,
    clean_type: &str,
) -> rusqlite::Result<()> {
    let start = plan_date.and_hms_opt(21, 0, 0).unwrap_or_default();
    conn.execute(
        r#"INSERT INTO cleaning_slot (slot_id, bay_id, start_ts, end_ts, manpower, clean_type)
           VALUES (?1, ?2, ?3, ?4, 2, ?5)"#,
        params![slot_id, bay_id, ts(start), ts(start + Duration::hours(3)), clean_type],
    )?;
    Ok(())
}

// ==========================================
// 标准车队
// ==========================================

/// 车辆编号 V01..Vnn
pub fn vehicle_id(i: usize) -> String {
    format!("V{:02}", i)
}

/// 股道编号 B01..Bnn
pub fn bay_id(i: usize) -> String {
    format!("B{:02}", i)
}

/// 标准车队: n 条股道（出库代价随位置递增），n 辆全部合格的车辆各停一条股道，
/// 里程 100000 + i * 500
pub fn seed_standard_fleet(conn: &Connection, plan_date: NaiveDate, n: usize) -> rusqlite::Result<()> {
    for i in 1..=n {
        insert_bay(conn, &bay_id(i), i as i32, i as f64)?;
    }
    for i in 1..=n {
        VehicleBuilder::new(&vehicle_id(i))
            .bay(&bay_id(i))
            .km(100_000.0 + i as f64 * 500.0)
            .insert(conn, plan_date)?;
    }
    Ok(())
}
