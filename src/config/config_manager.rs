// ==========================================
// 车辆夜间入段排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::planner_config_trait::{ConfigError, PlannerConfigReader};
use crate::config::settings::{hm, FleetLimits, SolverBackend};
use crate::db::open_sqlite_connection;
use crate::domain::plan::PlanWeights;
use async_trait::async_trait;
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, ConfigError> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, ConfigError> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, ConfigError> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, ConfigError> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let now = chrono::Local::now().naive_local();

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = ?3",
            params![key, value, now.format("%Y-%m-%d %H:%M:%S").to_string()],
        )?;

        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    ///
    /// # 用途
    /// - 运行计划时记录配置快照，便于审计复现
    pub fn get_config_snapshot(&self) -> Result<String, ConfigError> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 解析辅助 =====

    fn get_f64(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        match value.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, "配置格式错误，使用默认值");
                Ok(default)
            }
        }
    }

    fn get_u64(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        Ok(value.trim().parse::<u64>().unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "配置格式错误，使用默认值");
            default
        }))
    }

    fn get_time(&self, key: &str, default: NaiveTime) -> Result<NaiveTime, ConfigError> {
        let value = self.get_config_or_default(key, &default.format("%H:%M").to_string())?;
        Ok(NaiveTime::parse_from_str(value.trim(), "%H:%M").unwrap_or_else(|_| {
            tracing::warn!(config_key = key, raw_value = %value, "时间配置格式错误，使用默认值");
            default
        }))
    }
}

// ==========================================
// PlannerConfigReader Trait 实现
// ==========================================
#[async_trait]
impl PlannerConfigReader for ConfigManager {
    async fn get_fleet_limits(&self) -> Result<FleetLimits, ConfigError> {
        let d = FleetLimits::default();
        let limits = FleetLimits {
            active_min: self.get_u64(config_keys::ACTIVE_MIN, d.active_min as u64)? as usize,
            active_max: self.get_u64(config_keys::ACTIVE_MAX, d.active_max as u64)? as usize,
            standby_min: self.get_u64(config_keys::STANDBY_MIN, d.standby_min as u64)? as usize,
        };

        if limits.active_min > limits.active_max {
            tracing::warn!(
                active_min = limits.active_min,
                active_max = limits.active_max,
                "上线数量上下限配置倒置，使用默认值"
            );
            return Ok(d);
        }
        Ok(limits)
    }

    async fn get_service_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        Ok((
            self.get_time(config_keys::SERVICE_START, hm(6, 0))?,
            self.get_time(config_keys::SERVICE_END, hm(22, 30))?,
        ))
    }

    async fn get_night_window(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        Ok((
            self.get_time(config_keys::NIGHT_START, hm(21, 0))?,
            self.get_time(config_keys::NIGHT_END, hm(5, 30))?,
        ))
    }

    async fn get_default_weights(&self) -> Result<PlanWeights, ConfigError> {
        let d = PlanWeights::default();
        Ok(PlanWeights {
            risk: self.get_f64(config_keys::WEIGHT_RISK, d.risk)?.max(0.0),
            brand: self.get_f64(config_keys::WEIGHT_BRAND, d.brand)?.max(0.0),
            mileage: self.get_f64(config_keys::WEIGHT_MILEAGE, d.mileage)?.max(0.0),
            clean: self.get_f64(config_keys::WEIGHT_CLEAN, d.clean)?.max(0.0),
            shunt: self.get_f64(config_keys::WEIGHT_SHUNT, d.shunt)?.max(0.0),
            override_penalty: self.get_f64(config_keys::WEIGHT_OVERRIDE, d.override_penalty)?.max(0.0),
        })
    }

    async fn get_branding_window_days(&self) -> Result<u32, ConfigError> {
        Ok(self.get_u64(config_keys::BRANDING_WINDOW_DAYS, 7)?.max(1) as u32)
    }

    async fn get_solver_time_budget_secs(&self) -> Result<u64, ConfigError> {
        Ok(self.get_u64(config_keys::SOLVER_TIME_BUDGET_SECS, 30)?.max(1))
    }

    async fn get_solver_backend(&self) -> Result<SolverBackend, ConfigError> {
        let value = self.get_config_or_default(config_keys::SOLVER_BACKEND, "MILP")?;
        Ok(SolverBackend::from_str(&value))
    }

    async fn get_service_hours(&self) -> Result<f64, ConfigError> {
        self.get_f64(config_keys::SERVICE_HOURS, 16.5)
    }

    async fn get_avg_speed_kmh(&self) -> Result<f64, ConfigError> {
        self.get_f64(config_keys::AVG_SPEED_KMH, 35.0)
    }

    async fn get_default_maintenance_minutes(&self) -> Result<u32, ConfigError> {
        Ok(self.get_u64(config_keys::DEFAULT_MAINTENANCE_MINUTES, 60)? as u32)
    }

    async fn get_yard_job_buffer_minutes(&self) -> Result<u32, ConfigError> {
        Ok(self.get_u64(config_keys::YARD_JOB_BUFFER_MINUTES, 15)? as u32)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 车队规模
    pub const ACTIVE_MIN: &str = "fleet.active_min";
    pub const ACTIVE_MAX: &str = "fleet.active_max";
    pub const STANDBY_MIN: &str = "fleet.standby_min";

    // 时间窗口 (HH:MM)
    pub const SERVICE_START: &str = "window.service_start";
    pub const SERVICE_END: &str = "window.service_end";
    pub const NIGHT_START: &str = "window.night_start";
    pub const NIGHT_END: &str = "window.night_end";

    // 默认权重
    pub const WEIGHT_RISK: &str = "weights.risk";
    pub const WEIGHT_BRAND: &str = "weights.brand";
    pub const WEIGHT_MILEAGE: &str = "weights.mileage";
    pub const WEIGHT_CLEAN: &str = "weights.clean";
    pub const WEIGHT_SHUNT: &str = "weights.shunt";
    pub const WEIGHT_OVERRIDE: &str = "weights.override";

    // 广告
    pub const BRANDING_WINDOW_DAYS: &str = "branding.window_days";

    // 求解器
    pub const SOLVER_TIME_BUDGET_SECS: &str = "solver.time_budget_secs";
    pub const SOLVER_BACKEND: &str = "solver.backend";

    // 里程
    pub const SERVICE_HOURS: &str = "mileage.service_hours";
    pub const AVG_SPEED_KMH: &str = "mileage.avg_speed_kmh";

    // 入段作业
    pub const DEFAULT_MAINTENANCE_MINUTES: &str = "yard.default_maintenance_minutes";
    pub const YARD_JOB_BUFFER_MINUTES: &str = "yard.job_buffer_minutes";
}
