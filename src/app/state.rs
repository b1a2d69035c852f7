// ==========================================
// 车辆夜间入段排产系统 - 应用状态
// ==========================================
// 职责: 打开数据库、建表、组装仓储与 API 实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::PlanApi;
use crate::config::ConfigManager;
use crate::db::{apply_schema, open_sqlite_connection};
use crate::repository::{
    ActionLogRepository, AlertRepository, FleetDataProvider, FleetRepository, PlanItemRepository,
    PlanRepository, YardOccupancyRepository,
};

/// 应用状态
///
/// 所有仓储共享同一个 SQLite 连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 夜间计划API
    pub plan_api: Arc<PlanApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 车队数据源
    pub fleet_repo: Arc<FleetRepository>,

    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（不存在时创建并建表）
    ///
    /// # 返回
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        apply_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let plan_repo = Arc::new(PlanRepository::new(conn.clone()));
        let item_repo = Arc::new(PlanItemRepository::new(conn.clone()));
        let occupancy_repo = Arc::new(YardOccupancyRepository::new(conn.clone()));
        let alert_repo = Arc::new(AlertRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let fleet_repo = Arc::new(FleetRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // 初始化API层
        // ==========================================
        let plan_api = Arc::new(PlanApi::new(
            plan_repo,
            item_repo,
            occupancy_repo,
            alert_repo,
            action_log_repo.clone(),
            config_manager.clone(),
            fleet_repo.clone() as Arc<dyn FleetDataProvider>,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            plan_api,
            config_manager,
            fleet_repo,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 RAIL_INDUCTION_APS_DB_PATH（非空时）
/// - 否则: 用户数据目录/rail-induction-aps/rail_induction_aps.db
/// - 取不到用户数据目录时: ./rail_induction_aps.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("RAIL_INDUCTION_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./rail_induction_aps.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("rail-induction-aps");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("rail_induction_aps.db");
        }
    }

    path.to_string_lossy().to_string()
}
