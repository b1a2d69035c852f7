// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 组装临时数据库上的 PlanApi 及其仓储
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use tempfile::NamedTempFile;

use rail_induction_aps::api::{ApiError, PlanApi};
use rail_induction_aps::config::ConfigManager;
use rail_induction_aps::db::open_sqlite_connection;
use rail_induction_aps::domain::types::PlanStatus;
use rail_induction_aps::repository::{
    ActionLogRepository, AlertRepository, FleetDataProvider, FleetRepository, PlanItemRepository,
    PlanRepository, YardOccupancyRepository,
};

use super::fleet_builder::seed_standard_fleet;

// ==========================================
// API测试环境
// ==========================================

pub struct ApiTestEnv {
    pub db_path: String,
    pub conn: Arc<Mutex<Connection>>,
    pub plan_api: Arc<PlanApi>,
    pub config_manager: Arc<ConfigManager>,

    // Repository层（用于测试数据准备与校验）
    pub plan_repo: Arc<PlanRepository>,
    pub item_repo: Arc<PlanItemRepository>,
    pub occupancy_repo: Arc<YardOccupancyRepository>,
    pub alert_repo: Arc<AlertRepository>,
    pub action_log_repo: Arc<ActionLogRepository>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 创建空库测试环境
    pub fn new() -> Result<Self, String> {
        let (temp_file, db_path) =
            test_helpers::create_test_db().map_err(|e| format!("创建测试数据库失败: {}", e))?;

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let plan_repo = Arc::new(PlanRepository::new(conn.clone()));
        let item_repo = Arc::new(PlanItemRepository::new(conn.clone()));
        let occupancy_repo = Arc::new(YardOccupancyRepository::new(conn.clone()));
        let alert_repo = Arc::new(AlertRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));
        let fleet_repo: Arc<dyn FleetDataProvider> = Arc::new(FleetRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let plan_api = Arc::new(PlanApi::new(
            plan_repo.clone(),
            item_repo.clone(),
            occupancy_repo.clone(),
            alert_repo.clone(),
            action_log_repo.clone(),
            config_manager.clone(),
            fleet_repo,
        ));

        Ok(Self {
            db_path,
            conn,
            plan_api,
            config_manager,
            plan_repo,
            item_repo,
            occupancy_repo,
            alert_repo,
            action_log_repo,
            _temp_file: temp_file,
        })
    }

    /// 创建带标准车队（n 辆车 / n 条股道）的测试环境
    pub fn with_fleet(n: usize) -> Result<Self, String> {
        let env = Self::new()?;
        env.seed(|conn| seed_standard_fleet(conn, tomorrow(), n))?;
        Ok(env)
    }

    /// 在共享连接上写入测试数据
    pub fn seed(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<()>) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        f(&conn).map_err(|e| format!("写入测试数据失败: {}", e))
    }

    /// 写入全局配置
    pub fn set_config(&self, key: &str, value: &str) {
        self.config_manager
            .set_global_config_value(key, value)
            .expect("写入配置失败");
    }

    /// 创建明天的计划
    pub fn create_tomorrow_plan(&self) -> String {
        self.plan_api
            .create_plan(tomorrow(), None, None, "tester")
            .expect("创建计划失败")
    }

    /// 创建并运行明天的计划
    pub fn run_tomorrow_plan(&self) -> String {
        let plan_id = self.create_tomorrow_plan();
        self.plan_api
            .run_plan(&plan_id, None, "tester")
            .expect("运行计划失败");
        plan_id
    }

    pub fn plan_status(&self, plan_id: &str) -> PlanStatus {
        self.plan_repo
            .find_by_id(plan_id)
            .expect("查询计划失败")
            .expect("计划不存在")
            .status
    }
}

// ==========================================
// 断言辅助
// ==========================================

/// 明天（计划日必须晚于今天）
pub fn tomorrow() -> NaiveDate {
    chrono::Local::now().date_naive() + Duration::days(1)
}

/// 断言生命周期错误
pub fn assert_lifecycle_violation<T: std::fmt::Debug>(
    result: Result<T, ApiError>,
    expected_status: PlanStatus,
    expected_operation: &str,
) {
    match result {
        Err(ApiError::LifecycleViolation { status, operation, .. }) => {
            assert_eq!(status, expected_status);
            assert_eq!(operation, expected_operation);
        }
        other => panic!("期望 LifecycleViolation，实际: {:?}", other),
    }
}

/// 断言输入校验错误
pub fn assert_invalid_input<T: std::fmt::Debug>(result: Result<T, ApiError>) {
    match result {
        Err(ApiError::InvalidInput(_)) => {}
        other => panic!("期望 InvalidInput，实际: {:?}", other),
    }
}
