// ==========================================
// 排产流水线集成测试
// ==========================================
// 职责: 基于 SQLite 数据源验证 特征提取 → Stage 1 → Stage 2 ∥ Stage 3
// ==========================================

mod helpers;

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;
use tempfile::NamedTempFile;

use helpers::api_test_helper::tomorrow;
use helpers::fleet_builder::{bay_id, insert_bay, insert_cleaning_slot, seed_standard_fleet, vehicle_id, VehicleBuilder};
use rail_induction_aps::config::{config_keys, ConfigManager};
use rail_induction_aps::db::open_sqlite_connection;
use rail_induction_aps::domain::plan::PlanWeights;
use rail_induction_aps::domain::types::{AlertCode, AlertSeverity, Decision};
use rail_induction_aps::engine::{EngineError, PlanPipeline, FALLBACK_MESSAGE};
use rail_induction_aps::repository::{FleetDataProvider, FleetRepository};

struct PipelineEnv {
    conn: Arc<Mutex<Connection>>,
    config: Arc<ConfigManager>,
    pipeline: PlanPipeline<ConfigManager>,
    plan_date: NaiveDate,
    _temp_file: NamedTempFile,
}

impl PipelineEnv {
    fn new() -> Self {
        rail_induction_aps::logging::init_test();
        let (temp_file, db_path) = test_helpers::create_test_db().unwrap();
        let conn = Arc::new(Mutex::new(open_sqlite_connection(&db_path).unwrap()));
        let config = Arc::new(ConfigManager::from_connection(conn.clone()).unwrap());
        let provider: Arc<dyn FleetDataProvider> = Arc::new(FleetRepository::new(conn.clone()));

        Self {
            pipeline: PlanPipeline::new(config.clone(), provider),
            conn,
            config,
            plan_date: tomorrow(),
            _temp_file: temp_file,
        }
    }

    fn seed(&self, f: impl FnOnce(&Connection, NaiveDate) -> rusqlite::Result<()>) {
        let conn = self.conn.lock().unwrap();
        f(&conn, self.plan_date).unwrap();
    }

    fn set(&self, key: &str, value: &str) {
        self.config.set_global_config_value(key, value).unwrap();
    }

    fn as_of(&self) -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_标准车队按里程均衡上线() {
    let env = PipelineEnv::new();
    env.seed(|conn, d| seed_standard_fleet(conn, d, 10));

    let output = env
        .pipeline
        .execute("P-TEST", env.plan_date, PlanWeights::default(), env.as_of())
        .await
        .unwrap();

    let counts = output.assignment.counts();
    assert_eq!(counts.active, 7);
    assert_eq!(counts.standby, 3);
    assert!(!output.assignment.is_degraded());

    // 低里程车辆优先上线
    for i in 1..=7 {
        assert_eq!(output.assignment.decisions[&vehicle_id(i)], Decision::Active);
    }

    // 上线车辆留在原股道，按出库代价排序
    assert_eq!(output.turnout.slots.len(), 7);
    for (idx, slot) in output.turnout.slots.iter().enumerate() {
        assert_eq!(slot.turnout_rank, idx as u32 + 1);
        assert_eq!(slot.vehicle_id, vehicle_id(idx + 1));
        assert_eq!(slot.bay_id.as_deref(), Some(bay_id(idx + 1).as_str()));
    }
    assert!(output.yard_schedule.occupancies.is_empty());

    let km_target = output.items.iter().find(|i| i.vehicle_id == vehicle_id(1)).unwrap().km_target;
    assert_eq!(km_target, Some(16.5 * 35.0));
    let idle = output.items.iter().find(|i| i.vehicle_id == vehicle_id(10)).unwrap();
    assert_eq!(idle.km_target, None);
    assert_eq!(idle.turnout_rank, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_待清洁车辆入段并按深度清洁排程() {
    let env = PipelineEnv::new();
    env.seed(|conn, d| {
        seed_standard_fleet(conn, d, 10)?;
        insert_cleaning_slot(conn, "CS-10", &bay_id(10), d, "deep")
    });

    let output = env
        .pipeline
        .execute("P-TEST", env.plan_date, PlanWeights::default(), env.as_of())
        .await
        .unwrap();

    assert!(output.features[&vehicle_id(10)].needs_cleaning);
    assert_eq!(output.assignment.decisions[&vehicle_id(10)], Decision::Ibl);

    let jobs = &output.yard_schedule.occupancies;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].vehicle_id, vehicle_id(10));
    assert_eq!(jobs[0].job_type, "deep");
    assert_eq!(jobs[0].from_ts, env.plan_date.and_hms_opt(21, 0, 0).unwrap());
    assert_eq!((jobs[0].to_ts - jobs[0].from_ts).num_minutes(), 180);

    let item = output.items.iter().find(|i| i.vehicle_id == vehicle_id(10)).unwrap();
    assert_eq!(item.bay_id.as_deref(), Some(jobs[0].bay_id.as_str()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_三车示例不合格车辆不上线() {
    let env = PipelineEnv::new();
    env.set(config_keys::ACTIVE_MIN, "1");
    env.set(config_keys::ACTIVE_MAX, "2");
    env.set(config_keys::STANDBY_MIN, "1");
    env.seed(|conn, d| {
        for i in 1..=3 {
            insert_bay(conn, &bay_id(i), i as i32, 2.0)?;
        }
        VehicleBuilder::new("V1").bay(&bay_id(1)).insert(conn, d)?;
        VehicleBuilder::new("V2").bay(&bay_id(2)).insert(conn, d)?;
        VehicleBuilder::new("V3").bay(&bay_id(3)).cert_status("expired").insert(conn, d)
    });

    let output = env
        .pipeline
        .execute("P-TEST", env.plan_date, PlanWeights::default(), env.as_of())
        .await
        .unwrap();

    assert!(!output.features["V3"].fitness_ok);
    assert_ne!(output.assignment.decisions["V3"], Decision::Active);
    assert!((1..=2).contains(&output.assignment.counts().active));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_规则回退后端标记降级() {
    let env = PipelineEnv::new();
    env.set(config_keys::SOLVER_BACKEND, "GREEDY");
    env.seed(|conn, d| {
        seed_standard_fleet(conn, d, 9)?;
        insert_bay(conn, "B10", 10, 10.0)?;
        VehicleBuilder::new("V10").bay("B10").blocking_work_order().insert(conn, d)
    });

    let output = env
        .pipeline
        .execute("P-TEST", env.plan_date, PlanWeights::default(), env.as_of())
        .await
        .unwrap();

    assert!(output.assignment.is_degraded());
    let degraded = output
        .alerts
        .iter()
        .find(|a| a.code == AlertCode::OptimizationDegraded)
        .expect("降级告警");
    assert_eq!(degraded.severity, AlertSeverity::Warning);
    assert!(degraded.message.contains(FALLBACK_MESSAGE));

    // 规则回退: 前 active_max 辆上线，阻断车辆入段
    assert_eq!(output.assignment.counts().active, 9);
    assert_eq!(output.assignment.decisions["V10"], Decision::Ibl);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_合格车辆不足触发回退与告警() {
    let env = PipelineEnv::new();
    env.seed(|conn, d| seed_standard_fleet(conn, d, 5));

    let output = env
        .pipeline
        .execute("P-TEST", env.plan_date, PlanWeights::default(), env.as_of())
        .await
        .unwrap();

    assert!(output.assignment.is_degraded());
    assert_eq!(output.assignment.counts().active, 5);
    assert!(output
        .alerts
        .iter()
        .any(|a| a.code == AlertCode::ActiveBelowMinimum));
    assert!(output
        .alerts
        .iter()
        .any(|a| a.code == AlertCode::StandbyBelowMinimum));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_execute_无可用股道报错() {
    let env = PipelineEnv::new();
    env.seed(|conn, d| {
        seed_standard_fleet(conn, d, 3)?;
        conn.execute("UPDATE stabling_bay SET is_active = 0", [])?;
        Ok(())
    });

    let result = env
        .pipeline
        .execute("P-TEST", env.plan_date, PlanWeights::default(), env.as_of())
        .await;
    assert!(matches!(result, Err(EngineError::NoActiveBays(_))));
}
