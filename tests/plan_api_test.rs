// ==========================================
// PlanApi 集成测试
// ==========================================
// 测试范围:
// 1. 计划创建: 日期校验、重复日期、权重覆盖
// 2. 运行: 结果包、阻断车辆入段、出库序号连续、重跑替换
// 3. 人工调整: 原因必填、序号/股道冲突、amended 状态、审计记录
//    股道占用随入段决策增删、不合格车辆不可上线、出库序号重排
// 4. 定稿: 幂等、定稿后拒绝运行与调整
// 5. 情景投影: 只读、强制与禁用冲突
// 6. 查询: 摘要、分页、解释、特征、冲突报告
// ==========================================

mod helpers;

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use helpers::api_test_helper::*;
use helpers::fleet_builder::{bay_id, insert_bay, vehicle_id, VehicleBuilder};
use rail_induction_aps::api::ApiError;
use rail_induction_aps::config::config_keys;
use rail_induction_aps::domain::action_log::ActionType;
use rail_induction_aps::domain::types::{AlertCode, Decision, PlanStatus};
use rail_induction_aps::domain::yard::YardOccupancy;
use rail_induction_aps::engine::{ItemChanges, WhatIfRequest};

fn active_ids(env: &ApiTestEnv, plan_id: &str) -> Vec<String> {
    env.item_repo
        .list_by_plan(plan_id)
        .unwrap()
        .into_iter()
        .filter(|i| i.decision == Decision::Active)
        .map(|i| i.vehicle_id)
        .collect()
}

fn non_active_id(env: &ApiTestEnv, plan_id: &str) -> String {
    env.item_repo
        .list_by_plan(plan_id)
        .unwrap()
        .into_iter()
        .find(|i| i.decision != Decision::Active)
        .map(|i| i.vehicle_id)
        .expect("至少一辆非上线车辆")
}

// ==========================================
// 计划创建
// ==========================================

#[test]
fn test_create_plan_成功并写审计() {
    let env = ApiTestEnv::new().unwrap();

    let plan_id = env
        .plan_api
        .create_plan(tomorrow(), None, Some("夜班".to_string()), "dispatcher")
        .unwrap();

    let detail = env.plan_api.get_plan(&plan_id).unwrap();
    assert_eq!(detail.plan.status, PlanStatus::Draft);
    assert_eq!(detail.plan.plan_date, tomorrow());
    assert_eq!(detail.plan.notes.as_deref(), Some("夜班"));
    assert!(detail.items.is_empty());

    let logs = env.plan_api.list_action_logs(&plan_id).unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action_type, ActionType::CreatePlan);
    assert_eq!(logs[0].actor, "dispatcher");
}

#[test]
fn test_create_plan_日期不晚于今天被拒绝() {
    let env = ApiTestEnv::new().unwrap();
    let today = chrono::Local::now().date_naive();

    for date in [today, today - Duration::days(3)] {
        let result = env.plan_api.create_plan(date, None, None, "dispatcher");
        assert!(matches!(result, Err(ApiError::PlanDateNotInFuture { .. })));
    }
    assert_eq!(env.plan_api.list_plans(10, 0).unwrap().total, 0);
}

#[test]
fn test_create_plan_重复日期被拒绝() {
    let env = ApiTestEnv::new().unwrap();
    env.create_tomorrow_plan();

    let result = env.plan_api.create_plan(tomorrow(), None, None, "dispatcher");
    assert!(matches!(result, Err(ApiError::DuplicatePlanDate(_))));
}

#[test]
fn test_create_plan_权重覆盖与非法键() {
    let env = ApiTestEnv::new().unwrap();

    let mut weights = BTreeMap::new();
    weights.insert("brand".to_string(), 2.0);
    let plan_id = env
        .plan_api
        .create_plan(tomorrow(), Some(weights), None, "dispatcher")
        .unwrap();
    let plan = env.plan_api.get_plan(&plan_id).unwrap().plan;
    assert_eq!(plan.weights.brand, 2.0);
    assert_eq!(plan.weights.risk, 1.0);

    let mut bad = BTreeMap::new();
    bad.insert("speed".to_string(), 1.0);
    assert_invalid_input(env.plan_api.create_plan(tomorrow() + Duration::days(1), Some(bad), None, "dispatcher"));

    let mut negative = BTreeMap::new();
    negative.insert("risk".to_string(), -1.0);
    assert_invalid_input(env.plan_api.create_plan(
        tomorrow() + Duration::days(1),
        Some(negative),
        None,
        "dispatcher",
    ));
}

#[test]
fn test_create_plan_默认权重来自配置() {
    let env = ApiTestEnv::new().unwrap();
    env.set_config("weights.shunt", "0.5");

    let plan_id = env.create_tomorrow_plan();
    let plan = env.plan_api.get_plan(&plan_id).unwrap().plan;
    assert_eq!(plan.weights.shunt, 0.5);
}

// ==========================================
// 运行
// ==========================================

#[test]
fn test_run_plan_结果包满足车队约束() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.create_tomorrow_plan();

    let result = env.plan_api.run_plan(&plan_id, None, "dispatcher").unwrap();

    assert_eq!(result.status, PlanStatus::Completed);
    assert_eq!(result.counts.total(), 10);
    assert!((7..=9).contains(&result.counts.active));
    assert!(result.counts.standby >= 1);
    assert_eq!(result.items.len(), 10);

    // 出库序号 1..N 连续，且只有 active 有序号
    let ranks: Vec<u32> = result.turnout.iter().map(|s| s.turnout_rank).collect();
    let expected: Vec<u32> = (1..=result.counts.active as u32).collect();
    assert_eq!(ranks, expected);
    for item in &result.items {
        assert_eq!(item.turnout_rank.is_some(), item.decision == Decision::Active);
        assert!(!item.explanation.reasons.is_empty());
    }

    // 股道在上线车辆中不重复
    let bays: Vec<&String> = result
        .items
        .iter()
        .filter(|i| i.decision == Decision::Active)
        .filter_map(|i| i.bay_id.as_ref())
        .collect();
    let unique: BTreeSet<&String> = bays.iter().copied().collect();
    assert_eq!(bays.len(), unique.len());

    assert_eq!(env.plan_status(&plan_id), PlanStatus::Completed);
    let plan = env.plan_api.get_plan(&plan_id).unwrap().plan;
    assert!(plan.last_run_at.is_some());
    assert!(plan.objective_value.is_some());
}

#[test]
fn test_run_plan_阻断车辆入段并排程() {
    let env = ApiTestEnv::with_fleet(9).unwrap();
    let plan_date = tomorrow();
    env.seed(|conn| {
        insert_bay(conn, "B10", 10, 10.0)?;
        VehicleBuilder::new("V10").bay("B10").blocking_work_order().insert(conn, plan_date)
    })
    .unwrap();

    let plan_id = env.run_tomorrow_plan();

    let item = env.item_repo.find(&plan_id, "V10").unwrap().unwrap();
    assert_eq!(item.decision, Decision::Ibl);
    assert!(item.explanation.work_order_blocking);
    assert!(item.bay_id.is_some());

    let detail = env.plan_api.get_plan(&plan_id).unwrap();
    let job = detail
        .yard_schedule
        .iter()
        .find(|o| o.vehicle_id == "V10")
        .expect("入段车辆必须有股道占用");
    assert_eq!(job.job_type, "maintenance");
    assert_eq!(job.from_ts, plan_date.and_hms_opt(21, 0, 0).unwrap());
    assert!(env.plan_api.list_yard_conflicts(&plan_id).unwrap().is_empty());
}

#[test]
fn test_run_plan_重跑替换旧结果() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();

    let mut overrides = BTreeMap::new();
    overrides.insert("mileage".to_string(), 0.5);
    let result = env.plan_api.run_plan(&plan_id, Some(overrides), "dispatcher").unwrap();

    assert_eq!(result.weights.mileage, 0.5);
    assert_eq!(env.item_repo.list_by_plan(&plan_id).unwrap().len(), 10);
    assert_eq!(env.alert_repo.count_by_plan(&plan_id).unwrap(), result.alerts.len());

    let plan = env.plan_api.get_plan(&plan_id).unwrap().plan;
    assert_eq!(plan.weights.mileage, 0.5);

    let runs = env
        .action_log_repo
        .list_by_plan(&plan_id, Some(ActionType::RunPlan))
        .unwrap();
    assert_eq!(runs.len(), 2);
}

#[test]
fn test_run_plan_非法权重不改变状态() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.create_tomorrow_plan();

    let mut overrides = BTreeMap::new();
    overrides.insert("risk".to_string(), f64::NAN);
    assert_invalid_input(env.plan_api.run_plan(&plan_id, Some(overrides), "dispatcher"));
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Draft);
}

#[test]
fn test_run_plan_无可用股道置为失败() {
    let env = ApiTestEnv::new().unwrap();
    let plan_date = tomorrow();
    env.seed(|conn| VehicleBuilder::new("V01").insert(conn, plan_date)).unwrap();
    let plan_id = env.create_tomorrow_plan();

    let result = env.plan_api.run_plan(&plan_id, None, "dispatcher");
    assert!(matches!(result, Err(ApiError::RunFailed { .. })));

    let plan = env.plan_api.get_plan(&plan_id).unwrap().plan;
    assert_eq!(plan.status, PlanStatus::Failed);
    assert!(plan.last_error.is_some());
    assert!(env.item_repo.list_by_plan(&plan_id).unwrap().is_empty());

    let failures = env
        .action_log_repo
        .list_by_plan(&plan_id, Some(ActionType::RunFailed))
        .unwrap();
    assert_eq!(failures.len(), 1);
}

#[test]
fn test_run_plan_失败后保留上次结果且可重跑() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let before = env.item_repo.list_by_plan(&plan_id).unwrap();

    env.seed(|conn| conn.execute("UPDATE stabling_bay SET is_active = 0", []).map(|_| ()))
        .unwrap();
    assert!(matches!(
        env.plan_api.run_plan(&plan_id, None, "dispatcher"),
        Err(ApiError::RunFailed { .. })
    ));
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Failed);
    assert_eq!(env.item_repo.list_by_plan(&plan_id).unwrap().len(), before.len());

    env.seed(|conn| conn.execute("UPDATE stabling_bay SET is_active = 1", []).map(|_| ()))
        .unwrap();
    let result = env.plan_api.run_plan(&plan_id, None, "dispatcher").unwrap();
    assert_eq!(result.status, PlanStatus::Completed);
}

#[test]
fn test_run_plan_未知计划() {
    let env = ApiTestEnv::new().unwrap();
    assert!(matches!(
        env.plan_api.run_plan("missing", None, "dispatcher"),
        Err(ApiError::NotFound(_))
    ));
}

// ==========================================
// 人工调整
// ==========================================

#[test]
fn test_override_item_转出上线清空序号并进入amended() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let target = active_ids(&env, &plan_id)[0].clone();

    let updated = env
        .plan_api
        .override_item(
            &plan_id,
            &target,
            &ItemChanges::decision(Decision::Standby),
            "受电弓异响，转备用观察",
            "supervisor",
        )
        .unwrap();

    assert_eq!(updated.decision, Decision::Standby);
    assert!(updated.turnout_rank.is_none());
    assert!(updated.km_target.is_none());
    assert!(updated.manual_override);
    assert_eq!(updated.explanation.overrides.len(), 1);
    assert_eq!(updated.explanation.overrides[0].previous.decision, Decision::Active);
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Amended);

    let overrides = env.plan_api.list_overrides(&plan_id).unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].target_id.as_deref(), Some(target.as_str()));
    let payload = overrides[0].payload_json.as_ref().unwrap();
    assert_eq!(payload["previous"]["decision"], "active");
    assert_eq!(payload["new"]["decision"], "standby");
}

#[test]
fn test_override_item_转入上线取下一个序号() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let active_count = active_ids(&env, &plan_id).len() as u32;
    let target = non_active_id(&env, &plan_id);

    let updated = env
        .plan_api
        .override_item(
            &plan_id,
            &target,
            &ItemChanges::decision(Decision::Active),
            "早高峰加开",
            "supervisor",
        )
        .unwrap();

    assert_eq!(updated.decision, Decision::Active);
    assert_eq!(updated.turnout_rank, Some(active_count + 1));
}

#[test]
fn test_override_item_重复序号被拒绝() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let target = non_active_id(&env, &plan_id);

    let changes = ItemChanges {
        decision: Some("active".to_string()),
        turnout_rank: Some(1),
        ..Default::default()
    };
    assert_invalid_input(env.plan_api.override_item(&plan_id, &target, &changes, "加开", "supervisor"));
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Completed);
}

#[test]
fn test_override_item_原因必填与非法决策() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let target = vehicle_id(1);

    assert_invalid_input(env.plan_api.override_item(
        &plan_id,
        &target,
        &ItemChanges::decision(Decision::Ibl),
        "   ",
        "supervisor",
    ));

    let bad = ItemChanges {
        decision: Some("parked".to_string()),
        ..Default::default()
    };
    assert_invalid_input(env.plan_api.override_item(&plan_id, &target, &bad, "测试", "supervisor"));

    assert!(matches!(
        env.plan_api.override_item(
            &plan_id,
            "V99",
            &ItemChanges::decision(Decision::Ibl),
            "测试",
            "supervisor"
        ),
        Err(ApiError::NotFound(_))
    ));
    assert!(env.plan_api.list_overrides(&plan_id).unwrap().is_empty());
}

#[test]
fn test_override_item_草稿计划不允许() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.create_tomorrow_plan();

    assert_lifecycle_violation(
        env.plan_api.override_item(
            &plan_id,
            &vehicle_id(1),
            &ItemChanges::decision(Decision::Ibl),
            "测试",
            "supervisor",
        ),
        PlanStatus::Draft,
        "override",
    );
}

/// 9 辆标准车 + 阻断车辆 V10（入段，B01 21:00-22:00 检修）
fn fleet_with_blocked_v10() -> ApiTestEnv {
    let env = ApiTestEnv::with_fleet(9).unwrap();
    let plan_date = tomorrow();
    env.seed(|conn| {
        insert_bay(conn, "B10", 10, 10.0)?;
        VehicleBuilder::new("V10").bay("B10").blocking_work_order().insert(conn, plan_date)
    })
    .unwrap();
    env
}

fn yard_jobs_of(env: &ApiTestEnv, plan_id: &str, vehicle: &str) -> Vec<YardOccupancy> {
    env.plan_api
        .get_plan(plan_id)
        .unwrap()
        .yard_schedule
        .into_iter()
        .filter(|o| o.vehicle_id == vehicle)
        .collect()
}

fn active_ranks(env: &ApiTestEnv, plan_id: &str) -> Vec<(u32, String)> {
    let mut ranks: Vec<(u32, String)> = env
        .item_repo
        .list_by_plan(plan_id)
        .unwrap()
        .into_iter()
        .filter(|i| i.decision == Decision::Active)
        .map(|i| (i.turnout_rank.expect("上线车辆必须有出库序号"), i.vehicle_id))
        .collect();
    ranks.sort();
    ranks
}

#[test]
fn test_override_item_入段车辆转备用释放股道占用() {
    let env = fleet_with_blocked_v10();
    let plan_id = env.run_tomorrow_plan();
    assert_eq!(yard_jobs_of(&env, &plan_id, "V10").len(), 1);

    let updated = env
        .plan_api
        .override_item(
            &plan_id,
            "V10",
            &ItemChanges::decision(Decision::Standby),
            "工单改至白天处理",
            "supervisor",
        )
        .unwrap();

    assert_eq!(updated.decision, Decision::Standby);
    assert!(yard_jobs_of(&env, &plan_id, "V10").is_empty());
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Amended);

    // 再转回入段: 股道空闲，从夜间起点重新排入
    let back = env
        .plan_api
        .override_item(&plan_id, "V10", &ItemChanges::decision(Decision::Ibl), "恢复入段", "supervisor")
        .unwrap();
    let jobs = yard_jobs_of(&env, &plan_id, "V10");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].from_ts, tomorrow().and_hms_opt(21, 0, 0).unwrap());
    assert_eq!(back.bay_id.as_deref(), Some(jobs[0].bay_id.as_str()));
}

#[test]
fn test_override_item_转入段追加作业且不冲突() {
    let env = fleet_with_blocked_v10();
    let plan_id = env.run_tomorrow_plan();
    let actives = active_ranks(&env, &plan_id);
    let first = actives[0].1.clone();
    let second = actives[1].1.clone();

    // 指定 B01: 接在 V10 作业之后（22:00 + 缓冲 15 分钟）
    let changes = ItemChanges {
        decision: Some("ibl".to_string()),
        bay_id: Some("B01".to_string()),
        ..Default::default()
    };
    let updated = env
        .plan_api
        .override_item(&plan_id, &first, &changes, "夜间补做检修", "supervisor")
        .unwrap();
    assert_eq!(updated.decision, Decision::Ibl);
    assert_eq!(updated.bay_id.as_deref(), Some("B01"));
    assert_eq!(updated.turnout_rank, None);

    let jobs = yard_jobs_of(&env, &plan_id, &first);
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].bay_id, "B01");
    assert_eq!(jobs[0].from_ts, tomorrow().and_hms_opt(22, 15, 0).unwrap());
    assert_eq!(jobs[0].to_ts - jobs[0].from_ts, Duration::minutes(60));
    assert_eq!(jobs[0].job_type, "maintenance");

    // 未指定股道: 按轮转取下一股道
    let moved = env
        .plan_api
        .override_item(&plan_id, &second, &ItemChanges::decision(Decision::Ibl), "换下检修", "supervisor")
        .unwrap();
    let jobs = yard_jobs_of(&env, &plan_id, &second);
    assert_eq!(jobs.len(), 1);
    assert_eq!(moved.bay_id.as_deref(), Some(jobs[0].bay_id.as_str()));
    assert!(env.plan_api.list_yard_conflicts(&plan_id).unwrap().is_empty());

    let ranks: Vec<u32> = active_ranks(&env, &plan_id).into_iter().map(|(r, _)| r).collect();
    assert_eq!(ranks, (1..=ranks.len() as u32).collect::<Vec<_>>());

    let overrides = env.plan_api.list_overrides(&plan_id).unwrap();
    assert_eq!(overrides.len(), 2);
    assert_eq!(overrides[0].payload_json.as_ref().unwrap()["yard_job"]["bay_id"], "B01");
}

#[test]
fn test_override_item_追加作业超出夜间窗口写入告警() {
    let env = fleet_with_blocked_v10();
    let plan_id = env.run_tomorrow_plan();
    let overruns = |env: &ApiTestEnv| {
        env.alert_repo
            .list_by_plan(&plan_id)
            .unwrap()
            .into_iter()
            .filter(|a| a.code == AlertCode::YardWindowOverrun)
            .count()
    };
    assert_eq!(overruns(&env), 0);

    env.set_config(config_keys::NIGHT_END, "21:30");
    let target = active_ranks(&env, &plan_id)[0].1.clone();
    let changes = ItemChanges {
        decision: Some("ibl".to_string()),
        bay_id: Some("B01".to_string()),
        ..Default::default()
    };
    env.plan_api
        .override_item(&plan_id, &target, &changes, "夜间补做检修", "supervisor")
        .unwrap();

    assert_eq!(overruns(&env), 1);
    assert_eq!(yard_jobs_of(&env, &plan_id, &target).len(), 1);
}

#[test]
fn test_override_item_阻断车辆不可转上线() {
    let env = fleet_with_blocked_v10();
    let plan_id = env.run_tomorrow_plan();
    let alerts_before = env.alert_repo.count_by_plan(&plan_id).unwrap();

    assert_invalid_input(env.plan_api.override_item(
        &plan_id,
        "V10",
        &ItemChanges::decision(Decision::Active),
        "临时加开",
        "supervisor",
    ));

    let item = env.item_repo.find(&plan_id, "V10").unwrap().unwrap();
    assert_eq!(item.decision, Decision::Ibl);
    assert!(!item.manual_override);
    assert_eq!(yard_jobs_of(&env, &plan_id, "V10").len(), 1);
    assert_eq!(env.alert_repo.count_by_plan(&plan_id).unwrap(), alerts_before);
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Completed);
    assert!(env.plan_api.list_overrides(&plan_id).unwrap().is_empty());
}

#[test]
fn test_override_item_中间序号转出后其余序号连续() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let before = active_ranks(&env, &plan_id);
    assert!(before.len() >= 3);
    let target = before[1].1.clone();

    env.plan_api
        .override_item(&plan_id, &target, &ItemChanges::decision(Decision::Standby), "备车", "supervisor")
        .unwrap();

    let after = active_ranks(&env, &plan_id);
    let ranks: Vec<u32> = after.iter().map(|(r, _)| *r).collect();
    assert_eq!(ranks, (1..before.len() as u32).collect::<Vec<_>>());

    // 原有先后顺序不变
    let expected: Vec<String> = before.iter().filter(|(_, v)| *v != target).map(|(_, v)| v.clone()).collect();
    let order: Vec<String> = after.into_iter().map(|(_, v)| v).collect();
    assert_eq!(order, expected);

    let shifted = env.item_repo.find(&plan_id, &before[2].1).unwrap().unwrap();
    assert_eq!(shifted.turnout_rank, Some(2));
    assert!(shifted.explanation.reasons.iter().any(|r| r.contains("出库序号重排")));
}

// ==========================================
// 定稿
// ==========================================

#[test]
fn test_finalize_plan_幂等且冻结计划() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();

    assert!(env.plan_api.finalize_plan(&plan_id, "supervisor").unwrap());
    assert!(env.plan_api.finalize_plan(&plan_id, "supervisor").unwrap());

    let plan = env.plan_api.get_plan(&plan_id).unwrap().plan;
    assert_eq!(plan.status, PlanStatus::Finalized);
    assert!(plan.finalized_at.is_some());

    let finals = env
        .action_log_repo
        .list_by_plan(&plan_id, Some(ActionType::FinalizePlan))
        .unwrap();
    assert_eq!(finals.len(), 1);

    assert_lifecycle_violation(
        env.plan_api.override_item(
            &plan_id,
            &vehicle_id(1),
            &ItemChanges::decision(Decision::Ibl),
            "测试",
            "supervisor",
        ),
        PlanStatus::Finalized,
        "override",
    );
    assert_lifecycle_violation(
        env.plan_api.run_plan(&plan_id, None, "dispatcher"),
        PlanStatus::Finalized,
        "run",
    );
}

#[test]
fn test_finalize_plan_草稿不允许() {
    let env = ApiTestEnv::new().unwrap();
    let plan_id = env.create_tomorrow_plan();

    assert_lifecycle_violation(
        env.plan_api.finalize_plan(&plan_id, "supervisor"),
        PlanStatus::Draft,
        "finalize",
    );
}

#[test]
fn test_finalize_plan_调整后可定稿() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let target = active_ids(&env, &plan_id)[0].clone();
    env.plan_api
        .override_item(&plan_id, &target, &ItemChanges::decision(Decision::Standby), "备车", "supervisor")
        .unwrap();

    assert!(env.plan_api.finalize_plan(&plan_id, "supervisor").unwrap());
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Finalized);
}

// ==========================================
// 情景投影
// ==========================================

#[test]
fn test_what_if_只读且给出差异() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let target = active_ids(&env, &plan_id)[0].clone();
    let before = env.item_repo.list_by_plan(&plan_id).unwrap();

    let request = WhatIfRequest {
        ban: vec![target.clone()],
        ..Default::default()
    };
    let result = env.plan_api.what_if(&plan_id, &request).unwrap();

    assert_eq!(result.diffs.len(), 1);
    assert_eq!(result.diffs[0].vehicle_id, target);
    assert_eq!(result.diffs[0].scenario, Decision::Standby);
    assert_eq!(result.scenario.active + 1, result.baseline.active);
    assert!(result.scenario_cost.is_finite());

    let after = env.item_repo.list_by_plan(&plan_id).unwrap();
    let decisions = |items: &[rail_induction_aps::PlanItem]| -> Vec<Decision> {
        items.iter().map(|i| i.decision).collect()
    };
    assert_eq!(decisions(&before), decisions(&after));
    assert_eq!(env.plan_status(&plan_id), PlanStatus::Completed);
}

#[test]
fn test_what_if_强制与禁用冲突() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();
    let target = vehicle_id(1);

    let mut force = BTreeMap::new();
    force.insert(target.clone(), "active".to_string());
    let request = WhatIfRequest {
        force,
        ban: vec![target],
        ..Default::default()
    };
    assert_invalid_input(env.plan_api.what_if(&plan_id, &request));
}

#[test]
fn test_what_if_草稿计划无结果() {
    let env = ApiTestEnv::new().unwrap();
    let plan_id = env.create_tomorrow_plan();

    assert_lifecycle_violation(
        env.plan_api.what_if(&plan_id, &WhatIfRequest::default()),
        PlanStatus::Draft,
        "what_if",
    );
}

// ==========================================
// 查询
// ==========================================

#[test]
fn test_get_plan_summary_计数一致() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();

    let summary = env.plan_api.get_plan_summary(&plan_id).unwrap();
    assert_eq!(summary.counts.total(), 10);
    assert_eq!(summary.yard_jobs, summary.counts.ibl);
    assert_eq!(summary.override_count, 0);
    assert_eq!(summary.alert_count, env.plan_api.list_alerts(&plan_id).unwrap().len());
}

#[test]
fn test_list_plans_分页() {
    let env = ApiTestEnv::new().unwrap();
    for offset in 1..=3 {
        env.plan_api
            .create_plan(tomorrow() + Duration::days(offset), None, None, "dispatcher")
            .unwrap();
    }

    let page = env.plan_api.list_plans(2, 0).unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.plans.len(), 2);
    assert_eq!(page.plans[0].plan_date, tomorrow() + Duration::days(3));

    let rest = env.plan_api.list_plans(2, 2).unwrap();
    assert_eq!(rest.plans.len(), 1);

    assert_invalid_input(env.plan_api.list_plans(0, 0));
}

#[test]
fn test_explain_item_与实时特征() {
    let env = ApiTestEnv::with_fleet(10).unwrap();
    let plan_id = env.run_tomorrow_plan();

    let view = env.plan_api.explain_item(&plan_id, &vehicle_id(3)).unwrap();
    assert_eq!(view.vehicle_id, vehicle_id(3));
    assert!(view.explanation.fitness_ok);
    assert!(!view.explanation.reasons.is_empty());

    let ids = vec![vehicle_id(3), "V99".to_string()];
    let features = env.plan_api.get_vehicle_features(&plan_id, Some(ids.as_slice())).unwrap();
    assert_eq!(features.len(), 2);
    assert!(features[&vehicle_id(3)].fitness_ok);
    assert_eq!(features[&vehicle_id(3)].current_bay_id.as_deref(), Some(bay_id(3).as_str()));
    assert!(features["V99"].extraction_error.is_some());

    assert!(matches!(
        env.plan_api.explain_item(&plan_id, "V99"),
        Err(ApiError::NotFound(_))
    ));
}
