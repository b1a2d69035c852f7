// ==========================================
// 车辆夜间入段排产系统 - 命令行入口
// ==========================================
// 用法: rail-induction-aps [db_path] [plan_date]
// - db_path 缺省: RAIL_INDUCTION_APS_DB_PATH 或用户数据目录
// - plan_date 缺省: 明天
// 计划不存在时先创建；运行后以 JSON 输出结果包
// ==========================================

use anyhow::Context;
use chrono::NaiveDate;
use rail_induction_aps::app::{get_default_db_path, AppState};
use rail_induction_aps::{logging, APP_NAME, VERSION};

const CLI_ACTOR: &str = "cli";

fn main() {
    logging::init();

    if let Err(e) = run() {
        tracing::error!(error = %e, "夜间计划执行失败");
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let plan_date = match args.next() {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("计划日期格式应为 YYYY-MM-DD: {}", raw))?,
        None => chrono::Local::now()
            .date_naive()
            .succ_opt()
            .context("无法计算明天的日期")?,
    };

    tracing::info!(version = VERSION, db_path = %db_path, plan_date = %plan_date, "{}", APP_NAME);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;
    let api = &state.plan_api;

    let plan_id = match api.find_plan_by_date(plan_date)? {
        Some(plan) => plan.plan_id,
        None => api.create_plan(plan_date, None, None, CLI_ACTOR)?,
    };

    let result = api.run_plan(&plan_id, None, CLI_ACTOR)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
