// ==========================================
// 车辆夜间入段排产系统 - 排产流水线
// ==========================================
// 流程: 参数快照 → 特征提取 → Stage 1 分配 → (Stage 2 ∥ Stage 3) → 明细汇总
// 职责: 只计算，不写库；落库由 PlanApi 在单一事务中完成
// 红线: Stage 1 有时间预算，超时走规则回退，绝不挂起调用方
// ==========================================

use crate::config::{PlannerConfigReader, PlannerSettings};
use crate::domain::alert::AlertNotice;
use crate::domain::features::VehicleFeatures;
use crate::domain::plan::{ExplainValue, ItemExplanation, PlanItem, PlanWeights, ScoreTerms, SolverPath};
use crate::domain::types::{AlertCode, Decision};
use crate::engine::assignment::{AssignmentOutcome, AssignmentSolver};
use crate::engine::bay_pool::BayPool;
use crate::engine::error::EngineResult;
use crate::engine::feature_extractor::FeatureExtractor;
use crate::engine::scoring::ScoringCore;
use crate::engine::turnout::{TurnoutPlan, TurnoutSequencer};
use crate::engine::yard_scheduler::{YardSchedule, YardScheduler};
use crate::repository::fleet_repo::FleetDataProvider;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Stage 1 外层超时在时间预算之上的宽限（秒）
const SOLVER_GRACE_SECS: u64 = 5;

// ==========================================
// PipelineOutput - 一次运行的完整结果
// ==========================================
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub settings: PlannerSettings,
    pub weights: PlanWeights,
    pub features: BTreeMap<String, VehicleFeatures>,
    pub assignment: AssignmentOutcome,
    pub yard_schedule: YardSchedule,
    pub turnout: TurnoutPlan,
    pub items: Vec<PlanItem>,
    pub alerts: Vec<AlertNotice>,
    pub duration_ms: i64,
}

// ==========================================
// PlanPipeline - 排产流水线
// ==========================================
pub struct PlanPipeline<C>
where
    C: PlannerConfigReader,
{
    config: Arc<C>,
    provider: Arc<dyn FleetDataProvider>,
    extractor: FeatureExtractor,
}

impl<C> PlanPipeline<C>
where
    C: PlannerConfigReader,
{
    /// 创建新的流水线实例
    ///
    /// # 参数
    /// - config: 配置读取器
    /// - provider: 车队数据源
    pub fn new(config: Arc<C>, provider: Arc<dyn FleetDataProvider>) -> Self {
        Self {
            extractor: FeatureExtractor::new(provider.clone()),
            config,
            provider,
        }
    }

    /// 读取参数快照
    pub async fn load_settings(&self) -> EngineResult<PlannerSettings> {
        Ok(PlannerSettings::load(&*self.config).await?)
    }

    /// 当前可用股道池
    pub fn bay_pool(&self) -> EngineResult<BayPool> {
        BayPool::new(self.provider.list_bays(true)?)
    }

    /// 仅提取特征（查询接口使用）
    pub async fn extract_features(
        &self,
        plan_date: NaiveDate,
        vehicle_ids: Option<&[String]>,
        as_of: NaiveDateTime,
    ) -> EngineResult<BTreeMap<String, VehicleFeatures>> {
        let settings = self.load_settings().await?;
        self.extractor.extract(plan_date, vehicle_ids, as_of, &settings)
    }

    /// 执行完整排产流程
    ///
    /// # 参数
    /// - plan_id: 计划ID（写入明细与占用）
    /// - plan_date: 计划日
    /// - weights: 本次运行的权重（已合并覆盖值）
    /// - as_of: 当前时刻（判断待清洁档期）
    ///
    /// # 返回
    /// - Ok(PipelineOutput): 完整结果（可能为回退结果）
    /// - Err: 配置/数据源不可用或无可用股道
    #[instrument(skip_all, fields(plan_id = %plan_id, plan_date = %plan_date))]
    pub async fn execute(
        &self,
        plan_id: &str,
        plan_date: NaiveDate,
        weights: PlanWeights,
        as_of: NaiveDateTime,
    ) -> EngineResult<PipelineOutput> {
        let started = Instant::now();

        // ==========================================
        // 步骤0: 参数快照与股道池
        // ==========================================
        let settings = self.load_settings().await?;
        let pool = self.bay_pool()?;

        // ==========================================
        // 步骤1: 特征提取
        // ==========================================
        let features = Arc::new(self.extractor.extract(plan_date, None, as_of, &settings)?);

        // ==========================================
        // 步骤2: Stage 1 运营分配（阻塞线程池 + 外层超时）
        // ==========================================
        let solver = AssignmentSolver::from_settings(&settings);
        let assignment = self.run_assignment(&solver, features.clone(), weights).await;

        // ==========================================
        // 步骤3: Stage 2 ∥ Stage 3
        // ==========================================
        let yard_vehicles = vehicles_with(&assignment, Decision::Ibl);
        let active_vehicles = vehicles_with(&assignment, Decision::Active);
        let scheduler = YardScheduler::from_settings(&settings, plan_date);

        let (yard_schedule, turnout) = tokio::join!(
            async { scheduler.schedule(plan_id, &yard_vehicles, &pool, &features) },
            async { TurnoutSequencer::sequence(&active_vehicles, &pool, &features) },
        );

        // ==========================================
        // 步骤4: 明细与告警汇总
        // ==========================================
        let items = build_items(plan_id, &features, &assignment, &yard_schedule, &turnout, &weights);

        let mut alerts = assignment.alerts.clone();
        let failed: Vec<&str> = features
            .values()
            .filter(|f| f.extraction_error.is_some())
            .map(|f| f.vehicle_id.as_str())
            .collect();
        if !failed.is_empty() {
            alerts.push(AlertNotice::warning(
                AlertCode::ExtractionFailed,
                format!("{}辆车特征提取失败，已按不合格处理", failed.len()),
                json!({ "vehicles": failed }),
            ));
        }
        alerts.extend(yard_schedule.alerts.iter().cloned());
        alerts.extend(turnout.alerts.iter().cloned());

        let duration_ms = started.elapsed().as_millis() as i64;
        let counts = assignment.counts();
        info!(
            active = counts.active,
            standby = counts.standby,
            ibl = counts.ibl,
            yard_jobs = yard_schedule.occupancies.len(),
            alerts = alerts.len(),
            degraded = assignment.is_degraded(),
            duration_ms,
            "排产流水线完成"
        );

        let features = Arc::try_unwrap(features).unwrap_or_else(|shared| (*shared).clone());
        Ok(PipelineOutput {
            settings,
            weights,
            features,
            assignment,
            yard_schedule,
            turnout,
            items,
            alerts,
            duration_ms,
        })
    }

    /// Stage 1: spawn_blocking 执行，超时或任务异常时规则回退
    async fn run_assignment(
        &self,
        solver: &AssignmentSolver,
        features: Arc<BTreeMap<String, VehicleFeatures>>,
        weights: PlanWeights,
    ) -> AssignmentOutcome {
        let budget = Duration::from_secs(solver.time_budget_secs() + SOLVER_GRACE_SECS);
        let task = {
            let solver = solver.clone();
            let features = features.clone();
            tokio::task::spawn_blocking(move || solver.solve(&features, &weights))
        };

        match tokio::time::timeout(budget, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "Stage 1 求解任务异常，使用规则回退");
                solver.fallback(&features, &weights, &format!("求解任务异常: {}", join_err))
            }
            Err(_) => {
                warn!(budget_secs = budget.as_secs(), "Stage 1 求解超时，使用规则回退");
                solver.fallback(&features, &weights, "求解超时")
            }
        }
    }
}

fn vehicles_with(assignment: &AssignmentOutcome, decision: Decision) -> Vec<String> {
    assignment
        .decisions
        .iter()
        .filter(|(_, d)| **d == decision)
        .map(|(id, _)| id.clone())
        .collect()
}

/// 汇总单车明细（按 vehicle_id 升序）
fn build_items(
    plan_id: &str,
    features: &BTreeMap<String, VehicleFeatures>,
    assignment: &AssignmentOutcome,
    yard: &YardSchedule,
    turnout: &TurnoutPlan,
    weights: &PlanWeights,
) -> Vec<PlanItem> {
    assignment
        .decisions
        .iter()
        .filter_map(|(vehicle_id, decision)| {
            let f = features.get(vehicle_id)?;
            let terms = assignment.terms.get(vehicle_id).copied().unwrap_or_default();

            let (bay_id, turnout_rank, km_target, headline) = match decision {
                Decision::Active => {
                    let slot = turnout.slot_for(vehicle_id);
                    let rank = slot.map(|s| s.turnout_rank);
                    let headline = match rank {
                        Some(r) => format!("安排上线运营，出库序号{}", r),
                        None => "安排上线运营".to_string(),
                    };
                    (
                        slot.and_then(|s| s.bay_id.clone()),
                        rank,
                        Some(f.expected_km_if_active),
                        headline,
                    )
                }
                Decision::Ibl => {
                    let job = yard.occupancies.iter().find(|o| &o.vehicle_id == vehicle_id);
                    let headline = match job {
                        Some(o) => format!("入段作业({})，股道{} {}~{}", o.job_type, o.bay_id, o.from_ts, o.to_ts),
                        None => "入段作业".to_string(),
                    };
                    (job.map(|o| o.bay_id.clone()), None, None, headline)
                }
                Decision::Standby => (f.current_bay_id.clone(), None, None, "安排备用".to_string()),
            };

            let explanation = build_explanation(f, terms, *decision, assignment.solver_path, weights, &headline);

            Some(PlanItem {
                plan_id: plan_id.to_string(),
                vehicle_id: vehicle_id.clone(),
                decision: *decision,
                bay_id,
                turnout_rank,
                km_target,
                notes: Some(headline),
                explanation,
                manual_override: false,
                override_reason: None,
                overridden_at: None,
            })
        })
        .collect()
}

fn build_explanation(
    f: &VehicleFeatures,
    terms: ScoreTerms,
    decision: Decision,
    solver_path: SolverPath,
    weights: &PlanWeights,
    headline: &str,
) -> ItemExplanation {
    let mut reasons = vec![headline.to_string()];
    if solver_path == SolverPath::Fallback {
        reasons.push("规则回退分配".to_string());
    }
    reasons.extend(f.notes.values().cloned());

    let mut extra = BTreeMap::new();
    extra.insert(
        "decision_cost".to_string(),
        ExplainValue::Number(ScoringCore::decision_cost(&terms, decision, weights)),
    );
    if f.fitness_buffer_hours.is_finite() {
        extra.insert(
            "fitness_buffer_hours".to_string(),
            ExplainValue::Number(f.fitness_buffer_hours),
        );
    }
    extra.insert(
        "cleaning_duration_minutes".to_string(),
        ExplainValue::Number(f.cleaning_duration_minutes as f64),
    );
    extra.insert(
        "skill_requirement".to_string(),
        ExplainValue::Text(f.skill_requirement.to_string()),
    );
    if let Some(campaign) = &f.active_campaign_id {
        extra.insert("campaign_id".to_string(), ExplainValue::Text(campaign.clone()));
    }

    ItemExplanation {
        reasons,
        terms,
        fitness_ok: f.fitness_ok,
        work_order_blocking: f.work_order_blocking,
        critical_work_order_count: f.critical_work_order_count,
        needs_cleaning: f.needs_cleaning,
        cleaning_type: f.cleaning_type,
        solver_path,
        extraction_error: f.extraction_error.clone(),
        overrides: Vec::new(),
        extra,
    }
}
