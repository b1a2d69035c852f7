// ==========================================
// 车辆夜间入段排产系统 - 计划领域模型
// ==========================================
// 职责: Plan / PlanItem / 权重 / 可解释性结构
// 红线: PlanItem 只属于一个 Plan；人工调整必须留痕
// ==========================================

use crate::domain::types::{CleaningType, Decision, PlanStatus};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// PlanWeights - 目标函数权重
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanWeights {
    pub risk: f64,     // 证书/工单风险
    pub brand: f64,    // 广告曝光缺口
    pub mileage: f64,  // 里程均衡
    pub clean: f64,    // 未安排清洁
    pub shunt: f64,    // 出库调车代价
    #[serde(rename = "override")]
    pub override_penalty: f64, // what-if 中偏离已提交决策的惩罚
}

impl Default for PlanWeights {
    fn default() -> Self {
        Self {
            risk: 1.0,
            brand: 0.6,
            mileage: 0.2,
            clean: 0.4,
            shunt: 0.15,
            override_penalty: 3.0,
        }
    }
}

impl PlanWeights {
    pub const KEYS: [&'static str; 6] = ["risk", "brand", "mileage", "clean", "shunt", "override"];

    /// 按键读取权重
    pub fn get(&self, key: &str) -> Option<f64> {
        match key {
            "risk" => Some(self.risk),
            "brand" => Some(self.brand),
            "mileage" => Some(self.mileage),
            "clean" => Some(self.clean),
            "shunt" => Some(self.shunt),
            "override" => Some(self.override_penalty),
            _ => None,
        }
    }

    fn slot_mut(&mut self, key: &str) -> Option<&mut f64> {
        match key {
            "risk" => Some(&mut self.risk),
            "brand" => Some(&mut self.brand),
            "mileage" => Some(&mut self.mileage),
            "clean" => Some(&mut self.clean),
            "shunt" => Some(&mut self.shunt),
            "override" => Some(&mut self.override_penalty),
            _ => None,
        }
    }

    /// 以绝对值覆盖部分权重
    ///
    /// # 返回
    /// - `Err`: 未知键、非有限值或负值
    pub fn with_overrides(&self, overrides: &BTreeMap<String, f64>) -> Result<Self, String> {
        let mut next = *self;
        for (key, value) in overrides {
            let slot = next
                .slot_mut(key)
                .ok_or_else(|| format!("未知权重键: {}", key))?;
            if !value.is_finite() || *value < 0.0 {
                return Err(format!("权重{}取值非法: {}", key, value));
            }
            *slot = *value;
        }
        Ok(next)
    }

    /// 以增量调整部分权重（what-if）
    pub fn with_deltas(&self, deltas: &BTreeMap<String, f64>) -> Result<Self, String> {
        let mut next = *self;
        for (key, delta) in deltas {
            let slot = next
                .slot_mut(key)
                .ok_or_else(|| format!("未知权重键: {}", key))?;
            if !delta.is_finite() {
                return Err(format!("权重{}增量非法: {}", key, delta));
            }
            let value = *slot + delta;
            if value < 0.0 {
                return Err(format!("权重{}调整后为负: {}", key, value));
            }
            *slot = value;
        }
        Ok(next)
    }
}

// ==========================================
// Plan - 夜间计划
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub plan_date: NaiveDate, // 唯一
    pub status: PlanStatus,
    pub weights: PlanWeights,
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub finalized_at: Option<NaiveDateTime>,

    // ===== 最近一次运行 =====
    pub last_run_at: Option<NaiveDateTime>,
    pub last_run_duration_ms: Option<i64>,
    pub objective_value: Option<f64>,
    pub optimization_degraded: bool,
    pub last_error: Option<String>,

    pub revision: i32, // 每次状态/结果变更 +1
}

impl Plan {
    /// 新建草稿计划
    pub fn new_draft(
        plan_id: String,
        plan_date: NaiveDate,
        weights: PlanWeights,
        notes: Option<String>,
        created_by: String,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            plan_id,
            plan_date,
            status: PlanStatus::Draft,
            weights,
            notes,
            created_by,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            last_run_at: None,
            last_run_duration_ms: None,
            objective_value: None,
            optimization_degraded: false,
            last_error: None,
            revision: 0,
        }
    }
}

// ==========================================
// ScoreTerms - 单车目标函数分项（原始量）
// ==========================================
// 用途: 可解释性 + what-if 代价投影（无需重新求解）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreTerms {
    pub risk_score: f64,
    pub brand_deficit_hours: f64,          // 滚动窗口缺口（展示用）
    pub brand_shortfall_if_active: f64,    // max(0, 日目标 - 运营小时)
    pub brand_shortfall_if_idle: f64,      // 日目标
    pub mileage_deviation_km: f64,         // 相对车队均值
    pub mileage_abs_if_active: f64,        // |偏差 + 预计里程|
    pub mileage_abs_if_idle: f64,          // |偏差|
    pub needs_cleaning: bool,
    pub exit_cost_minutes: f64,
}

// ==========================================
// SolverPath - 决策来源
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverPath {
    Optimized,
    Fallback,
}

// ==========================================
// ExplainValue - 扩展解释项
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplainValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

// ==========================================
// OverrideRecord - 人工调整记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPlacement {
    pub decision: Decision,
    pub bay_id: Option<String>,
    pub turnout_rank: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub at: NaiveDateTime,
    pub actor: String,
    pub reason: String,
    pub previous: ItemPlacement,
    pub new: ItemPlacement,
}

// ==========================================
// ItemExplanation - 决策解释
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemExplanation {
    pub reasons: Vec<String>,
    pub terms: ScoreTerms,
    pub fitness_ok: bool,
    pub work_order_blocking: bool,
    pub critical_work_order_count: u32,
    pub needs_cleaning: bool,
    pub cleaning_type: CleaningType,
    pub solver_path: SolverPath,
    pub extraction_error: Option<String>,
    #[serde(default)]
    pub overrides: Vec<OverrideRecord>,
    #[serde(default)]
    pub extra: BTreeMap<String, ExplainValue>,
}

impl ItemExplanation {
    /// 运营安全性（人工强制上线时用于告警判断）
    pub fn is_safe_for_service(&self) -> bool {
        self.fitness_ok && !self.work_order_blocking && self.extraction_error.is_none()
    }
}

// ==========================================
// PlanItem - 计划明细（单车）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanItem {
    pub plan_id: String,
    pub vehicle_id: String,
    pub decision: Decision,
    pub bay_id: Option<String>,
    pub turnout_rank: Option<u32>, // 仅 active 有值
    pub km_target: Option<f64>,
    pub notes: Option<String>,
    pub explanation: ItemExplanation,

    // ===== 人工调整 =====
    pub manual_override: bool,
    pub override_reason: Option<String>,
    pub overridden_at: Option<NaiveDateTime>,
}

impl PlanItem {
    pub fn placement(&self) -> ItemPlacement {
        ItemPlacement {
            decision: self.decision,
            bay_id: self.bay_id.clone(),
            turnout_rank: self.turnout_rank,
        }
    }
}

// ==========================================
// DecisionCounts - 决策计数
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub active: usize,
    pub standby: usize,
    pub ibl: usize,
}

impl DecisionCounts {
    pub fn record(&mut self, decision: Decision) {
        match decision {
            Decision::Active => self.active += 1,
            Decision::Standby => self.standby += 1,
            Decision::Ibl => self.ibl += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.active + self.standby + self.ibl
    }

    pub fn from_decisions<'a>(decisions: impl IntoIterator<Item = &'a Decision>) -> Self {
        let mut counts = Self::default();
        for d in decisions {
            counts.record(*d);
        }
        counts
    }
}
