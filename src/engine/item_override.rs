// ==========================================
// 车辆夜间入段排产系统 - 人工调整规则
// ==========================================
// 职责: 校验并合成人工调整后的 PlanItem（纯函数，不写库）
// 红线: 调整原因必填；决策只能为 active / standby / ibl
//       证书失效 / 阻断工单 / 特征缺失的车辆不得调整为上线
//       上线车辆之间出库序号、股道不得重复；调整后出库序号为 1..N 连续
//       调整前后取值写入解释结构，可追溯
// ==========================================

use crate::domain::plan::{OverrideRecord, PlanItem};
use crate::domain::types::Decision;
use crate::engine::error::{EngineError, EngineResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ItemChanges - 调整内容（未出现的字段保持不变）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemChanges {
    #[serde(default)]
    pub decision: Option<String>,
    #[serde(default)]
    pub bay_id: Option<String>,
    #[serde(default)]
    pub turnout_rank: Option<u32>,
    #[serde(default)]
    pub km_target: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.decision.is_none()
            && self.bay_id.is_none()
            && self.turnout_rank.is_none()
            && self.km_target.is_none()
            && self.notes.is_none()
    }

    /// 仅改决策
    pub fn decision(decision: Decision) -> Self {
        Self {
            decision: Some(decision.to_db_str().to_string()),
            ..Self::default()
        }
    }
}

// ==========================================
// OverrideRules - 人工调整规则
// ==========================================
pub struct OverrideRules;

impl OverrideRules {
    /// 合成调整后的明细
    ///
    /// # 参数
    /// - current: 被调整的明细
    /// - plan_items: 同计划全部明细（用于序号/股道冲突校验）
    /// - changes: 调整内容
    /// - reason: 调整原因（必填）
    /// - actor: 操作人
    /// - now: 调整时刻
    ///
    /// # 规则
    /// - 不满足上线条件的车辆不得转为 active
    /// - 转出 active: 清空出库序号与里程目标
    /// - 转入 active 且未指定序号: 取现有最大序号 + 1
    pub fn apply(
        current: &PlanItem,
        plan_items: &[PlanItem],
        changes: &ItemChanges,
        reason: &str,
        actor: &str,
        now: NaiveDateTime,
    ) -> EngineResult<PlanItem> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::InvalidInput("调整原因不能为空".to_string()));
        }
        if changes.is_empty() {
            return Err(EngineError::InvalidInput("未提供任何调整内容".to_string()));
        }

        let decision = match &changes.decision {
            Some(raw) => Decision::parse(raw)
                .ok_or_else(|| EngineError::InvalidInput(format!("非法决策值: {}", raw)))?,
            None => current.decision,
        };

        if decision == Decision::Active && !current.explanation.is_safe_for_service() {
            let e = &current.explanation;
            return Err(EngineError::InvalidInput(format!(
                "车辆{}不满足上线条件(证书有效={}, 阻断工单={}, 特征缺失={})，不可调整为上线",
                current.vehicle_id,
                e.fitness_ok,
                e.work_order_blocking,
                e.extraction_error.is_some()
            )));
        }

        if let Some(km) = changes.km_target {
            if !km.is_finite() || km < 0.0 {
                return Err(EngineError::InvalidInput(format!("里程目标非法: {}", km)));
            }
        }

        let others: Vec<&PlanItem> = plan_items
            .iter()
            .filter(|i| i.vehicle_id != current.vehicle_id && i.decision == Decision::Active)
            .collect();

        let mut next = current.clone();
        next.decision = decision;
        if let Some(bay_id) = &changes.bay_id {
            next.bay_id = Some(bay_id.clone());
        }
        if let Some(notes) = &changes.notes {
            next.notes = Some(notes.clone());
        }

        if decision == Decision::Active {
            let rank = match changes.turnout_rank {
                Some(0) => return Err(EngineError::InvalidInput("出库序号从 1 开始".to_string())),
                Some(r) => r,
                None => match current.turnout_rank {
                    Some(r) if current.decision == Decision::Active => r,
                    _ => others.iter().filter_map(|i| i.turnout_rank).max().unwrap_or(0) + 1,
                },
            };
            if others.iter().any(|i| i.turnout_rank == Some(rank)) {
                return Err(EngineError::InvalidInput(format!("出库序号{}已被占用", rank)));
            }
            let bay_taken = |bay_id: &str| others.iter().any(|i| i.bay_id.as_deref() == Some(bay_id));
            match &changes.bay_id {
                Some(bay_id) if bay_taken(bay_id.as_str()) => {
                    return Err(EngineError::InvalidInput(format!("股道{}已有上线车辆停放", bay_id)));
                }
                // 由备用/入段转上线且原股道已被占用: 待人工指定股道
                None if next.bay_id.as_deref().map(bay_taken).unwrap_or(false) => next.bay_id = None,
                _ => {}
            }
            next.turnout_rank = Some(rank);
        } else {
            if changes.turnout_rank.is_some() {
                return Err(EngineError::InvalidInput("仅上线车辆可设置出库序号".to_string()));
            }
            next.turnout_rank = None;
            if current.decision == Decision::Active {
                next.km_target = None;
            }
        }
        if let Some(km) = changes.km_target {
            next.km_target = Some(km);
        }

        let record = OverrideRecord {
            at: now,
            actor: actor.to_string(),
            reason: reason.to_string(),
            previous: current.placement(),
            new: next.placement(),
        };
        next.explanation
            .reasons
            .push(format!("人工调整({}): {} → {}，原因: {}", actor, current.decision, decision, reason));
        next.explanation.overrides.push(record);
        next.manual_override = true;
        next.override_reason = Some(reason.to_string());
        next.overridden_at = Some(now);

        Ok(next)
    }

    /// 出库序号重排为 1..N（保持原有先后顺序）
    ///
    /// # 参数
    /// - plan_items: 调整后的同计划全部明细
    ///
    /// # 返回
    /// - 序号发生变化的上线明细（已写入说明）
    pub fn compact_turnout_ranks(plan_items: &[PlanItem]) -> Vec<PlanItem> {
        let mut active: Vec<&PlanItem> = plan_items
            .iter()
            .filter(|i| i.decision == Decision::Active)
            .collect();
        active.sort_by(|a, b| {
            a.turnout_rank
                .unwrap_or(u32::MAX)
                .cmp(&b.turnout_rank.unwrap_or(u32::MAX))
                .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
        });

        let mut changed = Vec::new();
        for (idx, item) in active.into_iter().enumerate() {
            let rank = idx as u32 + 1;
            if item.turnout_rank == Some(rank) {
                continue;
            }
            let mut moved = item.clone();
            moved.explanation.reasons.push(match item.turnout_rank {
                Some(old) => format!("出库序号重排: {} → {}", old, rank),
                None => format!("出库序号重排: 补为 {}", rank),
            });
            moved.turnout_rank = Some(rank);
            changed.push(moved);
        }
        changed
    }
}
