// ==========================================
// 车辆夜间入段排产系统 - Stage 3 停放与出库顺序
// ==========================================
// 职责: 为上线 (active) 车辆分配停放股道与早间出库序号
// 规则: 候选股道按出库代价升序；已停在候选股道的车辆保留原股道，
//       其余车辆按 vehicle_id 依次取剩余最低代价股道
//       出库序号按 (出库代价, vehicle_id) 连续编号 1..N
// 红线: 同一计划内股道不重复、序号不重复
// ==========================================

use crate::domain::alert::AlertNotice;
use crate::domain::features::VehicleFeatures;
use crate::domain::fleet::StablingBay;
use crate::domain::types::AlertCode;
use crate::domain::yard::TurnoutSlot;
use crate::engine::bay_pool::BayPool;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, instrument};

// ==========================================
// TurnoutPlan - Stage 3 输出
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TurnoutPlan {
    pub slots: Vec<TurnoutSlot>, // 按 turnout_rank 升序
    pub alerts: Vec<AlertNotice>,
}

impl TurnoutPlan {
    pub fn slot_for(&self, vehicle_id: &str) -> Option<&TurnoutSlot> {
        self.slots.iter().find(|s| s.vehicle_id == vehicle_id)
    }

    /// 总出库代价（秒）
    pub fn total_exit_cost_seconds(&self) -> i64 {
        self.slots.iter().map(|s| s.exit_cost_seconds).sum()
    }
}

// ==========================================
// TurnoutSequencer - 出库排序器
// ==========================================
pub struct TurnoutSequencer;

impl TurnoutSequencer {
    /// 生成停放股道与出库序号
    ///
    /// # 参数
    /// - active_vehicles: 上线车辆
    /// - pool: 可用股道池
    /// - features: 车辆特征（读取当前股道）
    ///
    /// # 返回
    /// - 股道不足时超出车辆无股道、排在最后，并产生容量告警
    #[instrument(skip_all, fields(vehicles = active_vehicles.len(), bays = pool.len()))]
    pub fn sequence(
        active_vehicles: &[String],
        pool: &BayPool,
        features: &BTreeMap<String, VehicleFeatures>,
    ) -> TurnoutPlan {
        let mut vehicles: Vec<&String> = active_vehicles.iter().collect();
        vehicles.sort();
        vehicles.dedup();

        let candidates = pool.by_exit_cost();
        let mut taken: HashSet<&str> = HashSet::new();
        let mut placed: BTreeMap<&str, &StablingBay> = BTreeMap::new();

        // 1. 已在候选股道的车辆保留原位
        for vehicle_id in &vehicles {
            let current = features
                .get(vehicle_id.as_str())
                .and_then(|f| f.current_bay_id.as_deref());
            if let Some(bay) = current.and_then(|id| candidates.iter().find(|b| b.bay_id == id)) {
                if taken.insert(bay.bay_id.as_str()) {
                    placed.insert(vehicle_id.as_str(), *bay);
                }
            }
        }

        // 2. 其余车辆依次取最低代价空闲股道
        let mut free = candidates
            .iter()
            .filter(|b| !taken.contains(b.bay_id.as_str()))
            .copied();
        let mut overflow: Vec<&str> = Vec::new();
        for vehicle_id in &vehicles {
            if placed.contains_key(vehicle_id.as_str()) {
                continue;
            }
            match free.next() {
                Some(bay) => {
                    placed.insert(vehicle_id.as_str(), bay);
                }
                None => overflow.push(vehicle_id.as_str()),
            }
        }

        // 3. 出库序号: 有股道者按 (代价, 编号)，无股道者殿后
        let mut ordered: Vec<(bool, i64, &str, Option<&StablingBay>)> = vehicles
            .iter()
            .map(|vehicle_id| {
                let bay = placed.get(vehicle_id.as_str()).copied();
                let cost = match bay {
                    Some(b) => b.exit_cost_seconds(),
                    None => features
                        .get(vehicle_id.as_str())
                        .map(|f| f.yard_exit_cost_seconds)
                        .unwrap_or(0),
                };
                (bay.is_none(), cost, vehicle_id.as_str(), bay)
            })
            .collect();
        ordered.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

        let slots: Vec<TurnoutSlot> = ordered
            .into_iter()
            .enumerate()
            .map(|(i, (_, cost, vehicle_id, bay))| TurnoutSlot {
                vehicle_id: vehicle_id.to_string(),
                bay_id: bay.map(|b| b.bay_id.clone()),
                turnout_rank: i as u32 + 1,
                exit_cost_seconds: cost,
            })
            .collect();

        let mut alerts = Vec::new();
        if !overflow.is_empty() {
            alerts.push(AlertNotice::warning(
                AlertCode::StablingCapacityShortfall,
                format!("可用股道{}条，上线车辆{}辆，{}辆未分配股道", pool.len(), vehicles.len(), overflow.len()),
                json!({ "bays": pool.len(), "vehicles": vehicles.len(), "unplaced": overflow }),
            ));
        }

        let plan = TurnoutPlan { slots, alerts };
        info!(
            slots = plan.slots.len(),
            unplaced = overflow.len(),
            total_exit_cost_seconds = plan.total_exit_cost_seconds(),
            "Stage 3 出库排序完成"
        );
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bay(id: &str, pos: i32, access_min: f64) -> StablingBay {
        StablingBay {
            bay_id: id.to_string(),
            position_idx: pos,
            electrified: true,
            length_m: None,
            access_time_min: access_min,
            is_active: true,
        }
    }

    fn standing(id: &str, bay_id: Option<&str>) -> VehicleFeatures {
        let mut f = VehicleFeatures::failed(id, String::new());
        f.extraction_error = None;
        f.fitness_ok = true;
        f.current_bay_id = bay_id.map(|s| s.to_string());
        f
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sequence_低代价先出且序号连续() {
        let pool = BayPool::new(vec![bay("B1", 1, 5.0), bay("B2", 2, 1.0), bay("B3", 3, 3.0)]).unwrap();
        let plan = TurnoutSequencer::sequence(&ids(&["V1", "V2", "V3"]), &pool, &BTreeMap::new());

        let order: Vec<(&str, Option<&str>, u32)> = plan
            .slots
            .iter()
            .map(|s| (s.vehicle_id.as_str(), s.bay_id.as_deref(), s.turnout_rank))
            .collect();
        assert_eq!(
            order,
            vec![("V1", Some("B2"), 1), ("V2", Some("B3"), 2), ("V3", Some("B1"), 3)]
        );
        assert_eq!(plan.slots[0].exit_cost_seconds, 60);
        assert!(plan.alerts.is_empty());
    }

    #[test]
    fn test_sequence_保留当前股道() {
        let pool = BayPool::new(vec![bay("B1", 1, 1.0), bay("B2", 2, 4.0)]).unwrap();
        let features: BTreeMap<String, VehicleFeatures> = [standing("V1", None), standing("V2", Some("B1"))]
            .into_iter()
            .map(|f| (f.vehicle_id.clone(), f))
            .collect();

        let plan = TurnoutSequencer::sequence(&ids(&["V1", "V2"]), &pool, &features);

        assert_eq!(plan.slot_for("V2").unwrap().bay_id.as_deref(), Some("B1"));
        assert_eq!(plan.slot_for("V2").unwrap().turnout_rank, 1);
        assert_eq!(plan.slot_for("V1").unwrap().bay_id.as_deref(), Some("B2"));
    }

    #[test]
    fn test_sequence_股道不足殿后并告警() {
        let pool = BayPool::new(vec![bay("B1", 1, 2.0)]).unwrap();
        let plan = TurnoutSequencer::sequence(&ids(&["V2", "V1", "V3"]), &pool, &BTreeMap::new());

        let ranks: Vec<u32> = plan.slots.iter().map(|s| s.turnout_rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(plan.slots[0].bay_id.as_deref(), Some("B1"));
        assert!(plan.slots[1..].iter().all(|s| s.bay_id.is_none()));
        assert_eq!(plan.alerts.len(), 1);
        assert_eq!(plan.alerts[0].code, AlertCode::StablingCapacityShortfall);

        let bays: HashSet<&str> = plan.slots.iter().filter_map(|s| s.bay_id.as_deref()).collect();
        assert_eq!(bays.len(), 1);
    }
}
