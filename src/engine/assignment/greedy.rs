// ==========================================
// Stage 1 - 规则回退
// ==========================================
// 排序: (可上线 降序, 风险分 升序, vehicle_id 升序)
// 前 active_max 辆可上线车辆 → active
// 其余: 阻断工单或待清洁 → ibl，否则 standby
// ==========================================

use crate::config::FleetLimits;
use crate::domain::features::VehicleFeatures;
use crate::domain::types::Decision;
use crate::engine::scoring::ScoringCore;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub(super) fn greedy_assign(
    features: &BTreeMap<String, VehicleFeatures>,
    limits: &FleetLimits,
) -> BTreeMap<String, Decision> {
    let mut ranked: Vec<(&VehicleFeatures, f64)> = features
        .values()
        .map(|f| (f, ScoringCore::risk_score(f)))
        .collect();

    ranked.sort_by(|(a, ra), (b, rb)| {
        b.is_eligible_for_service()
            .cmp(&a.is_eligible_for_service())
            .then(ra.partial_cmp(rb).unwrap_or(Ordering::Equal))
            .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
    });

    let mut decisions = BTreeMap::new();
    let mut active = 0usize;
    for (f, _) in ranked {
        let decision = if f.is_eligible_for_service() && active < limits.active_max {
            active += 1;
            Decision::Active
        } else if f.work_order_blocking || f.needs_cleaning {
            Decision::Ibl
        } else {
            Decision::Standby
        };
        decisions.insert(f.vehicle_id.clone(), decision);
    }
    decisions
}
