// ==========================================
// Stage 1 - 结果告警
// ==========================================
// 上线数量临界/越界、备用不足、不安全上线（二次校验）
// ==========================================

use crate::config::FleetLimits;
use crate::domain::alert::AlertNotice;
use crate::domain::features::VehicleFeatures;
use crate::domain::plan::DecisionCounts;
use crate::domain::types::{AlertCode, Decision};
use serde_json::json;
use std::collections::BTreeMap;

pub(super) fn assignment_alerts(
    decisions: &BTreeMap<String, Decision>,
    features: &BTreeMap<String, VehicleFeatures>,
    limits: &FleetLimits,
) -> Vec<AlertNotice> {
    let mut alerts = fleet_size_alerts(&DecisionCounts::from_decisions(decisions.values()), limits);

    for (vehicle_id, decision) in decisions {
        if *decision != Decision::Active {
            continue;
        }
        let Some(f) = features.get(vehicle_id) else {
            continue;
        };
        if f.critical_work_order_count > 0 || f.work_order_blocking {
            alerts.push(AlertNotice::critical(
                AlertCode::UnsafeActive,
                format!("车辆{}存在关键工单却被安排上线", vehicle_id),
                json!({ "vehicle_id": vehicle_id, "critical_work_orders": f.critical_work_order_count }),
            ));
        }
        if !f.fitness_ok {
            alerts.push(AlertNotice::critical(
                AlertCode::UnsafeActive,
                format!("车辆{}技术证书不合格却被安排上线", vehicle_id),
                json!({ "vehicle_id": vehicle_id, "fitness_buffer_hours": f.fitness_buffer_hours }),
            ));
        }
    }
    alerts
}

/// 车队规模告警（what-if 复用）
pub fn fleet_size_alerts(counts: &DecisionCounts, limits: &FleetLimits) -> Vec<AlertNotice> {
    let mut alerts = Vec::new();
    let data = json!({
        "active": counts.active,
        "standby": counts.standby,
        "ibl": counts.ibl,
        "active_min": limits.active_min,
        "active_max": limits.active_max,
        "standby_min": limits.standby_min,
    });

    if counts.active < limits.active_min {
        alerts.push(AlertNotice::critical(
            AlertCode::ActiveBelowMinimum,
            format!("上线车辆{}辆，低于下限{}辆", counts.active, limits.active_min),
            data.clone(),
        ));
    } else if counts.active == limits.active_min {
        alerts.push(AlertNotice::info(
            AlertCode::ActiveAtMinimum,
            format!("上线车辆{}辆，处于下限", counts.active),
            data.clone(),
        ));
    }

    if counts.active > limits.active_max {
        alerts.push(AlertNotice::critical(
            AlertCode::ActiveAboveMaximum,
            format!("上线车辆{}辆，超过上限{}辆", counts.active, limits.active_max),
            data.clone(),
        ));
    } else if counts.active == limits.active_max && limits.active_max != limits.active_min {
        alerts.push(AlertNotice::info(
            AlertCode::ActiveAtMaximum,
            format!("上线车辆{}辆，处于上限", counts.active),
            data.clone(),
        ));
    }

    if counts.standby < limits.standby_min {
        alerts.push(AlertNotice::warning(
            AlertCode::StandbyBelowMinimum,
            format!("备用车辆{}辆，低于下限{}辆", counts.standby, limits.standby_min),
            data,
        ));
    }
    alerts
}
