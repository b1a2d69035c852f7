// ==========================================
// Stage 1 - 混合整数规划模型 (good_lp + HiGHS)
// ==========================================
// 变量: 每车 xA / xS / xM 三个 0-1 变量，恰好一个为 1
// 硬约束: Σ xA ∈ [active_min, active_max]；不合格车辆 xA = 0
//
// 广告松弛: s_brand ≥ 日目标 - 运营小时 × xA, s_brand ≥ 0
//   最小化时 s_brand = max(0, 日目标 - 运营小时 × xA)
// 里程绝对值线性化: s⁺ - s⁻ = 偏差 + 预计里程 × xA, s⁺, s⁻ ≥ 0
//   最小化 s⁺ + s⁻ 时二者至多一个非零，和即 |偏差 + 预计里程 × xA|
// 清洁项 w_clean × nc × (1 - xM) 的常数部分不进入模型
// 备用 / 入段等价时以 ±YARD_TIE_BREAK 区分: 阻断或待清洁 → 入段，其余 → 备用
//   该项不计入 objective_value（由 ScoringCore::plan_cost 重算）
// 求解按零相对间隙执行
// ==========================================

use crate::config::FleetLimits;
use crate::domain::features::VehicleFeatures;
use crate::domain::plan::PlanWeights;
use crate::domain::types::Decision;
use crate::engine::scoring::ScoringCore;
use good_lp::solvers::highs::highs;
use good_lp::*;
use std::collections::BTreeMap;
use tracing::debug;

const YARD_TIE_BREAK: f64 = 1e-4;

struct VehicleVars {
    active: Variable,
    standby: Variable,
    yard: Variable,
}

/// 构建并求解模型
///
/// # 返回
/// - Ok(decisions): 求解器给出的决策（未校验）
/// - Err(reason): 不可行 / 求解器错误 / 解缺失
pub(super) fn solve_milp(
    features: &BTreeMap<String, VehicleFeatures>,
    weights: &PlanWeights,
    limits: &FleetLimits,
    service_hours: f64,
    time_limit_secs: u64,
) -> Result<BTreeMap<String, Decision>, String> {
    let mut vars = variables!();
    let mut objective = Expression::from(0.0);
    let mut per_vehicle: Vec<(&str, VehicleVars)> = Vec::with_capacity(features.len());
    let mut linking: Vec<Constraint> = Vec::new();

    for (vehicle_id, f) in features {
        let x = VehicleVars {
            active: vars.add(variable().binary().name(format!("xa_{vehicle_id}"))),
            standby: vars.add(variable().binary().name(format!("xs_{vehicle_id}"))),
            yard: vars.add(variable().binary().name(format!("xm_{vehicle_id}"))),
        };

        let risk = ScoringCore::risk_score(f);
        let exit_minutes = f.yard_exit_cost_seconds as f64 / 60.0;
        objective += (weights.risk * risk + weights.shunt * exit_minutes) * x.active;

        if f.needs_cleaning {
            objective -= weights.clean * x.yard;
        }
        if f.needs_cleaning || f.work_order_blocking {
            objective -= YARD_TIE_BREAK * x.yard;
        } else {
            objective += YARD_TIE_BREAK * x.yard;
        }

        let target = f.daily_branding_target_hours;
        if target > 0.0 {
            let s_brand = vars.add(variable().min(0.0).name(format!("sb_{vehicle_id}")));
            objective += weights.brand * s_brand;
            linking.push((s_brand + service_hours * x.active).geq(target));
        }

        let s_pos = vars.add(variable().min(0.0).name(format!("sp_{vehicle_id}")));
        let s_neg = vars.add(variable().min(0.0).name(format!("sn_{vehicle_id}")));
        objective += weights.mileage * s_pos + weights.mileage * s_neg;
        linking.push((s_pos - s_neg - f.expected_km_if_active * x.active).eq(f.mileage_deviation));

        per_vehicle.push((vehicle_id.as_str(), x));
    }

    // 零相对间隙: YARD_TIE_BREAK 与清洁项须可区分
    let mut prob = vars
        .minimise(objective)
        .using(highs)
        .with_time_limit(time_limit_secs as f64)
        .with_mip_gap(0.0)
        .map_err(|e| format!("MIP 间隙设置失败: {}", e))?;

    for c in linking {
        prob.add_constraint(c);
    }

    let mut active_sum = Expression::from(0.0);
    for (vehicle_id, x) in &per_vehicle {
        prob.add_constraint((x.active + x.standby + x.yard).eq(1.0));
        if !features[*vehicle_id].is_eligible_for_service() {
            prob.add_constraint(constraint!(x.active <= 0.0));
        }
        active_sum += x.active;
    }
    prob.add_constraint(active_sum.clone().geq(limits.active_min as f64));
    prob.add_constraint(active_sum.leq(limits.active_max as f64));

    debug!(vehicle_count = per_vehicle.len(), "MILP 模型构建完成");

    let sol = prob.solve().map_err(|e| format!("求解失败: {}", e))?;

    let mut decisions = BTreeMap::new();
    for (vehicle_id, x) in &per_vehicle {
        let picked: Vec<Decision> = [
            (Decision::Active, sol.value(x.active)),
            (Decision::Standby, sol.value(x.standby)),
            (Decision::Ibl, sol.value(x.yard)),
        ]
        .into_iter()
        .filter(|(_, v)| *v >= 0.5)
        .map(|(d, _)| d)
        .collect();

        match picked.as_slice() {
            [d] => {
                decisions.insert(vehicle_id.to_string(), *d);
            }
            _ => return Err(format!("车辆{}的解不唯一或缺失", vehicle_id)),
        }
    }
    Ok(decisions)
}
