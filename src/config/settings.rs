// ==========================================
// 车辆夜间入段排产系统 - 排产参数快照
// ==========================================
// 职责: 一次运行所用的全部参数，显式传入各引擎
// 红线: 不使用全局可变求解状态
// ==========================================

use crate::config::planner_config_trait::{ConfigError, PlannerConfigReader};
use crate::domain::plan::PlanWeights;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// FleetLimits - 车队规模约束
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetLimits {
    pub active_min: usize,
    pub active_max: usize,
    pub standby_min: usize,
}

impl Default for FleetLimits {
    fn default() -> Self {
        Self {
            active_min: 7,
            active_max: 9,
            standby_min: 1,
        }
    }
}

// ==========================================
// SolverBackend - 求解后端
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverBackend {
    Milp,   // good_lp + HiGHS
    Greedy, // 规则回退
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverBackend::Milp => write!(f, "MILP"),
            SolverBackend::Greedy => write!(f, "GREEDY"),
        }
    }
}

impl SolverBackend {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "GREEDY" => SolverBackend::Greedy,
            _ => SolverBackend::Milp, // 默认值
        }
    }
}

// ==========================================
// PlannerSettings - 参数快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerSettings {
    pub fleet: FleetLimits,
    pub service_start: NaiveTime,
    pub service_end: NaiveTime,
    pub night_start: NaiveTime,
    pub night_end: NaiveTime,
    pub default_weights: PlanWeights,
    pub branding_window_days: u32,
    pub solver_time_budget_secs: u64,
    pub solver_backend: SolverBackend,
    pub service_hours: f64,
    pub avg_speed_kmh: f64,
    pub default_maintenance_minutes: u32,
    pub yard_job_buffer_minutes: u32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            fleet: FleetLimits::default(),
            service_start: hm(6, 0),
            service_end: hm(22, 30),
            night_start: hm(21, 0),
            night_end: hm(5, 30),
            default_weights: PlanWeights::default(),
            branding_window_days: 7,
            solver_time_budget_secs: 30,
            solver_backend: SolverBackend::Milp,
            service_hours: 16.5,
            avg_speed_kmh: 35.0,
            default_maintenance_minutes: 60,
            yard_job_buffer_minutes: 15,
        }
    }
}

pub(crate) fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

impl PlannerSettings {
    /// 从配置读取器加载快照
    pub async fn load<C: PlannerConfigReader + ?Sized>(reader: &C) -> Result<Self, ConfigError> {
        let fleet = reader.get_fleet_limits().await?;
        let (service_start, service_end) = reader.get_service_window().await?;
        let (night_start, night_end) = reader.get_night_window().await?;

        Ok(Self {
            fleet,
            service_start,
            service_end,
            night_start,
            night_end,
            default_weights: reader.get_default_weights().await?,
            branding_window_days: reader.get_branding_window_days().await?,
            solver_time_budget_secs: reader.get_solver_time_budget_secs().await?,
            solver_backend: reader.get_solver_backend().await?,
            service_hours: reader.get_service_hours().await?,
            avg_speed_kmh: reader.get_avg_speed_kmh().await?,
            default_maintenance_minutes: reader.get_default_maintenance_minutes().await?,
            yard_job_buffer_minutes: reader.get_yard_job_buffer_minutes().await?,
        })
    }

    /// 计划日运营窗口 [start, end)
    pub fn service_window(&self, plan_date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = plan_date.and_time(self.service_start);
        let mut end = plan_date.and_time(self.service_end);
        if end <= start {
            end += Duration::days(1);
        }
        (start, end)
    }

    /// 计划日夜间窗口 [start, end)，跨零点时结束于次日
    pub fn night_window(&self, plan_date: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        let start = plan_date.and_time(self.night_start);
        let mut end = plan_date.and_time(self.night_end);
        if end <= start {
            end += Duration::days(1);
        }
        (start, end)
    }

    /// 上线车辆预计日里程
    pub fn expected_km_if_active(&self) -> f64 {
        self.service_hours * self.avg_speed_kmh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_night_window_跨零点() {
        let s = PlannerSettings::default();
        let d = NaiveDate::from_ymd_opt(2030, 3, 1).unwrap();
        let (start, end) = s.night_window(d);
        assert_eq!(start, d.and_hms_opt(21, 0, 0).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2030, 3, 2).unwrap().and_hms_opt(5, 30, 0).unwrap());
    }

    #[test]
    fn test_expected_km_默认值() {
        let s = PlannerSettings::default();
        assert!((s.expected_km_if_active() - 577.5).abs() < 1e-9);
    }
}
