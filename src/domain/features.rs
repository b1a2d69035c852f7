// ==========================================
// 车辆夜间入段排产系统 - 车辆特征
// ==========================================
// 职责: 单车单日的派生特征（计算后不可变）
// 红线: 技术证书不合格或存在阻断工单的车辆不可上线运营
// ==========================================

use crate::domain::types::{CleaningType, SkillLevel};
use serde::Serialize;
use std::collections::BTreeMap;

// ==========================================
// VehicleFeatures - 车辆特征
// ==========================================
// fitness_buffer_hours 无证书时为 +∞（JSON 输出为 null）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleFeatures {
    pub vehicle_id: String,

    // ===== 技术证书 =====
    pub fitness_ok: bool,
    pub fitness_buffer_hours: f64,

    // ===== 工单 =====
    pub work_order_blocking: bool,
    pub critical_work_order_count: u32,
    pub total_work_order_count: u32,

    // ===== 广告 =====
    pub active_campaign_id: Option<String>,
    pub daily_branding_target_hours: f64,
    pub branding_rolling_deficit_hours: f64,

    // ===== 里程 =====
    pub cumulative_km: f64,
    pub expected_km_if_active: f64,
    pub mileage_deviation: f64,

    // ===== 清洁 =====
    pub needs_cleaning: bool,
    pub cleaning_type: CleaningType,
    pub cleaning_duration_minutes: u32,
    pub skill_requirement: SkillLevel,

    // ===== 股道 =====
    pub current_bay_id: Option<String>,
    pub yard_exit_cost_seconds: i64,

    // ===== 可解释性 =====
    pub extraction_error: Option<String>,
    pub notes: BTreeMap<String, String>,
}

impl VehicleFeatures {
    /// 可上线运营: 证书合格 且 无阻断工单
    pub fn is_eligible_for_service(&self) -> bool {
        self.fitness_ok && !self.work_order_blocking
    }

    /// 特征提取失败时的保守记录（不合格，携带错误文本）
    pub fn failed(vehicle_id: &str, error: String) -> Self {
        let mut notes = BTreeMap::new();
        notes.insert("extraction".to_string(), format!("特征提取失败: {}", error));
        Self {
            vehicle_id: vehicle_id.to_string(),
            fitness_ok: false,
            fitness_buffer_hours: 0.0,
            work_order_blocking: false,
            critical_work_order_count: 0,
            total_work_order_count: 0,
            active_campaign_id: None,
            daily_branding_target_hours: 0.0,
            branding_rolling_deficit_hours: 0.0,
            cumulative_km: 0.0,
            expected_km_if_active: 0.0,
            mileage_deviation: 0.0,
            needs_cleaning: false,
            cleaning_type: CleaningType::None,
            cleaning_duration_minutes: 0,
            skill_requirement: SkillLevel::Basic,
            current_bay_id: None,
            yard_exit_cost_seconds: 0,
            extraction_error: Some(error),
            notes,
        }
    }
}
