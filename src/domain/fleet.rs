// ==========================================
// 车辆夜间入段排产系统 - 车队基础数据（只读输入）
// ==========================================
// 职责: 车辆 / 技术证书 / 工单 / 广告 / 股道 / 清洁档期
// 红线: 外部记录源的只读快照，排产过程不回写
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// Vehicle - 车辆
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub vehicle_id: String,             // 车辆ID
    pub fleet_number: Option<String>,   // 车号
    pub status: String,                 // 资产状态 (active/retired)
    pub current_bay_id: Option<String>, // 当前停放股道
}

// ==========================================
// FitnessCertificate - 技术合格证
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessCertificate {
    pub cert_id: String,
    pub vehicle_id: String,
    pub department: String, // 签发部门 (rolling_stock/signalling/telecom)
    pub valid_from: NaiveDateTime,
    pub valid_to: NaiveDateTime,
    pub status: String, // valid/expiring/expired/suspended
}

impl FitnessCertificate {
    /// 参与适用性判断的证书状态
    pub fn is_considered(&self) -> bool {
        matches!(self.status.to_lowercase().as_str(), "valid" | "expiring")
    }
}

// ==========================================
// WorkOrder - 工单
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub work_order_id: String,
    pub vehicle_id: String,
    pub status: String, // WAPPR/APPR/INPRG/WSCH/WMATL/COMP/CLOSE...
    pub priority: i32,
    pub yard_induction_required: bool,
    pub description: Option<String>,
}

/// 视为未关闭的工单状态
pub const OPEN_WORK_ORDER_STATUSES: [&str; 5] = ["WAPPR", "APPR", "INPRG", "WSCH", "WMATL"];

/// 关键工单优先级下限
pub const CRITICAL_WORK_ORDER_PRIORITY: i32 = 3;

impl WorkOrder {
    pub fn is_open(&self) -> bool {
        let status = self.status.to_uppercase();
        OPEN_WORK_ORDER_STATUSES.contains(&status.as_str())
    }

    /// 关键工单: 需入段 且 优先级 ≥ 3
    pub fn is_critical(&self) -> bool {
        self.yard_induction_required && self.priority >= CRITICAL_WORK_ORDER_PRIORITY
    }
}

// ==========================================
// BrandingCampaign - 车身广告合同
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingCampaign {
    pub campaign_id: String,
    pub advertiser: String,
    pub weekly_target_hours: f64,
    pub rolling_window_days: Option<u32>, // 为空时取配置默认窗口
}

// ==========================================
// StablingBay - 停车股道
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StablingBay {
    pub bay_id: String,
    pub position_idx: i32,
    pub electrified: bool,
    pub length_m: Option<f64>,
    pub access_time_min: f64,
    pub is_active: bool,
}

impl StablingBay {
    /// 出库代价（秒）
    pub fn exit_cost_seconds(&self) -> i64 {
        (self.access_time_min.max(0.0) * 60.0).ceil() as i64
    }
}

// ==========================================
// CleaningSlot - 清洁档期
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningSlot {
    pub slot_id: String,
    pub bay_id: String,
    pub start_ts: NaiveDateTime,
    pub end_ts: NaiveDateTime,
    pub manpower: i32,
    pub clean_type: String,
}

// ==========================================
// ExposureRecord - 广告曝光记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureRecord {
    pub vehicle_id: String,
    pub exposure_date: NaiveDate,
    pub exposure_hours: f64,
}
