// ==========================================
// 车辆夜间入段排产系统 - 股道占用与出库顺序
// ==========================================
// 红线: 同一股道内占用区间 [from, to) 不得重叠
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// YardOccupancy - 夜间股道占用（入段作业）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YardOccupancy {
    pub occupancy_id: String,
    pub plan_id: String,
    pub bay_id: String,
    pub vehicle_id: String,
    pub from_ts: NaiveDateTime,
    pub to_ts: NaiveDateTime, // 不含
    pub job_type: String,     // 清洁类型或 maintenance
}

impl YardOccupancy {
    /// 半开区间重叠判断
    pub fn overlaps(&self, other: &YardOccupancy) -> bool {
        self.bay_id == other.bay_id && self.from_ts < other.to_ts && other.from_ts < self.to_ts
    }
}

// ==========================================
// TurnoutSlot - 早间出库顺序
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoutSlot {
    pub vehicle_id: String,
    pub bay_id: Option<String>, // 股道不足时为空
    pub turnout_rank: u32,      // 1..N 连续
    pub exit_cost_seconds: i64,
}

// ==========================================
// YardConflict - 股道冲突报告
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YardConflict {
    pub bay_id: String,
    pub first: YardOccupancy,
    pub second: YardOccupancy,
}
