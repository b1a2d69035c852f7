// ==========================================
// 车辆夜间入段排产系统 - 股道池
// ==========================================
// 职责: Stage 2 / Stage 3 共用的可用股道集合
// 红线: 只收录 is_active 股道；空池视为错误
// ==========================================

use crate::domain::fleet::StablingBay;
use crate::engine::error::{EngineError, EngineResult};

// ==========================================
// BayPool - 可用股道池
// ==========================================
// 顺序: (position_idx, bay_id) 升序
#[derive(Debug, Clone)]
pub struct BayPool {
    bays: Vec<StablingBay>,
}

impl BayPool {
    /// 由股道清单构建
    ///
    /// # 返回
    /// - Err(NoActiveBays): 无任何可用股道
    pub fn new(bays: Vec<StablingBay>) -> EngineResult<Self> {
        let mut bays: Vec<StablingBay> = bays.into_iter().filter(|b| b.is_active).collect();
        if bays.is_empty() {
            return Err(EngineError::NoActiveBays("股道池为空".to_string()));
        }
        bays.sort_by(|a, b| {
            a.position_idx
                .cmp(&b.position_idx)
                .then_with(|| a.bay_id.cmp(&b.bay_id))
        });
        Ok(Self { bays })
    }

    pub fn bays(&self) -> &[StablingBay] {
        &self.bays
    }

    pub fn len(&self) -> usize {
        self.bays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bays.is_empty()
    }

    pub fn get(&self, bay_id: &str) -> Option<&StablingBay> {
        self.bays.iter().find(|b| b.bay_id == bay_id)
    }

    /// 第 n 个轮转位置的股道
    pub fn round_robin(&self, n: usize) -> &StablingBay {
        &self.bays[n % self.bays.len()]
    }

    /// 按出库代价排序 (exit_cost, position_idx, bay_id)
    pub fn by_exit_cost(&self) -> Vec<&StablingBay> {
        let mut ordered: Vec<&StablingBay> = self.bays.iter().collect();
        ordered.sort_by(|a, b| {
            a.exit_cost_seconds()
                .cmp(&b.exit_cost_seconds())
                .then(a.position_idx.cmp(&b.position_idx))
                .then_with(|| a.bay_id.cmp(&b.bay_id))
        });
        ordered
    }
}
