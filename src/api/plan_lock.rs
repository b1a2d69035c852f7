// ==========================================
// 车辆夜间入段排产系统 - 计划级互斥锁
// ==========================================
// 职责: 同一计划的运行提交、人工调整、定稿串行执行
// 红线: what-if 只读，不取锁
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// PlanLockRegistry - 按 plan_id 分配互斥锁
// ==========================================
#[derive(Debug, Default)]
pub struct PlanLockRegistry {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PlanLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, plan_id: &str) -> ApiResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| ApiError::InternalError(format!("计划锁表获取失败: {}", e)))?;
        Ok(locks
            .entry(plan_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// 持有计划锁执行闭包
    pub fn with_plan_lock<T>(&self, plan_id: &str, f: impl FnOnce() -> ApiResult<T>) -> ApiResult<T> {
        let lock = self.lock_for(plan_id)?;
        let _guard = lock
            .lock()
            .map_err(|e| ApiError::InternalError(format!("计划{}锁获取失败: {}", plan_id, e)))?;
        f()
    }
}
