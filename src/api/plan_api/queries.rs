use super::*;
use crate::domain::features::VehicleFeatures;
use crate::domain::yard::YardConflict;

impl PlanApi {
    // ==========================================
    // 查询接口
    // ==========================================

    /// 单车决策解释
    pub fn explain_item(&self, plan_id: &str, vehicle_id: &str) -> ApiResult<ItemExplainView> {
        self.load_plan(plan_id)?;
        let item = self
            .item_repo
            .find(plan_id, vehicle_id)?
            .ok_or_else(|| ApiError::NotFound(format!("计划{}中不存在车辆{}", plan_id, vehicle_id)))?;

        Ok(ItemExplainView {
            plan_id: item.plan_id,
            vehicle_id: item.vehicle_id,
            decision: item.decision,
            bay_id: item.bay_id,
            turnout_rank: item.turnout_rank,
            manual_override: item.manual_override,
            explanation: item.explanation,
        })
    }

    /// 按计划日实时提取车辆特征（不写库）
    ///
    /// # 参数
    /// - vehicle_ids: None 表示全部车辆；不在册车辆返回失败特征（extraction_error 有值）
    pub fn get_vehicle_features(
        &self,
        plan_id: &str,
        vehicle_ids: Option<&[String]>,
    ) -> ApiResult<BTreeMap<String, VehicleFeatures>> {
        let plan = self.load_plan(plan_id)?;
        Ok(block_on(self.pipeline.extract_features(plan.plan_date, vehicle_ids, Self::now()))??)
    }

    /// 检查入段排程中的股道时间冲突（正常应为空）
    pub fn list_yard_conflicts(&self, plan_id: &str) -> ApiResult<Vec<YardConflict>> {
        self.load_plan(plan_id)?;
        Ok(self.occupancy_repo.find_conflicts(plan_id)?)
    }

    /// 查询计划告警
    pub fn list_alerts(&self, plan_id: &str) -> ApiResult<Vec<PlanAlert>> {
        self.load_plan(plan_id)?;
        Ok(self.alert_repo.list_by_plan(plan_id)?)
    }
}
