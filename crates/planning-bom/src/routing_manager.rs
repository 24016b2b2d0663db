//! 途程管理器
//!
//! 與 BOM 管理器對稱的版本控管，另提供交期與外包成本計算。
//! 人工/機器/製造費用需要工作中心費率資料，屬於獨立的成本計算
//! 契約，本管理器不產出看似權威的零值成本。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use planning_core::{Operation, PlanningError, Result, RevisionStatus, Routing};

/// 途程管理器
#[derive(Debug, Default)]
pub struct RoutingManager {
    /// id 索引的途程倉儲
    routings: HashMap<Uuid, Routing>,

    /// 產品 → 途程 id 索引
    product_index: HashMap<String, Vec<Uuid>>,
}

impl RoutingManager {
    /// 創建空的管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 創建新的途程（草稿），同產品版本字串不可重複
    pub fn create(
        &mut self,
        product_id: &str,
        version: &str,
        effective_from: NaiveDate,
    ) -> Result<Uuid> {
        self.insert(Routing::new(
            product_id.to_string(),
            version.to_string(),
            effective_from,
        ))
    }

    /// 放入既有途程（含工序），同產品版本字串不可重複
    pub fn insert(&mut self, routing: Routing) -> Result<Uuid> {
        if self.version_exists(&routing.product_id, &routing.version) {
            return Err(PlanningError::InvalidVersion(format!(
                "產品 {} 已存在途程版本 {}",
                routing.product_id, routing.version
            )));
        }
        let id = routing.id;
        self.product_index
            .entry(routing.product_id.clone())
            .or_default()
            .push(id);
        self.routings.insert(id, routing);
        Ok(id)
    }

    /// 依 ID 取得途程
    pub fn get(&self, routing_id: Uuid) -> Result<&Routing> {
        self.routings
            .get(&routing_id)
            .ok_or(PlanningError::RoutingNotFound(routing_id))
    }

    fn get_mut(&mut self, routing_id: Uuid) -> Result<&mut Routing> {
        self.routings
            .get_mut(&routing_id)
            .ok_or(PlanningError::RoutingNotFound(routing_id))
    }

    /// 產品的所有版本
    pub fn find_all_versions(&self, product_id: &str) -> Vec<&Routing> {
        self.product_index
            .get(product_id)
            .map(|ids| ids.iter().filter_map(|id| self.routings.get(id)).collect())
            .unwrap_or_default()
    }

    fn version_exists(&self, product_id: &str, version: &str) -> bool {
        self.find_all_versions(product_id)
            .iter()
            .any(|r| r.version == version)
    }

    /// 指定日期生效的途程（僅已發布版本）
    pub fn get_effective(&self, product_id: &str, as_of: NaiveDate) -> Option<&Routing> {
        self.find_all_versions(product_id)
            .into_iter()
            .find(|r| r.status == RevisionStatus::Released && r.is_effective(as_of))
    }

    /// 指定日期生效的途程，找不到時回報錯誤
    pub fn require_effective(&self, product_id: &str, as_of: NaiveDate) -> Result<&Routing> {
        self.get_effective(product_id, as_of)
            .ok_or_else(|| PlanningError::NoEffectiveRouting(product_id.to_string()))
    }

    /// 以新版本複製（帶前版連結），版本字串不可重複
    pub fn new_version(&mut self, routing_id: Uuid, new_version: &str) -> Result<Uuid> {
        let source = self.get(routing_id)?;
        if self.version_exists(&source.product_id, new_version) {
            return Err(PlanningError::InvalidVersion(format!(
                "產品 {} 已存在途程版本 {}",
                source.product_id, new_version
            )));
        }

        let mut cloned = source.clone();
        cloned.id = Uuid::new_v4();
        cloned.version = new_version.to_string();
        cloned.status = RevisionStatus::Draft;
        cloned.predecessor_id = Some(routing_id);

        let id = cloned.id;
        self.product_index
            .entry(cloned.product_id.clone())
            .or_default()
            .push(id);
        self.routings.insert(id, cloned);
        Ok(id)
    }

    /// 調整草稿的生效區間
    pub fn set_effectivity(
        &mut self,
        routing_id: Uuid,
        effective_from: NaiveDate,
        effective_to: Option<NaiveDate>,
    ) -> Result<()> {
        let routing = self.get_mut(routing_id)?;
        if !routing.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "途程版本 {} 非草稿狀態，不可修改",
                routing.version
            )));
        }
        routing.effective_from = effective_from;
        routing.effective_to = effective_to;
        Ok(())
    }

    /// 發布途程：拒絕沒有工序的途程，生效區間不可與已發布版本重疊
    pub fn release(&mut self, routing_id: Uuid) -> Result<()> {
        let routing = self.get(routing_id)?;
        if routing.status != RevisionStatus::Draft {
            return Err(PlanningError::InvalidVersion(format!(
                "途程版本 {} 非草稿狀態，不可發布",
                routing.version
            )));
        }
        if routing.operations.is_empty() {
            return Err(PlanningError::InvalidVersion(format!(
                "途程版本 {} 沒有任何工序，不可發布",
                routing.version
            )));
        }

        let conflict = self
            .find_all_versions(&routing.product_id)
            .into_iter()
            .find(|other| {
                other.id != routing_id
                    && other.status == RevisionStatus::Released
                    && other.overlaps(routing)
            })
            .map(|other| other.version.clone());

        if let Some(version) = conflict {
            return Err(PlanningError::InvalidVersion(format!(
                "生效區間與已發布途程版本 {} 重疊，請先作廢或調整區間",
                version
            )));
        }

        self.get_mut(routing_id)?.status = RevisionStatus::Released;
        tracing::info!("途程 {} 已發布", routing_id);
        Ok(())
    }

    /// 作廢已發布的途程
    pub fn make_obsolete(&mut self, routing_id: Uuid) -> Result<()> {
        let routing = self.get_mut(routing_id)?;
        if routing.status != RevisionStatus::Released {
            return Err(PlanningError::InvalidVersion(format!(
                "途程版本 {} 非已發布狀態，不可作廢",
                routing.version
            )));
        }
        routing.status = RevisionStatus::Obsolete;
        Ok(())
    }

    /// 添加工序（僅草稿；工序號唯一）
    pub fn add_operation(&mut self, routing_id: Uuid, operation: Operation) -> Result<()> {
        let routing = self.get(routing_id)?;
        if !routing.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "途程版本 {} 非草稿狀態，不可修改",
                routing.version
            )));
        }
        if routing.find_operation(operation.operation_number).is_some() {
            return Err(PlanningError::InvalidVersion(format!(
                "工序號 {} 已存在",
                operation.operation_number
            )));
        }

        let routing = self.get_mut(routing_id)?;
        routing.operations.push(operation);
        routing.operations.sort_by_key(|op| op.operation_number);
        Ok(())
    }

    /// 更新工序（僅草稿）
    pub fn update_operation(&mut self, routing_id: Uuid, operation: Operation) -> Result<()> {
        let routing = self.get(routing_id)?;
        if !routing.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "途程版本 {} 非草稿狀態，不可修改",
                routing.version
            )));
        }
        if routing.find_operation(operation.operation_number).is_none() {
            return Err(PlanningError::InvalidVersion(format!(
                "工序號 {} 不存在",
                operation.operation_number
            )));
        }

        let routing = self.get_mut(routing_id)?;
        if let Some(existing) = routing
            .operations
            .iter_mut()
            .find(|op| op.operation_number == operation.operation_number)
        {
            *existing = operation;
        }
        Ok(())
    }

    /// 移除工序（僅草稿）
    pub fn remove_operation(&mut self, routing_id: Uuid, operation_number: u32) -> Result<()> {
        let routing = self.get(routing_id)?;
        if !routing.is_editable() {
            return Err(PlanningError::InvalidVersion(format!(
                "途程版本 {} 非草稿狀態，不可修改",
                routing.version
            )));
        }
        if routing.find_operation(operation_number).is_none() {
            return Err(PlanningError::InvalidVersion(format!(
                "工序號 {} 不存在",
                operation_number
            )));
        }

        let routing = self.get_mut(routing_id)?;
        routing
            .operations
            .retain(|op| op.operation_number != operation_number);
        Ok(())
    }

    /// 計算指定數量的生產交期（小時）
    ///
    /// 按工序號順序累加 (準備 + 單件 × 數量)，每一步依前一道工序的
    /// 重疊率折減（重疊允許本道在前道未完全結束前開工），分鐘換算小時。
    pub fn lead_time_hours(&self, routing_id: Uuid, quantity: Decimal) -> Result<Decimal> {
        let routing = self.get(routing_id)?;

        let mut total_minutes = Decimal::ZERO;
        let mut previous_overlap = Decimal::ZERO;

        for op in &routing.operations {
            let step = op.total_minutes(quantity);
            total_minutes += step * (Decimal::ONE - previous_overlap / Decimal::ONE_HUNDRED);
            previous_overlap = op.overlap_pct;
        }

        Ok(total_minutes / Decimal::from(60))
    }

    /// 彙總工序層級的外包成本
    ///
    /// 僅外包成本；人工/機器/製造費用需工作中心費率，不在本契約內。
    pub fn subcontract_cost(&self, routing_id: Uuid, quantity: Decimal) -> Result<Decimal> {
        let routing = self.get(routing_id)?;

        Ok(routing
            .operations
            .iter()
            .filter(|op| op.subcontract)
            .map(|op| op.subcontract_cost * quantity)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn op(no: u32, wc: &str, setup: i64, run: i64) -> Operation {
        Operation::new(no, wc.to_string(), Decimal::from(setup), Decimal::from(run))
    }

    fn released_routing(mgr: &mut RoutingManager, product: &str, ops: Vec<Operation>) -> Uuid {
        let id = mgr.create(product, "A", date(2026, 1, 1)).unwrap();
        for o in ops {
            mgr.add_operation(id, o).unwrap();
        }
        mgr.release(id).unwrap();
        id
    }

    #[test]
    fn test_versioning_mirrors_bom_manager() {
        let mut mgr = RoutingManager::new();
        let id = released_routing(&mut mgr, "BIKE-001", vec![op(10, "WC-WELD", 30, 5)]);

        // 已發布不可修改
        assert!(mgr.add_operation(id, op(20, "WC-PAINT", 15, 3)).is_err());

        let v2 = mgr.new_version(id, "B").unwrap();
        assert_eq!(mgr.get(v2).unwrap().predecessor_id, Some(id));
        assert!(matches!(
            mgr.new_version(id, "B"),
            Err(PlanningError::InvalidVersion(_))
        ));

        // 區間重疊時發布被拒
        assert!(mgr.release(v2).is_err());
        mgr.make_obsolete(id).unwrap();
        mgr.release(v2).unwrap();
    }

    #[test]
    fn test_release_requires_operations() {
        let mut mgr = RoutingManager::new();
        let id = mgr.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();

        assert!(matches!(
            mgr.release(id),
            Err(PlanningError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_duplicate_operation_number_rejected() {
        let mut mgr = RoutingManager::new();
        let id = mgr.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
        mgr.add_operation(id, op(10, "WC-WELD", 30, 5)).unwrap();

        assert!(matches!(
            mgr.add_operation(id, op(10, "WC-PAINT", 15, 3)),
            Err(PlanningError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_lead_time_without_overlap() {
        let mut mgr = RoutingManager::new();
        let id = released_routing(
            &mut mgr,
            "BIKE-001",
            vec![op(10, "WC-WELD", 30, 5), op(20, "WC-PAINT", 15, 3)],
        );

        // (30 + 5×10) + (15 + 3×10) = 80 + 45 = 125 分鐘
        let hours = mgr.lead_time_hours(id, Decimal::from(10)).unwrap();
        assert_eq!(hours * Decimal::from(60), Decimal::from(125));
    }

    #[test]
    fn test_lead_time_with_overlap() {
        let mut mgr = RoutingManager::new();
        let id = released_routing(
            &mut mgr,
            "BIKE-001",
            vec![
                // 第一道重疊率 40%：下一道只計 60%
                Operation::new(10, "WC-WELD".to_string(), Decimal::from(30), Decimal::from(5))
                    .with_overlap_pct(Decimal::from(40)),
                op(20, "WC-PAINT", 15, 3),
            ],
        );

        // 80 + 45×0.6 = 107 分鐘
        let hours = mgr.lead_time_hours(id, Decimal::from(10)).unwrap();
        assert_eq!(hours * Decimal::from(60), Decimal::from(107));
    }

    #[test]
    fn test_subcontract_cost_only_aggregates_subcontract_ops() {
        let mut mgr = RoutingManager::new();
        let id = released_routing(
            &mut mgr,
            "BIKE-001",
            vec![
                op(10, "WC-WELD", 30, 5),
                Operation::new(20, "WC-EXT".to_string(), Decimal::ZERO, Decimal::ZERO)
                    .as_subcontract(Decimal::from(12)),
            ],
        );

        // 只有外包工序計入：12 × 10 = 120
        assert_eq!(
            mgr.subcontract_cost(id, Decimal::from(10)).unwrap(),
            Decimal::from(120)
        );
    }

    #[test]
    fn test_get_effective() {
        let mut mgr = RoutingManager::new();
        released_routing(&mut mgr, "BIKE-001", vec![op(10, "WC-WELD", 30, 5)]);

        assert!(mgr.get_effective("BIKE-001", date(2026, 6, 1)).is_some());
        assert!(mgr.get_effective("BIKE-001", date(2025, 6, 1)).is_none());
        assert!(matches!(
            mgr.require_effective("UNKNOWN", date(2026, 6, 1)),
            Err(PlanningError::NoEffectiveRouting(_))
        ));
    }
}
