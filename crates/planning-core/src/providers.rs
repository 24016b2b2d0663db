//! 外部資料提供者契約
//!
//! 庫存與需求快照由周邊系統提供，本核心只透過這兩個窄介面讀取。
//! `Mem*` 實現供測試與示範使用，也可作為接入真實資料源的參考。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::demand::DemandSource;
use crate::horizon::PlanningHorizon;

/// 庫存資料提供者
pub trait InventoryProvider {
    /// 現有庫存
    fn on_hand_quantity(&self, product_id: &str) -> Decimal;

    /// 安全庫存
    fn safety_stock(&self, product_id: &str) -> Decimal;

    /// 截止日期前（含）的預計收貨總量
    fn scheduled_receipts(&self, product_id: &str, through_date: NaiveDate) -> Decimal;

    /// 提前期（天）
    fn lead_time_days(&self, product_id: &str) -> u32;
}

/// 需求資料提供者
pub trait DemandProvider {
    /// 時界內的獨立需求（銷售/預測）
    fn independent_demand(&self, product_id: &str, horizon: &PlanningHorizon) -> Vec<DemandSource>;

    /// 時界內的相依需求（父件工單）
    fn dependent_demand(&self, product_id: &str, horizon: &PlanningHorizon) -> Vec<DemandSource>;

    /// 指定日期的需求來源明細（供追溯）
    fn demand_sources(&self, product_id: &str, date: NaiveDate) -> Vec<DemandSource>;

    /// 時界內的主排程物料（批次 MRP 的進入點）
    fn master_scheduled_products(&self, horizon: &PlanningHorizon) -> Vec<String>;
}

/// 計劃訂單倉儲（持久化由協作者承擔，本核心只發出刪舊存新）
pub trait PlannedOrderStore {
    /// 儲存物料的計劃訂單
    fn save_planned_orders(&mut self, product_id: &str, orders: &[crate::PlannedOrder]);

    /// 刪除物料既有的計劃訂單
    fn delete_planned_orders(&mut self, product_id: &str);
}

/// 記憶體庫存提供者
#[derive(Debug, Default)]
pub struct MemInventoryProvider {
    on_hand: HashMap<String, Decimal>,
    safety_stock: HashMap<String, Decimal>,
    /// (物料, 到貨日) → 數量
    receipts: HashMap<String, Vec<(NaiveDate, Decimal)>>,
    lead_times: HashMap<String, u32>,
}

impl MemInventoryProvider {
    /// 創建空的提供者
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置現有庫存
    pub fn with_on_hand(mut self, product_id: &str, qty: Decimal) -> Self {
        self.on_hand.insert(product_id.to_string(), qty);
        self
    }

    /// 建構器模式：設置安全庫存
    pub fn with_safety_stock(mut self, product_id: &str, qty: Decimal) -> Self {
        self.safety_stock.insert(product_id.to_string(), qty);
        self
    }

    /// 建構器模式：設置提前期
    pub fn with_lead_time(mut self, product_id: &str, days: u32) -> Self {
        self.lead_times.insert(product_id.to_string(), days);
        self
    }

    /// 添加一筆預計收貨
    pub fn add_receipt(&mut self, product_id: &str, date: NaiveDate, qty: Decimal) {
        self.receipts
            .entry(product_id.to_string())
            .or_default()
            .push((date, qty));
    }
}

impl InventoryProvider for MemInventoryProvider {
    fn on_hand_quantity(&self, product_id: &str) -> Decimal {
        self.on_hand.get(product_id).copied().unwrap_or(Decimal::ZERO)
    }

    fn safety_stock(&self, product_id: &str) -> Decimal {
        self.safety_stock
            .get(product_id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn scheduled_receipts(&self, product_id: &str, through_date: NaiveDate) -> Decimal {
        self.receipts
            .get(product_id)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(date, _)| *date <= through_date)
                    .map(|(_, qty)| *qty)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO)
    }

    fn lead_time_days(&self, product_id: &str) -> u32 {
        self.lead_times.get(product_id).copied().unwrap_or(0)
    }
}

/// 記憶體需求提供者
#[derive(Debug, Default)]
pub struct MemDemandProvider {
    sources: Vec<DemandSource>,
}

impl MemDemandProvider {
    /// 創建空的提供者
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：加入需求來源
    pub fn with_source(mut self, source: DemandSource) -> Self {
        self.sources.push(source);
        self
    }

    /// 添加需求來源
    pub fn add_source(&mut self, source: DemandSource) {
        self.sources.push(source);
    }
}

impl DemandProvider for MemDemandProvider {
    fn independent_demand(&self, product_id: &str, horizon: &PlanningHorizon) -> Vec<DemandSource> {
        use crate::demand::DemandSourceType;
        self.sources
            .iter()
            .filter(|s| {
                s.product_id == product_id
                    && horizon.contains(s.date)
                    && matches!(
                        s.source_type,
                        DemandSourceType::SalesOrder | DemandSourceType::Forecast
                    )
            })
            .cloned()
            .collect()
    }

    fn dependent_demand(&self, product_id: &str, horizon: &PlanningHorizon) -> Vec<DemandSource> {
        use crate::demand::DemandSourceType;
        self.sources
            .iter()
            .filter(|s| {
                s.product_id == product_id
                    && horizon.contains(s.date)
                    && matches!(s.source_type, DemandSourceType::WorkOrder)
            })
            .cloned()
            .collect()
    }

    fn demand_sources(&self, product_id: &str, date: NaiveDate) -> Vec<DemandSource> {
        self.sources
            .iter()
            .filter(|s| s.product_id == product_id && s.date == date)
            .cloned()
            .collect()
    }

    fn master_scheduled_products(&self, horizon: &PlanningHorizon) -> Vec<String> {
        use crate::demand::DemandSourceType;
        let mut products: Vec<String> = self
            .sources
            .iter()
            .filter(|s| {
                horizon.contains(s.date)
                    && matches!(
                        s.source_type,
                        DemandSourceType::SalesOrder | DemandSourceType::Forecast
                    )
            })
            .map(|s| s.product_id.clone())
            .collect();
        products.sort();
        products.dedup();
        products
    }
}

/// 記憶體計劃訂單倉儲
#[derive(Debug, Default)]
pub struct MemPlannedOrderStore {
    orders: HashMap<String, Vec<crate::PlannedOrder>>,
}

impl MemPlannedOrderStore {
    /// 創建空的倉儲
    pub fn new() -> Self {
        Self::default()
    }

    /// 物料目前的計劃訂單
    pub fn orders_for(&self, product_id: &str) -> &[crate::PlannedOrder] {
        self.orders.get(product_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl PlannedOrderStore for MemPlannedOrderStore {
    fn save_planned_orders(&mut self, product_id: &str, orders: &[crate::PlannedOrder]) {
        self.orders
            .entry(product_id.to_string())
            .or_default()
            .extend_from_slice(orders);
    }

    fn delete_planned_orders(&mut self, product_id: &str) {
        self.orders.remove(product_id);
    }
}
