//! 物料需求與計劃訂單模型

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 計劃訂單類型（由是否存在生效 BOM 決定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// 生產
    Manufacturing,
    /// 採購
    Purchase,
}

/// 批量規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotSizingStrategy {
    /// 批對批（Lot for Lot）- 按實際淨需求訂購
    LotForLot,

    /// 固定訂購量（Fixed Order Quantity）
    FixedOrderQuantity,

    /// 經濟訂購量（Economic Order Quantity）
    EconomicOrderQuantity,

    /// 週期訂購量（Period Order Quantity）- 合併週期內需求
    PeriodOrderQuantity,

    /// 最小單位成本（Least Unit Cost）
    LeastUnitCost,
}

/// MRP 計算參數
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrpParameters {
    /// 固定批量（FOQ 使用）
    pub fixed_quantity: Decimal,

    /// 年需求量（EOQ / LUC 使用）
    pub annual_demand: Decimal,

    /// 單次訂購成本
    pub ordering_cost: Decimal,

    /// 單位持有成本（絕對值，EOQ 使用）
    pub holding_cost: Decimal,

    /// 持有成本率（比率，LUC 使用）
    pub holding_cost_rate: Decimal,

    /// 單位成本（LUC 使用）
    pub unit_cost: Decimal,

    /// 合併週期數（POQ 使用）
    pub period_count: u32,

    /// 提前期回報為 0 時的預設值（天）
    pub default_lead_time_days: u32,
}

impl MrpParameters {
    /// 創建預設參數
    pub fn new() -> Self {
        Self {
            fixed_quantity: Decimal::ZERO,
            annual_demand: Decimal::ZERO,
            ordering_cost: Decimal::ZERO,
            holding_cost: Decimal::ZERO,
            holding_cost_rate: Decimal::ZERO,
            unit_cost: Decimal::ZERO,
            period_count: 1,
            default_lead_time_days: 1,
        }
    }

    /// 建構器模式：設置固定批量
    pub fn with_fixed_quantity(mut self, quantity: Decimal) -> Self {
        self.fixed_quantity = quantity;
        self
    }

    /// 建構器模式：設置 EOQ 成本參數
    pub fn with_eoq_costs(
        mut self,
        annual_demand: Decimal,
        ordering_cost: Decimal,
        holding_cost: Decimal,
    ) -> Self {
        self.annual_demand = annual_demand;
        self.ordering_cost = ordering_cost;
        self.holding_cost = holding_cost;
        self
    }

    /// 建構器模式：設置 LUC 成本參數
    pub fn with_luc_costs(mut self, holding_cost_rate: Decimal, unit_cost: Decimal) -> Self {
        self.holding_cost_rate = holding_cost_rate;
        self.unit_cost = unit_cost;
        self
    }

    /// 建構器模式：設置合併週期數
    pub fn with_period_count(mut self, periods: u32) -> Self {
        self.period_count = periods;
        self
    }
}

impl Default for MrpParameters {
    fn default() -> Self {
        Self::new()
    }
}

/// 物料需求快照（不可變，一筆對應一個 (產品, 需求日, 層級)）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialRequirement {
    /// 物料ID
    pub product_id: String,

    /// 毛需求
    pub gross_requirement: Decimal,

    /// 淨需求
    pub net_requirement: Decimal,

    /// 需求日期
    pub required_date: NaiveDate,

    /// 下單日期（需求日 − 提前期，裁切到時界起始）
    pub order_date: NaiveDate,

    /// 計算當下現有庫存
    pub on_hand: Decimal,

    /// 需求日前已入帳的預計收貨（累計）
    pub scheduled_receipts: Decimal,

    /// 安全庫存
    pub safety_stock: Decimal,

    /// BOM 層級（0 = 頂層）
    pub bom_level: u32,

    /// 父件物料ID（層級 0 無）
    pub parent_product_id: Option<String>,
}

/// 計劃訂單（MRP 計算結果）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedOrder {
    /// 計劃訂單ID
    pub id: Uuid,

    /// 物料ID
    pub product_id: String,

    /// 批量調整後數量
    pub quantity: Decimal,

    /// 開始日期（下單/開工）
    pub start_date: NaiveDate,

    /// 完成日期（需求日）
    pub due_date: NaiveDate,

    /// 訂單類型
    pub order_type: OrderType,

    /// BOM 層級
    pub bom_level: u32,

    /// 使用的批量規則
    pub strategy: LotSizingStrategy,

    /// 批量調整前的原始淨需求
    pub original_requirement: Decimal,
}

impl PlannedOrder {
    /// 創建新的計劃訂單
    pub fn new(
        product_id: String,
        quantity: Decimal,
        start_date: NaiveDate,
        due_date: NaiveDate,
        order_type: OrderType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            quantity,
            start_date,
            due_date,
            order_type,
            bom_level: 0,
            strategy: LotSizingStrategy::LotForLot,
            original_requirement: quantity,
        }
    }

    /// 建構器模式：設置 BOM 層級
    pub fn with_bom_level(mut self, level: u32) -> Self {
        self.bom_level = level;
        self
    }

    /// 建構器模式：設置批量規則與原始需求
    pub fn with_strategy(mut self, strategy: LotSizingStrategy, original: Decimal) -> Self {
        self.strategy = strategy;
        self.original_requirement = original;
        self
    }

    /// 批量調整多出的數量（可供後續期間沖抵）
    pub fn lot_sizing_excess(&self) -> Decimal {
        self.quantity - self.original_requirement
    }

    /// 檢查是否為生產訂單
    pub fn is_manufacturing(&self) -> bool {
        self.order_type == OrderType::Manufacturing
    }
}

/// MRP 計算結果（純計算產物，不由本核心持久化）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MrpResult {
    /// 頂層物料ID
    pub product_id: String,

    /// 計劃訂單
    pub planned_orders: Vec<PlannedOrder>,

    /// 物料需求快照
    pub requirements: Vec<MaterialRequirement>,

    /// 警告信息
    pub warnings: Vec<String>,

    /// 錯誤信息（計算中捕獲的異常，不中斷部分結果）
    pub errors: Vec<String>,

    /// 計算時間戳
    pub calculated_at: NaiveDateTime,

    /// 本次計算使用的參數
    pub parameters: MrpParameters,
}

impl MrpResult {
    /// 創建空的計算結果
    pub fn empty(product_id: String, parameters: MrpParameters) -> Self {
        Self {
            product_id,
            planned_orders: Vec::new(),
            requirements: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            calculated_at: chrono::Utc::now().naive_utc(),
            parameters,
        }
    }

    /// 添加警告
    pub fn add_warning(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// 添加錯誤
    pub fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }

    /// 檢查計算是否完整（無錯誤）
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
