//! 需求來源模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 需求來源類型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandSourceType {
    /// 銷售訂單
    SalesOrder,
    /// 銷售預測
    Forecast,
    /// 工單（父件相依需求）
    WorkOrder,
    /// 安全庫存補充
    SafetyStock,
    /// 追溯推導（由父件需求衍生，附原始類型標記）
    Derived(String),
}

impl DemandSourceType {
    /// 類型標記（追溯推導時拼入 derived_from_ 前綴）
    pub fn tag(&self) -> String {
        match self {
            DemandSourceType::SalesOrder => "sales_order".to_string(),
            DemandSourceType::Forecast => "forecast".to_string(),
            DemandSourceType::WorkOrder => "work_order".to_string(),
            DemandSourceType::SafetyStock => "safety_stock".to_string(),
            DemandSourceType::Derived(tag) => tag.clone(),
        }
    }

    /// 衍生類型（derived_from_<原類型>）
    pub fn derived(&self) -> DemandSourceType {
        DemandSourceType::Derived(format!("derived_from_{}", self.tag()))
    }
}

/// 需求來源（某產品在某日的一筆需求）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandSource {
    /// 物料ID
    pub product_id: String,

    /// 需求類型
    pub source_type: DemandSourceType,

    /// 來源單據（如銷售訂單號）
    pub reference: Option<String>,

    /// 數量
    pub quantity: Decimal,

    /// 需求日期
    pub date: NaiveDate,

    /// 來源系統附加資料
    pub payload: Option<serde_json::Value>,
}

impl DemandSource {
    /// 創建新的需求來源
    pub fn new(
        product_id: String,
        quantity: Decimal,
        date: NaiveDate,
        source_type: DemandSourceType,
    ) -> Self {
        Self {
            product_id,
            source_type,
            reference: None,
            quantity,
            date,
            payload: None,
        }
    }

    /// 建構器模式：設置來源單據
    pub fn with_reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }

    /// 建構器模式：設置附加資料
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// 轉為衍生需求（保留數量/日期，重新標記類型）
    pub fn as_derived(&self, product_id: String) -> Self {
        Self {
            product_id,
            source_type: self.source_type.derived(),
            reference: self.reference.clone(),
            quantity: self.quantity,
            date: self.date,
            payload: self.payload.clone(),
        }
    }
}
