//! 途程（工序序列）模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bom::RevisionStatus;

/// 途程（產品的工序序列）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routing {
    /// 途程 ID
    pub id: Uuid,

    /// 所屬產品ID
    pub product_id: String,

    /// 版本字串
    pub version: String,

    /// 工序（按工序號排序）
    pub operations: Vec<Operation>,

    /// 版本狀態
    pub status: RevisionStatus,

    /// 生效起始日
    pub effective_from: NaiveDate,

    /// 生效截止日（None 表示無限期）
    pub effective_to: Option<NaiveDate>,

    /// 前一版本
    pub predecessor_id: Option<Uuid>,
}

impl Routing {
    /// 創建新的途程（草稿狀態）
    pub fn new(product_id: String, version: String, effective_from: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            version,
            operations: Vec::new(),
            status: RevisionStatus::Draft,
            effective_from,
            effective_to: None,
            predecessor_id: None,
        }
    }

    /// 建構器模式：設置生效截止日
    pub fn with_effective_to(mut self, date: NaiveDate) -> Self {
        self.effective_to = Some(date);
        self
    }

    /// 建構器模式：設置工序
    pub fn with_operations(mut self, operations: Vec<Operation>) -> Self {
        self.operations = operations;
        self.operations.sort_by_key(|op| op.operation_number);
        self
    }

    /// 檢查指定日期是否在生效區間內
    pub fn is_effective(&self, as_of: NaiveDate) -> bool {
        if as_of < self.effective_from {
            return false;
        }
        match self.effective_to {
            Some(to) => as_of <= to,
            None => true,
        }
    }

    /// 檢查是否可編輯（僅草稿）
    pub fn is_editable(&self) -> bool {
        self.status == RevisionStatus::Draft
    }

    /// 依工序號查找工序
    pub fn find_operation(&self, operation_number: u32) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.operation_number == operation_number)
    }

    /// 檢查兩個途程的生效區間是否重疊
    pub fn overlaps(&self, other: &Routing) -> bool {
        let self_to = self.effective_to.unwrap_or(NaiveDate::MAX);
        let other_to = other.effective_to.unwrap_or(NaiveDate::MAX);
        self.effective_from <= other_to && other.effective_from <= self_to
    }
}

/// 工序
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// 工序號（途程內唯一）
    pub operation_number: u32,

    /// 工作中心ID
    pub work_center_id: String,

    /// 準備時間（分鐘）
    pub setup_minutes: Decimal,

    /// 單件加工時間（分鐘）
    pub run_minutes_per_unit: Decimal,

    /// 與下一道工序的重疊率（百分比，0-100）
    pub overlap_pct: Decimal,

    /// 是否外包
    pub subcontract: bool,

    /// 外包單價
    pub subcontract_cost: Decimal,
}

impl Operation {
    /// 創建新的工序
    pub fn new(
        operation_number: u32,
        work_center_id: String,
        setup_minutes: Decimal,
        run_minutes_per_unit: Decimal,
    ) -> Self {
        Self {
            operation_number,
            work_center_id,
            setup_minutes,
            run_minutes_per_unit,
            overlap_pct: Decimal::ZERO,
            subcontract: false,
            subcontract_cost: Decimal::ZERO,
        }
    }

    /// 建構器模式：設置重疊率
    pub fn with_overlap_pct(mut self, overlap_pct: Decimal) -> Self {
        self.overlap_pct = overlap_pct;
        self
    }

    /// 建構器模式：設置外包
    pub fn as_subcontract(mut self, unit_cost: Decimal) -> Self {
        self.subcontract = true;
        self.subcontract_cost = unit_cost;
        self
    }

    /// 指定數量的工時（分鐘）= 準備 + 單件 × 數量
    pub fn total_minutes(&self, quantity: Decimal) -> Decimal {
        self.setup_minutes + self.run_minutes_per_unit * quantity
    }
}
