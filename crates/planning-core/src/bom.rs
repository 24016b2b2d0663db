//! BOM 物料清單模型

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 版本狀態（BOM 與途程共用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevisionStatus {
    /// 草稿（可編輯）
    Draft,
    /// 已發布（唯讀，僅可作廢）
    Released,
    /// 已作廢
    Obsolete,
}

/// 物料清單（BOM）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bom {
    /// BOM ID
    pub id: Uuid,

    /// 所屬產品ID
    pub product_id: String,

    /// 版本字串
    pub version: String,

    /// BOM 行（按行號排序）
    pub lines: Vec<BomLine>,

    /// 版本狀態
    pub status: RevisionStatus,

    /// 生效起始日
    pub effective_from: NaiveDate,

    /// 生效截止日（None 表示無限期）
    pub effective_to: Option<NaiveDate>,

    /// 前一版本
    pub predecessor_id: Option<Uuid>,
}

impl Bom {
    /// 創建新的 BOM（草稿狀態）
    pub fn new(product_id: String, version: String, effective_from: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            version,
            lines: Vec::new(),
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

    /// 建構器模式：設置 BOM 行
    pub fn with_lines(mut self, lines: Vec<BomLine>) -> Self {
        self.lines = lines;
        self.lines.sort_by_key(|l| l.line_number);
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

    /// 依行號查找 BOM 行
    pub fn find_line(&self, line_number: u32) -> Option<&BomLine> {
        self.lines.iter().find(|l| l.line_number == line_number)
    }

    /// 指定日期生效的 BOM 行
    pub fn effective_lines(&self, as_of: NaiveDate) -> Vec<&BomLine> {
        self.lines
            .iter()
            .filter(|l| l.is_effective(as_of))
            .collect()
    }

    /// 檢查兩個 BOM 的生效區間是否重疊
    pub fn overlaps(&self, other: &Bom) -> bool {
        let self_to = self.effective_to.unwrap_or(NaiveDate::MAX);
        let other_to = other.effective_to.unwrap_or(NaiveDate::MAX);
        self.effective_from <= other_to && other.effective_from <= self_to
    }
}

/// BOM 行（單一組件用量）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BomLine {
    /// 行號（BOM 內唯一）
    pub line_number: u32,

    /// 組件物料ID
    pub component_id: String,

    /// 單位用量（每一個父件所需數量）
    pub quantity: Decimal,

    /// 損耗率（百分比，0-100）
    pub scrap_pct: Decimal,

    /// 計量單位
    pub uom: String,

    /// 對應途程工序號（組件在哪道工序投料）
    pub operation_number: Option<u32>,

    /// 行級生效起始日
    pub effective_from: Option<NaiveDate>,

    /// 行級生效截止日
    pub effective_to: Option<NaiveDate>,
}

impl BomLine {
    /// 創建新的 BOM 行
    pub fn new(line_number: u32, component_id: String, quantity: Decimal, uom: String) -> Self {
        Self {
            line_number,
            component_id,
            quantity,
            scrap_pct: Decimal::ZERO,
            uom,
            operation_number: None,
            effective_from: None,
            effective_to: None,
        }
    }

    /// 建構器模式：設置損耗率
    pub fn with_scrap_pct(mut self, scrap_pct: Decimal) -> Self {
        self.scrap_pct = scrap_pct;
        self
    }

    /// 建構器模式：設置投料工序
    pub fn with_operation_number(mut self, operation_number: u32) -> Self {
        self.operation_number = Some(operation_number);
        self
    }

    /// 建構器模式：設置行級生效區間
    pub fn with_effectivity(mut self, from: NaiveDate, to: Option<NaiveDate>) -> Self {
        self.effective_from = Some(from);
        self.effective_to = to;
        self
    }

    /// 含損耗用量 = 用量 / (1 - 損耗率%)
    pub fn quantity_with_scrap(&self) -> Decimal {
        if self.scrap_pct >= Decimal::ONE_HUNDRED || self.scrap_pct < Decimal::ZERO {
            // 無效損耗率，回退為原始用量（validate 會另行回報）
            return self.quantity;
        }
        self.quantity / (Decimal::ONE - self.scrap_pct / Decimal::ONE_HUNDRED)
    }

    /// 檢查指定日期是否在行級生效區間內
    pub fn is_effective(&self, as_of: NaiveDate) -> bool {
        if let Some(from) = self.effective_from {
            if as_of < from {
                return false;
            }
        }
        if let Some(to) = self.effective_to {
            if as_of > to {
                return false;
            }
        }
        true
    }
}
