//! 工單模型與狀態機

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PlanningError, Result};

/// 工單狀態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderStatus {
    /// 已計劃
    Planned,
    /// 已下達
    Released,
    /// 生產中
    InProgress,
    /// 已完工
    Completed,
    /// 已結案
    Closed,
    /// 暫停
    OnHold,
    /// 已取消
    Cancelled,
}

impl WorkOrderStatus {
    /// 狀態轉換表：指定狀態允許轉入的目標狀態
    ///
    /// 所有轉換集中在此驗證，狀態檢查不散落各處
    pub fn allowed_transitions(self) -> &'static [WorkOrderStatus] {
        use WorkOrderStatus::*;
        match self {
            Planned => &[Released, Cancelled],
            Released => &[InProgress, OnHold, Cancelled],
            InProgress => &[Completed, Closed, OnHold, Cancelled],
            Completed => &[Closed, Cancelled],
            OnHold => &[Released, InProgress, Cancelled],
            Closed => &[],
            Cancelled => &[],
        }
    }

    /// 檢查是否允許轉換到目標狀態
    pub fn can_transition_to(self, target: WorkOrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    /// 是否為終止狀態
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkOrderStatus::Closed | WorkOrderStatus::Cancelled)
    }

    /// 是否可取消（任何非終止狀態）
    pub fn can_cancel(self) -> bool {
        !self.is_terminal()
    }

    /// 是否可修改（數量/日期等主檔欄位）
    pub fn can_modify(self) -> bool {
        matches!(self, WorkOrderStatus::Planned | WorkOrderStatus::Released)
    }

    /// 是否可改期
    pub fn can_reschedule(self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Planned | WorkOrderStatus::Released | WorkOrderStatus::OnHold
        )
    }

    /// 是否可發料
    pub fn can_issue_material(self) -> bool {
        matches!(self, WorkOrderStatus::Released | WorkOrderStatus::InProgress)
    }

    /// 是否計入產能負荷（已確認的工單）
    pub fn is_firm_load(self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Planned | WorkOrderStatus::Released | WorkOrderStatus::InProgress
        )
    }
}

/// 工單行類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkOrderLineType {
    /// 物料行（領料）
    Material,
    /// 工序行（報工）
    Operation,
}

/// 工單行（物料行與工序行混排，按行號排序）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrderLine {
    /// 行號
    pub line_number: u32,

    /// 行類型
    pub line_type: WorkOrderLineType,

    /// 物料ID（物料行）
    pub product_id: Option<String>,

    /// 計劃用量（物料行）
    pub planned_quantity: Decimal,

    /// 已發料量（物料行）
    pub issued_quantity: Decimal,

    /// 計量單位（物料行）
    pub uom: Option<String>,

    /// 工序號（工序行）
    pub operation_number: Option<u32>,

    /// 工作中心ID（工序行）
    pub work_center_id: Option<String>,

    /// 計劃準備工時（小時，工序行）
    pub planned_setup_hours: Decimal,

    /// 計劃加工工時（小時，工序行）
    pub planned_run_hours: Decimal,

    /// 實際準備工時（小時，工序行）
    pub actual_setup_hours: Decimal,

    /// 實際加工工時（小時，工序行）
    pub actual_run_hours: Decimal,
}

impl WorkOrderLine {
    /// 創建物料行
    pub fn material(
        line_number: u32,
        product_id: String,
        planned_quantity: Decimal,
        uom: String,
    ) -> Self {
        Self {
            line_number,
            line_type: WorkOrderLineType::Material,
            product_id: Some(product_id),
            planned_quantity,
            issued_quantity: Decimal::ZERO,
            uom: Some(uom),
            operation_number: None,
            work_center_id: None,
            planned_setup_hours: Decimal::ZERO,
            planned_run_hours: Decimal::ZERO,
            actual_setup_hours: Decimal::ZERO,
            actual_run_hours: Decimal::ZERO,
        }
    }

    /// 創建工序行
    pub fn operation(
        line_number: u32,
        operation_number: u32,
        work_center_id: String,
        planned_setup_hours: Decimal,
        planned_run_hours: Decimal,
    ) -> Self {
        Self {
            line_number,
            line_type: WorkOrderLineType::Operation,
            product_id: None,
            planned_quantity: Decimal::ZERO,
            issued_quantity: Decimal::ZERO,
            uom: None,
            operation_number: Some(operation_number),
            work_center_id: Some(work_center_id),
            planned_setup_hours,
            planned_run_hours,
            actual_setup_hours: Decimal::ZERO,
            actual_run_hours: Decimal::ZERO,
        }
    }

    /// 檢查是否為物料行
    pub fn is_material(&self) -> bool {
        self.line_type == WorkOrderLineType::Material
    }

    /// 檢查是否為工序行
    pub fn is_operation(&self) -> bool {
        self.line_type == WorkOrderLineType::Operation
    }
}

/// 工單
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    /// 工單ID
    pub id: Uuid,

    /// 工單號
    pub order_number: String,

    /// 物料ID
    pub product_id: String,

    /// 訂購數量
    pub quantity: Decimal,

    /// 計劃開工日
    pub planned_start: NaiveDate,

    /// 計劃完工日
    pub planned_end: NaiveDate,

    /// 實際開工日
    pub actual_start: Option<NaiveDate>,

    /// 實際完工日
    pub actual_end: Option<NaiveDate>,

    /// 狀態
    pub status: WorkOrderStatus,

    /// 已完工數量
    pub completed_quantity: Decimal,

    /// 報廢數量
    pub scrap_quantity: Decimal,

    /// 工單行
    pub lines: Vec<WorkOrderLine>,

    /// 父工單（多層生產）
    pub parent_order_id: Option<Uuid>,

    /// 銷售訂單關聯
    pub sales_order_ref: Option<String>,

    /// 暫停原因
    pub hold_reason: Option<String>,

    /// 暫停前狀態（恢復時還原）
    pub previous_status: Option<WorkOrderStatus>,
}

impl WorkOrder {
    /// 創建新的工單（已計劃狀態）
    pub fn new(
        order_number: String,
        product_id: String,
        quantity: Decimal,
        planned_start: NaiveDate,
        planned_end: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_number,
            product_id,
            quantity,
            planned_start,
            planned_end,
            actual_start: None,
            actual_end: None,
            status: WorkOrderStatus::Planned,
            completed_quantity: Decimal::ZERO,
            scrap_quantity: Decimal::ZERO,
            lines: Vec::new(),
            parent_order_id: None,
            sales_order_ref: None,
            hold_reason: None,
            previous_status: None,
        }
    }

    /// 建構器模式：設置工單行
    pub fn with_lines(mut self, lines: Vec<WorkOrderLine>) -> Self {
        self.lines = lines;
        self.lines.sort_by_key(|l| l.line_number);
        self
    }

    /// 建構器模式：設置銷售訂單關聯
    pub fn with_sales_order_ref(mut self, sales_order_ref: String) -> Self {
        self.sales_order_ref = Some(sales_order_ref);
        self
    }

    /// 建構器模式：設置父工單
    pub fn with_parent_order(mut self, parent_order_id: Uuid) -> Self {
        self.parent_order_id = Some(parent_order_id);
        self
    }

    /// 轉換狀態（集中驗證，非法轉換回報當前與目標狀態）
    pub fn transition_to(&mut self, target: WorkOrderStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(PlanningError::InvalidStatusTransition {
                current: self.status,
                attempted: target,
            });
        }
        self.status = target;
        Ok(())
    }

    /// 暫停（記住先前狀態供恢復）
    pub fn hold(&mut self, reason: String) -> Result<()> {
        let previous = self.status;
        self.transition_to(WorkOrderStatus::OnHold)?;
        self.previous_status = Some(previous);
        self.hold_reason = Some(reason);
        Ok(())
    }

    /// 恢復（還原暫停前狀態）
    pub fn resume(&mut self) -> Result<()> {
        let target = self
            .previous_status
            .ok_or_else(|| PlanningError::InvalidStatusTransition {
                current: self.status,
                attempted: WorkOrderStatus::InProgress,
            })?;
        self.transition_to(target)?;
        self.previous_status = None;
        self.hold_reason = None;
        Ok(())
    }

    /// 剩餘未完工數量（非負）
    pub fn remaining_quantity(&self) -> Decimal {
        (self.quantity - self.completed_quantity).max(Decimal::ZERO)
    }

    /// 依工序號查找工序行
    pub fn find_operation_line(&self, operation_number: u32) -> Option<&WorkOrderLine> {
        self.lines
            .iter()
            .find(|l| l.is_operation() && l.operation_number == Some(operation_number))
    }

    /// 物料行
    pub fn material_lines(&self) -> Vec<&WorkOrderLine> {
        self.lines.iter().filter(|l| l.is_material()).collect()
    }

    /// 工序行
    pub fn operation_lines(&self) -> Vec<&WorkOrderLine> {
        self.lines.iter().filter(|l| l.is_operation()).collect()
    }
}
