//! 工單管理器
//!
//! 建單時從生效 BOM/途程自動產生物料行與工序行，
//! 生命週期轉換集中由狀態機驗證。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;
use uuid::Uuid;

use planning_bom::{BomManager, RoutingManager};
use planning_core::{
    PlanningError, Result, WorkOrder, WorkOrderLine, WorkOrderStatus,
};

/// 工單管理器
#[derive(Debug, Default)]
pub struct WorkOrderManager {
    orders: HashMap<Uuid, WorkOrder>,

    /// 工單號流水
    next_number: u32,
}

impl WorkOrderManager {
    /// 創建空的管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 建立工單：物料行取自生效 BOM（頂層展開一次，過濾行級生效日），
    /// 工序行取自生效途程
    ///
    /// 沒有生效途程的產品仍可建單（無工序行）；沒有生效 BOM 則拒絕。
    pub fn create(
        &mut self,
        bom: &BomManager,
        routing: &RoutingManager,
        product_id: &str,
        quantity: Decimal,
        planned_start: NaiveDate,
        planned_end: NaiveDate,
        as_of: NaiveDate,
    ) -> Result<Uuid> {
        if quantity <= Decimal::ZERO {
            return Err(PlanningError::InvalidQuantity(format!(
                "工單數量必須為正數，得到 {quantity}"
            )));
        }

        let lines = Self::generate_lines(bom, routing, product_id, quantity, as_of)?;

        self.next_number += 1;
        let order = WorkOrder::new(
            format!("WO-{:05}", self.next_number),
            product_id.to_string(),
            quantity,
            planned_start,
            planned_end,
        )
        .with_lines(lines);

        let id = order.id;
        tracing::info!("建立工單 {}：{} × {}", order.order_number, product_id, quantity);
        self.orders.insert(id, order);
        Ok(id)
    }

    /// 依生效 BOM/途程產生工單行
    fn generate_lines(
        bom: &BomManager,
        routing: &RoutingManager,
        product_id: &str,
        quantity: Decimal,
        as_of: NaiveDate,
    ) -> Result<Vec<WorkOrderLine>> {
        let effective_bom = bom.require_effective(product_id, as_of)?;

        let mut lines = Vec::new();
        let mut line_number = 0u32;

        for bom_line in effective_bom.effective_lines(as_of) {
            line_number += 10;
            lines.push(WorkOrderLine::material(
                line_number,
                bom_line.component_id.clone(),
                bom_line.quantity_with_scrap() * quantity,
                bom_line.uom.clone(),
            ));
        }

        match routing.get_effective(product_id, as_of) {
            Some(effective_routing) => {
                for op in &effective_routing.operations {
                    line_number += 10;
                    lines.push(WorkOrderLine::operation(
                        line_number,
                        op.operation_number,
                        op.work_center_id.clone(),
                        op.setup_minutes / Decimal::from(60),
                        op.run_minutes_per_unit * quantity / Decimal::from(60),
                    ));
                }
            }
            None => {
                tracing::debug!("產品 {} 無生效途程，工單不含工序行", product_id);
            }
        }

        Ok(lines)
    }

    /// 依 ID 取得工單
    pub fn get(&self, order_id: Uuid) -> Result<&WorkOrder> {
        self.orders
            .get(&order_id)
            .ok_or(PlanningError::WorkOrderNotFound(order_id))
    }

    fn get_mut(&mut self, order_id: Uuid) -> Result<&mut WorkOrder> {
        self.orders
            .get_mut(&order_id)
            .ok_or(PlanningError::WorkOrderNotFound(order_id))
    }

    /// 依工單號查找
    pub fn find_by_number(&self, order_number: &str) -> Option<&WorkOrder> {
        self.orders.values().find(|o| o.order_number == order_number)
    }

    /// 依狀態查找
    pub fn find_by_status(&self, status: WorkOrderStatus) -> Vec<&WorkOrder> {
        self.orders.values().filter(|o| o.status == status).collect()
    }

    /// 查找指定工作中心、計劃開工日落在區間內的工單（供產能計算）
    pub fn find_by_work_center_and_date_range(
        &self,
        work_center_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Vec<&WorkOrder> {
        self.orders
            .values()
            .filter(|o| {
                o.planned_start >= start
                    && o.planned_start <= end
                    && o.lines
                        .iter()
                        .any(|l| l.work_center_id.as_deref() == Some(work_center_id))
            })
            .collect()
    }

    /// 所有工單
    pub fn all(&self) -> Vec<&WorkOrder> {
        self.orders.values().collect()
    }

    /// 下達工單（Planned → Released）
    pub fn release(&mut self, order_id: Uuid) -> Result<()> {
        self.get_mut(order_id)?
            .transition_to(WorkOrderStatus::Released)
    }

    /// 開工（Released → InProgress，記錄實際開工日）
    pub fn start(&mut self, order_id: Uuid, on: NaiveDate) -> Result<()> {
        let order = self.get_mut(order_id)?;
        order.transition_to(WorkOrderStatus::InProgress)?;
        order.actual_start = Some(on);
        Ok(())
    }

    /// 暫停（記住先前狀態）
    pub fn hold(&mut self, order_id: Uuid, reason: String) -> Result<()> {
        self.get_mut(order_id)?.hold(reason)
    }

    /// 恢復（還原暫停前狀態）
    pub fn resume(&mut self, order_id: Uuid) -> Result<()> {
        self.get_mut(order_id)?.resume()
    }

    /// 回報完工數量，累計達到訂購量時自動轉為已完工
    pub fn complete(
        &mut self,
        order_id: Uuid,
        completed_qty: Decimal,
        scrap_qty: Decimal,
    ) -> Result<()> {
        let order = self.get_mut(order_id)?;
        if order.status != WorkOrderStatus::InProgress {
            return Err(PlanningError::StatusConflict {
                action: "回報完工".to_string(),
                current: order.status,
            });
        }
        if completed_qty < Decimal::ZERO || scrap_qty < Decimal::ZERO {
            return Err(PlanningError::InvalidQuantity(
                "完工/報廢數量不可為負".to_string(),
            ));
        }

        order.completed_quantity += completed_qty;
        order.scrap_quantity += scrap_qty;

        // 恰於累計完工量達到訂購量時轉換，未達不轉
        if order.completed_quantity >= order.quantity {
            order.transition_to(WorkOrderStatus::Completed)?;
            tracing::info!("工單 {} 完工", order.order_number);
        }
        Ok(())
    }

    /// 結案（Completed 或 InProgress → Closed，記錄實際完工日）
    pub fn close(&mut self, order_id: Uuid, on: NaiveDate) -> Result<()> {
        let order = self.get_mut(order_id)?;
        order.transition_to(WorkOrderStatus::Closed)?;
        order.actual_end = Some(on);
        Ok(())
    }

    /// 取消（由可取消判定守衛）
    pub fn cancel(&mut self, order_id: Uuid) -> Result<()> {
        let order = self.get_mut(order_id)?;
        if !order.status.can_cancel() {
            return Err(PlanningError::InvalidStatusTransition {
                current: order.status,
                attempted: WorkOrderStatus::Cancelled,
            });
        }
        order.transition_to(WorkOrderStatus::Cancelled)
    }

    /// 發料：狀態必須允許發料，行必須是物料行
    pub fn issue_material(
        &mut self,
        order_id: Uuid,
        line_number: u32,
        quantity: Decimal,
    ) -> Result<()> {
        let order = self.get_mut(order_id)?;
        if !order.status.can_issue_material() {
            return Err(PlanningError::StatusConflict {
                action: "發料".to_string(),
                current: order.status,
            });
        }
        if quantity <= Decimal::ZERO {
            return Err(PlanningError::InvalidQuantity(
                "發料數量必須為正數".to_string(),
            ));
        }

        let order_id_for_err = order.id;
        let line = order
            .lines
            .iter_mut()
            .find(|l| l.line_number == line_number && l.is_material())
            .ok_or(PlanningError::WorkOrderLineNotFound {
                order_id: order_id_for_err,
                line_number,
            })?;

        line.issued_quantity += quantity;
        Ok(())
    }

    /// 回報工序工時：首次回報時自動把已下達工單轉為生產中
    pub fn report_operation(
        &mut self,
        order_id: Uuid,
        operation_number: u32,
        setup_hours: Decimal,
        run_hours: Decimal,
        on: NaiveDate,
    ) -> Result<()> {
        let order = self.get_mut(order_id)?;

        // 首次報工自動開工
        if order.status == WorkOrderStatus::Released {
            order.transition_to(WorkOrderStatus::InProgress)?;
            order.actual_start.get_or_insert(on);
        }
        if order.status != WorkOrderStatus::InProgress {
            return Err(PlanningError::StatusConflict {
                action: "報工".to_string(),
                current: order.status,
            });
        }

        let order_id_for_err = order.id;
        let line = order
            .lines
            .iter_mut()
            .find(|l| l.is_operation() && l.operation_number == Some(operation_number))
            .ok_or(PlanningError::WorkOrderLineNotFound {
                order_id: order_id_for_err,
                line_number: operation_number,
            })?;

        line.actual_setup_hours += setup_hours;
        line.actual_run_hours += run_hours;
        Ok(())
    }

    /// 改期：計劃開工/完工日整體平移（供產能解決方案使用）
    pub fn shift_schedule(&mut self, order_id: Uuid, days: i64) -> Result<()> {
        let order = self.get_mut(order_id)?;
        if !order.status.can_reschedule() {
            return Err(PlanningError::StatusConflict {
                action: "改期".to_string(),
                current: order.status,
            });
        }

        let duration = chrono::Duration::days(days);
        order.planned_start = order
            .planned_start
            .checked_add_signed(duration)
            .unwrap_or(order.planned_start);
        order.planned_end = order
            .planned_end
            .checked_add_signed(duration)
            .unwrap_or(order.planned_end);
        tracing::info!("工單 {} 改期 {} 天", order.order_number, days);
        Ok(())
    }

    /// 將指定工作中心的工序行轉到替代工作中心，回傳轉移的計劃工時
    pub fn reassign_work_center(
        &mut self,
        order_id: Uuid,
        from_work_center_id: &str,
        to_work_center_id: &str,
    ) -> Result<Decimal> {
        let order = self.get_mut(order_id)?;
        if order.status.is_terminal() {
            return Err(PlanningError::StatusConflict {
                action: "轉移工作中心".to_string(),
                current: order.status,
            });
        }

        let mut moved_hours = Decimal::ZERO;
        for line in order
            .lines
            .iter_mut()
            .filter(|l| l.is_operation() && l.work_center_id.as_deref() == Some(from_work_center_id))
        {
            line.work_center_id = Some(to_work_center_id.to_string());
            moved_hours += line.planned_setup_hours + line.planned_run_hours;
        }

        if moved_hours > Decimal::ZERO {
            tracing::info!(
                "工單 {} 工序由 {} 轉至 {}（{} 小時）",
                order.order_number,
                from_work_center_id,
                to_work_center_id,
                moved_hours
            );
        }
        Ok(moved_hours)
    }

    /// 變更數量：不可低於已完工量；成功時依 BOM/途程以新數量重建所有行
    pub fn change_quantity(
        &mut self,
        order_id: Uuid,
        new_quantity: Decimal,
        bom: &BomManager,
        routing: &RoutingManager,
        as_of: NaiveDate,
    ) -> Result<()> {
        let order = self.get(order_id)?;

        if order.status.is_terminal() || order.status == WorkOrderStatus::Completed {
            return Err(PlanningError::StatusConflict {
                action: "變更數量".to_string(),
                current: order.status,
            });
        }
        if new_quantity < order.completed_quantity {
            return Err(PlanningError::InvalidQuantity(format!(
                "新數量 {} 低於已完工量 {}",
                new_quantity, order.completed_quantity
            )));
        }
        if new_quantity <= Decimal::ZERO {
            return Err(PlanningError::InvalidQuantity(format!(
                "工單數量必須為正數，得到 {new_quantity}"
            )));
        }

        let product_id = order.product_id.clone();
        let lines = Self::generate_lines(bom, routing, &product_id, new_quantity, as_of)?;

        let order = self.get_mut(order_id)?;
        order.quantity = new_quantity;
        order.lines = lines;
        tracing::info!("工單 {} 數量變更為 {}", order.order_number, new_quantity);
        Ok(())
    }
}
