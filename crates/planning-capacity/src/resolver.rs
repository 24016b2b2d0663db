//! 產能解決方案套用器
//!
//! 依動作種類分派處理：改期/轉移/加班/取消有具體副作用；
//! 拆分/外包/增班需要核外流程（採購下單、人資排班核准），
//! 僅記錄意圖並回報未套用。

use chrono::NaiveDate;
use rust_decimal::Decimal;

use planning_core::{
    PlanningError, PlanningHorizon, ResolutionAction, ResolutionSuggestion, Result,
};
use planning_workorder::WorkOrderManager;

use crate::work_center_manager::WorkCenterManager;

/// 套用情境（審批與強制旗標）
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyContext {
    /// 呼叫端已取得審批
    pub approved: bool,

    /// 強制套用不可自動套用的建議
    pub forced: bool,
}

impl ApplyContext {
    /// 自動解決情境（無審批、不強制）
    pub fn auto() -> Self {
        Self::default()
    }

    /// 已審批情境
    pub fn approved() -> Self {
        Self {
            approved: true,
            forced: false,
        }
    }
}

/// 套用結果
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    /// 是否實際產生副作用
    pub applied: bool,

    /// 結果說明
    pub message: String,
}

/// 產能解決方案套用器
#[derive(Debug, Clone)]
pub struct CapacityResolver {
    /// 改期延後上限（天）
    pub max_reschedule_days: i64,

    /// 單一建議的加班時數上限（小時）
    pub max_overtime_hours: Decimal,

    /// 加班預算（None 表示不設限）
    pub overtime_budget: Option<Decimal>,
}

impl Default for CapacityResolver {
    fn default() -> Self {
        Self {
            max_reschedule_days: 30,
            max_overtime_hours: Decimal::from(24),
            overtime_budget: None,
        }
    }
}

impl CapacityResolver {
    /// 創建預設配置的套用器
    pub fn new() -> Self {
        Self::default()
    }

    /// 建構器模式：設置加班預算
    pub fn with_overtime_budget(mut self, budget: Decimal) -> Self {
        self.overtime_budget = Some(budget);
        self
    }

    /// 驗證建議的前置條件，回傳完整違規清單而非拋錯
    pub fn validate_suggestion(
        &self,
        suggestion: &ResolutionSuggestion,
        orders: &WorkOrderManager,
    ) -> Vec<String> {
        let mut violations = Vec::new();

        match &suggestion.action {
            ResolutionAction::Reschedule { days_delayed, .. } => {
                if *days_delayed <= 0 {
                    violations.push("改期天數必須為正數".to_string());
                }
                if *days_delayed > self.max_reschedule_days {
                    violations.push(format!(
                        "改期延後 {} 天，超過上限 {} 天",
                        days_delayed, self.max_reschedule_days
                    ));
                }
            }
            ResolutionAction::Overtime { total_hours, .. } => {
                if *total_hours > self.max_overtime_hours {
                    violations.push(format!(
                        "加班 {} 小時，超過上限 {} 小時",
                        total_hours, self.max_overtime_hours
                    ));
                }
                if let Some(budget) = self.overtime_budget {
                    if suggestion.estimated_cost > budget {
                        violations.push(format!(
                            "加班成本 {} 超出預算 {}",
                            suggestion.estimated_cost, budget
                        ));
                    }
                }
            }
            ResolutionAction::Cancel { order_id } => match orders.get(*order_id) {
                Ok(order) => {
                    if !order.status.can_cancel() {
                        violations.push(format!(
                            "工單 {} 狀態 {:?} 不可取消",
                            order.order_number, order.status
                        ));
                    }
                }
                Err(_) => violations.push(format!("找不到工單 {}", order_id)),
            },
            // 其餘動作無前置條件
            _ => {}
        }

        violations
    }

    /// 套用單一建議
    ///
    /// 需審批而情境未審批、或不可自動套用而未強制時拒絕執行。
    pub fn apply_suggestion(
        &self,
        suggestion: &ResolutionSuggestion,
        context: &ApplyContext,
        horizon: &PlanningHorizon,
        orders: &mut WorkOrderManager,
        centers: &mut WorkCenterManager,
    ) -> Result<ApplyOutcome> {
        if suggestion.requires_approval && !context.approved {
            return Err(PlanningError::ApprovalRequired);
        }
        if !suggestion.can_auto_apply && !context.forced {
            return Err(PlanningError::AutoApplyNotAllowed);
        }

        let violations = self.validate_suggestion(suggestion, orders);
        if !violations.is_empty() {
            return Ok(ApplyOutcome {
                applied: false,
                message: format!("前置條件不符: {}", violations.join("; ")),
            });
        }

        match &suggestion.action {
            ResolutionAction::Reschedule {
                from_period_start,
                from_period_end,
                days_delayed,
                ..
            } => self.apply_reschedule(
                suggestion,
                *from_period_start,
                *from_period_end,
                *days_delayed,
                orders,
            ),

            ResolutionAction::AlternativeWorkCenter {
                alternate_id,
                transfer_hours,
            } => self.apply_alternative(suggestion, alternate_id, *transfer_hours, orders, centers),

            ResolutionAction::Overtime {
                hours_per_day,
                total_hours,
            } => self.apply_overtime(suggestion, *hours_per_day, *total_hours, horizon, centers),

            ResolutionAction::Cancel { order_id } => {
                orders.cancel(*order_id)?;
                Ok(ApplyOutcome {
                    applied: true,
                    message: format!("已取消工單 {}", order_id),
                })
            }

            // 核外流程：僅記錄意圖
            ResolutionAction::Split { .. }
            | ResolutionAction::Subcontract
            | ResolutionAction::AddShift { .. }
            | ResolutionAction::Manual => {
                tracing::info!(
                    "建議 {}（{}）需要核外流程，未自動執行",
                    suggestion.action.kind(),
                    suggestion.description
                );
                Ok(ApplyOutcome {
                    applied: false,
                    message: format!("{} 需要核外流程，僅記錄意圖", suggestion.action.kind()),
                })
            }
        }
    }

    /// 改期：把超載期間內、可改期的工單往後平移，直到移動量達標
    fn apply_reschedule(
        &self,
        suggestion: &ResolutionSuggestion,
        from_start: NaiveDate,
        from_end: NaiveDate,
        days_delayed: i64,
        orders: &mut WorkOrderManager,
    ) -> Result<ApplyOutcome> {
        // 後進先出：較晚開工的先移，減少對急單的衝擊
        let mut candidates: Vec<(uuid::Uuid, Decimal)> = orders
            .all()
            .into_iter()
            .filter(|o| {
                o.status.can_reschedule()
                    && o.planned_start >= from_start
                    && o.planned_start <= from_end
            })
            .map(|o| {
                let hours: Decimal = o
                    .operation_lines()
                    .iter()
                    .filter(|l| l.work_center_id.as_deref() == Some(&suggestion.work_center_id))
                    .map(|l| l.planned_setup_hours + l.planned_run_hours)
                    .sum();
                (o.id, hours)
            })
            .filter(|(_, hours)| *hours > Decimal::ZERO)
            .collect();
        candidates.sort_by(|a, b| {
            let da = orders.get(a.0).map(|o| o.planned_start).unwrap_or(from_start);
            let db = orders.get(b.0).map(|o| o.planned_start).unwrap_or(from_start);
            db.cmp(&da)
        });

        let mut moved = Decimal::ZERO;
        let mut count = 0;
        for (order_id, hours) in candidates {
            if moved >= suggestion.hours_resolved {
                break;
            }
            orders.shift_schedule(order_id, days_delayed)?;
            moved += hours;
            count += 1;
        }

        Ok(ApplyOutcome {
            applied: count > 0,
            message: format!("改期 {} 張工單，移動 {} 小時", count, moved),
        })
    }

    /// 轉移：把工序行重新指派到替代工作中心，直到轉移量達標
    fn apply_alternative(
        &self,
        suggestion: &ResolutionSuggestion,
        alternate_id: &str,
        transfer_hours: Decimal,
        orders: &mut WorkOrderManager,
        centers: &WorkCenterManager,
    ) -> Result<ApplyOutcome> {
        // 替代中心必須存在
        centers.get(alternate_id)?;

        let candidates: Vec<uuid::Uuid> = orders
            .all()
            .into_iter()
            .filter(|o| {
                !o.status.is_terminal()
                    && o.operation_lines()
                        .iter()
                        .any(|l| l.work_center_id.as_deref() == Some(&suggestion.work_center_id))
            })
            .map(|o| o.id)
            .collect();

        let mut moved = Decimal::ZERO;
        let mut count = 0;
        for order_id in candidates {
            if moved >= transfer_hours {
                break;
            }
            let hours =
                orders.reassign_work_center(order_id, &suggestion.work_center_id, alternate_id)?;
            if hours > Decimal::ZERO {
                moved += hours;
                count += 1;
            }
        }

        Ok(ApplyOutcome {
            applied: count > 0,
            message: format!(
                "轉移 {} 張工單至 {}，共 {} 小時",
                count, alternate_id, moved
            ),
        })
    }

    /// 加班：在時界內的工作日逐日核准加班，直到總時數達標
    fn apply_overtime(
        &self,
        suggestion: &ResolutionSuggestion,
        hours_per_day: Decimal,
        total_hours: Decimal,
        horizon: &PlanningHorizon,
        centers: &mut WorkCenterManager,
    ) -> Result<ApplyOutcome> {
        let working_days: Vec<NaiveDate> = {
            let center = centers.get(&suggestion.work_center_id)?;
            let mut days = Vec::new();
            let mut current = horizon.start;
            while current <= horizon.end {
                if center.is_working_day(current) {
                    days.push(current);
                }
                match current.succ_opt() {
                    Some(next) => current = next,
                    None => break,
                }
            }
            days
        };

        let mut granted = Decimal::ZERO;
        for day in working_days {
            if granted >= total_hours {
                break;
            }
            let grant = hours_per_day.min(total_hours - granted);
            centers.grant_overtime(&suggestion.work_center_id, day, grant)?;
            granted += grant;
        }

        Ok(ApplyOutcome {
            applied: granted > Decimal::ZERO,
            message: format!("核准加班 {} 小時", granted),
        })
    }

    /// 自動解決：依優先級走訪建議，只套用可自動套用且不需審批者，
    /// 追蹤剩餘超載歸零即停，回傳實際套用的建議
    pub fn auto_resolve(
        &self,
        suggestions: &[ResolutionSuggestion],
        excess: Decimal,
        horizon: &PlanningHorizon,
        orders: &mut WorkOrderManager,
        centers: &mut WorkCenterManager,
    ) -> Vec<ResolutionSuggestion> {
        let mut ranked: Vec<&ResolutionSuggestion> = suggestions.iter().collect();
        ranked.sort_by_key(|s| s.priority);

        let mut remaining = excess;
        let mut applied = Vec::new();

        for suggestion in ranked {
            if remaining <= Decimal::ZERO {
                break;
            }
            if suggestion.requires_approval || !suggestion.can_auto_apply {
                continue;
            }

            match self.apply_suggestion(suggestion, &ApplyContext::auto(), horizon, orders, centers)
            {
                Ok(outcome) if outcome.applied => {
                    tracing::info!(
                        "自動套用建議 {}：{}",
                        suggestion.action.kind(),
                        outcome.message
                    );
                    remaining -= suggestion.hours_resolved;
                    applied.push(suggestion.clone());
                }
                Ok(outcome) => {
                    tracing::debug!(
                        "建議 {} 未套用：{}",
                        suggestion.action.kind(),
                        outcome.message
                    );
                }
                Err(err) => {
                    tracing::warn!("套用建議 {} 失敗：{}", suggestion.action.kind(), err);
                }
            }
        }

        applied
    }
}
