//! 產能計劃器
//!
//! 把已確認工單與 MRP 計劃訂單換算為各工作中心的期間負荷，
//! 偵測超載並依固定策略順序產生解決建議。計劃訂單的工時由
//! 本計劃器在負荷計算時透過途程推導，MRP 引擎不需要預先附掛。

use rayon::prelude::*;
use rust_decimal::Decimal;

use planning_bom::RoutingManager;
use planning_core::{
    CapacityLoad, CapacityPeriod, CapacityProfile, LoadSourceType, PlannedOrder, PlanningHorizon,
    ResolutionAction, ResolutionSuggestion, Result,
};
use planning_workorder::WorkOrderManager;

use crate::work_center_manager::WorkCenterManager;
use crate::MAX_OVERTIME_HOURS_PER_DAY;

/// 產能計劃器
pub struct CapacityPlanner<'a> {
    work_centers: &'a WorkCenterManager,
    routings: &'a RoutingManager,
}

impl<'a> CapacityPlanner<'a> {
    /// 創建新的計劃器
    pub fn new(work_centers: &'a WorkCenterManager, routings: &'a RoutingManager) -> Self {
        Self {
            work_centers,
            routings,
        }
    }

    /// 計算單一工作中心在時界內的產能負荷檔（每週分桶）
    pub fn calculate_load(
        &self,
        work_center_id: &str,
        horizon: &PlanningHorizon,
        work_orders: &WorkOrderManager,
        planned_orders: &[PlannedOrder],
    ) -> Result<CapacityProfile> {
        let center = self.work_centers.get(work_center_id)?;

        tracing::debug!(
            "計算工作中心 {} 負荷：{} ~ {}",
            work_center_id,
            horizon.start,
            horizon.end
        );

        let loads = self.collect_loads(work_center_id, horizon, work_orders, planned_orders);

        let mut periods = Vec::new();
        let mut total_available = Decimal::ZERO;
        let mut total_loaded = Decimal::ZERO;

        for (start, end) in horizon.weekly_buckets() {
            let available_hours = center.available_hours_between(start, end);
            let period_loads: Vec<CapacityLoad> = loads
                .iter()
                .filter(|l| l.load_date >= start && l.load_date <= end)
                .cloned()
                .collect();
            let loaded_hours: Decimal = period_loads.iter().map(|l| l.total_hours()).sum();

            total_available += available_hours;
            total_loaded += loaded_hours;

            periods.push(CapacityPeriod {
                start,
                end,
                available_hours,
                loaded_hours,
                loads: period_loads,
            });
        }

        Ok(CapacityProfile {
            work_center_id: work_center_id.to_string(),
            horizon: horizon.clone(),
            periods,
            total_available,
            total_loaded,
            calculated_at: chrono::Utc::now().naive_utc(),
        })
    }

    /// 計算所有啟用工作中心的負荷檔（rayon 平行展開）
    pub fn calculate_load_all(
        &self,
        horizon: &PlanningHorizon,
        work_orders: &WorkOrderManager,
        planned_orders: &[PlannedOrder],
    ) -> Result<Vec<CapacityProfile>> {
        let ids: Vec<String> = self
            .work_centers
            .find_active()
            .iter()
            .map(|c| c.id.clone())
            .collect();

        ids.par_iter()
            .map(|id| self.calculate_load(id, horizon, work_orders, planned_orders))
            .collect()
    }

    /// 蒐集時界內落在指定工作中心的所有負荷
    fn collect_loads(
        &self,
        work_center_id: &str,
        horizon: &PlanningHorizon,
        work_orders: &WorkOrderManager,
        planned_orders: &[PlannedOrder],
    ) -> Vec<CapacityLoad> {
        let mut loads = Vec::new();

        // (a) 已確認工單：計劃工時直接取自工序行
        for order in work_orders.all() {
            if !order.status.is_firm_load() || !horizon.contains(order.planned_start) {
                continue;
            }
            for line in order.operation_lines() {
                if line.work_center_id.as_deref() != Some(work_center_id) {
                    continue;
                }
                loads.push(CapacityLoad {
                    source_id: order.order_number.clone(),
                    source_type: LoadSourceType::WorkOrder,
                    work_center_id: work_center_id.to_string(),
                    setup_hours: line.planned_setup_hours,
                    run_hours: line.planned_run_hours,
                    load_date: order.planned_start,
                    operation_number: line.operation_number.unwrap_or(0),
                    product_id: order.product_id.clone(),
                    quantity: order.quantity,
                });
            }
        }

        // (b) 計劃訂單：於此依生效途程推導工時
        for order in planned_orders {
            if !order.is_manufacturing() || !horizon.contains(order.start_date) {
                continue;
            }
            let Some(routing) = self.routings.get_effective(&order.product_id, order.due_date)
            else {
                continue;
            };
            for op in &routing.operations {
                if op.work_center_id != work_center_id {
                    continue;
                }
                loads.push(CapacityLoad {
                    source_id: order.id.to_string(),
                    source_type: LoadSourceType::PlannedOrder,
                    work_center_id: work_center_id.to_string(),
                    setup_hours: op.setup_minutes / Decimal::from(60),
                    run_hours: op.run_minutes_per_unit * order.quantity / Decimal::from(60),
                    load_date: order.start_date,
                    operation_number: op.operation_number,
                    product_id: order.product_id.clone(),
                    quantity: order.quantity,
                });
            }
        }

        loads
    }

    /// 產生解決建議：固定生成順序，再按優先級升冪排序
    ///
    /// 未超載時回傳空清單。審批/自動套用旗標與優先級無關，
    /// 優先級只決定呈現順序。
    pub fn suggest_resolutions(
        &self,
        work_center_id: &str,
        horizon: &PlanningHorizon,
        work_orders: &WorkOrderManager,
        planned_orders: &[PlannedOrder],
    ) -> Result<Vec<ResolutionSuggestion>> {
        let profile = self.calculate_load(work_center_id, horizon, work_orders, planned_orders)?;
        if !profile.is_overloaded() {
            return Ok(Vec::new());
        }

        let excess = profile.excess_load();
        let center = self.work_centers.get(work_center_id)?;
        let mut suggestions = Vec::new();

        tracing::info!("工作中心 {} 超載 {} 小時，產生解決建議", work_center_id, excess);

        // 1. 替代工作中心：有剩餘產能才建議
        if let Some(alternate_id) = &center.alternate_id {
            let alternate_profile =
                self.calculate_load(alternate_id, horizon, work_orders, planned_orders)?;
            let spare = alternate_profile.total_available - alternate_profile.total_loaded;
            if spare > Decimal::ZERO {
                let transfer = excess.min(spare);
                suggestions.push(
                    ResolutionSuggestion::new(
                        work_center_id.to_string(),
                        ResolutionAction::AlternativeWorkCenter {
                            alternate_id: alternate_id.clone(),
                            transfer_hours: transfer,
                        },
                        format!("轉移 {} 小時至替代工作中心 {}", transfer, alternate_id),
                        transfer,
                    )
                    .with_priority(1)
                    .with_flags(false, true),
                );
            }
        }

        // 2. 加班：上限 = 每日 4 小時 × 時界內工作日數
        let working_days = center.working_days_between(horizon.start, horizon.end);
        let max_overtime =
            Decimal::from(MAX_OVERTIME_HOURS_PER_DAY) * Decimal::from(working_days);
        let overtime_hours = excess.min(max_overtime);
        if overtime_hours > Decimal::ZERO {
            suggestions.push(
                ResolutionSuggestion::new(
                    work_center_id.to_string(),
                    ResolutionAction::Overtime {
                        hours_per_day: Decimal::from(MAX_OVERTIME_HOURS_PER_DAY),
                        total_hours: overtime_hours,
                    },
                    format!("加班 {} 小時", overtime_hours),
                    overtime_hours,
                )
                .with_priority(2)
                .with_estimated_cost(overtime_hours * center.overtime_rate)
                .with_flags(false, true),
            );
        }

        // 3. 改期：逐一超載期間，找下一個有剩餘產能的期間
        for overloaded in profile.overloaded_periods() {
            let target = profile
                .periods
                .iter()
                .find(|p| p.start > overloaded.start && p.remaining() > Decimal::ZERO);
            if let Some(target) = target {
                let move_hours = overloaded.excess().min(target.remaining());
                let days_delayed = (target.start - overloaded.start).num_days();
                suggestions.push(
                    ResolutionSuggestion::new(
                        work_center_id.to_string(),
                        ResolutionAction::Reschedule {
                            from_period_start: overloaded.start,
                            from_period_end: overloaded.end,
                            new_date: target.start,
                            days_delayed,
                        },
                        format!(
                            "將 {} 小時負荷由 {} 延後 {} 天至 {}",
                            move_hours, overloaded.start, days_delayed, target.start
                        ),
                        move_hours,
                    )
                    .with_priority(3)
                    .with_flags(false, true),
                );
            }
        }

        // 4. 拆分：固定啟發式，假設解決 50% 超載，一律需審批、不可自動套用
        suggestions.push(
            ResolutionSuggestion::new(
                work_center_id.to_string(),
                ResolutionAction::Split { portions: 2 },
                "拆分訂單分散負荷".to_string(),
                excess / Decimal::TWO,
            )
            .with_priority(4)
            .with_flags(true, false),
        );

        // 5. 增班：僅當超載超過加班上限時建議
        if excess > max_overtime {
            let shift_capacity = center.shift_hours * Decimal::from(working_days);
            suggestions.push(
                ResolutionSuggestion::new(
                    work_center_id.to_string(),
                    ResolutionAction::AddShift {
                        shift_hours: center.shift_hours,
                    },
                    format!("增加一個班次（{} 小時/日）", center.shift_hours),
                    shift_capacity,
                )
                .with_priority(5)
                .with_flags(true, false),
            );
        }

        suggestions.sort_by_key(|s| s.priority);
        Ok(suggestions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use planning_bom::BomManager;
    use planning_core::{BomLine, Operation, OrderType, WorkCenter};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn horizon() -> PlanningHorizon {
        // 兩週：8/3（週一）~ 8/16（週日）
        PlanningHorizon::new(date(2026, 8, 3), date(2026, 8, 16))
    }

    /// 單工作中心 + 單工序途程 + 單行 BOM 的測試環境
    fn build_env() -> (WorkCenterManager, RoutingManager, BomManager) {
        let mut centers = WorkCenterManager::new();
        centers.register(WorkCenter::new("WC-WELD".to_string(), "焊接".to_string()));

        let mut routings = RoutingManager::new();
        let rid = routings.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
        routings
            .add_operation(
                rid,
                // 30 分準備 + 6 分/件
                Operation::new(10, "WC-WELD".to_string(), Decimal::from(30), Decimal::from(6)),
            )
            .unwrap();
        routings.release(rid).unwrap();

        let mut bom = BomManager::new();
        let bid = bom.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
        bom.add_line(
            bid,
            BomLine::new(10, "FRAME-001".to_string(), Decimal::ONE, "PCS".to_string()),
        )
        .unwrap();
        bom.release(bid).unwrap();

        (centers, routings, bom)
    }

    fn planned_order(qty: i64, start: NaiveDate) -> PlannedOrder {
        PlannedOrder::new(
            "BIKE-001".to_string(),
            Decimal::from(qty),
            start,
            date(2026, 8, 20),
            OrderType::Manufacturing,
        )
    }

    #[test]
    fn test_profile_from_work_orders_and_planned_orders() {
        let (centers, routings, bom) = build_env();
        let planner = CapacityPlanner::new(&centers, &routings);

        let mut orders = WorkOrderManager::new();
        // 工單 10 件：準備 0.5h + 加工 1h = 1.5h，開工 8/4
        orders
            .create(
                &bom,
                &routings,
                "BIKE-001",
                Decimal::from(10),
                date(2026, 8, 4),
                date(2026, 8, 7),
                date(2026, 8, 1),
            )
            .unwrap();

        // 計劃訂單 20 件：0.5 + 2 = 2.5h，開工 8/11（第二週）
        let planned = vec![planned_order(20, date(2026, 8, 11))];

        let profile = planner
            .calculate_load("WC-WELD", &horizon(), &orders, &planned)
            .unwrap();

        assert_eq!(profile.periods.len(), 2);
        assert_eq!(profile.periods[0].loaded_hours, Decimal::new(15, 1));
        assert_eq!(profile.periods[1].loaded_hours, Decimal::new(25, 1));
        assert_eq!(profile.total_loaded, Decimal::from(4));
        // 兩週各 5 個工作日 × 8 小時
        assert_eq!(profile.total_available, Decimal::from(80));
        assert!(!profile.is_overloaded());
        assert_eq!(profile.excess_load(), Decimal::ZERO);

        // 負荷記錄的來源類型
        assert_eq!(
            profile.periods[0].loads[0].source_type,
            LoadSourceType::WorkOrder
        );
        assert_eq!(
            profile.periods[1].loads[0].source_type,
            LoadSourceType::PlannedOrder
        );
    }

    #[test]
    fn test_cancelled_orders_do_not_load() {
        let (centers, routings, bom) = build_env();
        let planner = CapacityPlanner::new(&centers, &routings);

        let mut orders = WorkOrderManager::new();
        let id = orders
            .create(
                &bom,
                &routings,
                "BIKE-001",
                Decimal::from(10),
                date(2026, 8, 4),
                date(2026, 8, 7),
                date(2026, 8, 1),
            )
            .unwrap();
        orders.cancel(id).unwrap();

        let profile = planner
            .calculate_load("WC-WELD", &horizon(), &orders, &[])
            .unwrap();
        assert_eq!(profile.total_loaded, Decimal::ZERO);
    }

    #[test]
    fn test_no_overload_no_suggestions() {
        let (centers, routings, _) = build_env();
        let planner = CapacityPlanner::new(&centers, &routings);
        let orders = WorkOrderManager::new();

        let suggestions = planner
            .suggest_resolutions("WC-WELD", &horizon(), &orders, &[])
            .unwrap();
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_overload_suggestion_ranking() {
        // 主中心每日 1 小時（兩週共 10h），替代中心空載
        let mut centers = WorkCenterManager::new();
        centers.register(
            WorkCenter::new("WC-WELD".to_string(), "焊接".to_string())
                .with_hours_per_day(Decimal::ONE)
                .with_alternate("WC-WELD-2".to_string())
                .with_overtime_rate(Decimal::from(30)),
        );
        centers.register(
            WorkCenter::new("WC-WELD-2".to_string(), "焊接備援".to_string())
                .with_hours_per_day(Decimal::ONE),
        );

        let mut routings = RoutingManager::new();
        let rid = routings.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
        routings
            .add_operation(
                rid,
                // 每件 60 分 → 30 件 = 30h，遠超兩週 10h 可用
                Operation::new(10, "WC-WELD".to_string(), Decimal::ZERO, Decimal::from(60)),
            )
            .unwrap();
        routings.release(rid).unwrap();

        let planner = CapacityPlanner::new(&centers, &routings);
        let orders = WorkOrderManager::new();
        let planned = vec![planned_order(30, date(2026, 8, 4))];

        let suggestions = planner
            .suggest_resolutions("WC-WELD", &horizon(), &orders, &planned)
            .unwrap();

        // 超載 20h；替代中心先於加班，拆分/增班殿後
        let kinds: Vec<&str> = suggestions.iter().map(|s| s.action.kind()).collect();
        let alt_pos = kinds.iter().position(|k| *k == "alternative_work_center").unwrap();
        let ot_pos = kinds.iter().position(|k| *k == "overtime").unwrap();
        let split_pos = kinds.iter().position(|k| *k == "split").unwrap();
        assert!(alt_pos < ot_pos);
        assert!(ot_pos < split_pos);

        // 替代中心可承接其全部剩餘 10h
        let alt = &suggestions[alt_pos];
        assert_eq!(alt.hours_resolved, Decimal::from(10));
        assert!(alt.can_auto_apply);
        assert!(!alt.requires_approval);

        // 超載 20h（30 − 10），但加班上限 4h × 10 工作日 = 40h → 建議 20h
        let ot = &suggestions[ot_pos];
        assert_eq!(ot.hours_resolved, Decimal::from(20));
        assert_eq!(ot.estimated_cost, Decimal::from(600));

        // 拆分固定解決一半超載、需審批
        let split = &suggestions[split_pos];
        assert_eq!(split.hours_resolved, Decimal::from(10));
        assert!(split.requires_approval);
        assert!(!split.can_auto_apply);

        // 超載未超過加班上限 → 不建議增班
        assert!(!kinds.contains(&"add_shift"));
    }

    #[test]
    fn test_add_shift_suggested_when_overtime_insufficient() {
        // 單日工作（只開週一）且加班上限低，迫使增班建議出現
        let mut centers = WorkCenterManager::new();
        centers.register(
            WorkCenter::new("WC-WELD".to_string(), "焊接".to_string())
                .with_hours_per_day(Decimal::ONE)
                .with_working_days([true, false, false, false, false, false, false])
                .with_shift_hours(Decimal::from(8)),
        );

        let mut routings = RoutingManager::new();
        let rid = routings.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
        routings
            .add_operation(
                rid,
                Operation::new(10, "WC-WELD".to_string(), Decimal::ZERO, Decimal::from(60)),
            )
            .unwrap();
        routings.release(rid).unwrap();

        let planner = CapacityPlanner::new(&centers, &routings);
        let orders = WorkOrderManager::new();
        // 兩週只有 2 個工作日：可用 2h、加班上限 8h、負荷 30h → 超載 28h > 8h
        let planned = vec![planned_order(30, date(2026, 8, 3))];

        let suggestions = planner
            .suggest_resolutions("WC-WELD", &horizon(), &orders, &planned)
            .unwrap();

        let add_shift = suggestions
            .iter()
            .find(|s| s.action.kind() == "add_shift")
            .expect("應建議增班");
        // 8h/班 × 2 工作日
        assert_eq!(add_shift.hours_resolved, Decimal::from(16));
        assert!(add_shift.requires_approval);
        assert!(!add_shift.can_auto_apply);
    }

    #[test]
    fn test_reschedule_targets_later_spare_period() {
        // 第一週超載、第二週空閒 → 改期建議指向第二週
        let (mut centers, _, _) = build_env();
        centers.register(WorkCenter::new("WC-WELD".to_string(), "焊接".to_string()));

        let mut routings = RoutingManager::new();
        let rid = routings.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
        routings
            .add_operation(
                rid,
                Operation::new(10, "WC-WELD".to_string(), Decimal::ZERO, Decimal::from(60)),
            )
            .unwrap();
        routings.release(rid).unwrap();

        let planner = CapacityPlanner::new(&centers, &routings);
        let orders = WorkOrderManager::new();
        // 第一週負荷 85h（整體可用 80h），第二週 0h
        let planned = vec![planned_order(85, date(2026, 8, 4))];

        let suggestions = planner
            .suggest_resolutions("WC-WELD", &horizon(), &orders, &planned)
            .unwrap();

        let reschedule = suggestions
            .iter()
            .find(|s| s.action.kind() == "reschedule")
            .expect("應建議改期");
        match &reschedule.action {
            ResolutionAction::Reschedule {
                new_date,
                days_delayed,
                ..
            } => {
                assert_eq!(*new_date, date(2026, 8, 10));
                assert_eq!(*days_delayed, 7);
            }
            other => panic!("預期改期動作，得到 {other:?}"),
        }
        // 第一週超出 45h，第二週剩餘 40h → 移動 40h
        assert_eq!(reschedule.hours_resolved, Decimal::from(40));
    }

    #[test]
    fn test_calculate_load_all_covers_active_centers() {
        let (mut centers, routings, _) = build_env();
        centers.register(WorkCenter::new("WC-PAINT".to_string(), "噴塗".to_string()));

        let planner = CapacityPlanner::new(&centers, &routings);
        let orders = WorkOrderManager::new();

        let profiles = planner
            .calculate_load_all(&horizon(), &orders, &[])
            .unwrap();
        assert_eq!(profiles.len(), 2);
    }
}
