//! 集成測試：計劃閉環端到端場景

use chrono::NaiveDate;
use mfg_planning::*;
use rust_decimal::Decimal;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn line(no: u32, component: &str, qty: i64) -> BomLine {
    BomLine::new(no, component.to_string(), Decimal::from(qty), "PCS".to_string())
}

#[test]
fn test_simple_netting_scenario() {
    // 場景：庫存 10、安全庫存 2、第 30 天毛需求 15、提前期 5 天、批對批
    // ⇒ 淨需求 7、下單日 = 第 25 天、計劃訂單 7
    init_tracing();

    let bom = BomManager::new();
    let inventory = MemInventoryProvider::new()
        .with_on_hand("P-100", Decimal::from(10))
        .with_safety_stock("P-100", Decimal::from(2))
        .with_lead_time("P-100", 5);
    let demand = MemDemandProvider::new().with_source(
        DemandSource::new(
            "P-100".to_string(),
            Decimal::from(15),
            date(2026, 8, 31), // 時界第 30 天
            DemandSourceType::SalesOrder,
        )
        .with_reference("SO-900".to_string()),
    );

    let horizon = PlanningHorizon::new(date(2026, 8, 1), date(2026, 10, 31));
    let engine = MrpEngine::new(&bom, &inventory, &demand);
    let result = engine.calculate(
        "P-100",
        &horizon,
        LotSizingStrategy::LotForLot,
        &MrpParameters::new(),
    );

    assert!(result.is_complete());
    assert_eq!(result.requirements.len(), 1);
    let req = &result.requirements[0];
    assert_eq!(req.gross_requirement, Decimal::from(15));
    assert_eq!(req.net_requirement, Decimal::from(7));
    assert_eq!(req.order_date, date(2026, 8, 26)); // 第 25 天

    assert_eq!(result.planned_orders.len(), 1);
    let order = &result.planned_orders[0];
    assert_eq!(order.quantity, Decimal::from(7));
    assert_eq!(order.order_type, OrderType::Purchase); // 無 BOM → 採購
    assert_eq!(order.start_date, date(2026, 8, 26));
}

#[test]
fn test_eoq_scenario() {
    // 場景：淨需求 50、年需求 1200、訂購成本 100、持有成本 10
    // ⇒ EOQ = sqrt(24000) ≈ 154.9，訂購量 = max(50, 154.9)
    init_tracing();

    let bom = BomManager::new();
    let inventory = MemInventoryProvider::new().with_lead_time("P-200", 3);
    let demand = MemDemandProvider::new().with_source(DemandSource::new(
        "P-200".to_string(),
        Decimal::from(50),
        date(2026, 9, 15),
        DemandSourceType::Forecast,
    ));

    let horizon = PlanningHorizon::new(date(2026, 8, 1), date(2026, 10, 31));
    let engine = MrpEngine::new(&bom, &inventory, &demand);
    let params = MrpParameters::new().with_eoq_costs(
        Decimal::from(1200),
        Decimal::from(100),
        Decimal::from(10),
    );
    let result = engine.calculate(
        "P-200",
        &horizon,
        LotSizingStrategy::EconomicOrderQuantity,
        &params,
    );

    let order = &result.planned_orders[0];
    assert!(order.quantity > Decimal::new(1549, 1) && order.quantity < Decimal::new(1550, 1));
    assert_eq!(order.original_requirement, Decimal::from(50));
    // 批量多出的部分記錄在訂單上
    assert!(order.lot_sizing_excess() > Decimal::from(104));
}

#[test]
fn test_circular_bom_rejected_before_persistence() {
    // 場景：A 含 B，再把 A 加入 B 的 BOM ⇒ 寫入前即拒絕
    init_tracing();

    let mut bom = BomManager::new();
    let a = bom.create("PART-A", "A", date(2026, 1, 1)).unwrap();
    bom.add_line(a, line(10, "PART-B", 1)).unwrap();
    bom.release(a).unwrap();

    let b = bom.create("PART-B", "A", date(2026, 1, 1)).unwrap();
    let err = bom.add_line(b, line(10, "PART-A", 1)).unwrap_err();

    match err {
        PlanningError::CircularDependency { path } => {
            assert!(path.contains(&"PART-A".to_string()));
            assert!(path.contains(&"PART-B".to_string()));
        }
        other => panic!("預期循環依賴錯誤，得到 {other:?}"),
    }
    assert!(bom.get(b).unwrap().lines.is_empty());
}

#[test]
fn test_overload_resolution_ranking_scenario() {
    // 場景：工作中心超載 10 小時，替代中心剩餘 6 小時、加班上限 8 小時
    // ⇒ 建議依序：替代中心（6h）→ 加班（8h）→ 拆分/增班
    init_tracing();

    // 主中心：週一/週二各 5 小時 → 一週可用 10h；加班上限 4h × 2 天 = 8h
    let mut centers = WorkCenterManager::new();
    centers.register(
        WorkCenter::new("WC-MAIN".to_string(), "主線".to_string())
            .with_hours_per_day(Decimal::from(5))
            .with_working_days([true, true, false, false, false, false, false])
            .with_alternate("WC-ALT".to_string())
            .with_overtime_rate(Decimal::from(25)),
    );
    // 替代中心：週一/週二各 3 小時 → 剩餘 6h
    centers.register(
        WorkCenter::new("WC-ALT".to_string(), "備援線".to_string())
            .with_hours_per_day(Decimal::from(3))
            .with_working_days([true, true, false, false, false, false, false]),
    );

    let mut routings = RoutingManager::new();
    let rid = routings.create("P-300", "A", date(2026, 1, 1)).unwrap();
    routings
        .add_operation(
            rid,
            Operation::new(10, "WC-MAIN".to_string(), Decimal::ZERO, Decimal::from(60)),
        )
        .unwrap();
    routings.release(rid).unwrap();

    // P-300 的 BOM（建工單需要）
    let mut bom = BomManager::new();
    let bid = bom.create("P-300", "A", date(2026, 1, 1)).unwrap();
    bom.add_line(bid, line(10, "RAW-300", 1)).unwrap();
    bom.release(bid).unwrap();

    let planner = CapacityPlanner::new(&centers, &routings);
    let mut orders = WorkOrderManager::new();

    // 一週時界；工單 20 件 × 1h = 20h，可用 10h ⇒ 超載 10h
    let horizon = PlanningHorizon::new(date(2026, 8, 3), date(2026, 8, 9));
    orders
        .create(
            &bom,
            &routings,
            "P-300",
            Decimal::from(20),
            date(2026, 8, 3),
            date(2026, 8, 9),
            date(2026, 8, 3),
        )
        .unwrap();

    let profile = planner
        .calculate_load("WC-MAIN", &horizon, &orders, &[])
        .unwrap();
    assert!(profile.is_overloaded());
    assert_eq!(profile.excess_load(), Decimal::from(10));

    let suggestions = planner
        .suggest_resolutions("WC-MAIN", &horizon, &orders, &[])
        .unwrap();

    let kinds: Vec<&str> = suggestions.iter().map(|s| s.action.kind()).collect();
    let alt_pos = kinds.iter().position(|k| *k == "alternative_work_center").unwrap();
    let ot_pos = kinds.iter().position(|k| *k == "overtime").unwrap();
    let split_pos = kinds.iter().position(|k| *k == "split").unwrap();
    let shift_pos = kinds.iter().position(|k| *k == "add_shift").unwrap();

    assert!(alt_pos < ot_pos, "替代中心應先於加班");
    assert!(ot_pos < split_pos, "加班應先於拆分");
    assert!(ot_pos < shift_pos, "加班應先於增班");

    assert_eq!(suggestions[alt_pos].hours_resolved, Decimal::from(6));
    assert_eq!(suggestions[ot_pos].hours_resolved, Decimal::from(8));
    assert_eq!(suggestions[ot_pos].estimated_cost, Decimal::from(200));

    // 自動解決：只套用可自動套用且不需審批者，超載歸零即停
    let resolver = CapacityResolver::new();
    let applied = resolver.auto_resolve(
        &suggestions,
        profile.excess_load(),
        &horizon,
        &mut orders,
        &mut centers,
    );

    let applied_kinds: Vec<&str> = applied.iter().map(|s| s.action.kind()).collect();
    assert_eq!(applied_kinds, vec!["alternative_work_center", "overtime"]);

    // 工序已轉到替代中心
    assert!(orders.all()[0]
        .operation_lines()
        .iter()
        .all(|l| l.work_center_id.as_deref() == Some("WC-ALT")));

    // 加班已核准到主中心日曆上
    let total_overtime: Decimal = centers
        .get("WC-MAIN")
        .unwrap()
        .overtime
        .values()
        .copied()
        .sum();
    assert_eq!(total_overtime, Decimal::from(8));
}

#[test]
fn test_closed_loop_planning_flow() {
    // 閉環：BOM/途程 → MRP → 產能 → 工單生命週期
    init_tracing();

    // 1. 主檔：BIKE = 2×WHEEL（損耗 20%）+ 1×FRAME；焊接 + 噴塗
    let mut bom = BomManager::new();
    let bike_bom = bom.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
    bom.add_line(
        bike_bom,
        line(10, "WHEEL-001", 2).with_scrap_pct(Decimal::from(20)),
    )
    .unwrap();
    bom.add_line(bike_bom, line(20, "FRAME-001", 1)).unwrap();
    bom.release(bike_bom).unwrap();

    let mut routings = RoutingManager::new();
    let bike_routing = routings.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
    routings
        .add_operation(
            bike_routing,
            Operation::new(10, "WC-WELD".to_string(), Decimal::from(30), Decimal::from(12))
                .with_overlap_pct(Decimal::from(50)),
        )
        .unwrap();
    routings
        .add_operation(
            bike_routing,
            Operation::new(20, "WC-PAINT".to_string(), Decimal::from(20), Decimal::from(6)),
        )
        .unwrap();
    routings.release(bike_routing).unwrap();

    let mut centers = WorkCenterManager::new();
    centers.register(WorkCenter::new("WC-WELD".to_string(), "焊接".to_string()));
    centers.register(WorkCenter::new("WC-PAINT".to_string(), "噴塗".to_string()));

    // 2. MRP：40 台需求，無庫存
    let inventory = MemInventoryProvider::new()
        .with_lead_time("BIKE-001", 5)
        .with_lead_time("WHEEL-001", 3)
        .with_lead_time("FRAME-001", 3);
    let demand = MemDemandProvider::new().with_source(DemandSource::new(
        "BIKE-001".to_string(),
        Decimal::from(40),
        date(2026, 9, 7),
        DemandSourceType::SalesOrder,
    ));

    let horizon = PlanningHorizon::new(date(2026, 8, 3), date(2026, 9, 27));
    let engine = MrpEngine::new(&bom, &inventory, &demand);
    let result = engine.calculate(
        "BIKE-001",
        &horizon,
        LotSizingStrategy::LotForLot,
        &MrpParameters::new(),
    );

    assert!(result.is_complete());
    // 輪子含損耗：2 / 0.8 × 40 = 100
    let wheel_qty: Decimal = result
        .planned_orders
        .iter()
        .filter(|o| o.product_id == "WHEEL-001")
        .map(|o| o.quantity)
        .sum();
    assert_eq!(wheel_qty, Decimal::from(100));

    // 3. 產能：計劃訂單的工時由計劃器經途程推導
    let orders = WorkOrderManager::new();
    let planner = CapacityPlanner::new(&centers, &routings);
    let profile = planner
        .calculate_load("WC-WELD", &horizon, &orders, &result.planned_orders)
        .unwrap();

    // 焊接負荷：0.5h 準備 + 40 × 0.2h 加工 = 8.5h
    assert_eq!(profile.total_loaded, Decimal::new(85, 1));
    assert!(!profile.is_overloaded());

    // 4. 途程交期：重疊率折減後 (30 + 12×40) + (20 + 6×40) × 0.5 = 640 分鐘
    let lead = routings
        .lead_time_hours(bike_routing, Decimal::from(40))
        .unwrap();
    assert_eq!(lead * Decimal::from(60), Decimal::from(640));

    // 5. 工單執行：建單 → 下達 → 報工自動開工 → 完工 → 結案
    let mut orders = WorkOrderManager::new();
    let wo = orders
        .create(
            &bom,
            &routings,
            "BIKE-001",
            Decimal::from(40),
            date(2026, 8, 31),
            date(2026, 9, 7),
            date(2026, 8, 3),
        )
        .unwrap();

    orders.release(wo).unwrap();
    orders.issue_material(wo, 10, Decimal::from(100)).unwrap();
    orders
        .report_operation(wo, 10, Decimal::new(5, 1), Decimal::from(8), date(2026, 8, 31))
        .unwrap();
    assert_eq!(orders.get(wo).unwrap().status, WorkOrderStatus::InProgress);

    orders.complete(wo, Decimal::from(40), Decimal::ZERO).unwrap();
    assert_eq!(orders.get(wo).unwrap().status, WorkOrderStatus::Completed);

    orders.close(wo, date(2026, 9, 5)).unwrap();
    assert_eq!(orders.get(wo).unwrap().status, WorkOrderStatus::Closed);

    // 結案後任何轉換都是非法的
    let err = orders.release(wo).unwrap_err();
    assert!(matches!(err, PlanningError::InvalidStatusTransition { .. }));
}

#[test]
fn test_pegging_traces_parent_demand() {
    init_tracing();

    let mut bom = BomManager::new();
    let bike = bom.create("BIKE-001", "A", date(2026, 1, 1)).unwrap();
    bom.add_line(bike, line(10, "WHEEL-001", 2)).unwrap();
    bom.release(bike).unwrap();

    let d = date(2026, 9, 7);
    let demand = MemDemandProvider::new()
        .with_source(
            DemandSource::new(
                "BIKE-001".to_string(),
                Decimal::from(40),
                d,
                DemandSourceType::SalesOrder,
            )
            .with_reference("SO-555".to_string()),
        )
        .with_source(DemandSource::new(
            "WHEEL-001".to_string(),
            Decimal::from(10),
            d,
            DemandSourceType::WorkOrder,
        ));

    let sources = PeggingCalculator::peg(&bom, &demand, "WHEEL-001", d);

    // 自身的工單需求 + 由 BIKE 銷售訂單衍生的需求
    assert_eq!(sources.len(), 2);
    assert!(sources
        .iter()
        .any(|s| s.source_type == DemandSourceType::WorkOrder));
    assert!(sources.iter().any(|s| {
        s.source_type == DemandSourceType::Derived("derived_from_sales_order".to_string())
            && s.reference.as_deref() == Some("SO-555")
    }));
}

#[test]
fn test_mrp_errors_are_captured_not_thrown() {
    // 失敗語義：需求提供者回報了需求，但計算途中任何異常
    // 都應轉為結果錯誤項，而非讓呼叫端拿不到部分結果
    init_tracing();

    struct PanicFreeInventory;

    impl InventoryProvider for PanicFreeInventory {
        fn on_hand_quantity(&self, _: &str) -> Decimal {
            Decimal::ZERO
        }
        fn safety_stock(&self, _: &str) -> Decimal {
            Decimal::ZERO
        }
        fn scheduled_receipts(&self, _: &str, _: NaiveDate) -> Decimal {
            Decimal::ZERO
        }
        fn lead_time_days(&self, _: &str) -> u32 {
            0
        }
    }

    let bom = BomManager::new();
    let inventory = PanicFreeInventory;
    let demand = MemDemandProvider::new().with_source(DemandSource::new(
        "P-400".to_string(),
        Decimal::from(5),
        date(2026, 8, 15),
        DemandSourceType::SalesOrder,
    ));

    let horizon = PlanningHorizon::new(date(2026, 8, 1), date(2026, 8, 31));
    let engine = MrpEngine::new(&bom, &inventory, &demand);
    let result = engine.calculate(
        "P-400",
        &horizon,
        LotSizingStrategy::LotForLot,
        &MrpParameters::new(),
    );

    // 提前期 0 → 警告而非錯誤；結果完整可用
    assert!(result.is_complete());
    assert!(result.warnings.iter().any(|w| w.contains("提前期為 0")));
    assert_eq!(result.planned_orders.len(), 1);
}
