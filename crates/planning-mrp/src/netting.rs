//! 毛轉淨計算
//!
//! 單一物料在時界內的淨需求計算：以遞推的預計庫存沖抵毛需求，
//! 淨需求經批量規則轉為計劃訂單，批量多出的部分回沖預計庫存
//! 供後續期間使用。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use planning_core::{
    InventoryProvider, LotSizingStrategy, MaterialRequirement, MrpParameters, OrderType,
    PlannedOrder, PlanningHorizon,
};

use crate::lot_sizing::LotSizingCalculator;

/// 單一物料的計劃結果
#[derive(Debug, Clone, Default)]
pub struct ComponentPlan {
    /// 物料需求快照
    pub requirements: Vec<MaterialRequirement>,

    /// 計劃訂單
    pub planned_orders: Vec<PlannedOrder>,

    /// 警告信息
    pub warnings: Vec<String>,
}

/// 毛轉淨計算器
pub struct NettingCalculator;

impl NettingCalculator {
    /// 對單一物料執行淨需求計算
    ///
    /// `gross` 為已按日期彙總排序的毛需求；預計收貨逐筆入帳一次，
    /// 快照中的 scheduled_receipts 記錄截至需求日的累計值。
    #[allow(clippy::too_many_arguments)]
    pub fn plan(
        product_id: &str,
        gross: &BTreeMap<NaiveDate, Decimal>,
        inventory: &dyn InventoryProvider,
        horizon: &PlanningHorizon,
        strategy: LotSizingStrategy,
        params: &MrpParameters,
        order_type: OrderType,
        bom_level: u32,
        parent_product_id: Option<&str>,
    ) -> ComponentPlan {
        let mut plan = ComponentPlan::default();

        let on_hand = inventory.on_hand_quantity(product_id);
        let safety_stock = inventory.safety_stock(product_id);

        let mut lead_time_days = inventory.lead_time_days(product_id);
        if lead_time_days == 0 {
            lead_time_days = params.default_lead_time_days.max(1);
            plan.warnings.push(format!(
                "物料 {} 提前期為 0，改用預設 {} 天",
                product_id, lead_time_days
            ));
        }

        let mut projected_on_hand = on_hand;
        let mut receipts_credited = Decimal::ZERO;

        for (&required_date, &gross_qty) in gross {
            // 截至需求日的累計收貨，扣除已入帳部分
            let cumulative_receipts = inventory.scheduled_receipts(product_id, required_date);
            let new_receipts = cumulative_receipts - receipts_credited;
            receipts_credited = cumulative_receipts;

            let available = projected_on_hand + new_receipts - safety_stock;
            let net_requirement = (gross_qty - available).max(Decimal::ZERO);

            let mut order_date = required_date
                .checked_sub_signed(chrono::Duration::days(lead_time_days as i64))
                .unwrap_or(horizon.start);
            if order_date < horizon.start {
                plan.warnings.push(format!(
                    "物料 {} 需求日 {} 的下單日早於時界起始，已裁切",
                    product_id, required_date
                ));
                order_date = horizon.start;
            }

            plan.requirements.push(MaterialRequirement {
                product_id: product_id.to_string(),
                gross_requirement: gross_qty,
                net_requirement,
                required_date,
                order_date,
                on_hand,
                scheduled_receipts: cumulative_receipts,
                safety_stock,
                bom_level,
                parent_product_id: parent_product_id.map(str::to_string),
            });

            projected_on_hand = (available - gross_qty).max(Decimal::ZERO);

            if net_requirement > Decimal::ZERO {
                let lot_quantity = LotSizingCalculator::apply(strategy, net_requirement, params);

                plan.planned_orders.push(
                    PlannedOrder::new(
                        product_id.to_string(),
                        lot_quantity,
                        order_date,
                        required_date,
                        order_type,
                    )
                    .with_bom_level(bom_level)
                    .with_strategy(strategy, net_requirement),
                );

                // 批量多出的數量可供後續期間沖抵
                projected_on_hand += lot_quantity - net_requirement;
            }
        }

        plan
    }

    /// 將需求來源按日期彙總（升冪由 BTreeMap 保證）
    pub fn gross_by_date(
        sources: impl IntoIterator<Item = (NaiveDate, Decimal)>,
    ) -> BTreeMap<NaiveDate, Decimal> {
        let mut merged = BTreeMap::new();
        for (date, qty) in sources {
            *merged.entry(date).or_insert(Decimal::ZERO) += qty;
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planning_core::MemInventoryProvider;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn horizon() -> PlanningHorizon {
        PlanningHorizon::new(date(2026, 8, 1), date(2026, 10, 31))
    }

    #[test]
    fn test_simple_netting_scenario() {
        // 庫存 10、安全庫存 2、毛需求 15、提前期 5 天、批對批
        let inventory = MemInventoryProvider::new()
            .with_on_hand("P-001", Decimal::from(10))
            .with_safety_stock("P-001", Decimal::from(2))
            .with_lead_time("P-001", 5);

        let gross = NettingCalculator::gross_by_date([(date(2026, 8, 30), Decimal::from(15))]);

        let plan = NettingCalculator::plan(
            "P-001",
            &gross,
            &inventory,
            &horizon(),
            LotSizingStrategy::LotForLot,
            &MrpParameters::new(),
            OrderType::Purchase,
            0,
            None,
        );

        // 淨需求 = 15 − (10 − 2) = 7
        assert_eq!(plan.requirements.len(), 1);
        let req = &plan.requirements[0];
        assert_eq!(req.net_requirement, Decimal::from(7));
        assert_eq!(req.order_date, date(2026, 8, 25));

        assert_eq!(plan.planned_orders.len(), 1);
        assert_eq!(plan.planned_orders[0].quantity, Decimal::from(7));
        assert_eq!(plan.planned_orders[0].start_date, date(2026, 8, 25));
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_scheduled_receipts_credited_once() {
        // 8/10 到貨 20，兩個需求日都在其後：只能沖抵一次
        let mut inventory = MemInventoryProvider::new().with_lead_time("P-002", 3);
        inventory.add_receipt("P-002", date(2026, 8, 10), Decimal::from(20));

        let gross = NettingCalculator::gross_by_date([
            (date(2026, 8, 15), Decimal::from(20)),
            (date(2026, 8, 25), Decimal::from(20)),
        ]);

        let plan = NettingCalculator::plan(
            "P-002",
            &gross,
            &inventory,
            &horizon(),
            LotSizingStrategy::LotForLot,
            &MrpParameters::new(),
            OrderType::Purchase,
            0,
            None,
        );

        // 第一期被收貨完全沖抵，第二期需全額訂購
        assert_eq!(plan.requirements[0].net_requirement, Decimal::ZERO);
        assert_eq!(plan.requirements[1].net_requirement, Decimal::from(20));
        // 快照記錄截至需求日的累計收貨
        assert_eq!(plan.requirements[0].scheduled_receipts, Decimal::from(20));
        assert_eq!(plan.requirements[1].scheduled_receipts, Decimal::from(20));
    }

    #[test]
    fn test_zero_lead_time_defaults_with_warning() {
        let inventory = MemInventoryProvider::new();

        let gross = NettingCalculator::gross_by_date([(date(2026, 8, 15), Decimal::from(5))]);

        let plan = NettingCalculator::plan(
            "P-003",
            &gross,
            &inventory,
            &horizon(),
            LotSizingStrategy::LotForLot,
            &MrpParameters::new(),
            OrderType::Purchase,
            0,
            None,
        );

        assert!(plan.warnings.iter().any(|w| w.contains("提前期為 0")));
        // 預設 1 天提前期
        assert_eq!(plan.planned_orders[0].start_date, date(2026, 8, 14));
    }

    #[test]
    fn test_order_date_clipped_to_horizon_start() {
        let inventory = MemInventoryProvider::new().with_lead_time("P-004", 10);

        // 需求日離時界起始不足 10 天
        let gross = NettingCalculator::gross_by_date([(date(2026, 8, 5), Decimal::from(5))]);

        let plan = NettingCalculator::plan(
            "P-004",
            &gross,
            &inventory,
            &horizon(),
            LotSizingStrategy::LotForLot,
            &MrpParameters::new(),
            OrderType::Purchase,
            0,
            None,
        );

        assert_eq!(plan.planned_orders[0].start_date, date(2026, 8, 1));
        assert!(plan.warnings.iter().any(|w| w.contains("裁切")));
    }

    #[test]
    fn test_lot_sizing_excess_offsets_next_period() {
        // 固定批量 100，第一期淨需求 40 → 訂 100，多出 60 沖抵第二期 50
        let inventory = MemInventoryProvider::new().with_lead_time("P-005", 2);

        let gross = NettingCalculator::gross_by_date([
            (date(2026, 8, 10), Decimal::from(40)),
            (date(2026, 8, 20), Decimal::from(50)),
        ]);

        let plan = NettingCalculator::plan(
            "P-005",
            &gross,
            &inventory,
            &horizon(),
            LotSizingStrategy::FixedOrderQuantity,
            &MrpParameters::new().with_fixed_quantity(Decimal::from(100)),
            OrderType::Purchase,
            0,
            None,
        );

        assert_eq!(plan.planned_orders.len(), 1);
        assert_eq!(plan.planned_orders[0].quantity, Decimal::from(100));
        assert_eq!(plan.requirements[1].net_requirement, Decimal::ZERO);
    }

    #[test]
    fn test_gross_merges_same_date() {
        let merged = NettingCalculator::gross_by_date([
            (date(2026, 8, 10), Decimal::from(30)),
            (date(2026, 8, 10), Decimal::from(20)),
            (date(2026, 8, 5), Decimal::from(10)),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&date(2026, 8, 10)], Decimal::from(50));
        // BTreeMap 保證日期升冪
        assert_eq!(*merged.keys().next().unwrap(), date(2026, 8, 5));
    }
}
