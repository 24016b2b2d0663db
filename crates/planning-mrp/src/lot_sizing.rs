//! 批量規則實現
//!
//! 所有規則保證回傳數量 ≥ 淨需求。

use planning_core::{LotSizingStrategy, MrpParameters};
use rust_decimal::Decimal;

/// 批量規則計算器
pub struct LotSizingCalculator;

impl LotSizingCalculator {
    /// 應用批量規則，將淨需求轉為訂購數量
    pub fn apply(strategy: LotSizingStrategy, net: Decimal, params: &MrpParameters) -> Decimal {
        match strategy {
            // 批對批：訂購量即淨需求
            LotSizingStrategy::LotForLot => net,

            // 固定訂購量：至少訂購固定批量
            LotSizingStrategy::FixedOrderQuantity => net.max(params.fixed_quantity),

            // 經濟訂購量：EOQ = sqrt(2 × 年需求 × 訂購成本 / 持有成本)
            LotSizingStrategy::EconomicOrderQuantity => {
                let eoq = Self::eoq(params.annual_demand, params.ordering_cost, params.holding_cost);
                net.max(eoq)
            }

            // 週期訂購量：合併未來數個週期的需求
            LotSizingStrategy::PeriodOrderQuantity => {
                net * Decimal::from(params.period_count.max(1))
            }

            // 最小單位成本：以持有成本率推導的 EOQ 變體，
            // 費率非正時退化為批對批
            LotSizingStrategy::LeastUnitCost => {
                let holding = params.holding_cost_rate * params.unit_cost;
                if holding <= Decimal::ZERO {
                    net
                } else {
                    let eoq = Self::eoq(params.annual_demand, params.ordering_cost, holding);
                    net.max(eoq)
                }
            }
        }
    }

    /// EOQ 公式，參數非正時回傳 0（由呼叫端 max 回退到淨需求）
    ///
    /// 平方根經由 f64 計算後轉回 Decimal
    fn eoq(annual_demand: Decimal, ordering_cost: Decimal, holding_cost: Decimal) -> Decimal {
        if annual_demand <= Decimal::ZERO
            || ordering_cost <= Decimal::ZERO
            || holding_cost <= Decimal::ZERO
        {
            return Decimal::ZERO;
        }

        let ratio = Decimal::TWO * annual_demand * ordering_cost / holding_cost;
        let ratio_f64 = ratio.to_string().parse::<f64>().unwrap_or(0.0);
        Decimal::try_from(ratio_f64.sqrt()).unwrap_or(Decimal::ZERO)
    }
}
