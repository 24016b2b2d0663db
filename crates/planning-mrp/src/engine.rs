//! MRP 主引擎
//!
//! 對頂層物料執行毛轉淨，對生產型計劃訂單逐層展開 BOM，
//! 深度優先地為每個組件重複淨算。計算中的異常被捕獲為
//! 結果的錯誤項，部分結果仍回傳給呼叫端。

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use planning_bom::BomManager;
use planning_core::{
    DemandProvider, InventoryProvider, LotSizingStrategy, MrpParameters, MrpResult, OrderType,
    PlanningHorizon, Result,
};

use crate::netting::NettingCalculator;
use crate::MAX_MRP_LEVEL;

/// MRP 引擎
pub struct MrpEngine<'a, I: InventoryProvider, D: DemandProvider> {
    bom: &'a BomManager,
    inventory: &'a I,
    demand: &'a D,
}

impl<'a, I: InventoryProvider, D: DemandProvider> MrpEngine<'a, I, D> {
    /// 創建新的引擎
    pub fn new(bom: &'a BomManager, inventory: &'a I, demand: &'a D) -> Self {
        Self {
            bom,
            inventory,
            demand,
        }
    }

    /// 主 MRP 計算入口
    ///
    /// 簽名不回傳 Err：計算異常轉為 `result.errors` 項目，
    /// 已算出的需求與訂單保留在結果中供呼叫端使用。
    pub fn calculate(
        &self,
        product_id: &str,
        horizon: &PlanningHorizon,
        strategy: LotSizingStrategy,
        params: &MrpParameters,
    ) -> MrpResult {
        tracing::info!(
            "開始 MRP 計算：物料 {}，時界 {} ~ {}",
            product_id,
            horizon.start,
            horizon.end
        );

        let mut result = MrpResult::empty(product_id.to_string(), params.clone());

        if let Err(err) = self.calculate_inner(product_id, horizon, strategy, params, &mut result)
        {
            // 異常轉為結果錯誤項，部分結果仍可用
            let captured = planning_core::PlanningError::CalculationError(err.to_string());
            tracing::warn!("MRP 計算中斷：{}", captured);
            result.add_error(captured.to_string());
        }

        tracing::info!(
            "MRP 計算完成：計劃訂單 {} 筆，需求 {} 筆，警告 {} 則，錯誤 {} 則",
            result.planned_orders.len(),
            result.requirements.len(),
            result.warnings.len(),
            result.errors.len()
        );

        result
    }

    fn calculate_inner(
        &self,
        product_id: &str,
        horizon: &PlanningHorizon,
        strategy: LotSizingStrategy,
        params: &MrpParameters,
        result: &mut MrpResult,
    ) -> Result<()> {
        // Step 1: 合併獨立需求與相依需求為毛需求
        let mut sources = self.demand.independent_demand(product_id, horizon);
        sources.extend(self.demand.dependent_demand(product_id, horizon));

        let gross = NettingCalculator::gross_by_date(
            sources.into_iter().map(|s| (s.date, s.quantity)),
        );

        if gross.is_empty() {
            tracing::debug!("物料 {} 時界內無需求", product_id);
            return Ok(());
        }

        // Step 2-3: 淨算 + 多層展開
        self.plan_level(product_id, &gross, 0, None, horizon, strategy, params, result)
    }

    /// 對時界內所有主排程物料執行 MRP，每個物料各自回傳結果
    pub fn calculate_master_schedule(
        &self,
        horizon: &PlanningHorizon,
        strategy: LotSizingStrategy,
        params: &MrpParameters,
    ) -> Vec<MrpResult> {
        let products = self.demand.master_scheduled_products(horizon);
        tracing::info!("主排程批次 MRP：{} 個物料", products.len());

        products
            .iter()
            .map(|product_id| self.calculate(product_id, horizon, strategy, params))
            .collect()
    }

    /// 以重生成方式持久化計算結果：逐物料刪舊存新，儲存本身由倉儲協作者承擔
    pub fn regenerate(&self, store: &mut impl planning_core::PlannedOrderStore, result: &MrpResult) {
        let mut products: Vec<&str> = result
            .planned_orders
            .iter()
            .map(|o| o.product_id.as_str())
            .collect();
        products.sort_unstable();
        products.dedup();

        for product_id in products {
            let orders: Vec<_> = result
                .planned_orders
                .iter()
                .filter(|o| o.product_id == product_id)
                .cloned()
                .collect();
            store.delete_planned_orders(product_id);
            store.save_planned_orders(product_id, &orders);
        }
    }

    /// 追溯指定物料在指定日期的需求來源（含父件衍生需求）
    pub fn peg(&self, product_id: &str, date: NaiveDate) -> Vec<planning_core::DemandSource> {
        crate::pegging::PeggingCalculator::peg(self.bom, self.demand, product_id, date)
    }

    /// 在指定層級淨算單一物料，並對生產型訂單展開下一層
    #[allow(clippy::too_many_arguments)]
    fn plan_level(
        &self,
        product_id: &str,
        gross: &BTreeMap<NaiveDate, Decimal>,
        level: u32,
        parent_product_id: Option<&str>,
        horizon: &PlanningHorizon,
        strategy: LotSizingStrategy,
        params: &MrpParameters,
        result: &mut MrpResult,
    ) -> Result<()> {
        if level > MAX_MRP_LEVEL {
            result.add_warning(format!(
                "物料 {} 超過最大展開層級 {}，停止展開",
                product_id, MAX_MRP_LEVEL
            ));
            return Ok(());
        }

        tracing::debug!("計算物料 MRP: {} (層級 {})", product_id, level);

        // 訂單類型僅由是否存在生效 BOM 決定
        let order_type = if self.bom.get_effective(product_id, horizon.start).is_some() {
            OrderType::Manufacturing
        } else {
            OrderType::Purchase
        };

        let plan = NettingCalculator::plan(
            product_id,
            gross,
            self.inventory,
            horizon,
            strategy,
            params,
            order_type,
            level,
            parent_product_id,
        );

        result.requirements.extend(plan.requirements);
        result.warnings.extend(plan.warnings);

        // 生產型訂單展開一層 BOM，為每個組件遞迴淨算
        for order in &plan.planned_orders {
            if !order.is_manufacturing() {
                continue;
            }

            let Some(bom) = self.bom.get_effective(product_id, order.due_date) else {
                result.add_warning(format!(
                    "物料 {} 在 {} 無生效 BOM，無法展開訂單需求",
                    product_id, order.due_date
                ));
                continue;
            };

            for line in bom.effective_lines(order.due_date) {
                let component_gross = NettingCalculator::gross_by_date([(
                    order.start_date,
                    line.quantity_with_scrap() * order.quantity,
                )]);

                self.plan_level(
                    &line.component_id,
                    &component_gross,
                    level + 1,
                    Some(product_id),
                    horizon,
                    strategy,
                    params,
                    result,
                )?;
            }
        }

        result.planned_orders.extend(plan.planned_orders);
        Ok(())
    }
}
