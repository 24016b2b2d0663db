//! 需求追溯
//!
//! 回答「這個物料在這一天的需求從哪裡來」：直接需求來源，
//! 加上沿 BOM 反查（where-used）取得的父件需求，後者以
//! `derived_from_<原類型>` 重新標記。

use chrono::NaiveDate;
use std::collections::HashSet;

use planning_bom::BomManager;
use planning_core::{DemandProvider, DemandSource};

/// 需求追溯計算器
pub struct PeggingCalculator;

impl PeggingCalculator {
    /// 追溯指定物料在指定日期的所有需求來源
    pub fn peg(
        bom: &BomManager,
        demand: &impl DemandProvider,
        product_id: &str,
        date: NaiveDate,
    ) -> Vec<DemandSource> {
        let mut sources = demand.demand_sources(product_id, date);

        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(product_id.to_string());

        Self::walk_parents(bom, demand, product_id, product_id, date, &mut visited, &mut sources);

        sources
    }

    /// 沿 where-used 向上走訪父件，收集衍生需求
    #[allow(clippy::too_many_arguments)]
    fn walk_parents(
        bom: &BomManager,
        demand: &impl DemandProvider,
        root_product_id: &str,
        current_product_id: &str,
        date: NaiveDate,
        visited: &mut HashSet<String>,
        out: &mut Vec<DemandSource>,
    ) {
        for entry in bom.where_used(current_product_id) {
            if !visited.insert(entry.product_id.clone()) {
                continue;
            }

            for parent_source in demand.demand_sources(&entry.product_id, date) {
                out.push(parent_source.as_derived(root_product_id.to_string()));
            }

            Self::walk_parents(
                bom,
                demand,
                root_product_id,
                &entry.product_id,
                date,
                visited,
                out,
            );
        }
    }
}
