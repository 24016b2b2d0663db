//! # 製造計劃核心
//!
//! BOM/途程主檔、MRP 引擎、產能計劃與工單執行組成的閉環計劃系統：
//! BOM 與途程定義產品「做什麼、怎麼做」；MRP 把需求轉為時間分期、
//! 已淨算、已批量化的供應建議；產能計劃對照有限工作中心產能驗證
//! 建議並提出解法；工單在受控生命週期中執行最終計劃。
//!
//! 本 crate 彙整各子 crate 的公開介面。

pub use planning_bom::{BomManager, ExplodedComponent, RoutingManager, WhereUsedEntry};
pub use planning_capacity::{
    ApplyContext, ApplyOutcome, CapacityPlanner, CapacityResolver, WorkCenterManager,
};
pub use planning_core::*;
pub use planning_mrp::{
    ForecastChain, ForecastProvider, LotSizingCalculator, MrpEngine, NettingCalculator,
    PeggingCalculator,
};
pub use planning_workorder::WorkOrderManager;
