//! # Planning MRP
//!
//! 物料需求計劃引擎：毛轉淨、批量規則、多層展開、需求追溯

pub mod engine;
pub mod forecast;
pub mod lot_sizing;
pub mod netting;
pub mod pegging;

// Re-export 主要類型
pub use engine::MrpEngine;
pub use forecast::{ForecastChain, ForecastProvider};
pub use lot_sizing::LotSizingCalculator;
pub use netting::{ComponentPlan, NettingCalculator};
pub use pegging::PeggingCalculator;

/// MRP 多層展開最大層級（超過時記錄警告並停止，不視為錯誤）
pub const MAX_MRP_LEVEL: u32 = 10;
