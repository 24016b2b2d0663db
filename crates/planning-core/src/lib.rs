//! # Planning Core
//!
//! 製造計劃核心資料模型與類型定義

pub mod bom;
pub mod capacity;
pub mod demand;
pub mod horizon;
pub mod providers;
pub mod requirement;
pub mod routing;
pub mod work_center;
pub mod work_order;

// Re-export 主要類型
pub use bom::{Bom, BomLine, RevisionStatus};
pub use capacity::{
    CapacityLoad, CapacityPeriod, CapacityProfile, LoadSourceType, ResolutionAction,
    ResolutionSuggestion,
};
pub use demand::{DemandSource, DemandSourceType};
pub use horizon::PlanningHorizon;
pub use providers::{
    DemandProvider, InventoryProvider, MemDemandProvider, MemInventoryProvider,
    MemPlannedOrderStore, PlannedOrderStore,
};
pub use requirement::{
    LotSizingStrategy, MaterialRequirement, MrpParameters, MrpResult, OrderType, PlannedOrder,
};
pub use routing::{Operation, Routing};
pub use work_center::WorkCenter;
pub use work_order::{WorkOrder, WorkOrderLine, WorkOrderLineType, WorkOrderStatus};

use uuid::Uuid;

/// 計劃核心錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    #[error("找不到 BOM: {0}")]
    BomNotFound(Uuid),

    #[error("找不到產品的生效 BOM: {0}")]
    NoEffectiveBom(String),

    #[error("找不到途程: {0}")]
    RoutingNotFound(Uuid),

    #[error("找不到產品的生效途程: {0}")]
    NoEffectiveRouting(String),

    #[error("找不到工作中心: {0}")]
    WorkCenterNotFound(String),

    #[error("找不到工單: {0}")]
    WorkOrderNotFound(Uuid),

    #[error("檢測到循環依賴: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<String> },

    #[error("無效的版本操作: {0}")]
    InvalidVersion(String),

    #[error("無效的狀態轉換: {current:?} -> {attempted:?}")]
    InvalidStatusTransition {
        current: WorkOrderStatus,
        attempted: WorkOrderStatus,
    },

    #[error("狀態 {current:?} 不允許操作: {action}")]
    StatusConflict {
        action: String,
        current: WorkOrderStatus,
    },

    #[error("工單 {order_id} 找不到行號 {line_number}")]
    WorkOrderLineNotFound { order_id: Uuid, line_number: u32 },

    #[error("計算錯誤: {0}")]
    CalculationError(String),

    #[error("無法取得預測: {0}")]
    ForecastUnavailable(String),

    #[error("建議需要審批後才能套用")]
    ApprovalRequired,

    #[error("建議不允許自動套用")]
    AutoApplyNotAllowed,

    #[error("無效的數量: {0}")]
    InvalidQuantity(String),
}

pub type Result<T> = std::result::Result<T, PlanningError>;
