//! 產能負荷與解決建議模型

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::horizon::PlanningHorizon;

/// 負荷來源類型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadSourceType {
    /// 工單（已確認負荷）
    WorkOrder,
    /// 計劃訂單（MRP 建議負荷）
    PlannedOrder,
}

/// 產能負荷（不可變的分配記錄）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityLoad {
    /// 來源單據ID
    pub source_id: String,

    /// 來源類型
    pub source_type: LoadSourceType,

    /// 工作中心ID
    pub work_center_id: String,

    /// 準備工時（小時）
    pub setup_hours: Decimal,

    /// 加工工時（小時）
    pub run_hours: Decimal,

    /// 負荷日期
    pub load_date: NaiveDate,

    /// 工序號
    pub operation_number: u32,

    /// 物料ID
    pub product_id: String,

    /// 數量
    pub quantity: Decimal,
}

impl CapacityLoad {
    /// 總工時 = 準備 + 加工
    pub fn total_hours(&self) -> Decimal {
        self.setup_hours + self.run_hours
    }
}

/// 產能期間（單一時間桶的可用/負荷）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityPeriod {
    /// 期間起始日
    pub start: NaiveDate,

    /// 期間截止日（含）
    pub end: NaiveDate,

    /// 可用工時
    pub available_hours: Decimal,

    /// 已負荷工時
    pub loaded_hours: Decimal,

    /// 構成負荷的分配記錄
    pub loads: Vec<CapacityLoad>,
}

impl CapacityPeriod {
    /// 檢查本期間是否超載
    pub fn is_overloaded(&self) -> bool {
        self.loaded_hours > self.available_hours
    }

    /// 超載工時（非負）
    pub fn excess(&self) -> Decimal {
        (self.loaded_hours - self.available_hours).max(Decimal::ZERO)
    }

    /// 剩餘可用工時（非負）
    pub fn remaining(&self) -> Decimal {
        (self.available_hours - self.loaded_hours).max(Decimal::ZERO)
    }

    /// 檢查日期是否落在期間內
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// 產能負荷檔（單一工作中心在時界內的負荷概況）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityProfile {
    /// 工作中心ID
    pub work_center_id: String,

    /// 計劃時界
    pub horizon: PlanningHorizon,

    /// 有序期間
    pub periods: Vec<CapacityPeriod>,

    /// 總可用工時
    pub total_available: Decimal,

    /// 總負荷工時
    pub total_loaded: Decimal,

    /// 計算時間戳
    pub calculated_at: NaiveDateTime,
}

impl CapacityProfile {
    /// 檢查整體是否超載（總負荷 > 總可用）
    pub fn is_overloaded(&self) -> bool {
        self.total_loaded > self.total_available
    }

    /// 整體超載工時（非負）
    pub fn excess_load(&self) -> Decimal {
        (self.total_loaded - self.total_available).max(Decimal::ZERO)
    }

    /// 逐期間篩選出超載的期間
    pub fn overloaded_periods(&self) -> Vec<&CapacityPeriod> {
        self.periods.iter().filter(|p| p.is_overloaded()).collect()
    }

    /// 整體利用率（百分比）
    pub fn utilization_pct(&self) -> Decimal {
        crate::work_center::WorkCenter::utilization_pct(self.total_loaded, self.total_available)
    }
}

/// 解決建議的動作（附動作專屬資料）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolutionAction {
    /// 改期：將超載期間的負荷移往較晚的期間
    Reschedule {
        from_period_start: NaiveDate,
        from_period_end: NaiveDate,
        new_date: NaiveDate,
        days_delayed: i64,
    },

    /// 轉移到替代工作中心
    AlternativeWorkCenter {
        alternate_id: String,
        transfer_hours: Decimal,
    },

    /// 加班
    Overtime {
        hours_per_day: Decimal,
        total_hours: Decimal,
    },

    /// 拆分訂單
    Split { portions: u32 },

    /// 外包
    Subcontract,

    /// 增加班次
    AddShift { shift_hours: Decimal },

    /// 取消工單
    Cancel { order_id: uuid::Uuid },

    /// 人工處理
    Manual,
}

impl ResolutionAction {
    /// 動作種類標記（供日誌與描述使用）
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionAction::Reschedule { .. } => "reschedule",
            ResolutionAction::AlternativeWorkCenter { .. } => "alternative_work_center",
            ResolutionAction::Overtime { .. } => "overtime",
            ResolutionAction::Split { .. } => "split",
            ResolutionAction::Subcontract => "subcontract",
            ResolutionAction::AddShift { .. } => "add_shift",
            ResolutionAction::Cancel { .. } => "cancel",
            ResolutionAction::Manual => "manual",
        }
    }
}

/// 產能解決建議
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionSuggestion {
    /// 目標工作中心
    pub work_center_id: String,

    /// 建議動作（含動作專屬資料）
    pub action: ResolutionAction,

    /// 說明文字
    pub description: String,

    /// 預計可解決的工時
    pub hours_resolved: Decimal,

    /// 優先級（越小越優先，僅決定呈現順序）
    pub priority: u8,

    /// 預估成本
    pub estimated_cost: Decimal,

    /// 是否需要審批
    pub requires_approval: bool,

    /// 是否可自動套用
    pub can_auto_apply: bool,
}

impl ResolutionSuggestion {
    /// 創建新的解決建議
    pub fn new(
        work_center_id: String,
        action: ResolutionAction,
        description: String,
        hours_resolved: Decimal,
    ) -> Self {
        Self {
            work_center_id,
            action,
            description,
            hours_resolved,
            priority: 99,
            estimated_cost: Decimal::ZERO,
            requires_approval: false,
            can_auto_apply: false,
        }
    }

    /// 建構器模式：設置優先級
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// 建構器模式：設置預估成本
    pub fn with_estimated_cost(mut self, cost: Decimal) -> Self {
        self.estimated_cost = cost;
        self
    }

    /// 建構器模式：設置審批/自動套用旗標
    pub fn with_flags(mut self, requires_approval: bool, can_auto_apply: bool) -> Self {
        self.requires_approval = requires_approval;
        self.can_auto_apply = can_auto_apply;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(available: i64, loaded: i64) -> CapacityPeriod {
        CapacityPeriod {
            start: date(2026, 8, 3),
            end: date(2026, 8, 9),
            available_hours: Decimal::from(available),
            loaded_hours: Decimal::from(loaded),
            loads: Vec::new(),
        }
    }

    #[test]
    fn test_period_overload() {
        let p = period(40, 50);
        assert!(p.is_overloaded());
        assert_eq!(p.excess(), Decimal::from(10));
        assert_eq!(p.remaining(), Decimal::ZERO);

        let ok = period(40, 30);
        assert!(!ok.is_overloaded());
        assert_eq!(ok.excess(), Decimal::ZERO);
        assert_eq!(ok.remaining(), Decimal::from(10));
    }

    #[test]
    fn test_profile_invariants() {
        let profile = CapacityProfile {
            work_center_id: "WC-WELD".to_string(),
            horizon: PlanningHorizon::new(date(2026, 8, 3), date(2026, 8, 16)),
            periods: vec![period(40, 50), period(40, 30)],
            total_available: Decimal::from(80),
            total_loaded: Decimal::from(80),
            calculated_at: chrono::Utc::now().naive_utc(),
        };

        // 總負荷 == 總可用：不算超載
        assert!(!profile.is_overloaded());
        assert_eq!(profile.excess_load(), Decimal::ZERO);
        // 但仍有單一期間超載
        assert_eq!(profile.overloaded_periods().len(), 1);
        assert_eq!(profile.utilization_pct(), Decimal::ONE_HUNDRED);
    }

    #[test]
    fn test_action_kind() {
        let action = ResolutionAction::Overtime {
            hours_per_day: Decimal::from(4),
            total_hours: Decimal::from(20),
        };
        assert_eq!(action.kind(), "overtime");
        assert_eq!(ResolutionAction::Manual.kind(), "manual");
    }

    #[test]
    fn test_suggestion_builder() {
        let s = ResolutionSuggestion::new(
            "WC-WELD".to_string(),
            ResolutionAction::Split { portions: 2 },
            "拆分為 2 批".to_string(),
            Decimal::from(5),
        )
        .with_priority(4)
        .with_flags(true, false);

        assert_eq!(s.priority, 4);
        assert!(s.requires_approval);
        assert!(!s.can_auto_apply);
    }
}
