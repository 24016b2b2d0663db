//! 工作中心管理器

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::HashMap;

use planning_core::{PlanningError, Result, WorkCenter};

/// 工作中心管理器
#[derive(Debug, Default)]
pub struct WorkCenterManager {
    centers: HashMap<String, WorkCenter>,
}

impl WorkCenterManager {
    /// 創建空的管理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 登記工作中心（同代碼覆蓋）
    pub fn register(&mut self, center: WorkCenter) {
        self.centers.insert(center.id.clone(), center);
    }

    /// 依代碼取得工作中心
    pub fn get(&self, work_center_id: &str) -> Result<&WorkCenter> {
        self.centers
            .get(work_center_id)
            .ok_or_else(|| PlanningError::WorkCenterNotFound(work_center_id.to_string()))
    }

    /// 依代碼取得可變引用
    pub fn get_mut(&mut self, work_center_id: &str) -> Result<&mut WorkCenter> {
        self.centers
            .get_mut(work_center_id)
            .ok_or_else(|| PlanningError::WorkCenterNotFound(work_center_id.to_string()))
    }

    /// 依類別查找
    pub fn find_by_category(&self, category: &str) -> Vec<&WorkCenter> {
        self.centers
            .values()
            .filter(|c| c.category == category)
            .collect()
    }

    /// 所有啟用的工作中心
    pub fn find_active(&self) -> Vec<&WorkCenter> {
        self.centers.values().filter(|c| c.active).collect()
    }

    /// 所有工作中心代碼
    pub fn ids(&self) -> Vec<String> {
        self.centers.keys().cloned().collect()
    }

    /// 添加停工日
    pub fn add_closure(&mut self, work_center_id: &str, date: NaiveDate) -> Result<()> {
        self.get_mut(work_center_id)?.add_closure(date);
        Ok(())
    }

    /// 核准加班
    pub fn grant_overtime(
        &mut self,
        work_center_id: &str,
        date: NaiveDate,
        hours: Decimal,
    ) -> Result<()> {
        self.get_mut(work_center_id)?.grant_overtime(date, hours);
        Ok(())
    }

    /// 區間可用工時
    pub fn available_hours_between(
        &self,
        work_center_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal> {
        Ok(self.get(work_center_id)?.available_hours_between(start, end))
    }

    /// 區間利用率（百分比）
    pub fn utilization_pct(
        &self,
        work_center_id: &str,
        loaded: Decimal,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Decimal> {
        let available = self.available_hours_between(work_center_id, start, end)?;
        Ok(WorkCenter::utilization_pct(loaded, available))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut mgr = WorkCenterManager::new();
        mgr.register(
            WorkCenter::new("WC-WELD".to_string(), "焊接".to_string())
                .with_category("welding".to_string()),
        );

        assert!(mgr.get("WC-WELD").is_ok());
        assert!(matches!(
            mgr.get("WC-NONE"),
            Err(PlanningError::WorkCenterNotFound(_))
        ));
        assert_eq!(mgr.find_by_category("welding").len(), 1);
        assert_eq!(mgr.find_active().len(), 1);
    }

    #[test]
    fn test_closure_and_overtime_management() {
        let mut mgr = WorkCenterManager::new();
        mgr.register(WorkCenter::new("WC-WELD".to_string(), "焊接".to_string()));

        let monday = date(2026, 8, 3);
        mgr.grant_overtime("WC-WELD", monday, Decimal::from(2)).unwrap();
        assert_eq!(
            mgr.get("WC-WELD").unwrap().available_hours_on(monday),
            Decimal::from(10)
        );

        mgr.add_closure("WC-WELD", monday).unwrap();
        assert_eq!(
            mgr.get("WC-WELD").unwrap().available_hours_on(monday),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_utilization() {
        let mut mgr = WorkCenterManager::new();
        mgr.register(WorkCenter::new("WC-WELD".to_string(), "焊接".to_string()));

        // 一週 40 小時，負荷 20 → 50%
        let pct = mgr
            .utilization_pct("WC-WELD", Decimal::from(20), date(2026, 8, 3), date(2026, 8, 9))
            .unwrap();
        assert_eq!(pct, Decimal::from(50));
    }
}
