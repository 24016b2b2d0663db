//! 計劃時界模型

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 計劃時界（起迄日期與時間桶切分）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningHorizon {
    /// 起始日
    pub start: NaiveDate,

    /// 截止日（含）
    pub end: NaiveDate,
}

impl PlanningHorizon {
    /// 創建新的計劃時界
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// 從起始日與天數創建
    pub fn from_days(start: NaiveDate, days: u32) -> Self {
        let end = start
            .checked_add_signed(chrono::Duration::days(days as i64))
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// 檢查日期是否落在時界內
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// 時界總天數（含迄日）
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// 切分為固定長度的時間桶（最後一桶裁切到迄日）
    ///
    /// 回傳有序且連續的 (起, 迄) 區間，迄日含在桶內
    pub fn buckets(&self, bucket_days: u32) -> Vec<(NaiveDate, NaiveDate)> {
        let bucket_days = bucket_days.max(1);
        let mut buckets = Vec::new();
        let mut current = self.start;

        while current <= self.end {
            let bucket_end = current
                .checked_add_signed(chrono::Duration::days(bucket_days as i64 - 1))
                .unwrap_or(NaiveDate::MAX)
                .min(self.end);
            buckets.push((current, bucket_end));

            match bucket_end.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }

        buckets
    }

    /// 每週時間桶（產能計劃預設粒度）
    pub fn weekly_buckets(&self) -> Vec<(NaiveDate, NaiveDate)> {
        self.buckets(7)
    }
}
