//! 工作中心模型

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 工作中心（生產資源）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkCenter {
    /// 工作中心代碼（業務主鍵）
    pub id: String,

    /// 名稱
    pub name: String,

    /// 類別（如 welding / assembly / paint）
    pub category: String,

    /// 每日工時（小時）
    pub hours_per_day: Decimal,

    /// 效率係數（0-1）
    pub efficiency: Decimal,

    /// 產能單位數（平行機台/人員數）
    pub capacity_units: u32,

    /// 工作日（週一到週日，true 表示工作日）
    /// 索引 0 = 週一, 1 = 週二, ..., 6 = 週日
    pub working_days: [bool; 7],

    /// 停工日（歲修、盤點等）
    pub closures: Vec<NaiveDate>,

    /// 已核准加班工時（日期 → 小時）
    pub overtime: HashMap<NaiveDate, Decimal>,

    /// 替代工作中心（單一後備，而非任意圖）
    pub alternate_id: Option<String>,

    /// 加班費率（每小時）
    pub overtime_rate: Decimal,

    /// 單一班次工時（小時），供增班建議使用
    pub shift_hours: Decimal,

    /// 是否啟用
    pub active: bool,
}

impl WorkCenter {
    /// 創建新的工作中心（預設週一到週五、單班 8 小時、效率 100%）
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            category: String::new(),
            hours_per_day: Decimal::from(8),
            efficiency: Decimal::ONE,
            capacity_units: 1,
            working_days: [true, true, true, true, true, false, false],
            closures: Vec::new(),
            overtime: HashMap::new(),
            alternate_id: None,
            overtime_rate: Decimal::ZERO,
            shift_hours: Decimal::from(8),
            active: true,
        }
    }

    /// 建構器模式：設置類別
    pub fn with_category(mut self, category: String) -> Self {
        self.category = category;
        self
    }

    /// 建構器模式：設置每日工時
    pub fn with_hours_per_day(mut self, hours: Decimal) -> Self {
        self.hours_per_day = hours;
        self
    }

    /// 建構器模式：設置效率係數
    pub fn with_efficiency(mut self, efficiency: Decimal) -> Self {
        self.efficiency = efficiency;
        self
    }

    /// 建構器模式：設置產能單位數
    pub fn with_capacity_units(mut self, units: u32) -> Self {
        self.capacity_units = units;
        self
    }

    /// 建構器模式：設置工作日
    pub fn with_working_days(mut self, working_days: [bool; 7]) -> Self {
        self.working_days = working_days;
        self
    }

    /// 建構器模式：設置替代工作中心
    pub fn with_alternate(mut self, alternate_id: String) -> Self {
        self.alternate_id = Some(alternate_id);
        self
    }

    /// 建構器模式：設置加班費率
    pub fn with_overtime_rate(mut self, rate: Decimal) -> Self {
        self.overtime_rate = rate;
        self
    }

    /// 建構器模式：設置班次工時
    pub fn with_shift_hours(mut self, hours: Decimal) -> Self {
        self.shift_hours = hours;
        self
    }

    /// 添加停工日
    pub fn add_closure(&mut self, date: NaiveDate) {
        if !self.closures.contains(&date) {
            self.closures.push(date);
            self.closures.sort();
        }
    }

    /// 核准加班（累加到指定日期）
    pub fn grant_overtime(&mut self, date: NaiveDate, hours: Decimal) {
        *self.overtime.entry(date).or_insert(Decimal::ZERO) += hours;
    }

    /// 理論日產能 = 每日工時 × 效率 × 產能單位數
    pub fn daily_theoretical_capacity(&self) -> Decimal {
        self.hours_per_day * self.efficiency * Decimal::from(self.capacity_units)
    }

    /// 檢查是否為工作日（排除停工日）
    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        if self.closures.contains(&date) {
            return false;
        }
        let weekday_index = date.weekday().num_days_from_monday() as usize;
        self.working_days[weekday_index]
    }

    /// 指定日期的可用工時（非工作日為 0，含已核准加班）
    pub fn available_hours_on(&self, date: NaiveDate) -> Decimal {
        if !self.is_working_day(date) {
            return Decimal::ZERO;
        }
        let overtime = self
            .overtime
            .get(&date)
            .copied()
            .unwrap_or(Decimal::ZERO);
        self.daily_theoretical_capacity() + overtime
    }

    /// 區間可用工時（逐日累加，含迄日）
    pub fn available_hours_between(&self, start: NaiveDate, end: NaiveDate) -> Decimal {
        let mut total = Decimal::ZERO;
        let mut current = start;
        while current <= end {
            total += self.available_hours_on(current);
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        total
    }

    /// 區間工作日數量（含迄日）
    pub fn working_days_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_working_day(current) {
                count += 1;
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        count
    }

    /// 利用率（百分比），可用為 0 時回傳 0
    pub fn utilization_pct(loaded: Decimal, available: Decimal) -> Decimal {
        if available <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        loaded / available * Decimal::ONE_HUNDRED
    }
}
