// ==========================================
// PHIBRA MAX WATER - 投入品费用模型
// ==========================================
// 用途: 灌溉/施肥日历表 → 按日按农场费用、按品种费用汇总
// ==========================================

use crate::domain::types::InputKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// InputEntry - 日历表展开后的单条投入记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEntry {
    pub farm_id: String,
    pub date: NaiveDate,
    pub amount: f64,
}

// ==========================================
// DailyInputCost - 按日按农场投入费用
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyInputCost {
    pub date: NaiveDate,
    pub farm_id: String,
    pub kind: InputKind,
    pub amount: f64, // 投入量
    pub cost: f64,   // 投入量 × 单价
}

// ==========================================
// DailyTotalCost - 按日按农场总费用（灌溉 + 施肥）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTotalCost {
    pub date: NaiveDate,
    pub farm_id: String,
    pub irrigation_cost: f64,
    pub fertilizer_cost: f64,
    pub total_cost: f64,
}

// ==========================================
// HybridCost - 按品种汇总的总费用
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridCost {
    pub hybrid: String,
    pub farm_count: usize,
    pub irrigation_cost: f64,
    pub fertilizer_cost: f64,
    pub total_cost: f64,
}

// ==========================================
// InputPrices - 投入品单价
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputPrices {
    pub irrigation: f64, // 每单位灌溉量价格（USD）
    pub fertilizer: f64, // 每单位施肥量价格（USD）
}

impl Default for InputPrices {
    fn default() -> Self {
        Self {
            irrigation: 15.0,
            fertilizer: 0.5,
        }
    }
}

impl InputPrices {
    pub fn price_of(&self, kind: InputKind) -> f64 {
        match kind {
            InputKind::Irrigation => self.irrigation,
            InputKind::Fertilizer => self.fertilizer,
        }
    }
}

// ==========================================
// DateRange - 闭区间日期范围
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// 创建日期范围，start > end 时返回 None
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
