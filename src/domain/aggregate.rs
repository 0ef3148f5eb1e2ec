// ==========================================
// PHIBRA MAX WATER - 聚合结果模型
// ==========================================
// 用途: 按 (地块, 品种) 汇总多年费用与用水效率
// 生命周期: 每次聚合请求新建，返回后不可变，不落库
// ==========================================

use crate::domain::types::{Efficiency, GroupKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// AggregateResult - 单个分组的聚合结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    // ===== 分组键 =====
    pub field_id: String,
    pub hybrid: String,

    // ===== 覆盖范围 =====
    pub years: Vec<i32>,      // 覆盖年份（升序）
    pub record_count: usize,  // 参与汇总的记录数

    // ===== 费用 =====
    pub cost_totals: BTreeMap<String, f64>, // 各费用列合计
    pub total_cost: f64,                    // 费用总计
    pub cost_per_area: Option<f64>,         // 单位面积费用（仅指定面积列且面积非 0）

    // ===== 用水与产出 =====
    pub total_water: f64,        // 用水合计（指定面积列时按面积加权）
    pub total_yield: f64,        // 产出合计（同上加权口径）
    pub total_area: Option<f64>, // 面积合计（仅指定面积列）
    pub efficiency: Efficiency,  // 产出 / 用水，用水为 0 时 Undefined
}

impl AggregateResult {
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            field_id: self.field_id.clone(),
            hybrid: self.hybrid.clone(),
        }
    }

    pub fn cost_total(&self, column: &str) -> Option<f64> {
        self.cost_totals.get(column).copied()
    }
}
