// ==========================================
// PHIBRA MAX WATER - 费用/效率聚合引擎
// ==========================================
// 职责: 按 (地块, 品种) 分组汇总费用列、用水、产出，计算用水效率
// 红线: 纯函数，不修改输入；同一输入必然得到同一输出
// ==========================================
// 输入: MergedDataset + AggregateRequest
// 输出: Vec<AggregateResult>（按地块、品种升序）
// ==========================================

use crate::domain::aggregate::AggregateResult;
use crate::domain::record::{FieldRecord, MergedDataset};
use crate::domain::schema::{ColumnLayout, ColumnRole, Schema};
use crate::domain::types::{Efficiency, GroupKey};
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument, warn};

// ==========================================
// AggregateRequest - 聚合参数
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRequest {
    pub cost_columns: BTreeSet<String>,
    pub water_column: String,
    pub yield_column: String,
    pub area_column: Option<String>, // 指定后用水/产出按面积加权
}

impl AggregateRequest {
    pub fn new<I, S>(cost_columns: I, water_column: &str, yield_column: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cost_columns: cost_columns.into_iter().map(Into::into).collect(),
            water_column: water_column.to_string(),
            yield_column: yield_column.to_string(),
            area_column: None,
        }
    }

    pub fn with_area_column(mut self, area_column: &str) -> Self {
        self.area_column = Some(area_column.to_string());
        self
    }

    /// 校验所有引用列均为 schema 中的数值列
    ///
    /// 检查顺序: 费用列（升序）→ 用水列 → 产出列 → 面积列
    pub fn validate(&self, schema: &Schema, layout: &ColumnLayout) -> ImportResult<()> {
        let referenced = self
            .cost_columns
            .iter()
            .chain(std::iter::once(&self.water_column))
            .chain(std::iter::once(&self.yield_column))
            .chain(self.area_column.iter());

        for column in referenced {
            if !schema.contains(column) {
                return Err(ImportError::UnknownColumn(column.clone()));
            }
            if layout.role(column) != ColumnRole::Measure {
                return Err(ImportError::NotMeasureColumn(column.clone()));
            }
        }
        Ok(())
    }
}

// 单个分组的累加器
#[derive(Default)]
struct GroupAccumulator {
    years: BTreeSet<i32>,
    record_count: usize,
    cost_totals: BTreeMap<String, f64>,
    total_water: f64,
    total_yield: f64,
    total_area: f64,
}

fn measure_of(record: &FieldRecord, column: &str) -> ImportResult<f64> {
    record.measure(column).ok_or_else(|| {
        ImportError::InternalError(format!(
            "记录 {} 缺少数值列 '{}'",
            record.key(),
            column
        ))
    })
}

// ==========================================
// Aggregator - 聚合引擎
// ==========================================
pub struct Aggregator;

impl Aggregator {
    /// 聚合合并数据集
    ///
    /// # 返回
    /// - Err(UnknownColumn): 引用列不在 schema 中
    /// - Err(NotMeasureColumn): 引用了主键列或标签列
    /// - Err(NumericOverflow): 某分组合计溢出为非有限数
    #[instrument(skip(self, merged, request), fields(records = merged.len(), costs = request.cost_columns.len()))]
    pub fn aggregate(
        &self,
        merged: &MergedDataset,
        request: &AggregateRequest,
    ) -> ImportResult<Vec<AggregateResult>> {
        request.validate(merged.schema(), merged.layout())?;

        let mut groups: BTreeMap<GroupKey, GroupAccumulator> = BTreeMap::new();

        for record in merged.records() {
            let acc = groups.entry(record.group_key()).or_default();

            acc.years.insert(record.year);
            acc.record_count += 1;

            for column in &request.cost_columns {
                *acc.cost_totals.entry(column.clone()).or_insert(0.0) += measure_of(record, column)?;
            }

            let weight = match &request.area_column {
                Some(area_column) => {
                    let area = measure_of(record, area_column)?;
                    acc.total_area += area;
                    area
                }
                None => 1.0,
            };

            acc.total_water += measure_of(record, &request.water_column)? * weight;
            acc.total_yield += measure_of(record, &request.yield_column)? * weight;
        }

        let results = groups
            .into_iter()
            .map(|(key, acc)| self.finish_group(key, acc, request))
            .collect::<ImportResult<Vec<AggregateResult>>>()?;

        debug!(groups = results.len(), "聚合完成");
        Ok(results)
    }

    fn finish_group(
        &self,
        key: GroupKey,
        acc: GroupAccumulator,
        request: &AggregateRequest,
    ) -> ImportResult<AggregateResult> {
        let total_cost: f64 = acc.cost_totals.values().sum();

        // 单元格均为有限数，但合计仍可能溢出
        let totals = acc
            .cost_totals
            .iter()
            .map(|(column, v)| (column.as_str(), *v))
            .chain([
                (request.water_column.as_str(), acc.total_water),
                (request.yield_column.as_str(), acc.total_yield),
            ])
            .chain(request.area_column.as_deref().map(|c| (c, acc.total_area)));
        let overflowed = totals
            .filter(|(_, v)| !v.is_finite())
            .map(|(column, _)| column.to_string())
            .next()
            .or_else(|| (!total_cost.is_finite()).then(|| "total_cost".to_string()));
        if let Some(column) = overflowed {
            warn!(group = %key, column = %column, "分组合计溢出");
            return Err(ImportError::NumericOverflow {
                group: key.to_string(),
                column,
            });
        }

        let total_area = request.area_column.as_ref().map(|_| acc.total_area);
        let cost_per_area = total_area
            .filter(|area| *area != 0.0)
            .map(|area| total_cost / area)
            .filter(|v| v.is_finite());

        Ok(AggregateResult {
            field_id: key.field_id,
            hybrid: key.hybrid,
            years: acc.years.into_iter().collect(),
            record_count: acc.record_count,
            cost_totals: acc.cost_totals,
            total_cost,
            cost_per_area,
            total_water: acc.total_water,
            total_yield: acc.total_yield,
            total_area,
            efficiency: Efficiency::from_totals(acc.total_yield, acc.total_water),
        })
    }
}

/// 按列名聚合（无面积加权）
pub fn aggregate<I, S>(
    merged: &MergedDataset,
    cost_columns: I,
    water_column: &str,
    yield_column: &str,
) -> ImportResult<Vec<AggregateResult>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let request = AggregateRequest::new(cost_columns, water_column, yield_column);
    Aggregator.aggregate(merged, &request)
}
