// ==========================================
// PHIBRA MAX WATER - 农田记录领域模型
// ==========================================
// 职责: 原始行 / 字段记录 / 数据集 / 合并数据集
// 生命周期: 由单次聚合请求创建，产出 AggregateResult 后即丢弃
// ==========================================

use crate::domain::schema::{ColumnLayout, Schema};
use crate::domain::types::{GroupKey, RecordKey};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// 原始行（列名 → 单元格文本）
pub type RawRow = BTreeMap<String, String>;

// ==========================================
// RawTable - 文件解析产物
// ==========================================
// headers 保留文件中的列顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

// ==========================================
// FieldRecord - 单行农田记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldRecord {
    pub row: usize, // 在所属数据集输入行中的下标（0 起）
    pub field_id: String,
    pub hybrid: String,
    pub year: i32,
    pub measures: BTreeMap<String, f64>,
    pub labels: BTreeMap<String, String>,
}

impl FieldRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.field_id.clone(), self.hybrid.clone(), self.year)
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            field_id: self.field_id.clone(),
            hybrid: self.hybrid.clone(),
        }
    }

    pub fn measure(&self, column: &str) -> Option<f64> {
        self.measures.get(column).copied()
    }

    pub fn label(&self, column: &str) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }
}

// ==========================================
// Dataset - 单次导入的数据集
// ==========================================
// 红线: 同一数据集内 (地块, 品种, 年份) 唯一；所有记录共享 schema
// 只能经由 DatasetLoader 或合并结果转换得到
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    batch_id: Uuid,
    source: Option<String>,
    schema: Schema,
    layout: ColumnLayout,
    records: Vec<FieldRecord>,
}

impl Dataset {
    pub(crate) fn new(
        source: Option<String>,
        schema: Schema,
        layout: ColumnLayout,
        records: Vec<FieldRecord>,
    ) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            source,
            schema,
            layout,
            records,
        }
    }

    pub fn batch_id(&self) -> Uuid {
        self.batch_id
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// 等价性只看内容（schema / 布局 / 记录），批次 ID 与来源名不参与比较
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema && self.layout == other.layout && self.records == other.records
    }
}

// ==========================================
// MergedDataset - 多数据集合并结果
// ==========================================
// schema 取首个数据集的列顺序；records 按输入顺序拼接
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedDataset {
    schema: Schema,
    layout: ColumnLayout,
    records: Vec<FieldRecord>,
    sources: Vec<Uuid>,
}

impl MergedDataset {
    pub(crate) fn new(
        schema: Schema,
        layout: ColumnLayout,
        records: Vec<FieldRecord>,
        sources: Vec<Uuid>,
    ) -> Self {
        Self {
            schema,
            layout,
            records,
            sources,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    /// 参与合并的数据集批次 ID（按输入顺序）
    pub fn sources(&self) -> &[Uuid] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// 合并结果的主键在所有年份间仍唯一，可作为下一次合并的输入
// 行下标按合并后的位置重新编号，出错位置指向转换后的数据集
impl From<MergedDataset> for Dataset {
    fn from(merged: MergedDataset) -> Self {
        let records = merged
            .records
            .into_iter()
            .enumerate()
            .map(|(row, record)| FieldRecord { row, ..record })
            .collect();
        Dataset::new(None, merged.schema, merged.layout, records)
    }
}
