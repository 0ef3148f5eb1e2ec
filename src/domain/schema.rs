// ==========================================
// PHIBRA MAX WATER - 列结构模型
// ==========================================
// 职责: Schema（有序列名集合）+ ColumnLayout（主键列/标签列角色）
// 红线: 列集合在导入时一次性校验，后续按角色访问，不做临时键查找
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// Schema - 有序列名集合
// ==========================================
// 约束: 列名非空且不重复
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    /// 创建 Schema
    ///
    /// # 返回
    /// - Err(InvalidSchema): 存在空列名或重复列名
    pub fn new<I, S>(columns: I) -> ImportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = BTreeSet::new();

        for (idx, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                return Err(ImportError::InvalidSchema(format!("第 {} 列列名为空", idx)));
            }
            if !seen.insert(column.as_str()) {
                return Err(ImportError::InvalidSchema(format!("列名重复: '{}'", column)));
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn column_set(&self) -> BTreeSet<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// 列集合是否一致（不要求顺序相同）
    pub fn same_columns(&self, other: &Schema) -> bool {
        self.column_set() == other.column_set()
    }

    /// 列集合对称差（按列名升序）
    pub fn symmetric_difference(&self, other: &Schema) -> Vec<String> {
        let left = self.column_set();
        let right = other.column_set();
        left.symmetric_difference(&right)
            .map(|c| c.to_string())
            .collect()
    }
}

// ==========================================
// ColumnRole - 列角色
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    FieldId, // 地块编号
    Hybrid,  // 品种
    Year,    // 年份
    Label,   // 文本标签（原样保留）
    Measure, // 数值列（费用/用水/产量/面积等）
}

// ==========================================
// ColumnLayout - 列角色布局
// ==========================================
// 默认: field / hybrid / year，无标签列
// 其余列一律视为数值列
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    field_column: String,
    hybrid_column: String,
    year_column: String,
    label_columns: BTreeSet<String>,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            field_column: "field".to_string(),
            hybrid_column: "hybrid".to_string(),
            year_column: "year".to_string(),
            label_columns: BTreeSet::new(),
        }
    }
}

impl ColumnLayout {
    /// 创建列布局
    ///
    /// # 返回
    /// - Err(InvalidSchema): 主键列名为空、主键列重名、标签列与主键列重叠
    pub fn new<I, S>(
        field_column: &str,
        hybrid_column: &str,
        year_column: &str,
        label_columns: I,
    ) -> ImportResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = [field_column, hybrid_column, year_column];
        if keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ImportError::InvalidSchema("主键列名不能为空".to_string()));
        }
        if field_column == hybrid_column || field_column == year_column || hybrid_column == year_column {
            return Err(ImportError::InvalidSchema(format!(
                "主键列必须互不相同: {}/{}/{}",
                field_column, hybrid_column, year_column
            )));
        }

        let label_columns: BTreeSet<String> = label_columns.into_iter().map(Into::into).collect();
        if let Some(overlap) = label_columns.iter().find(|l| keys.contains(&l.as_str())) {
            return Err(ImportError::InvalidSchema(format!(
                "标签列不能同时是主键列: '{}'",
                overlap
            )));
        }

        Ok(Self {
            field_column: field_column.to_string(),
            hybrid_column: hybrid_column.to_string(),
            year_column: year_column.to_string(),
            label_columns,
        })
    }

    pub fn field_column(&self) -> &str {
        &self.field_column
    }

    pub fn hybrid_column(&self) -> &str {
        &self.hybrid_column
    }

    pub fn year_column(&self) -> &str {
        &self.year_column
    }

    pub fn label_columns(&self) -> &BTreeSet<String> {
        &self.label_columns
    }

    /// 判定列角色
    pub fn role(&self, column: &str) -> ColumnRole {
        if column == self.field_column {
            ColumnRole::FieldId
        } else if column == self.hybrid_column {
            ColumnRole::Hybrid
        } else if column == self.year_column {
            ColumnRole::Year
        } else if self.label_columns.contains(column) {
            ColumnRole::Label
        } else {
            ColumnRole::Measure
        }
    }

    /// 布局要求 schema 中必须存在的列（主键列 + 标签列）
    pub fn required_columns(&self) -> Vec<&str> {
        let mut required = vec![
            self.field_column.as_str(),
            self.hybrid_column.as_str(),
            self.year_column.as_str(),
        ];
        required.extend(self.label_columns.iter().map(String::as_str));
        required
    }
}
