// ==========================================
// PHIBRA MAX WATER - 字段映射器实现
// ==========================================
// 职责: 原始行 → FieldRecord（按 ColumnLayout 分派列角色 + 类型转换）
// 红线: 不做任何缺省值填充或数值强制转换
// ==========================================

use crate::domain::record::{FieldRecord, RawRow};
use crate::domain::schema::{ColumnLayout, ColumnRole, Schema};
use crate::importer::error::ValidationReason;
use crate::importer::importer_trait::FieldMapper as FieldMapperTrait;
use std::collections::BTreeMap;

pub struct FieldMapper;

impl FieldMapperTrait for FieldMapper {
    fn map_to_field_record(
        &self,
        row: &RawRow,
        row_index: usize,
        schema: &Schema,
        layout: &ColumnLayout,
    ) -> Result<FieldRecord, ValidationReason> {
        let field_id = self.get_key(row, layout.field_column())?;
        let hybrid = self.get_key(row, layout.hybrid_column())?;
        let year = self.parse_year(row, layout.year_column())?;

        let mut measures = BTreeMap::new();
        let mut labels = BTreeMap::new();

        // 按 schema 顺序处理，保证同一行的报错列稳定
        for column in schema.columns() {
            match layout.role(column) {
                ColumnRole::FieldId | ColumnRole::Hybrid | ColumnRole::Year => {}
                ColumnRole::Label => {
                    let value = row.get(column).map(|v| v.trim()).unwrap_or_default();
                    labels.insert(column.clone(), value.to_string());
                }
                ColumnRole::Measure => {
                    let value = self.parse_measure(row, column)?;
                    measures.insert(column.clone(), value);
                }
            }
        }

        Ok(FieldRecord {
            row: row_index,
            field_id,
            hybrid,
            year,
            measures,
            labels,
        })
    }
}

impl FieldMapper {
    /// 提取主键列（去首尾空白后非空）
    fn get_key(&self, row: &RawRow, column: &str) -> Result<String, ValidationReason> {
        match row.get(column).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ValidationReason::EmptyKey(column.to_string())),
        }
    }

    /// 解析年份（整数，不接受 "2023.0" 之类的小数写法）
    fn parse_year(&self, row: &RawRow, column: &str) -> Result<i32, ValidationReason> {
        let raw = row.get(column).map(|v| v.trim()).unwrap_or_default();
        if raw.is_empty() {
            return Err(ValidationReason::EmptyKey(column.to_string()));
        }
        raw.parse::<i32>()
            .map_err(|_| ValidationReason::InvalidYear(raw.to_string()))
    }

    /// 解析数值列（有限 f64）
    fn parse_measure(&self, row: &RawRow, column: &str) -> Result<f64, ValidationReason> {
        let raw = row.get(column).map(|v| v.trim()).unwrap_or_default();
        if raw.is_empty() {
            return Err(ValidationReason::MissingValue(column.to_string()));
        }

        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(ValidationReason::NonNumeric {
                column: column.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}
