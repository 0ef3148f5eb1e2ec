// ==========================================
// PHIBRA MAX WATER - 结构校验器实现
// ==========================================
// 职责: 列布局与 schema 兼容性校验 + 单行列集合校验
// 红线: 只看列集合，不解析单元格内容
// ==========================================

use crate::domain::record::RawRow;
use crate::domain::schema::{ColumnLayout, Schema};
use crate::importer::error::{ImportError, ImportResult, ValidationReason};
use crate::importer::importer_trait::DqValidator as DqValidatorTrait;

pub struct DqValidator;

impl DqValidatorTrait for DqValidator {
    /// 校验列布局要求的列全部出现在 schema 中
    fn validate_schema(&self, schema: &Schema, layout: &ColumnLayout) -> ImportResult<()> {
        let missing: Vec<&str> = layout
            .required_columns()
            .into_iter()
            .filter(|column| !schema.contains(column))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::InvalidSchema(format!(
                "schema 缺少主键列或标签列: {:?}",
                missing
            )))
        }
    }

    /// 校验单行列集合
    fn validate_row_columns(&self, row: &RawRow, schema: &Schema) -> Result<(), ValidationReason> {
        // 缺失列: 按 schema 顺序报告第一个
        if let Some(missing) = schema.columns().iter().find(|c| !row.contains_key(*c)) {
            return Err(ValidationReason::MissingColumn(missing.clone()));
        }

        // 多余列: RawRow 为 BTreeMap，按列名升序报告第一个
        if let Some(extra) = row.keys().find(|c| !schema.contains(c)) {
            return Err(ValidationReason::ExtraColumn(extra.clone()));
        }

        Ok(())
    }
}
