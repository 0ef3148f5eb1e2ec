// ==========================================
// PHIBRA MAX WATER - 导入管道 Trait
// ==========================================
// 职责: 定义导入各阶段接口（不包含实现）
// 管道: 文件解析 → 行结构校验 → 字段映射 → 主键冲突检测
// ==========================================

use crate::domain::record::{FieldRecord, RawRow, RawTable};
use crate::domain::schema::{ColumnLayout, Schema};
use crate::domain::types::RecordKey;
use crate::importer::error::{ImportResult, ValidationReason};
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始表（表头 + 行记录）
    ///
    /// # 返回
    /// - Ok(RawTable): 表头保持文件顺序，完全空白的行已跳过
    /// - Err: 文件不存在、格式不支持、解析失败、表头无效
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable>;
}

// ==========================================
// DqValidator Trait
// ==========================================
// 用途: 结构校验接口（阶段 1）
// 实现者: DqValidator
pub trait DqValidator: Send + Sync {
    /// 校验列布局与 schema 是否兼容（主键列/标签列必须存在）
    fn validate_schema(&self, schema: &Schema, layout: &ColumnLayout) -> ImportResult<()>;

    /// 校验单行列集合与 schema 完全一致
    ///
    /// # 返回
    /// - Err(MissingColumn): 按 schema 顺序的第一个缺失列
    /// - Err(ExtraColumn): 按列名升序的第一个多余列
    fn validate_row_columns(&self, row: &RawRow, schema: &Schema) -> Result<(), ValidationReason>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 2）
// 实现者: FieldMapper
pub trait FieldMapper: Send + Sync {
    /// 将结构已校验的原始行映射为 FieldRecord
    ///
    /// # 参数
    /// - row: 原始行
    /// - row_index: 行下标（0 起）
    /// - schema: 列集合
    /// - layout: 列角色
    ///
    /// # 返回
    /// - Err: 主键为空、年份非整数、数值缺失或非数值
    fn map_to_field_record(
        &self,
        row: &RawRow,
        row_index: usize,
        schema: &Schema,
        layout: &ColumnLayout,
    ) -> Result<FieldRecord, ValidationReason>;
}

/// 重复主键命中
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateHit {
    pub key: RecordKey,
    pub first_source: usize, // 首次出现的来源下标
    pub first_row: usize,    // 首次出现的行下标
    pub source: usize,       // 重复出现的来源下标
    pub row: usize,          // 重复出现的行下标
}

// ==========================================
// ConflictHandler Trait
// ==========================================
// 用途: 主键冲突检测接口（阶段 3 / 合并）
// 实现者: ConflictHandler
pub trait ConflictHandler: Send + Sync {
    /// 检测单个数据集内的第一个重复主键
    fn first_duplicate(&self, records: &[FieldRecord]) -> Option<DuplicateHit>;

    /// 检测多个记录集之间的第一个重复主键（按来源顺序、行顺序扫描）
    fn first_cross_source_duplicate(&self, sources: &[&[FieldRecord]]) -> Option<DuplicateHit>;
}
