// ==========================================
// PHIBRA MAX WATER - 数据集加载器
// ==========================================
// 职责: 整合导入流程，从原始行（或文件）到 Dataset
// 流程: 解析 → schema 校验 → 行结构校验 → 字段映射 → 主键冲突检测
// 红线: 按行顺序返回第一个失败，不做部分导入
// ==========================================

use crate::domain::record::{Dataset, FieldRecord, RawRow, RawTable};
use crate::domain::schema::{ColumnLayout, Schema};
use crate::importer::conflict_handler::ConflictHandler as DefaultConflictHandler;
use crate::importer::dq_validator::DqValidator as DefaultDqValidator;
use crate::importer::error::{ImportError, ImportResult, ValidationReason};
use crate::importer::field_mapper::FieldMapper as DefaultFieldMapper;
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::{ConflictHandler, DqValidator, FieldMapper, FileParser};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

// ==========================================
// DatasetLoader - 数据集加载器
// ==========================================
pub struct DatasetLoader {
    layout: ColumnLayout,

    // 导入组件
    file_parser: Box<dyn FileParser>,
    dq_validator: Box<dyn DqValidator>,
    field_mapper: Box<dyn FieldMapper>,
    conflict_handler: Box<dyn ConflictHandler>,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new(ColumnLayout::default())
    }
}

impl DatasetLoader {
    /// 使用默认组件创建加载器
    pub fn new(layout: ColumnLayout) -> Self {
        Self::with_components(
            layout,
            Box::new(UniversalFileParser),
            Box::new(DefaultDqValidator),
            Box::new(DefaultFieldMapper),
            Box::new(DefaultConflictHandler),
        )
    }

    /// 注入自定义组件创建加载器
    pub fn with_components(
        layout: ColumnLayout,
        file_parser: Box<dyn FileParser>,
        dq_validator: Box<dyn DqValidator>,
        field_mapper: Box<dyn FieldMapper>,
        conflict_handler: Box<dyn ConflictHandler>,
    ) -> Self {
        Self {
            layout,
            file_parser,
            dq_validator,
            field_mapper,
            conflict_handler,
        }
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    /// 由原始行与 schema 构建数据集
    ///
    /// # 参数
    /// - rows: 原始行（下标即行号，0 起）
    /// - schema: 列集合
    ///
    /// # 返回
    /// - Ok(Dataset)
    /// - Err(InvalidSchema): schema 缺少主键列或标签列
    /// - Err(Validation): 按行顺序的第一个失败（缺列/多列/主键重复/单元格无效）
    #[instrument(skip(self, rows, schema), fields(rows = rows.len(), columns = schema.len()))]
    pub fn load(&self, rows: &[RawRow], schema: &Schema) -> ImportResult<Dataset> {
        self.load_with_source(rows, schema, None)
    }

    /// 由已解析的原始表构建数据集
    ///
    /// # 参数
    /// - schema: None 时使用表头作为 schema
    /// - source: 来源名（通常为文件名）
    pub fn load_table(
        &self,
        table: &RawTable,
        schema: Option<&Schema>,
        source: Option<String>,
    ) -> ImportResult<Dataset> {
        match schema {
            Some(schema) => self.load_with_source(&table.rows, schema, source),
            None => {
                let header_schema = Schema::new(table.headers.iter().cloned())?;
                self.load_with_source(&table.rows, &header_schema, source)
            }
        }
    }

    /// 从文件加载数据集（CSV / Excel）
    #[instrument(skip(self, file_path, schema), fields(file = %file_path.as_ref().display()))]
    pub fn load_file<P: AsRef<Path>>(
        &self,
        file_path: P,
        schema: Option<&Schema>,
    ) -> ImportResult<Dataset> {
        let path = file_path.as_ref();
        let table = self.file_parser.parse_to_raw_table(path)?;
        info!(rows = table.rows.len(), headers = table.headers.len(), "文件解析完成");

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        self.load_table(&table, schema, source)
    }

    fn load_with_source(
        &self,
        rows: &[RawRow],
        schema: &Schema,
        source: Option<String>,
    ) -> ImportResult<Dataset> {
        // === 步骤 1: schema 与列布局兼容性 ===
        self.dq_validator.validate_schema(schema, &self.layout)?;

        // === 步骤 2: 逐行结构校验 + 字段映射，遇到第一个失败即停止 ===
        let mut records: Vec<FieldRecord> = Vec::with_capacity(rows.len());
        let mut row_failure: Option<(usize, ValidationReason)> = None;

        for (row_index, row) in rows.iter().enumerate() {
            let mapped = self
                .dq_validator
                .validate_row_columns(row, schema)
                .and_then(|_| {
                    self.field_mapper
                        .map_to_field_record(row, row_index, schema, &self.layout)
                });

            match mapped {
                Ok(record) => records.push(record),
                Err(reason) => {
                    row_failure = Some((row_index, reason));
                    break;
                }
            }
        }

        // === 步骤 3: 主键冲突检测（仅限失败行之前的记录，保证按行顺序报错） ===
        if let Some(hit) = self.conflict_handler.first_duplicate(&records) {
            warn!(row = hit.row, first_row = hit.first_row, key = %hit.key, "主键重复");
            return Err(ImportError::Validation {
                row: hit.row,
                reason: ValidationReason::DuplicateKey {
                    key: hit.key,
                    first_row: hit.first_row,
                },
            });
        }

        if let Some((row, reason)) = row_failure {
            warn!(row = row, reason = %reason, "行校验失败");
            return Err(ImportError::Validation { row, reason });
        }

        debug!(records = records.len(), "数据集构建完成");
        Ok(Dataset::new(
            source,
            schema.clone(),
            self.layout.clone(),
            records,
        ))
    }
}

/// 使用默认列布局（field / hybrid / year）构建数据集
pub fn load_dataset(rows: &[RawRow], schema: &Schema) -> ImportResult<Dataset> {
    DatasetLoader::default().load(rows, schema)
}
