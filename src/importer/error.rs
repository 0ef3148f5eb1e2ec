// ==========================================
// PHIBRA MAX WATER - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 文件 / 数据集校验 / 合并冲突 / 聚合参数 / 费用表 / 墒情 / 配置与数据库
// ==========================================

use crate::domain::types::RecordKey;
use thiserror::Error;

/// 单行校验失败原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationReason {
    #[error("缺少列 '{0}'")]
    MissingColumn(String),

    #[error("多余列 '{0}'")]
    ExtraColumn(String),

    #[error("主键重复 {key}，首次出现于行 {first_row}")]
    DuplicateKey { key: RecordKey, first_row: usize },

    #[error("主键列 '{0}' 为空")]
    EmptyKey(String),

    #[error("年份无法解析为整数: '{0}'")]
    InvalidYear(String),

    #[error("列 '{0}' 缺少数值")]
    MissingValue(String),

    #[error("列 '{column}' 不是有效数值: '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("列 '{column}' 不是有效日期: '{value}'")]
    InvalidDate { column: String, value: String },
}

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("表头无效: {0}")]
    InvalidHeader(String),

    // ===== 数据集校验错误 =====
    #[error("数据校验失败 (行 {row}): {reason}")]
    Validation { row: usize, reason: ValidationReason },

    #[error("列定义无效: {0}")]
    InvalidSchema(String),

    // ===== 合并错误 =====
    #[error("没有可合并的数据集")]
    NoDatasets,

    #[error("数据集结构不一致 (数据集 {dataset}): 列差异 {columns:?}")]
    SchemaMismatch { dataset: usize, columns: Vec<String> },

    #[error("列角色不一致 (数据集 {dataset}): 主键列或标签列与首个数据集不同")]
    LayoutMismatch { dataset: usize },

    #[error(
        "主键冲突 (数据集 {dataset}, 行 {row}): {key} 已存在于数据集 {first_dataset} 行 {first_row}"
    )]
    DuplicateKey {
        dataset: usize,
        row: usize,
        key: RecordKey,
        first_dataset: usize,
        first_row: usize,
    },

    // ===== 聚合参数错误 =====
    #[error("列不存在: '{0}'")]
    UnknownColumn(String),

    #[error("列 '{0}' 不是数值列（主键列或标签列）")]
    NotMeasureColumn(String),

    #[error("数值溢出 (分组 {group}): 列 '{column}' 的合计不是有限数")]
    NumericOverflow { group: String, column: String },

    // ===== 投入费用表错误 =====
    #[error("缺少必需列: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("未找到可识别的日期列")]
    NoDateColumns,

    #[error("日期范围无效: {start} > {end}")]
    InvalidDateRange { start: String, end: String },

    // ===== 墒情与预报错误 =====
    #[error("降雨预报无效: {0}")]
    InvalidForecast(String),

    // ===== 模拟参数错误 =====
    #[error("模拟参数无效: {0}")]
    InvalidSimulation(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 出错的行下标（仅行级错误）
    pub fn row(&self) -> Option<usize> {
        match self {
            ImportError::Validation { row, .. } | ImportError::DuplicateKey { row, .. } => {
                Some(*row)
            }
            _ => None,
        }
    }

    /// 出错的数据集下标（仅合并错误）
    pub fn dataset(&self) -> Option<usize> {
        match self {
            ImportError::SchemaMismatch { dataset, .. }
            | ImportError::LayoutMismatch { dataset }
            | ImportError::DuplicateKey { dataset, .. } => Some(*dataset),
            _ => None,
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::DatabaseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
