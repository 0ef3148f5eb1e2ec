// ==========================================
// PHIBRA MAX WATER - API 层错误类型
// ==========================================
// 职责: 定义 API 层错误类型，将导入/引擎错误转换为可直接展示的错误
// 约定: 每个错误都有稳定的错误代码 + 原文消息 + 位置（行/数据集下标）
// ==========================================

use crate::importer::error::{ImportError, ValidationReason};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 数据集错误（带位置）
    // ==========================================
    #[error("数据校验失败 (行 {row}): {reason}")]
    Validation { row: usize, reason: ValidationReason },

    #[error("数据集结构不一致 (数据集 {dataset}): 列差异 {columns:?}")]
    SchemaMismatch { dataset: usize, columns: Vec<String> },

    #[error(
        "主键冲突 (数据集 {dataset}, 行 {row}): {key} 已存在于数据集 {first_dataset} 行 {first_row}"
    )]
    DuplicateKey {
        dataset: usize,
        row: usize,
        key: String,
        first_dataset: usize,
        first_row: usize,
    },

    #[error("列角色不一致 (数据集 {dataset})")]
    LayoutMismatch { dataset: usize },

    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 配置与数据访问错误
    // ==========================================
    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误代码（供前端分支处理）
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION",
            ApiError::SchemaMismatch { .. } => "SCHEMA_MISMATCH",
            ApiError::DuplicateKey { .. } => "DUPLICATE_KEY",
            ApiError::LayoutMismatch { .. } => "LAYOUT_MISMATCH",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::ConfigError(_) => "CONFIG_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// 出错位置
    pub fn location(&self) -> Option<ErrorLocation> {
        match self {
            ApiError::Validation { row, .. } => Some(ErrorLocation {
                dataset: None,
                row: Some(*row),
            }),
            ApiError::DuplicateKey { dataset, row, .. } => Some(ErrorLocation {
                dataset: Some(*dataset),
                row: Some(*row),
            }),
            ApiError::SchemaMismatch { dataset, .. } | ApiError::LayoutMismatch { dataset } => {
                Some(ErrorLocation {
                    dataset: Some(*dataset),
                    row: None,
                })
            }
            _ => None,
        }
    }

    /// 转换为响应结构
    pub fn to_response(&self) -> ApiErrorResponse {
        let details = match self {
            ApiError::SchemaMismatch { columns, .. } => {
                Some(serde_json::json!({ "columns": columns }))
            }
            ApiError::DuplicateKey {
                key,
                first_dataset,
                first_row,
                ..
            } => Some(serde_json::json!({
                "key": key,
                "first_dataset": first_dataset,
                "first_row": first_row,
            })),
            _ => None,
        };

        ApiErrorResponse {
            code: self.kind().to_string(),
            message: self.to_string(),
            location: self.location(),
            details,
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            // 带位置的数据集错误
            ImportError::Validation { row, reason } => ApiError::Validation { row, reason },
            ImportError::SchemaMismatch { dataset, columns } => {
                ApiError::SchemaMismatch { dataset, columns }
            }
            ImportError::DuplicateKey {
                dataset,
                row,
                key,
                first_dataset,
                first_row,
            } => ApiError::DuplicateKey {
                dataset,
                row,
                key: key.to_string(),
                first_dataset,
                first_row,
            },
            ImportError::LayoutMismatch { dataset } => ApiError::LayoutMismatch { dataset },

            // 文件错误
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            e @ (ImportError::UnsupportedFormat(_)
            | ImportError::FileReadError(_)
            | ImportError::ExcelParseError(_)
            | ImportError::CsvParseError(_)
            | ImportError::InvalidHeader(_)) => ApiError::ImportError(e.to_string()),

            // 请求参数错误
            e @ (ImportError::InvalidSchema(_)
            | ImportError::NoDatasets
            | ImportError::UnknownColumn(_)
            | ImportError::NotMeasureColumn(_)
            | ImportError::NumericOverflow { .. }
            | ImportError::MissingColumns(_)
            | ImportError::NoDateColumns
            | ImportError::InvalidDateRange { .. }
            | ImportError::InvalidForecast(_)
            | ImportError::InvalidSimulation(_)) => ApiError::InvalidInput(e.to_string()),

            // 配置与数据库
            e @ ImportError::ConfigReadError { .. } => ApiError::ConfigError(e.to_string()),
            ImportError::DatabaseError(msg) => ApiError::DatabaseError(msg),

            // 通用错误
            ImportError::InternalError(msg) => ApiError::InternalError(msg),
            ImportError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 错误响应（返回给展示层）
// ==========================================

/// 出错位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
    /// 数据集下标（合并错误）
    pub dataset: Option<usize>,
    /// 行下标（0 起）
    pub row: Option<usize>,
}

/// 错误响应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 错误代码
    pub code: String,
    /// 错误消息（可原样展示）
    pub message: String,
    /// 出错位置（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
    /// 详细信息（可选）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
