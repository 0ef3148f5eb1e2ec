// ==========================================
// PHIBRA MAX WATER - 墒情传感器表 / 传感器品种表导入
// ==========================================
// 传感器表: Sensor_ID / Date / Depth / Moisture_Level（必需）+ Sensor_Type（可选）
// 品种表: Sensor_ID / CompanyHybrid
// ==========================================

use crate::domain::record::{RawRow, RawTable};
use crate::domain::soil_moisture::SensorReading;
use crate::importer::cost_sheet::{parse_sheet_date, HYBRID_COLUMN};
use crate::importer::error::{ImportError, ImportResult, ValidationReason};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::FileParser;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

// ===== 列名常量 =====
pub const SENSOR_ID_COLUMN: &str = "Sensor_ID";
pub const DATE_COLUMN: &str = "Date";
pub const DEPTH_COLUMN: &str = "Depth";
pub const MOISTURE_COLUMN: &str = "Moisture_Level";
pub const SENSOR_TYPE_COLUMN: &str = "Sensor_Type";

/// Sensor_Type 缺列或为空时的取值
pub const UNKNOWN_SENSOR_TYPE: &str = "Unknown";

fn missing_columns(table: &RawTable, required: &[&str]) -> ImportResult<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| !table.headers.iter().any(|h| h == *c))
        .map(|c| c.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingColumns(missing))
    }
}

fn require_text(row: &RawRow, column: &str, row_index: usize) -> ImportResult<String> {
    match row.get(column).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ImportError::Validation {
            row: row_index,
            reason: ValidationReason::EmptyKey(column.to_string()),
        }),
    }
}

fn require_number(row: &RawRow, column: &str, row_index: usize) -> ImportResult<f64> {
    let raw = row.get(column).map(|v| v.trim()).unwrap_or_default();
    if raw.is_empty() {
        return Err(ImportError::Validation {
            row: row_index,
            reason: ValidationReason::MissingValue(column.to_string()),
        });
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ImportError::Validation {
            row: row_index,
            reason: ValidationReason::NonNumeric {
                column: column.to_string(),
                value: raw.to_string(),
            },
        }),
    }
}

// ==========================================
// SensorSheet - 墒情传感器读数表
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSheet {
    readings: Vec<SensorReading>,
}

impl SensorSheet {
    /// 必需列（按报告顺序）
    pub const REQUIRED_COLUMNS: [&'static str; 4] =
        [SENSOR_ID_COLUMN, DATE_COLUMN, DEPTH_COLUMN, MOISTURE_COLUMN];

    /// 由原始表构建读数表
    ///
    /// # 返回
    /// - Err(MissingColumns): 列出全部缺失的必需列
    /// - Err(Validation): Sensor_ID 为空、日期无法解析、深度/湿度非数值
    pub fn from_table(table: &RawTable) -> ImportResult<Self> {
        missing_columns(table, &Self::REQUIRED_COLUMNS)?;

        let mut readings = Vec::with_capacity(table.rows.len());
        for (row_index, row) in table.rows.iter().enumerate() {
            let sensor_id = require_text(row, SENSOR_ID_COLUMN, row_index)?;

            let raw_date = row.get(DATE_COLUMN).map(|v| v.trim()).unwrap_or_default();
            let date = parse_sheet_date(raw_date).ok_or_else(|| ImportError::Validation {
                row: row_index,
                reason: ValidationReason::InvalidDate {
                    column: DATE_COLUMN.to_string(),
                    value: raw_date.to_string(),
                },
            })?;

            let sensor_type = row
                .get(SENSOR_TYPE_COLUMN)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .unwrap_or(UNKNOWN_SENSOR_TYPE)
                .to_string();

            readings.push(SensorReading {
                sensor_id,
                date,
                depth: require_number(row, DEPTH_COLUMN, row_index)?,
                moisture: require_number(row, MOISTURE_COLUMN, row_index)?,
                sensor_type,
            });
        }

        info!(readings = readings.len(), "墒情传感器表解析完成");
        Ok(Self { readings })
    }

    /// 从文件读取读数表
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> ImportResult<Self> {
        let table = UniversalFileParser.parse_to_raw_table(file_path.as_ref())?;
        Self::from_table(&table)
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    pub fn into_readings(self) -> Vec<SensorReading> {
        self.readings
    }
}

// ==========================================
// SensorHybridSheet - 传感器 → 品种
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorHybridSheet {
    assignments: BTreeMap<String, String>,
}

impl SensorHybridSheet {
    pub const REQUIRED_COLUMNS: [&'static str; 2] = [SENSOR_ID_COLUMN, HYBRID_COLUMN];

    /// 由原始表构建传感器品种表（同一传感器多行时保留首行）
    pub fn from_table(table: &RawTable) -> ImportResult<Self> {
        missing_columns(table, &Self::REQUIRED_COLUMNS)?;

        let mut assignments = BTreeMap::new();
        for (row_index, row) in table.rows.iter().enumerate() {
            let sensor_id = require_text(row, SENSOR_ID_COLUMN, row_index)?;
            let hybrid = require_text(row, HYBRID_COLUMN, row_index)?;

            if assignments.contains_key(&sensor_id) {
                warn!(row = row_index, sensor_id = %sensor_id, "传感器品种重复，保留首行");
                continue;
            }
            assignments.insert(sensor_id, hybrid);
        }

        info!(sensors = assignments.len(), "传感器品种表解析完成");
        Ok(Self { assignments })
    }

    pub fn from_file<P: AsRef<Path>>(file_path: P) -> ImportResult<Self> {
        let table = UniversalFileParser.parse_to_raw_table(file_path.as_ref())?;
        Self::from_table(&table)
    }

    pub fn hybrid_of(&self, sensor_id: &str) -> Option<&str> {
        self.assignments.get(sensor_id).map(String::as_str)
    }

    pub fn assignments(&self) -> &BTreeMap<String, String> {
        &self.assignments
    }
}
