// ==========================================
// PHIBRA MAX WATER - 投入品日历表 / 种植表导入
// ==========================================
// 灌溉/施肥日历: FarmID + 每日一列 + 可选 Total 列（宽表）
// 种植表: FarmID / PlantingDate / CompanyHybrid / Seeding Rate(plants/ac)
// ==========================================

use crate::domain::input_cost::{DateRange, InputEntry};
use crate::domain::record::{RawRow, RawTable};
use crate::domain::types::InputKind;
use crate::importer::error::{ImportError, ImportResult, ValidationReason};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::importer_trait::FileParser;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

// ===== 列名常量 =====
pub const FARM_ID_COLUMN: &str = "FarmID";
pub const TOTAL_COLUMN: &str = "Total";
pub const PLANTING_DATE_COLUMN: &str = "PlantingDate";
pub const HYBRID_COLUMN: &str = "CompanyHybrid";
pub const SEEDING_RATE_COLUMN: &str = "Seeding Rate(plants/ac)";

/// 可识别的日期表头格式
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// 解析日期文本（表头或单元格）
///
/// 依次尝试: 常用日期格式 → 带时间的日期 → Excel 序列号
pub fn parse_sheet_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }

    // Excel 序列号（1900 日期系统），只接受合理区间，避免把普通数字当成日期
    if let Ok(serial) = value.parse::<f64>() {
        if (20_000.0..=80_000.0).contains(&serial) {
            let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
            return epoch.checked_add_signed(Duration::days(serial.trunc() as i64));
        }
    }

    None
}

/// 解析日历单元格: 空白记为 0，非数值报错
fn parse_amount(row: &RawRow, column: &str, row_index: usize) -> ImportResult<f64> {
    let raw = row.get(column).map(|v| v.trim()).unwrap_or_default();
    if raw.is_empty() {
        return Ok(0.0);
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

fn require_farm_id(row: &RawRow, row_index: usize) -> ImportResult<String> {
    match row.get(FARM_ID_COLUMN).map(|v| v.trim()) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ImportError::Validation {
            row: row_index,
            reason: ValidationReason::EmptyKey(FARM_ID_COLUMN.to_string()),
        }),
    }
}

// ==========================================
// FarmCalendar - 单个农场的投入日历
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FarmCalendar {
    pub amounts: BTreeMap<NaiveDate, f64>,
    pub total: f64, // Total 列（不存在或空白时为 0）
}

// ==========================================
// WideCostSheet - 灌溉/施肥宽表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideCostSheet {
    kind: InputKind,
    dates: BTreeSet<NaiveDate>,
    has_total: bool,
    farms: BTreeMap<String, FarmCalendar>,
}

impl WideCostSheet {
    /// 由原始表构建宽表
    ///
    /// # 返回
    /// - Err(MissingColumns): 缺少 FarmID
    /// - Err(NoDateColumns): 没有可解析的日期列
    /// - Err(Validation): FarmID 为空或单元格非数值
    pub fn from_table(table: &RawTable, kind: InputKind) -> ImportResult<Self> {
        if !table.headers.iter().any(|h| h == FARM_ID_COLUMN) {
            return Err(ImportError::MissingColumns(vec![FARM_ID_COLUMN.to_string()]));
        }
        let has_total = table.headers.iter().any(|h| h == TOTAL_COLUMN);

        // 日期列: 除 FarmID / Total 外的全部列，无法解析的表头丢弃
        let mut date_columns: Vec<(&str, NaiveDate)> = Vec::new();
        for header in &table.headers {
            if header == FARM_ID_COLUMN || header == TOTAL_COLUMN {
                continue;
            }
            match parse_sheet_date(header) {
                Some(date) => date_columns.push((header.as_str(), date)),
                None => debug!(kind = %kind, header = %header, "丢弃无法解析为日期的列"),
            }
        }
        if date_columns.is_empty() {
            return Err(ImportError::NoDateColumns);
        }

        let mut farms: BTreeMap<String, FarmCalendar> = BTreeMap::new();
        for (row_index, row) in table.rows.iter().enumerate() {
            let farm_id = require_farm_id(row, row_index)?;
            let calendar = farms.entry(farm_id).or_default();

            // 同一农场多行时累加
            for (column, date) in &date_columns {
                let amount = parse_amount(row, column, row_index)?;
                *calendar.amounts.entry(*date).or_insert(0.0) += amount;
            }
            if has_total {
                calendar.total += parse_amount(row, TOTAL_COLUMN, row_index)?;
            }
        }

        let dates: BTreeSet<NaiveDate> = date_columns.iter().map(|(_, d)| *d).collect();
        info!(kind = %kind, farms = farms.len(), dates = dates.len(), "投入日历表解析完成");

        Ok(Self {
            kind,
            dates,
            has_total,
            farms,
        })
    }

    /// 从文件读取宽表
    pub fn from_file<P: AsRef<Path>>(file_path: P, kind: InputKind) -> ImportResult<Self> {
        let table = UniversalFileParser.parse_to_raw_table(file_path.as_ref())?;
        Self::from_table(&table, kind)
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn dates(&self) -> &BTreeSet<NaiveDate> {
        &self.dates
    }

    pub fn has_total(&self) -> bool {
        self.has_total
    }

    pub fn farms(&self) -> &BTreeMap<String, FarmCalendar> {
        &self.farms
    }

    /// 宽表 → 长表（按日期、农场升序）
    ///
    /// # 参数
    /// - range: 闭区间过滤；None 表示不过滤
    pub fn melt(&self, range: Option<&DateRange>) -> Vec<InputEntry> {
        let mut entries: Vec<InputEntry> = self
            .farms
            .iter()
            .flat_map(|(farm_id, calendar)| {
                calendar.amounts.iter().map(move |(date, amount)| InputEntry {
                    farm_id: farm_id.clone(),
                    date: *date,
                    amount: *amount,
                })
            })
            .filter(|entry| range.map_or(true, |r| r.contains(entry.date)))
            .collect();

        entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.farm_id.cmp(&b.farm_id)));
        entries
    }

    /// 各农场 Total 列
    ///
    /// # 返回
    /// - Err(MissingColumns): 表中没有 Total 列
    pub fn totals(&self) -> ImportResult<BTreeMap<&str, f64>> {
        if !self.has_total {
            return Err(ImportError::MissingColumns(vec![TOTAL_COLUMN.to_string()]));
        }
        Ok(self
            .farms
            .iter()
            .map(|(farm_id, calendar)| (farm_id.as_str(), calendar.total))
            .collect())
    }
}

// ==========================================
// PlantingRecord - 种植记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantingRecord {
    pub farm_id: String,
    pub planting_date: Option<NaiveDate>,
    pub hybrid: String,
    pub seeding_rate: Option<f64>, // plants/ac
}

// ==========================================
// PlantingSheet - 种植表（农场 → 品种）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantingSheet {
    records: Vec<PlantingRecord>,
}

impl PlantingSheet {
    /// 必需列（按报告顺序）
    pub const REQUIRED_COLUMNS: [&'static str; 4] = [
        FARM_ID_COLUMN,
        PLANTING_DATE_COLUMN,
        HYBRID_COLUMN,
        SEEDING_RATE_COLUMN,
    ];

    /// 由原始表构建种植表
    ///
    /// # 返回
    /// - Err(MissingColumns): 列出全部缺失的必需列
    /// - Err(Validation): FarmID / CompanyHybrid 为空，或播种密度非数值
    pub fn from_table(table: &RawTable) -> ImportResult<Self> {
        let missing: Vec<String> = Self::REQUIRED_COLUMNS
            .iter()
            .filter(|c| !table.headers.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ImportError::MissingColumns(missing));
        }

        let mut records: Vec<PlantingRecord> = Vec::with_capacity(table.rows.len());
        for (row_index, row) in table.rows.iter().enumerate() {
            let farm_id = require_farm_id(row, row_index)?;

            let hybrid = match row.get(HYBRID_COLUMN).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => {
                    return Err(ImportError::Validation {
                        row: row_index,
                        reason: ValidationReason::EmptyKey(HYBRID_COLUMN.to_string()),
                    })
                }
            };

            let planting_date = row
                .get(PLANTING_DATE_COLUMN)
                .and_then(|v| parse_sheet_date(v));

            let seeding_rate = match row.get(SEEDING_RATE_COLUMN).map(|v| v.trim()) {
                Some(v) if !v.is_empty() => Some(parse_amount(row, SEEDING_RATE_COLUMN, row_index)?),
                _ => None,
            };

            // 同一农场多行时保留第一行
            if records.iter().any(|r| r.farm_id == farm_id) {
                warn!(row = row_index, farm_id = %farm_id, "种植表农场重复，保留首行");
                continue;
            }

            records.push(PlantingRecord {
                farm_id,
                planting_date,
                hybrid,
                seeding_rate,
            });
        }

        info!(farms = records.len(), "种植表解析完成");
        Ok(Self { records })
    }

    /// 从文件读取种植表
    pub fn from_file<P: AsRef<Path>>(file_path: P) -> ImportResult<Self> {
        let table = UniversalFileParser.parse_to_raw_table(file_path.as_ref())?;
        Self::from_table(&table)
    }

    pub fn records(&self) -> &[PlantingRecord] {
        &self.records
    }

    /// 农场对应的品种
    pub fn hybrid_of(&self, farm_id: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.farm_id == farm_id)
            .map(|r| r.hybrid.as_str())
    }

    /// 表中出现的全部品种（升序去重）
    pub fn hybrids(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.hybrid.as_str()).collect()
    }
}
