// ==========================================
// PHIBRA MAX WATER - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use crate::domain::record::{RawRow, RawTable};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// 溢出列名前缀（表头不得以此开头）
pub const OVERFLOW_COLUMN_PREFIX: &str = "<overflow:";

/// 超出表头宽度的单元格列名（1 起）
pub fn overflow_column_name(col_idx: usize) -> String {
    format!("{}{}>", OVERFLOW_COLUMN_PREFIX, col_idx + 1)
}

/// 校验表头：非空、不重复、不占用溢出列名
fn validate_headers(headers: &[String]) -> ImportResult<()> {
    let mut seen = BTreeSet::new();
    for (idx, header) in headers.iter().enumerate() {
        if header.is_empty() {
            return Err(ImportError::InvalidHeader(format!("第 {} 列表头为空", idx + 1)));
        }
        if header.starts_with(OVERFLOW_COLUMN_PREFIX) {
            return Err(ImportError::InvalidHeader(format!("表头使用了保留名: '{}'", header)));
        }
        if !seen.insert(header.as_str()) {
            return Err(ImportError::InvalidHeader(format!("表头重复: '{}'", header)));
        }
    }
    Ok(())
}

/// 按表头组装一行
///
/// - 超出表头宽度的非空单元格记为 <overflow:n>，交由结构校验报告为多余列
/// - 短行缺少的列不补齐，交由结构校验报告为缺失列
fn build_row<'a, I>(headers: &[String], cells: I) -> RawRow
where
    I: Iterator<Item = String> + 'a,
{
    let mut row_map = RawRow::new();
    for (col_idx, value) in cells.enumerate() {
        match headers.get(col_idx) {
            Some(header) => {
                row_map.insert(header.clone(), value);
            }
            None if !value.is_empty() => {
                row_map.insert(overflow_column_name(col_idx), value);
            }
            None => {}
        }
    }
    row_map
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致，由结构校验给出行级错误
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        validate_headers(&headers)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let row_map = build_row(&headers, record.iter().map(|v| v.trim().to_string()));

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row_map);
        }

        debug!(file = %file_path.display(), rows = rows.len(), "CSV 解析完成");
        Ok(RawTable { headers, rows })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 仅读取第一个工作表，第一行为表头
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无表头行".to_string()))?;

        // 去掉表头尾部的空单元格（格式化区域常见）
        let mut headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();
        while headers.last().map_or(false, |h| h.is_empty()) {
            headers.pop();
        }
        validate_headers(&headers)?;

        let mut rows = Vec::new();
        for data_row in sheet_rows {
            let row_map = build_row(
                &headers,
                data_row.iter().map(|cell| cell.to_string().trim().to_string()),
            );

            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }
            rows.push(row_map);
        }

        debug!(file = %file_path.display(), sheet = %sheet_name, rows = rows.len(), "Excel 解析完成");
        Ok(RawTable { headers, rows })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_raw_table(&self, file_path: &Path) -> ImportResult<RawTable> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_to_raw_table(file_path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_table(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(temp_file, "{}", line).unwrap();
        }
        temp_file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let temp_file = csv_file(&[
            "field,hybrid,year,cost",
            "F1,H1,2023,100",
            "F2, H2 ,2023,80.5",
        ]);

        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();

        assert_eq!(table.headers, vec!["field", "hybrid", "year", "cost"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("field"), Some(&"F1".to_string()));
        assert_eq!(table.rows[1].get("hybrid"), Some(&"H2".to_string()));
        assert_eq!(table.rows[1].get("cost"), Some(&"80.5".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_table(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let temp_file = csv_file(&["field,cost", "F1,2.5", ",", "F2,3.0"]);

        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();

        // 应跳过空行
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_csv_parser_overflow_and_short_rows() {
        let temp_file = csv_file(&["field,hybrid,year", "F1,H1,2023,extra", "F2,H2"]);

        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();

        assert_eq!(table.rows[0].get("<overflow:4>"), Some(&"extra".to_string()));
        assert!(!table.rows[1].contains_key("year"));
    }

    #[test]
    fn test_csv_parser_overflow_does_not_overwrite_lookalike_header() {
        let temp_file = csv_file(&["field,column_3", "F1,real,extra"]);

        let table = CsvParser.parse_to_raw_table(temp_file.path()).unwrap();

        assert_eq!(table.rows[0].get("column_3"), Some(&"real".to_string()));
        assert_eq!(table.rows[0].get("<overflow:3>"), Some(&"extra".to_string()));
    }

    #[test]
    fn test_csv_parser_rejects_reserved_header() {
        let temp_file = csv_file(&["field,<overflow:2>", "F1,x"]);

        let result = CsvParser.parse_to_raw_table(temp_file.path());
        assert!(matches!(result, Err(ImportError::InvalidHeader(_))));
    }

    #[test]
    fn test_csv_parser_duplicate_header() {
        let temp_file = csv_file(&["field,field", "F1,F2"]);

        let result = CsvParser.parse_to_raw_table(temp_file.path());
        assert!(matches!(result, Err(ImportError::InvalidHeader(_))));
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let temp_file = Builder::new().suffix(".txt").tempfile().unwrap();

        let result = UniversalFileParser.parse_to_raw_table(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }
}
