// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的配置库初始化、原始行构造、CSV 夹具等功能
// ==========================================

#![allow(dead_code)]

use phibra_water::config::{config_keys, ConfigManager};
use phibra_water::domain::{Dataset, RawRow, Schema};
use phibra_water::importer::load_dataset;
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 标准列集合
pub const STANDARD_COLUMNS: [&str; 6] = ["field", "hybrid", "year", "cost", "water", "yield"];

/// 创建临时配置库
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - ConfigManager: 已建表的配置管理器
pub fn create_test_config() -> Result<(NamedTempFile, ConfigManager), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径不是 UTF-8")?.to_string();
    let config = ConfigManager::new(&db_path)?;
    Ok((temp_file, config))
}

/// 写入一组测试配置（标签列 + 多费用列 + 面积列）
pub fn insert_test_config(config: &ConfigManager) -> Result<(), Box<dyn Error>> {
    config.set_global_config_value(config_keys::LABEL_COLUMNS, r#"["notes"]"#)?;
    config.set_global_config_value(config_keys::COST_COLUMNS, "seed,labor")?;
    config.set_global_config_value(config_keys::WATER_COLUMN, "water")?;
    config.set_global_config_value(config_keys::YIELD_COLUMN, "yield")?;
    config.set_global_config_value(config_keys::AREA_COLUMN, "acres")?;
    Ok(())
}

/// 由列名与单元格文本构造原始行
pub fn rows(columns: &[&str], cells: &[&[&str]]) -> Vec<RawRow> {
    cells
        .iter()
        .map(|row| {
            columns
                .iter()
                .zip(row.iter())
                .map(|(c, v)| (c.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

pub fn schema(columns: &[&str]) -> Schema {
    Schema::new(columns.iter().copied()).expect("测试 schema 应有效")
}

/// 标准列数据集: 每行 (field, hybrid, year, cost, water, yield)
pub fn standard_dataset(cells: &[&[&str]]) -> Dataset {
    load_dataset(&rows(&STANDARD_COLUMNS, cells), &schema(&STANDARD_COLUMNS))
        .expect("标准数据集应加载成功")
}

/// 在目录下写入 CSV 夹具
pub fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("创建夹具文件失败");
    file.write_all(content.as_bytes()).expect("写入夹具文件失败");
    path
}
