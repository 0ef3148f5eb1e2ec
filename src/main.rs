// ==========================================
// PHIBRA MAX WATER - 命令行入口
// ==========================================
// 用法: phibra-water --help
// 输出: 聚合结果 JSON（stdout）；日志写 stderr
// 列名默认值来自配置库
// ==========================================

use anyhow::{bail, Context, Result};
use clap::Parser;
use phibra_water::api::AggregationApi;
use phibra_water::config::{AggregationConfigReader, ConfigManager};
use phibra_water::engine::AggregateRequest;
use phibra_water::{get_default_db_path, logging, APP_NAME, VERSION};
use std::path::PathBuf;
use std::sync::Arc;

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "phibra-water")]
#[command(about = "按 (地块, 品种) 汇总费用与用水效率")]
#[command(version)]
struct Cli {
    /// 数据文件（.csv/.xlsx/.xls），首行表头即列定义
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// 费用列（可重复；指定后替换配置中的费用列）
    #[arg(long = "cost", value_name = "COLUMN", value_parser = non_blank)]
    cost_columns: Vec<String>,

    /// 用水列
    #[arg(long = "water", value_name = "COLUMN", value_parser = non_blank)]
    water_column: Option<String>,

    /// 产出列
    #[arg(long = "yield", value_name = "COLUMN", value_parser = non_blank)]
    yield_column: Option<String>,

    /// 面积列（用水/产出按面积加权）
    #[arg(long = "area", value_name = "COLUMN", value_parser = non_blank)]
    area_column: Option<String>,

    /// 配置库路径（默认见 get_default_db_path）
    #[arg(long = "db", value_name = "PATH")]
    db_path: Option<String>,
}

fn non_blank(value: &str) -> std::result::Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err("列名不能为空".to_string())
    } else {
        Ok(trimmed.to_string())
    }
}

impl Cli {
    /// 以配置默认值为底，覆盖命令行指定的列
    fn apply_to(&self, mut request: AggregateRequest) -> AggregateRequest {
        if !self.cost_columns.is_empty() {
            request.cost_columns = self.cost_columns.iter().cloned().collect();
        }
        if let Some(water) = &self.water_column {
            request.water_column = water.clone();
        }
        if let Some(yield_column) = &self.yield_column {
            request.yield_column = yield_column.clone();
        }
        if let Some(area) = &self.area_column {
            request.area_column = Some(area.clone());
        }
        request
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = Cli::parse();
    tracing::info!("{} v{}", APP_NAME, VERSION);

    let db_path = args.db_path.clone().unwrap_or_else(get_default_db_path);
    tracing::info!(db_path = %db_path, "使用配置库");
    let config = Arc::new(
        ConfigManager::new(&db_path).with_context(|| format!("无法打开配置库: {}", db_path))?,
    );

    let request = args.apply_to(config.get_default_aggregate_request().await?);
    let api = AggregationApi::new(Arc::clone(&config));

    match api.run(&args.files, Some(request)).await {
        Ok(results) => {
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Err(e) => {
            // 错误结构同样以 JSON 输出，便于展示层原样显示
            println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            bail!("聚合失败: {}", e)
        }
    }
}
