// ==========================================
// PHIBRA MAX WATER - 核心库
// ==========================================
// 职责: 农田记录导入、多年数据集合并、费用/用水效率聚合
// 扩展: 投入品费用表、灌溉建议、土壤墒情、病害预警、用水响应模拟
// 技术栈: Rust + SQLite（配置存储）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 导入层 - 文件解析与数据集构建
pub mod importer;

// 引擎层 - 合并、聚合与分析
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    CropStage, DiseaseRisk, Efficiency, GroupKey, InputKind, MicroclimateZone, RecordKey,
};

// 领域实体
pub use domain::{
    AggregateResult, ColumnLayout, Dataset, FieldRecord, MergedDataset, RawRow, RawTable, Schema,
};

// 导入
pub use importer::{load_dataset, DatasetLoader, ImportError, ImportResult, ValidationReason};

// 引擎
pub use engine::{
    aggregate, categorize_microclimate, merge, AggregateRequest, Aggregator, DatasetMerger,
    DecisionSupport, SoilWaterPlanner,
};

// API
pub use api::{AggregationApi, ApiError, ApiResult, FieldAnalysisApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "PHIBRA MAX WATER";

/// 获取默认配置数据库路径
///
/// 优先级: PHIBRA_WATER_DB_PATH 环境变量 > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("PHIBRA_WATER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./phibra_water.db");

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join("phibra-water");
        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&app_dir).is_ok() {
            path = app_dir.join("phibra_water.db");
        }
    }

    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }
}
