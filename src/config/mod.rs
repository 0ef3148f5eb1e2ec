// ==========================================
// PHIBRA MAX WATER - 配置层
// ==========================================
// 职责: 系统配置管理（列名、单价、阈值、模拟参数）
// 存储: config_kv 表
// ==========================================

pub mod aggregation_config_trait;
pub mod config_manager;

// 重导出核心配置管理器
pub use aggregation_config_trait::AggregationConfigReader;
pub use config_manager::{config_keys, ConfigManager};
