// ==========================================
// PHIBRA MAX WATER - 聚合配置读取 Trait
// ==========================================
// 职责: 定义聚合/费用/灌溉/模拟所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::input_cost::InputPrices;
use crate::domain::schema::ColumnLayout;
use crate::engine::aggregator::AggregateRequest;
use crate::engine::irrigation::IrrigationThresholds;
use crate::importer::error::ImportResult;
use async_trait::async_trait;

// ==========================================
// AggregationConfigReader Trait
// ==========================================
// 用途: API 层与命令行读取默认参数
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AggregationConfigReader: Send + Sync {
    // ===== 列配置 =====

    /// 获取列角色布局
    ///
    /// # 默认值
    /// - field / hybrid / year，无标签列
    async fn get_column_layout(&self) -> ImportResult<ColumnLayout>;

    /// 获取默认聚合参数
    ///
    /// # 默认值
    /// - 费用列 ["cost"]，用水列 "water"，产出列 "yield"，无面积列
    async fn get_default_aggregate_request(&self) -> ImportResult<AggregateRequest>;

    /// 是否启用合并结果缓存
    ///
    /// # 默认值
    /// - true
    async fn is_merge_cache_enabled(&self) -> ImportResult<bool>;

    /// 合并缓存最多保留的条目数（超出时淘汰最早写入的条目）
    ///
    /// # 默认值
    /// - 16
    async fn get_merge_cache_capacity(&self) -> ImportResult<usize>;

    // ===== 投入品与灌溉 =====

    /// 获取投入品单价
    ///
    /// # 默认值
    /// - 灌溉 15.0 USD，施肥 0.5 USD
    async fn get_input_prices(&self) -> ImportResult<InputPrices>;

    /// 获取灌溉判定阈值
    ///
    /// # 默认值
    /// - 土壤湿度 30，QPF 0.2，每英亩英寸 15.0 USD
    async fn get_irrigation_thresholds(&self) -> ImportResult<IrrigationThresholds>;

    // ===== 用水效率 =====

    /// 获取市场单价（经济用水效率）
    ///
    /// # 默认值
    /// - 2.0
    async fn get_market_price(&self) -> ImportResult<f64>;

    /// 获取基准产量（灌溉用水效率）
    ///
    /// # 默认值
    /// - 2.0
    async fn get_baseline_yield(&self) -> ImportResult<f64>;

    /// 获取模拟参数 (seed, count)
    ///
    /// # 默认值
    /// - (42, 50)
    async fn get_simulation_params(&self) -> ImportResult<(u64, usize)>;
}
