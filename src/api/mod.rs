// ==========================================
// PHIBRA MAX WATER - API 层
// ==========================================
// 职责: 提供业务 API 接口，供展示层与命令行调用
// ==========================================

pub mod aggregation_api;
pub mod error;
pub mod field_analysis_api;

// 重导出核心类型
pub use aggregation_api::AggregationApi;
pub use error::{ApiError, ApiErrorResponse, ApiResult, ErrorLocation};
pub use field_analysis_api::{
    CostSheetFiles, DecisionReport, FieldAnalysisApi, SensorFiles, SoilMoistureReport,
    TrialEfficiency, WaterEfficiencyReport,
};
