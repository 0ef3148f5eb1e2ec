// ==========================================
// PHIBRA MAX WATER - 引擎层
// ==========================================
// 职责: 合并、聚合、投入费用、灌溉建议、土壤墒情、决策支持、用水响应模拟
// 红线: 引擎不读文件、不访问数据库，只消费领域对象
// ==========================================

pub mod aggregator;
pub mod decision_support;
pub mod input_cost;
pub mod irrigation;
pub mod merger;
pub mod soil_moisture;
pub mod water_response;

// 重导出核心引擎
pub use aggregator::{aggregate, AggregateRequest, Aggregator};
pub use decision_support::{
    advise, categorize_microclimate, Advisory, AlertLevel, DecisionSupport, RiskFilter,
    RiskObservation,
};
pub use input_cost::InputCostCalculator;
pub use irrigation::{
    acre_inches_to_litres, recommend_irrigation, IrrigationAdvice, IrrigationAdvisor,
    IrrigationInputs, IrrigationThresholds, LITRES_PER_ACRE_INCH,
};
pub use merger::{merge, DatasetMerger};
pub use soil_moisture::{
    join_hybrids, latest_mean_moisture, moisture_profile, stage_soil_capacity, SoilWaterPlanner,
    MM_PER_INCH, RECENT_PROFILE_DATES,
};
pub use water_response::{
    efficiency_by_hybrid, HybridWaterEfficiency, SimulatedTrial, TrialSimulator,
    WaterResponseModel,
};
