// ==========================================
// PHIBRA MAX WATER - 领域模型层
// ==========================================
// 职责: 定义列结构、农田记录、数据集、聚合结果、投入费用与土壤墒情实体
// 红线: 不含文件读取逻辑，不含引擎计算逻辑
// ==========================================

pub mod aggregate;
pub mod input_cost;
pub mod record;
pub mod schema;
pub mod soil_moisture;
pub mod types;

// 重导出核心类型
pub use aggregate::AggregateResult;
pub use input_cost::{
    DailyInputCost, DailyTotalCost, DateRange, HybridCost, InputEntry, InputPrices,
};
pub use record::{Dataset, FieldRecord, MergedDataset, RawRow, RawTable};
pub use schema::{ColumnLayout, ColumnRole, Schema};
pub use soil_moisture::{HybridSensorReading, MoistureCell, SensorReading, SoilWaterBalance};
pub use types::{
    CropStage, DiseaseRisk, Efficiency, GroupKey, InputKind, MicroclimateZone, RecordKey,
};
