// ==========================================
// PHIBRA MAX WATER - 土壤墒情模型
// ==========================================
// 用途: 墒情传感器读数 → 深度/日期剖面、生育期土壤水量平衡
// 单位: 深度（英寸），湿度读数（毫米），水量（英寸）
// ==========================================

use crate::domain::types::CropStage;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// SensorReading - 单条传感器读数
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub sensor_id: String,
    pub date: NaiveDate,
    pub depth: f64,
    pub moisture: f64,
    pub sensor_type: String, // 缺列时为 "Unknown"
}

// ==========================================
// HybridSensorReading - 关联品种后的读数
// ==========================================
// hybrid 为 None: 品种表中没有该传感器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridSensorReading {
    #[serde(flatten)]
    pub reading: SensorReading,
    pub hybrid: Option<String>,
}

// ==========================================
// MoistureCell - 剖面单元（深度 × 日期的平均湿度）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoistureCell {
    pub depth: f64,
    pub date: NaiveDate,
    pub mean_moisture: f64,
    pub reading_count: usize,
}

// ==========================================
// SoilWaterBalance - 生育期土壤水量平衡
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilWaterBalance {
    pub crop_stage: CropStage,
    pub soil_capacity: f64,                 // 生育期土壤持水量（英寸）
    pub latest_date: Option<NaiveDate>,     // 参与平均的最新读数日期
    pub average_soil_moisture: f64,         // 最新日期平均湿度（英寸）
    pub forecast_rain: f64,                 // 预报降雨合计（英寸）
    pub total_available_water: f64,         // 平均湿度 + 预报降雨
    pub irrigation_threshold: f64,          // max(持水量 - 可用水量, 0)
    pub available_water_by_day: Vec<f64>,   // 平均湿度 + 逐日累计降雨
}

impl SoilWaterBalance {
    pub fn needs_irrigation(&self) -> bool {
        self.irrigation_threshold > 0.0
    }
}
