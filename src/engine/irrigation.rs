// ==========================================
// PHIBRA MAX WATER - 灌溉建议引擎
// ==========================================
// 职责: 根据土壤墒情、生育期、降雨预报、NDVI 判定是否灌溉及灌水量
// 红线: 规则按固定顺序执行，每条命中规则都记录 reason
// ==========================================
// 规则顺序:
// 1) 土壤湿度 < 阈值 且 无降雨预报 → 需要灌溉，灌水量 = 生育期需水量
// 2) 有降雨预报 且 QPF > 阈值 → 不需要灌溉
// 3) NDVI 存在且低于生育期阈值 → 需要灌溉，灌水量 = max(当前, 生育期需水量)
// ==========================================

use crate::domain::types::CropStage;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// 每英亩英寸对应升数
pub const LITRES_PER_ACRE_INCH: f64 = 102_790.4;

/// 英亩英寸 → 升
pub fn acre_inches_to_litres(acre_inches: f64) -> f64 {
    acre_inches * LITRES_PER_ACRE_INCH
}

// 生育期需水量（英寸）与 NDVI 阈值；未知生育期取默认值
fn stage_water_requirement(stage: &CropStage) -> f64 {
    match stage {
        CropStage::Germination => 0.2,
        CropStage::Vegetative => 0.3,
        CropStage::Flowering => 0.4,
        CropStage::Maturation => 0.2,
        CropStage::Other(_) => 0.3,
    }
}

fn stage_ndvi_threshold(stage: &CropStage) -> f64 {
    match stage {
        CropStage::Germination => 0.3,
        CropStage::Vegetative => 0.5,
        CropStage::Flowering => 0.5,
        CropStage::Maturation => 0.3,
        CropStage::Other(_) => 0.5,
    }
}

// ==========================================
// IrrigationThresholds - 可配置阈值
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrigationThresholds {
    pub soil_moisture_threshold: f64, // 土壤湿度阈值（%）
    pub qpf_threshold: f64,           // 定量降水预报阈值（英寸）
    pub cost_per_acre_inch: f64,      // 每英亩英寸灌溉费用（USD）
}

impl Default for IrrigationThresholds {
    fn default() -> Self {
        Self {
            soil_moisture_threshold: 30.0,
            qpf_threshold: 0.2,
            cost_per_acre_inch: 15.0,
        }
    }
}

// ==========================================
// IrrigationInputs - 单次判定输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationInputs {
    pub soil_moisture: f64,
    pub crop_stage: CropStage,
    pub rain_forecast: bool,
    pub qpf: f64,
    pub ndvi: Option<f64>,
}

// ==========================================
// IrrigationAdvice - 判定结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrrigationAdvice {
    pub needed: bool,
    pub water_inches: f64,
    pub cost: f64,
    pub reasons: Vec<String>, // 命中规则代码（按执行顺序）
}

impl IrrigationAdvice {
    /// 灌水量（升/英亩）
    pub fn water_litres_per_acre(&self) -> f64 {
        acre_inches_to_litres(self.water_inches)
    }
}

// ==========================================
// IrrigationAdvisor - 灌溉建议引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct IrrigationAdvisor {
    thresholds: IrrigationThresholds,
}

impl IrrigationAdvisor {
    pub fn new(thresholds: IrrigationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &IrrigationThresholds {
        &self.thresholds
    }

    #[instrument(skip(self), fields(stage = %inputs.crop_stage))]
    pub fn recommend(&self, inputs: &IrrigationInputs) -> IrrigationAdvice {
        let requirement = stage_water_requirement(&inputs.crop_stage);
        let mut needed = false;
        let mut water_inches = 0.0;
        let mut reasons = Vec::new();

        if inputs.soil_moisture < self.thresholds.soil_moisture_threshold && !inputs.rain_forecast {
            needed = true;
            water_inches = requirement;
            reasons.push("SOIL_DRY_NO_RAIN".to_string());
        }

        // 有效降雨只取消“需要灌溉”标记，灌水量保持不变
        if inputs.rain_forecast && inputs.qpf > self.thresholds.qpf_threshold {
            needed = false;
            reasons.push("RAIN_EXPECTED".to_string());
        }

        if let Some(ndvi) = inputs.ndvi {
            if ndvi < stage_ndvi_threshold(&inputs.crop_stage) {
                needed = true;
                water_inches = f64::max(water_inches, requirement);
                reasons.push("LOW_NDVI".to_string());
            }
        }

        IrrigationAdvice {
            needed,
            water_inches,
            cost: water_inches * self.thresholds.cost_per_acre_inch,
            reasons,
        }
    }
}

/// 使用默认阈值判定
pub fn recommend_irrigation(inputs: &IrrigationInputs) -> IrrigationAdvice {
    IrrigationAdvisor::default().recommend(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(soil: f64, stage: &str, rain: bool, qpf: f64, ndvi: Option<f64>) -> IrrigationInputs {
        IrrigationInputs {
            soil_moisture: soil,
            crop_stage: CropStage::parse(stage),
            rain_forecast: rain,
            qpf,
            ndvi,
        }
    }

    #[test]
    fn test_dry_soil_without_rain_needs_irrigation() {
        let advice = recommend_irrigation(&inputs(20.0, "flowering", false, 0.0, None));
        assert!(advice.needed);
        assert_eq!(advice.water_inches, 0.4);
        assert_eq!(advice.cost, 0.4 * 15.0);
        assert_eq!(advice.reasons, vec!["SOIL_DRY_NO_RAIN"]);
    }

    #[test]
    fn test_wet_soil_no_irrigation() {
        let advice = recommend_irrigation(&inputs(45.0, "vegetative", false, 0.0, Some(0.8)));
        assert!(!advice.needed);
        assert_eq!(advice.water_inches, 0.0);
        assert_eq!(advice.cost, 0.0);
        assert!(advice.reasons.is_empty());
    }

    #[test]
    fn test_heavy_rain_cancels() {
        let advice = recommend_irrigation(&inputs(20.0, "vegetative", true, 0.5, None));
        assert!(!advice.needed);
        assert_eq!(advice.reasons, vec!["RAIN_EXPECTED"]);
    }

    #[test]
    fn test_low_ndvi_overrides_rain() {
        let advice = recommend_irrigation(&inputs(50.0, "germination", true, 0.5, Some(0.1)));
        assert!(advice.needed);
        assert_eq!(advice.water_inches, 0.2);
        assert_eq!(advice.reasons, vec!["RAIN_EXPECTED", "LOW_NDVI"]);
    }

    #[test]
    fn test_unknown_stage_defaults() {
        let advice = recommend_irrigation(&inputs(50.0, "tasseling", false, 0.0, Some(0.45)));
        assert!(advice.needed);
        assert_eq!(advice.water_inches, 0.3);
    }

    #[test]
    fn test_custom_thresholds() {
        let advisor = IrrigationAdvisor::new(IrrigationThresholds {
            soil_moisture_threshold: 40.0,
            qpf_threshold: 0.2,
            cost_per_acre_inch: 20.0,
        });
        let advice = advisor.recommend(&inputs(35.0, "maturation", false, 0.0, None));
        assert!(advice.needed);
        assert_eq!(advice.cost, 0.2 * 20.0);
    }

    #[test]
    fn test_acre_inch_conversion() {
        assert_eq!(acre_inches_to_litres(2.0), 205_580.8);
    }
}
