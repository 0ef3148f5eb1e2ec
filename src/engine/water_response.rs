// ==========================================
// PHIBRA MAX WATER - 用水响应模型与模拟试验
// ==========================================
// 职责: 产量对用水/温度/湿度的高斯响应曲线 + 可复现的模拟试验数据
// 红线: 同一 seed 必须产出完全相同的试验数据
// ==========================================

use crate::domain::types::Efficiency;
use crate::importer::error::{ImportError, ImportResult};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

const HYBRIDS: [&str; 3] = ["Hybrid_A", "Hybrid_B", "Hybrid_C"];
const LOCATIONS: [&str; 4] = ["North", "South", "East", "West"];

// 模拟取值范围
const TEMPERATURE_RANGE: (f64, f64) = (15.0, 35.0);
const HUMIDITY_RANGE: (f64, f64) = (30.0, 70.0);
const WATER_RANGE: (f64, f64) = (500.0, 2000.0);
const COST_PER_GALLON_RANGE: (f64, f64) = (0.05, 0.15);
const YIELD_NOISE_STD: f64 = 0.5;

fn gaussian_effect(value: f64, optimum: f64, sigma: f64) -> f64 {
    (-(value - optimum).powi(2) / (2.0 * sigma.powi(2))).exp()
}

// ==========================================
// WaterResponseModel - 产量响应曲线
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterResponseModel {
    pub potential_yield: f64,
    pub optimal_water: f64,
    pub water_sigma: f64,
    pub optimal_temperature: f64,
    pub temperature_sigma: f64,
    pub optimal_humidity: f64,
    pub humidity_sigma: f64,
}

impl Default for WaterResponseModel {
    fn default() -> Self {
        Self {
            potential_yield: 10.0,
            optimal_water: 1200.0,
            water_sigma: 300.0,
            optimal_temperature: 25.0,
            temperature_sigma: 5.0,
            optimal_humidity: 50.0,
            humidity_sigma: 10.0,
        }
    }
}

impl WaterResponseModel {
    /// 校验参数（潜在产量非负、各 σ 为正且均为有限数）
    pub fn validate(&self) -> ImportResult<()> {
        let values = [
            self.potential_yield,
            self.optimal_water,
            self.water_sigma,
            self.optimal_temperature,
            self.temperature_sigma,
            self.optimal_humidity,
            self.humidity_sigma,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ImportError::InvalidSimulation("模型参数必须为有限数".to_string()));
        }
        if self.potential_yield < 0.0 {
            return Err(ImportError::InvalidSimulation("潜在产量不能为负".to_string()));
        }
        if self.water_sigma <= 0.0 || self.temperature_sigma <= 0.0 || self.humidity_sigma <= 0.0 {
            return Err(ImportError::InvalidSimulation("σ 必须为正".to_string()));
        }
        Ok(())
    }

    /// 不含噪声的响应产量
    ///
    /// # 返回
    /// - Err(InvalidSimulation): 模型参数无效
    pub fn response(&self, water: f64, temperature: f64, humidity: f64) -> ImportResult<f64> {
        self.validate()?;
        Ok(self.response_unchecked(water, temperature, humidity))
    }

    // 调用方已完成 validate()
    fn response_unchecked(&self, water: f64, temperature: f64, humidity: f64) -> f64 {
        let raw = self.potential_yield
            * gaussian_effect(water, self.optimal_water, self.water_sigma)
            * gaussian_effect(temperature, self.optimal_temperature, self.temperature_sigma)
            * gaussian_effect(humidity, self.optimal_humidity, self.humidity_sigma);
        self.clip(raw)
    }

    // 截断到 [0, 潜在产量]；NaN 记为 0
    fn clip(&self, value: f64) -> f64 {
        value.max(0.0).min(self.potential_yield.max(0.0))
    }
}

// ==========================================
// SimulatedTrial - 单条模拟试验
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedTrial {
    pub sensor_id: usize, // 1 起
    pub hybrid: String,
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub water_usage: f64,
    pub crop_yield: f64,
    pub cost_per_gallon: f64,
}

impl SimulatedTrial {
    /// 用水费用 = 用水量 × 单价
    pub fn water_cost(&self) -> f64 {
        self.water_usage * self.cost_per_gallon
    }

    /// 经济用水效率 = 100 × (产值 - 用水费用) / 用水量
    pub fn economic_wue(&self, market_price: f64) -> Efficiency {
        let net = self.crop_yield * market_price - self.water_cost();
        Efficiency::from_totals(100.0 * net, self.water_usage)
    }

    /// 灌溉用水效率 = 100 × (产量 - 基准产量) / 用水量
    pub fn irrigation_wue(&self, baseline_yield: f64) -> Efficiency {
        Efficiency::from_totals(100.0 * (self.crop_yield - baseline_yield), self.water_usage)
    }
}

// ==========================================
// HybridWaterEfficiency - 按品种用水效率汇总
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridWaterEfficiency {
    pub hybrid: String,
    pub trial_count: usize,
    pub mean_water: f64,
    pub mean_yield: f64,
    pub total_water_cost: f64,
    pub efficiency: Efficiency, // 平均产量 / 平均用水
}

// ==========================================
// TrialSimulator - 模拟试验生成器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TrialSimulator {
    model: WaterResponseModel,
}

impl TrialSimulator {
    pub fn new(model: WaterResponseModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &WaterResponseModel {
        &self.model
    }

    /// 生成模拟试验
    ///
    /// # 返回
    /// - Err(InvalidSimulation): count 为 0 或模型参数无效
    #[instrument(skip(self))]
    pub fn simulate(&self, seed: u64, count: usize) -> ImportResult<Vec<SimulatedTrial>> {
        if count == 0 {
            return Err(ImportError::InvalidSimulation("试验数量必须大于 0".to_string()));
        }
        self.model.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let noise = Normal::new(0.0, YIELD_NOISE_STD)
            .map_err(|e| ImportError::InvalidSimulation(format!("噪声分布错误: {e}")))?;

        let mut trials = Vec::with_capacity(count);
        for idx in 0..count {
            let hybrid = HYBRIDS[rng.gen_range(0..HYBRIDS.len())];
            let location = LOCATIONS[rng.gen_range(0..LOCATIONS.len())];
            let temperature = rng.gen_range(TEMPERATURE_RANGE.0..TEMPERATURE_RANGE.1);
            let humidity = rng.gen_range(HUMIDITY_RANGE.0..HUMIDITY_RANGE.1);
            let water_usage = rng.gen_range(WATER_RANGE.0..WATER_RANGE.1);
            let cost_per_gallon = rng.gen_range(COST_PER_GALLON_RANGE.0..COST_PER_GALLON_RANGE.1);

            let noisy = self.model.response_unchecked(water_usage, temperature, humidity)
                + noise.sample(&mut rng);

            trials.push(SimulatedTrial {
                sensor_id: idx + 1,
                hybrid: hybrid.to_string(),
                location: location.to_string(),
                temperature,
                humidity,
                water_usage,
                crop_yield: self.model.clip(noisy),
                cost_per_gallon,
            });
        }

        debug!(trials = trials.len(), "模拟试验生成完成");
        Ok(trials)
    }
}

/// 按品种汇总用水效率（品种名升序）
pub fn efficiency_by_hybrid(trials: &[SimulatedTrial]) -> Vec<HybridWaterEfficiency> {
    let mut groups: BTreeMap<&str, Vec<&SimulatedTrial>> = BTreeMap::new();
    for trial in trials {
        groups.entry(trial.hybrid.as_str()).or_default().push(trial);
    }

    groups
        .into_iter()
        .map(|(hybrid, group)| {
            let n = group.len() as f64;
            let mean_water = group.iter().map(|t| t.water_usage).sum::<f64>() / n;
            let mean_yield = group.iter().map(|t| t.crop_yield).sum::<f64>() / n;
            HybridWaterEfficiency {
                hybrid: hybrid.to_string(),
                trial_count: group.len(),
                mean_water,
                mean_yield,
                total_water_cost: group.iter().map(|t| t.water_cost()).sum(),
                efficiency: Efficiency::from_totals(mean_yield, mean_water),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_peaks_at_optimum() {
        let model = WaterResponseModel::default();
        assert_eq!(model.response(1200.0, 25.0, 50.0).unwrap(), 10.0);
        assert!(model.response(1500.0, 25.0, 50.0).unwrap() < 10.0);
        assert!(model.response(900.0, 25.0, 50.0).unwrap() > 0.0);
    }

    #[test]
    fn test_response_symmetric_around_optimum() {
        let model = WaterResponseModel::default();
        let low = model.response(900.0, 25.0, 50.0).unwrap();
        let high = model.response(1500.0, 25.0, 50.0).unwrap();
        assert!((low - high).abs() < 1e-12);
    }

    #[test]
    fn test_simulate_is_reproducible() {
        let simulator = TrialSimulator::default();
        let a = simulator.simulate(42, 50).unwrap();
        let b = simulator.simulate(42, 50).unwrap();
        let c = simulator.simulate(7, 50).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 50);
        assert_eq!(a[0].sensor_id, 1);
    }

    #[test]
    fn test_simulate_values_within_ranges() {
        let trials = TrialSimulator::default().simulate(1, 200).unwrap();
        for t in &trials {
            assert!((15.0..35.0).contains(&t.temperature));
            assert!((30.0..70.0).contains(&t.humidity));
            assert!((500.0..2000.0).contains(&t.water_usage));
            assert!((0.05..0.15).contains(&t.cost_per_gallon));
            assert!((0.0..=10.0).contains(&t.crop_yield));
            assert!(HYBRIDS.contains(&t.hybrid.as_str()));
            assert!(LOCATIONS.contains(&t.location.as_str()));
        }
    }

    #[test]
    fn test_simulate_rejects_zero_count() {
        let result = TrialSimulator::default().simulate(42, 0);
        assert!(matches!(result, Err(ImportError::InvalidSimulation(_))));
    }

    #[test]
    fn test_simulate_rejects_bad_model() {
        let model = WaterResponseModel {
            water_sigma: 0.0,
            ..WaterResponseModel::default()
        };
        let result = TrialSimulator::new(model).simulate(42, 10);
        assert!(matches!(result, Err(ImportError::InvalidSimulation(_))));
    }

    #[test]
    fn test_response_rejects_invalid_model_instead_of_panicking() {
        let negative = WaterResponseModel {
            potential_yield: -1.0,
            ..WaterResponseModel::default()
        };
        assert!(matches!(
            negative.response(1200.0, 25.0, 50.0),
            Err(ImportError::InvalidSimulation(_))
        ));

        let nan = WaterResponseModel {
            potential_yield: f64::NAN,
            ..WaterResponseModel::default()
        };
        assert!(nan.response(1200.0, 25.0, 50.0).is_err());
    }

    #[test]
    fn test_clip_bounds_and_nan() {
        let model = WaterResponseModel::default();
        assert_eq!(model.clip(-3.0), 0.0);
        assert_eq!(model.clip(12.0), 10.0);
        assert_eq!(model.clip(f64::NAN), 0.0);

        let negative = WaterResponseModel {
            potential_yield: -1.0,
            ..WaterResponseModel::default()
        };
        assert_eq!(negative.clip(5.0), 0.0);
    }

    #[test]
    fn test_wue_metrics() {
        let trial = SimulatedTrial {
            sensor_id: 1,
            hybrid: "Hybrid_A".to_string(),
            location: "North".to_string(),
            temperature: 25.0,
            humidity: 50.0,
            water_usage: 1000.0,
            crop_yield: 8.0,
            cost_per_gallon: 0.01,
        };

        assert_eq!(trial.water_cost(), 10.0);
        assert_eq!(trial.economic_wue(2.0), Efficiency::Ratio(0.6)); // 100*(16-10)/1000
        assert_eq!(trial.irrigation_wue(2.0), Efficiency::Ratio(0.6)); // 100*(8-2)/1000

        let dry = SimulatedTrial {
            water_usage: 0.0,
            ..trial
        };
        assert!(dry.irrigation_wue(2.0).is_undefined());
    }

    #[test]
    fn test_efficiency_by_hybrid_sorted() {
        let trials = TrialSimulator::default().simulate(42, 60).unwrap();
        let summary = efficiency_by_hybrid(&trials);

        let names: Vec<&str> = summary.iter().map(|s| s.hybrid.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(summary.iter().map(|s| s.trial_count).sum::<usize>(), 60);
        assert!(efficiency_by_hybrid(&[]).is_empty());
    }
}
