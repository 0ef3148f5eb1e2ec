// ==========================================
// PHIBRA MAX WATER - 田间分析 API
// ==========================================
// 职责: 投入费用（按日 / 按品种）、灌溉建议、土壤墒情、病害预警、用水效率模拟
// 参数: 单价、阈值、模拟参数默认取自配置
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AggregationConfigReader;
use crate::domain::input_cost::{DailyTotalCost, DateRange, HybridCost};
use crate::domain::soil_moisture::{HybridSensorReading, MoistureCell, SoilWaterBalance};
use crate::domain::types::{CropStage, DiseaseRisk, Efficiency, InputKind};
use crate::engine::decision_support::{Advisory, DecisionSupport, RiskFilter, RiskObservation};
use crate::engine::input_cost::InputCostCalculator;
use crate::engine::irrigation::{IrrigationAdvice, IrrigationAdvisor, IrrigationInputs};
use crate::engine::soil_moisture::{
    join_hybrids, moisture_profile, SoilWaterPlanner, RECENT_PROFILE_DATES,
};
use crate::engine::water_response::{
    efficiency_by_hybrid, HybridWaterEfficiency, SimulatedTrial, TrialSimulator,
};
use crate::importer::cost_sheet::{PlantingSheet, WideCostSheet};
use crate::importer::sensor_sheet::{SensorHybridSheet, SensorSheet};
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

/// 投入费用表文件位置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSheetFiles {
    pub irrigation: Option<PathBuf>,
    pub fertilizer: Option<PathBuf>,
}

/// 墒情传感器文件位置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFiles {
    pub readings: PathBuf,
    pub hybrids: Option<PathBuf>, // Sensor_ID → CompanyHybrid
}

/// 土壤墒情报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilMoistureReport {
    pub readings: Vec<HybridSensorReading>,
    pub profile: Vec<MoistureCell>, // 最近若干日期的深度 × 日期剖面
    pub balance: SoilWaterBalance,
}

/// 病害风险决策报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReport {
    pub advisory: Option<Advisory>,
    pub distribution: BTreeMap<DiseaseRisk, usize>,
}

/// 单条模拟试验 + 效率指标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialEfficiency {
    pub trial: SimulatedTrial,
    pub economic_wue: Efficiency,
    pub irrigation_wue: Efficiency,
}

/// 用水效率模拟报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterEfficiencyReport {
    pub seed: u64,
    pub market_price: f64,
    pub baseline_yield: f64,
    pub trials: Vec<TrialEfficiency>,
    pub by_hybrid: Vec<HybridWaterEfficiency>,
}

// ==========================================
// FieldAnalysisApi - 田间分析 API
// ==========================================
pub struct FieldAnalysisApi<C>
where
    C: AggregationConfigReader,
{
    config: Arc<C>,
    simulator: TrialSimulator,
}

impl<C> FieldAnalysisApi<C>
where
    C: AggregationConfigReader,
{
    pub fn new(config: Arc<C>) -> Self {
        Self {
            config,
            simulator: TrialSimulator::default(),
        }
    }

    /// 按日按农场投入费用
    ///
    /// # 参数
    /// - start / end: 可选日期范围（含端点）；两者需同时给出
    #[instrument(skip(self, files))]
    pub async fn daily_costs(
        &self,
        files: &CostSheetFiles,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ApiResult<Vec<DailyTotalCost>> {
        let range = date_range(start, end)?;
        let calculator = InputCostCalculator::new(self.config.get_input_prices().await?);
        let (irrigation, fertilizer) = load_cost_sheets(files.clone()).await?;

        Ok(calculator.combined_daily_costs(irrigation.as_ref(), fertilizer.as_ref(), range.as_ref()))
    }

    /// 按品种汇总投入费用
    ///
    /// # 参数
    /// - hybrid_filter: 为空时不过滤
    #[instrument(skip(self, files, planting_file, hybrid_filter))]
    pub async fn cost_per_hybrid(
        &self,
        files: &CostSheetFiles,
        planting_file: PathBuf,
        hybrid_filter: &BTreeSet<String>,
    ) -> ApiResult<Vec<HybridCost>> {
        let calculator = InputCostCalculator::new(self.config.get_input_prices().await?);
        let (irrigation, fertilizer) = load_cost_sheets(files.clone()).await?;
        let planting = run_blocking(move || PlantingSheet::from_file(&planting_file)).await?;

        let costs = calculator.cost_per_hybrid(
            irrigation.as_ref(),
            fertilizer.as_ref(),
            &planting,
            Some(hybrid_filter),
        )?;
        info!(hybrids = costs.len(), "按品种费用汇总完成");
        Ok(costs)
    }

    /// 灌溉建议（阈值取自配置）
    pub async fn recommend_irrigation(&self, inputs: &IrrigationInputs) -> ApiResult<IrrigationAdvice> {
        let thresholds = self.config.get_irrigation_thresholds().await?;
        Ok(IrrigationAdvisor::new(thresholds).recommend(inputs))
    }

    /// 土壤墒情报告: 读数关联品种 → 深度 × 日期剖面 → 生育期水量平衡
    ///
    /// # 参数
    /// - forecast_rain: 逐日预报降雨（英寸）
    #[instrument(skip(self, files, forecast_rain), fields(stage = %stage))]
    pub async fn soil_moisture_report(
        &self,
        files: &SensorFiles,
        stage: &CropStage,
        forecast_rain: &[f64],
    ) -> ApiResult<SoilMoistureReport> {
        let files = files.clone();
        let (sensors, hybrids) = run_blocking(move || {
            let sensors = SensorSheet::from_file(&files.readings)?;
            let hybrids = files
                .hybrids
                .map(SensorHybridSheet::from_file)
                .transpose()?
                .unwrap_or_default();
            Ok((sensors, hybrids))
        })
        .await?;

        let balance = SoilWaterPlanner.balance(stage, sensors.readings(), forecast_rain)?;
        let profile = moisture_profile(sensors.readings(), RECENT_PROFILE_DATES);
        let readings = join_hybrids(sensors.readings(), hybrids.assignments());
        info!(
            readings = readings.len(),
            threshold = balance.irrigation_threshold,
            "土壤墒情报告完成"
        );

        Ok(SoilMoistureReport {
            readings,
            profile,
            balance,
        })
    }

    /// 病害风险预警与分布
    pub fn disease_decision(
        &self,
        observations: &[RiskObservation],
        filter: &RiskFilter,
    ) -> DecisionReport {
        let support = DecisionSupport;
        DecisionReport {
            advisory: support.latest_advisory(observations, filter),
            distribution: support.risk_distribution(observations, filter),
        }
    }

    /// 用水效率模拟
    ///
    /// seed / count 为 None 时取配置默认值
    #[instrument(skip(self))]
    pub async fn simulate_water_efficiency(
        &self,
        seed: Option<u64>,
        count: Option<usize>,
    ) -> ApiResult<WaterEfficiencyReport> {
        let (default_seed, default_count) = self.config.get_simulation_params().await?;
        let seed = seed.unwrap_or(default_seed);
        let count = count.unwrap_or(default_count);
        let market_price = self.config.get_market_price().await?;
        let baseline_yield = self.config.get_baseline_yield().await?;

        let simulated = self.simulator.simulate(seed, count)?;
        let by_hybrid = efficiency_by_hybrid(&simulated);
        let trials = simulated
            .into_iter()
            .map(|trial| TrialEfficiency {
                economic_wue: trial.economic_wue(market_price),
                irrigation_wue: trial.irrigation_wue(baseline_yield),
                trial,
            })
            .collect();

        Ok(WaterEfficiencyReport {
            seed,
            market_price,
            baseline_yield,
            trials,
            by_hybrid,
        })
    }
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> ApiResult<Option<DateRange>> {
    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => DateRange::new(start, end).map(Some).ok_or_else(|| {
            ImportError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            }
            .into()
        }),
        _ => Err(ApiError::InvalidInput(
            "日期范围需要同时提供开始与结束日期".to_string(),
        )),
    }
}

async fn load_cost_sheets(
    files: CostSheetFiles,
) -> ApiResult<(Option<WideCostSheet>, Option<WideCostSheet>)> {
    run_blocking(move || {
        let irrigation = files
            .irrigation
            .map(|path| WideCostSheet::from_file(path, InputKind::Irrigation))
            .transpose()?;
        let fertilizer = files
            .fertilizer
            .map(|path| WideCostSheet::from_file(path, InputKind::Fertilizer))
            .transpose()?;
        Ok((irrigation, fertilizer))
    })
    .await
}

async fn run_blocking<T, F>(job: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ImportResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ApiError::InternalError(format!("后台任务失败: {}", e)))?
        .map_err(ApiError::from)
}
