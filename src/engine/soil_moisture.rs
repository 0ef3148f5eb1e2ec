// ==========================================
// PHIBRA MAX WATER - 土壤墒情引擎
// ==========================================
// 职责: 读数关联品种、深度 × 日期湿度剖面、生育期土壤水量平衡
// 红线: 不读文件，只消费已解析的传感器读数
// ==========================================
// 灌溉阈值 = max(生育期持水量 - (最新日期平均湿度 / 25.4 + 预报降雨合计), 0)
// ==========================================

use crate::domain::soil_moisture::{
    HybridSensorReading, MoistureCell, SensorReading, SoilWaterBalance,
};
use crate::domain::types::CropStage;
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// 毫米 → 英寸
pub const MM_PER_INCH: f64 = 25.4;

/// 剖面默认保留的最近日期数
pub const RECENT_PROFILE_DATES: usize = 15;

/// 生育期土壤持水量（英寸）；未知生育期取 20 mm
pub fn stage_soil_capacity(stage: &CropStage) -> f64 {
    match stage {
        CropStage::Germination => 1.18,
        CropStage::Vegetative => 1.57,
        CropStage::Flowering => 1.97,
        CropStage::Maturation => 1.38,
        CropStage::Other(_) => 0.79,
    }
}

// 深度分组键（按 total_cmp 全序）
#[derive(Debug, Clone, Copy)]
struct DepthKey(f64);

impl PartialEq for DepthKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DepthKey {}

impl PartialOrd for DepthKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DepthKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// 按 Sensor_ID 左关联品种（保持读数顺序）
pub fn join_hybrids(
    readings: &[SensorReading],
    assignments: &BTreeMap<String, String>,
) -> Vec<HybridSensorReading> {
    readings
        .iter()
        .map(|reading| HybridSensorReading {
            hybrid: assignments.get(&reading.sensor_id).cloned(),
            reading: reading.clone(),
        })
        .collect()
}

/// 深度 × 日期平均湿度剖面（按深度、日期升序）
///
/// # 参数
/// - recent_dates: 只保留最近的若干个日期；0 表示全部
pub fn moisture_profile(readings: &[SensorReading], recent_dates: usize) -> Vec<MoistureCell> {
    let dates: BTreeSet<NaiveDate> = readings.iter().map(|r| r.date).collect();
    let skip = if recent_dates == 0 {
        0
    } else {
        dates.len().saturating_sub(recent_dates)
    };
    let kept: BTreeSet<NaiveDate> = dates.into_iter().skip(skip).collect();

    let mut cells: BTreeMap<(DepthKey, NaiveDate), (f64, usize)> = BTreeMap::new();
    for reading in readings.iter().filter(|r| kept.contains(&r.date)) {
        let cell = cells
            .entry((DepthKey(reading.depth), reading.date))
            .or_insert((0.0, 0));
        cell.0 += reading.moisture;
        cell.1 += 1;
    }

    cells
        .into_iter()
        .map(|((depth, date), (sum, count))| MoistureCell {
            depth: depth.0,
            date,
            mean_moisture: sum / count as f64,
            reading_count: count,
        })
        .collect()
}

/// 最新日期的平均湿度（毫米）
pub fn latest_mean_moisture(readings: &[SensorReading]) -> Option<(NaiveDate, f64)> {
    let latest = readings.iter().map(|r| r.date).max()?;
    let values: Vec<f64> = readings
        .iter()
        .filter(|r| r.date == latest)
        .map(|r| r.moisture)
        .collect();
    Some((latest, values.iter().sum::<f64>() / values.len() as f64))
}

// ==========================================
// SoilWaterPlanner - 生育期土壤水量平衡
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct SoilWaterPlanner;

impl SoilWaterPlanner {
    /// 计算土壤水量平衡
    ///
    /// # 参数
    /// - forecast_rain: 逐日预报降雨（英寸），按日期顺序
    ///
    /// # 返回
    /// - Err(InvalidForecast): 预报值为负或非有限数
    #[instrument(skip(self, readings, forecast_rain), fields(stage = %stage, readings = readings.len()))]
    pub fn balance(
        &self,
        stage: &CropStage,
        readings: &[SensorReading],
        forecast_rain: &[f64],
    ) -> ImportResult<SoilWaterBalance> {
        if let Some((day, value)) = forecast_rain
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ImportError::InvalidForecast(format!(
                "第 {} 天降雨量为 {}",
                day + 1,
                value
            )));
        }

        let soil_capacity = stage_soil_capacity(stage);
        let latest = latest_mean_moisture(readings);
        let average_soil_moisture = latest.map_or(0.0, |(_, mm)| mm / MM_PER_INCH);

        let available_water_by_day: Vec<f64> = forecast_rain
            .iter()
            .scan(0.0, |cumulative, rain| {
                *cumulative += rain;
                Some(average_soil_moisture + *cumulative)
            })
            .collect();
        let forecast_rain: f64 = forecast_rain.iter().sum();
        let total_available_water = average_soil_moisture + forecast_rain;
        let irrigation_threshold = f64::max(soil_capacity - total_available_water, 0.0);

        debug!(soil_capacity, total_available_water, irrigation_threshold, "土壤水量平衡计算完成");

        Ok(SoilWaterBalance {
            crop_stage: stage.clone(),
            soil_capacity,
            latest_date: latest.map(|(date, _)| date),
            average_soil_moisture,
            forecast_rain,
            total_available_water,
            irrigation_threshold,
            available_water_by_day,
        })
    }
}
