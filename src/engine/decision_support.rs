// ==========================================
// PHIBRA MAX WATER - 农艺决策支持引擎
// ==========================================
// 职责: 病害风险 → 预警等级与农事建议；温湿度 → 小气候分区
// 规则:
// - 取筛选后时间最新的一条风险记录（同时刻取输入中靠后者）
// - High → DANGER，Moderate → WARNING，Low → SUCCESS
// - 平均温度 > 30 且最低相对湿度 < 40 → 炎热干燥
//   平均温度 <= 30 且最低相对湿度 >= 40 → 凉爽湿润
//   其余（含 NaN）→ 温和
// ==========================================

use crate::domain::input_cost::DateRange;
use crate::domain::types::{DiseaseRisk, MicroclimateZone};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// 小气候分区温度界限（°C）
pub const HOT_MEAN_TEMPERATURE: f64 = 30.0;
/// 小气候分区湿度界限（%）
pub const HUMID_MIN_RELATIVE_HUMIDITY: f64 = 40.0;

/// 按平均温度与最低相对湿度划分小气候
pub fn categorize_microclimate(mean_temp: f64, min_relative_humidity: f64) -> MicroclimateZone {
    if mean_temp > HOT_MEAN_TEMPERATURE && min_relative_humidity < HUMID_MIN_RELATIVE_HUMIDITY {
        MicroclimateZone::HotDry
    } else if mean_temp <= HOT_MEAN_TEMPERATURE
        && min_relative_humidity >= HUMID_MIN_RELATIVE_HUMIDITY
    {
        MicroclimateZone::CoolHumid
    } else {
        MicroclimateZone::Moderate
    }
}

// ==========================================
// AlertLevel - 预警等级
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Danger,
    Warning,
    Success,
}

// ==========================================
// RiskObservation - 单条病害风险记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskObservation {
    pub timestamp: NaiveDateTime,
    pub risk: DiseaseRisk,
}

// ==========================================
// RiskFilter - 记录筛选条件
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskFilter {
    pub range: Option<DateRange>,      // 按日期闭区间；None 不过滤
    pub levels: BTreeSet<DiseaseRisk>, // 为空时不过滤
}

impl RiskFilter {
    pub fn matches(&self, observation: &RiskObservation) -> bool {
        let in_range = self
            .range
            .map_or(true, |r| r.contains(observation.timestamp.date()));
        in_range && (self.levels.is_empty() || self.levels.contains(&observation.risk))
    }
}

// ==========================================
// Advisory - 预警与建议
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub risk: DiseaseRisk,
    pub alert: AlertLevel,
    pub message: String,
    pub recommendations: Vec<String>,
}

/// 风险等级对应的预警与建议
pub fn advise(risk: DiseaseRisk) -> Advisory {
    let (alert, message, recommendations): (AlertLevel, &str, Vec<&str>) = match risk {
        DiseaseRisk::High => (
            AlertLevel::Danger,
            "High Risk Conditions Detected! Immediate action recommended.",
            vec![
                "Apply fungicides as a preventive measure.",
                "Increase monitoring for early detection of disease symptoms.",
                "Ensure proper irrigation to maintain optimal soil moisture.",
            ],
        ),
        DiseaseRisk::Moderate => (
            AlertLevel::Warning,
            "Moderate Risk Conditions. Monitor closely and prepare for possible intervention.",
            vec![
                "Monitor crop health regularly.",
                "Prepare treatment plans in case conditions worsen.",
                "Maintain adequate irrigation to reduce plant stress.",
            ],
        ),
        DiseaseRisk::Low => (
            AlertLevel::Success,
            "Low Risk Conditions. Continue regular practices.",
            vec![
                "Continue regular farming practices.",
                "Monitor weather forecasts for any changes in conditions.",
            ],
        ),
    };

    Advisory {
        risk,
        alert,
        message: message.to_string(),
        recommendations: recommendations.into_iter().map(String::from).collect(),
    }
}

// ==========================================
// DecisionSupport - 决策支持
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionSupport;

impl DecisionSupport {
    /// 筛选后最新记录对应的预警；无匹配记录时为 None
    pub fn latest_advisory(
        &self,
        observations: &[RiskObservation],
        filter: &RiskFilter,
    ) -> Option<Advisory> {
        let latest = observations
            .iter()
            .filter(|o| filter.matches(o))
            .max_by_key(|o| o.timestamp)?;
        debug!(timestamp = %latest.timestamp, risk = %latest.risk, "最新病害风险记录");
        Some(advise(latest.risk))
    }

    /// 筛选后各风险等级的记录数（出现过的等级）
    pub fn risk_distribution(
        &self,
        observations: &[RiskObservation],
        filter: &RiskFilter,
    ) -> BTreeMap<DiseaseRisk, usize> {
        let mut counts = BTreeMap::new();
        for observation in observations.iter().filter(|o| filter.matches(o)) {
            *counts.entry(observation.risk).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn obs(day: u32, hour: u32, risk: DiseaseRisk) -> RiskObservation {
        RiskObservation {
            timestamp: at(day, hour),
            risk,
        }
    }

    #[test]
    fn test_categorize_microclimate() {
        assert_eq!(categorize_microclimate(32.0, 35.0), MicroclimateZone::HotDry);
        assert_eq!(categorize_microclimate(30.0, 40.0), MicroclimateZone::CoolHumid);
        assert_eq!(categorize_microclimate(24.0, 65.0), MicroclimateZone::CoolHumid);
        // 炎热但湿润、凉爽但干燥均为温和
        assert_eq!(categorize_microclimate(33.0, 55.0), MicroclimateZone::Moderate);
        assert_eq!(categorize_microclimate(22.0, 30.0), MicroclimateZone::Moderate);
        assert_eq!(categorize_microclimate(f64::NAN, 50.0), MicroclimateZone::Moderate);
        assert_eq!(MicroclimateZone::HotDry.to_string(), "Hot & Dry");
    }

    #[test]
    fn test_advise_by_risk_level() {
        let high = advise(DiseaseRisk::High);
        assert_eq!(high.alert, AlertLevel::Danger);
        assert_eq!(high.recommendations.len(), 3);
        assert_eq!(high.recommendations[0], "Apply fungicides as a preventive measure.");

        let moderate = advise(DiseaseRisk::Moderate);
        assert_eq!(moderate.alert, AlertLevel::Warning);
        assert_eq!(moderate.recommendations[0], "Monitor crop health regularly.");

        let low = advise(DiseaseRisk::Low);
        assert_eq!(low.alert, AlertLevel::Success);
        assert_eq!(low.recommendations.len(), 2);
    }

    #[test]
    fn test_latest_advisory_uses_newest_matching_observation() {
        let observations = vec![
            obs(3, 8, DiseaseRisk::High),
            obs(1, 8, DiseaseRisk::Low),
            obs(2, 8, DiseaseRisk::Moderate),
        ];
        let support = DecisionSupport;

        let all = support.latest_advisory(&observations, &RiskFilter::default()).unwrap();
        assert_eq!(all.risk, DiseaseRisk::High);

        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
        );
        let filter = RiskFilter {
            range,
            levels: BTreeSet::new(),
        };
        assert_eq!(
            support.latest_advisory(&observations, &filter).unwrap().alert,
            AlertLevel::Warning
        );

        let low_only = RiskFilter {
            range: None,
            levels: [DiseaseRisk::Low].into_iter().collect(),
        };
        assert_eq!(
            support.latest_advisory(&observations, &low_only).unwrap().risk,
            DiseaseRisk::Low
        );
    }

    #[test]
    fn test_latest_advisory_tie_takes_later_input() {
        let observations = vec![obs(1, 8, DiseaseRisk::High), obs(1, 8, DiseaseRisk::Low)];
        let advisory = DecisionSupport
            .latest_advisory(&observations, &RiskFilter::default())
            .unwrap();
        assert_eq!(advisory.risk, DiseaseRisk::Low);
    }

    #[test]
    fn test_no_matching_observation() {
        let observations = vec![obs(1, 8, DiseaseRisk::High)];
        let filter = RiskFilter {
            range: None,
            levels: [DiseaseRisk::Moderate].into_iter().collect(),
        };
        assert!(DecisionSupport.latest_advisory(&observations, &filter).is_none());
        assert!(DecisionSupport.latest_advisory(&[], &RiskFilter::default()).is_none());
    }

    #[test]
    fn test_risk_distribution_counts_filtered() {
        let observations = vec![
            obs(1, 8, DiseaseRisk::High),
            obs(1, 9, DiseaseRisk::High),
            obs(2, 8, DiseaseRisk::Low),
            obs(9, 8, DiseaseRisk::Moderate),
        ];
        let filter = RiskFilter {
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
            ),
            levels: BTreeSet::new(),
        };

        let counts = DecisionSupport.risk_distribution(&observations, &filter);
        assert_eq!(counts.get(&DiseaseRisk::High), Some(&2));
        assert_eq!(counts.get(&DiseaseRisk::Low), Some(&1));
        assert_eq!(counts.get(&DiseaseRisk::Moderate), None);
    }
}
