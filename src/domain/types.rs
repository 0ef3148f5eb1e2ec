// ==========================================
// PHIBRA MAX WATER - 领域类型定义
// ==========================================
// 职责: 主键、分组键、效率比值、投入品类型、作物生育期
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 记录主键 (Record Key)
// ==========================================
// 单个数据集内: (地块编号, 品种, 年份) 唯一
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub field_id: String,
    pub hybrid: String,
    pub year: i32,
}

impl RecordKey {
    pub fn new(field_id: impl Into<String>, hybrid: impl Into<String>, year: i32) -> Self {
        Self {
            field_id: field_id.into(),
            hybrid: hybrid.into(),
            year,
        }
    }

    /// 去掉年份后的分组键
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            field_id: self.field_id.clone(),
            hybrid: self.hybrid.clone(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.field_id, self.hybrid, self.year)
    }
}

// ==========================================
// 聚合分组键 (Group Key)
// ==========================================
// 排序: 先地块编号，再品种（字典序升序）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub field_id: String,
    pub hybrid: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.field_id, self.hybrid)
    }
}

// ==========================================
// 用水效率 (Efficiency)
// ==========================================
// 总用水量为 0 时为 Undefined，序列化为 null
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum Efficiency {
    Ratio(f64),
    Undefined,
}

impl Efficiency {
    /// 由产出总量与用水总量计算效率
    ///
    /// # 规则
    /// - water == 0 → Undefined
    /// - 任一总量非有限数 → Undefined
    /// - 比值非有限数（溢出/NaN）→ Undefined
    pub fn from_totals(output: f64, water: f64) -> Self {
        if water == 0.0 || !water.is_finite() || !output.is_finite() {
            return Efficiency::Undefined;
        }
        let ratio = output / water;
        if ratio.is_finite() {
            Efficiency::Ratio(ratio)
        } else {
            Efficiency::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Efficiency::Ratio(v) => Some(*v),
            Efficiency::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Efficiency::Undefined)
    }
}

impl From<Option<f64>> for Efficiency {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Efficiency::Ratio(v),
            _ => Efficiency::Undefined,
        }
    }
}

impl From<Efficiency> for Option<f64> {
    fn from(value: Efficiency) -> Self {
        value.value()
    }
}

impl fmt::Display for Efficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Efficiency::Ratio(v) => write!(f, "{:.4}", v),
            Efficiency::Undefined => write!(f, "UNDEFINED"),
        }
    }
}

// ==========================================
// 投入品类型 (Input Kind)
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputKind {
    Irrigation, // 灌溉
    Fertilizer, // 施肥
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Irrigation => write!(f, "IRRIGATION"),
            InputKind::Fertilizer => write!(f, "FERTILIZER"),
        }
    }
}

// ==========================================
// 作物生育期 (Crop Stage)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CropStage {
    Germination, // 出苗期
    Vegetative,  // 营养生长期
    Flowering,   // 开花期
    Maturation,  // 成熟期
    Other(String),
}

impl CropStage {
    /// 按名称解析（忽略大小写和首尾空白），无法识别时保留原始名称
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "germination" => CropStage::Germination,
            "vegetative" => CropStage::Vegetative,
            "flowering" => CropStage::Flowering,
            "maturation" => CropStage::Maturation,
            _ => CropStage::Other(value.trim().to_string()),
        }
    }
}

impl fmt::Display for CropStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropStage::Germination => write!(f, "GERMINATION"),
            CropStage::Vegetative => write!(f, "VEGETATIVE"),
            CropStage::Flowering => write!(f, "FLOWERING"),
            CropStage::Maturation => write!(f, "MATURATION"),
            CropStage::Other(name) => write!(f, "{}", name),
        }
    }
}

// ==========================================
// 病害风险等级 (Disease Risk)
// ==========================================
// 排序: Low < Moderate < High
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiseaseRisk {
    Low,
    Moderate,
    High,
}

impl DiseaseRisk {
    /// 解析 "High Risk" / "moderate" 等文本（忽略大小写与 "Risk" 后缀）
    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_lowercase();
        let name = lowered.strip_suffix("risk").unwrap_or(&lowered).trim();
        match name {
            "low" => Some(DiseaseRisk::Low),
            "moderate" => Some(DiseaseRisk::Moderate),
            "high" => Some(DiseaseRisk::High),
            _ => None,
        }
    }
}

impl fmt::Display for DiseaseRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiseaseRisk::Low => write!(f, "Low Risk"),
            DiseaseRisk::Moderate => write!(f, "Moderate Risk"),
            DiseaseRisk::High => write!(f, "High Risk"),
        }
    }
}

// ==========================================
// 小气候分区 (Microclimate Zone)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MicroclimateZone {
    HotDry,
    CoolHumid,
    Moderate,
}

impl fmt::Display for MicroclimateZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MicroclimateZone::HotDry => write!(f, "Hot & Dry"),
            MicroclimateZone::CoolHumid => write!(f, "Cool & Humid"),
            MicroclimateZone::Moderate => write!(f, "Moderate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key_ordering() {
        let a = RecordKey::new("F1", "H2", 2022);
        let b = RecordKey::new("F1", "H10", 2023);
        let c = RecordKey::new("F2", "H1", 2020);

        // 字典序: "H10" < "H2"
        assert!(b < a);
        assert!(a < c);
        assert_eq!(a.group_key().to_string(), "(F1, H2)");
    }

    #[test]
    fn test_efficiency_zero_water_is_undefined() {
        assert_eq!(Efficiency::from_totals(500.0, 0.0), Efficiency::Undefined);
        assert_eq!(Efficiency::from_totals(0.0, 0.0), Efficiency::Undefined);
        assert_eq!(Efficiency::from_totals(500.0, 50.0), Efficiency::Ratio(10.0));
    }

    #[test]
    fn test_efficiency_overflow_is_undefined() {
        let e = Efficiency::from_totals(f64::MAX, 1e-300);
        assert!(e.is_undefined());

        // yield / inf 为 0.0，仍需视为未定义
        assert!(Efficiency::from_totals(1000.0, f64::INFINITY).is_undefined());
        assert!(Efficiency::from_totals(f64::INFINITY, 10.0).is_undefined());
        assert!(Efficiency::from_totals(f64::NAN, 10.0).is_undefined());
    }

    #[test]
    fn test_efficiency_serializes_as_nullable_number() {
        let json = serde_json::to_string(&vec![Efficiency::Ratio(2.5), Efficiency::Undefined]).unwrap();
        assert_eq!(json, "[2.5,null]");

        let back: Vec<Efficiency> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Efficiency::Ratio(2.5), Efficiency::Undefined]);
    }

    #[test]
    fn test_crop_stage_parse() {
        assert_eq!(CropStage::parse(" Flowering "), CropStage::Flowering);
        assert_eq!(CropStage::parse("VEGETATIVE"), CropStage::Vegetative);
        assert_eq!(CropStage::parse("Tasseling"), CropStage::Other("Tasseling".to_string()));
    }

    #[test]
    fn test_disease_risk_parse_and_display() {
        assert_eq!(DiseaseRisk::parse("High Risk"), Some(DiseaseRisk::High));
        assert_eq!(DiseaseRisk::parse(" moderate risk "), Some(DiseaseRisk::Moderate));
        assert_eq!(DiseaseRisk::parse("LOW"), Some(DiseaseRisk::Low));
        assert_eq!(DiseaseRisk::parse("N/A"), None);
        assert_eq!(DiseaseRisk::High.to_string(), "High Risk");
        assert!(DiseaseRisk::Low < DiseaseRisk::High);
    }
}
