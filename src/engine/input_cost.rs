// ==========================================
// PHIBRA MAX WATER - 投入品费用计算引擎
// ==========================================
// 职责: 灌溉/施肥日历 → 按日按农场费用；Total 列 → 按品种总费用
// 红线: 不读取文件，只消费已解析的 WideCostSheet / PlantingSheet
// ==========================================

use crate::domain::input_cost::{DailyInputCost, DailyTotalCost, DateRange, HybridCost, InputPrices};
use crate::domain::types::InputKind;
use crate::importer::cost_sheet::{PlantingSheet, WideCostSheet};
use crate::importer::error::ImportResult;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

// ==========================================
// InputCostCalculator - 投入品费用计算
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct InputCostCalculator {
    prices: InputPrices,
}

impl InputCostCalculator {
    pub fn new(prices: InputPrices) -> Self {
        Self { prices }
    }

    pub fn prices(&self) -> &InputPrices {
        &self.prices
    }

    /// 按日按农场投入费用（按日期、农场升序）
    pub fn daily_costs(&self, sheet: &WideCostSheet, range: Option<&DateRange>) -> Vec<DailyInputCost> {
        let price = self.prices.price_of(sheet.kind());
        sheet
            .melt(range)
            .into_iter()
            .map(|entry| DailyInputCost {
                date: entry.date,
                farm_id: entry.farm_id,
                kind: sheet.kind(),
                amount: entry.amount,
                cost: entry.amount * price,
            })
            .collect()
    }

    /// 灌溉 + 施肥按日按农场合计
    ///
    /// 任一日历缺失时该项费用记为 0；两者都缺失时返回空
    pub fn combined_daily_costs(
        &self,
        irrigation: Option<&WideCostSheet>,
        fertilizer: Option<&WideCostSheet>,
        range: Option<&DateRange>,
    ) -> Vec<DailyTotalCost> {
        let mut combined: BTreeMap<(NaiveDate, String), (f64, f64)> = BTreeMap::new();

        for sheet in irrigation.into_iter().chain(fertilizer) {
            for daily in self.daily_costs(sheet, range) {
                let slot = combined.entry((daily.date, daily.farm_id)).or_insert((0.0, 0.0));
                match daily.kind {
                    InputKind::Irrigation => slot.0 += daily.cost,
                    InputKind::Fertilizer => slot.1 += daily.cost,
                }
            }
        }

        combined
            .into_iter()
            .map(|((date, farm_id), (irrigation_cost, fertilizer_cost))| DailyTotalCost {
                date,
                farm_id,
                irrigation_cost,
                fertilizer_cost,
                total_cost: irrigation_cost + fertilizer_cost,
            })
            .collect()
    }

    /// 按品种汇总总费用
    ///
    /// # 规则
    /// - 费用取各日历 Total 列 × 单价（日历存在但无 Total 列 → MissingColumns）
    /// - 施肥按农场左连接到灌溉；缺失记 0（灌溉缺失时以施肥农场为准）
    /// - 农场品种来自种植表，种植表中没有的农场丢弃
    /// - hybrid_filter 非空时只保留所列品种
    /// - 结果按品种名升序
    #[instrument(skip_all, fields(hybrids = hybrid_filter.map(|f| f.len())))]
    pub fn cost_per_hybrid(
        &self,
        irrigation: Option<&WideCostSheet>,
        fertilizer: Option<&WideCostSheet>,
        planting: &PlantingSheet,
        hybrid_filter: Option<&BTreeSet<String>>,
    ) -> ImportResult<Vec<HybridCost>> {
        let irrigation_totals = irrigation.map(WideCostSheet::totals).transpose()?;
        let fertilizer_totals = fertilizer.map(WideCostSheet::totals).transpose()?;

        // 参与连接的农场: 以灌溉表为左表
        let farms: BTreeSet<&str> = match (&irrigation_totals, &fertilizer_totals) {
            (Some(irr), _) => irr.keys().copied().collect(),
            (None, Some(fert)) => fert.keys().copied().collect(),
            (None, None) => BTreeSet::new(),
        };

        let mut per_hybrid: BTreeMap<&str, HybridCost> = BTreeMap::new();
        for farm_id in farms {
            let Some(hybrid) = planting.hybrid_of(farm_id) else {
                debug!(farm_id = %farm_id, "农场不在种植表中，跳过");
                continue;
            };
            if hybrid_filter.map_or(false, |f| !f.is_empty() && !f.contains(hybrid)) {
                continue;
            }

            let irrigation_cost = irrigation_totals
                .as_ref()
                .and_then(|t| t.get(farm_id))
                .map_or(0.0, |total| total * self.prices.irrigation);
            let fertilizer_cost = fertilizer_totals
                .as_ref()
                .and_then(|t| t.get(farm_id))
                .map_or(0.0, |total| total * self.prices.fertilizer);

            let entry = per_hybrid.entry(hybrid).or_insert_with(|| HybridCost {
                hybrid: hybrid.to_string(),
                farm_count: 0,
                irrigation_cost: 0.0,
                fertilizer_cost: 0.0,
                total_cost: 0.0,
            });
            entry.farm_count += 1;
            entry.irrigation_cost += irrigation_cost;
            entry.fertilizer_cost += fertilizer_cost;
            entry.total_cost += irrigation_cost + fertilizer_cost;
        }

        Ok(per_hybrid.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::record::RawTable;
    use crate::importer::error::ImportError;

    fn table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|cells| {
                    headers
                        .iter()
                        .zip(cells.iter())
                        .map(|(h, v)| (h.to_string(), v.to_string()))
                        .collect()
                })
                .collect(),
        }
    }

    fn irrigation() -> WideCostSheet {
        let t = table(
            &["FarmID", "2024-06-01", "2024-06-02", "Total"],
            &[&["A", "1", "2", "3"], &["B", "0", "1", "1"], &["C", "4", "", "4"]],
        );
        WideCostSheet::from_table(&t, InputKind::Irrigation).unwrap()
    }

    fn fertilizer() -> WideCostSheet {
        let t = table(
            &["FarmID", "2024-06-02", "Total"],
            &[&["A", "10", "10"], &["D", "20", "20"]],
        );
        WideCostSheet::from_table(&t, InputKind::Fertilizer).unwrap()
    }

    fn planting() -> PlantingSheet {
        let t = table(
            &["FarmID", "PlantingDate", "CompanyHybrid", "Seeding Rate(plants/ac)"],
            &[&["A", "2024-04-20", "H2", "34000"], &["B", "2024-04-21", "H1", "34000"]],
        );
        PlantingSheet::from_table(&t).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_daily_costs_apply_price() {
        let calc = InputCostCalculator::default();
        let range = DateRange::new(date(2), date(2)).unwrap();

        let costs = calc.daily_costs(&irrigation(), Some(&range));

        assert_eq!(costs.len(), 3);
        assert_eq!(costs[0].farm_id, "A");
        assert_eq!(costs[0].cost, 30.0);
        assert_eq!(costs[2].cost, 0.0); // 空白单元格记 0
    }

    #[test]
    fn test_combined_daily_costs() {
        let calc = InputCostCalculator::default();
        let costs = calc.combined_daily_costs(Some(&irrigation()), Some(&fertilizer()), None);

        let a_day2 = costs
            .iter()
            .find(|c| c.date == date(2) && c.farm_id == "A")
            .unwrap();
        assert_eq!(a_day2.irrigation_cost, 30.0);
        assert_eq!(a_day2.fertilizer_cost, 5.0);
        assert_eq!(a_day2.total_cost, 35.0);

        // D 只有施肥
        assert!(costs.iter().any(|c| c.farm_id == "D" && c.irrigation_cost == 0.0));
        assert!(calc.combined_daily_costs(None, None, None).is_empty());
    }

    #[test]
    fn test_cost_per_hybrid_joins_and_sorts() {
        let calc = InputCostCalculator::default();
        let result = calc
            .cost_per_hybrid(Some(&irrigation()), Some(&fertilizer()), &planting(), None)
            .unwrap();

        // C 不在种植表中被丢弃；D 不在灌溉表中不参与左连接
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].hybrid, "H1");
        assert_eq!(result[0].total_cost, 15.0);
        assert_eq!(result[1].hybrid, "H2");
        assert_eq!(result[1].irrigation_cost, 45.0);
        assert_eq!(result[1].fertilizer_cost, 5.0);
        assert_eq!(result[1].total_cost, 50.0);
    }

    #[test]
    fn test_cost_per_hybrid_filter() {
        let calc = InputCostCalculator::default();
        let filter: BTreeSet<String> = ["H2".to_string()].into_iter().collect();

        let result = calc
            .cost_per_hybrid(Some(&irrigation()), None, &planting(), Some(&filter))
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].hybrid, "H2");
        assert_eq!(result[0].fertilizer_cost, 0.0);
    }

    #[test]
    fn test_cost_per_hybrid_requires_total_column() {
        let t = table(&["FarmID", "2024-06-01"], &[&["A", "1"]]);
        let no_total = WideCostSheet::from_table(&t, InputKind::Irrigation).unwrap();

        let result = InputCostCalculator::default().cost_per_hybrid(Some(&no_total), None, &planting(), None);
        assert!(matches!(result, Err(ImportError::MissingColumns(_))));
    }
}
