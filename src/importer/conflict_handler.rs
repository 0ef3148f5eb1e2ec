// ==========================================
// PHIBRA MAX WATER - 冲突处理器实现
// ==========================================
// 职责: 检测同数据集内 / 跨数据集重复 (地块, 品种, 年份)
// 策略: 首次出现者保留，第二次出现报错（不做覆盖或合并）
// ==========================================

use crate::domain::record::FieldRecord;
use crate::domain::types::RecordKey;
use crate::importer::importer_trait::{ConflictHandler as ConflictHandlerTrait, DuplicateHit};
use std::collections::HashMap;

pub struct ConflictHandler;

impl ConflictHandlerTrait for ConflictHandler {
    /// 检测单个数据集内的第一个重复主键
    ///
    /// # 返回
    /// - Some(DuplicateHit): source 均为 0，row 为第二次出现的行下标
    fn first_duplicate(&self, records: &[FieldRecord]) -> Option<DuplicateHit> {
        self.first_cross_source_duplicate(&[records])
    }

    /// 检测跨记录集重复主键
    ///
    /// # 参数
    /// - sources: 按数据集顺序排列的记录集
    ///
    /// # 返回
    /// - Some(DuplicateHit): 扫描顺序中第一次命中的重复
    fn first_cross_source_duplicate(&self, sources: &[&[FieldRecord]]) -> Option<DuplicateHit> {
        let mut first_occurrence: HashMap<RecordKey, (usize, usize)> = HashMap::new();

        for (source_idx, records) in sources.iter().enumerate() {
            for record in records.iter() {
                let key = record.key();
                if let Some(&(first_source, first_row)) = first_occurrence.get(&key) {
                    return Some(DuplicateHit {
                        key,
                        first_source,
                        first_row,
                        source: source_idx,
                        row: record.row,
                    });
                }
                first_occurrence.insert(key, (source_idx, record.row));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(row: usize, field: &str, hybrid: &str, year: i32) -> FieldRecord {
        FieldRecord {
            row,
            field_id: field.to_string(),
            hybrid: hybrid.to_string(),
            year,
            measures: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }

    #[test]
    fn test_first_duplicate_reports_second_occurrence() {
        let records = vec![
            record(0, "F1", "H1", 2023),
            record(1, "F2", "H1", 2023),
            record(2, "F1", "H1", 2023),
            record(3, "F2", "H1", 2023),
        ];

        let hit = ConflictHandler.first_duplicate(&records).unwrap();
        assert_eq!(hit.key, RecordKey::new("F1", "H1", 2023));
        assert_eq!(hit.first_row, 0);
        assert_eq!(hit.row, 2);
    }

    #[test]
    fn test_different_years_are_not_duplicates() {
        let a = vec![record(0, "F1", "H1", 2022)];
        let b = vec![record(0, "F1", "H1", 2023)];

        assert!(ConflictHandler
            .first_cross_source_duplicate(&[&a, &b])
            .is_none());
    }

    #[test]
    fn test_cross_source_duplicate_location() {
        let a = vec![record(0, "F1", "H1", 2022), record(1, "F2", "H2", 2023)];
        let b = vec![record(0, "F3", "H1", 2023), record(1, "F2", "H2", 2023)];

        let hit = ConflictHandler
            .first_cross_source_duplicate(&[&a, &b])
            .unwrap();
        assert_eq!(hit.first_source, 0);
        assert_eq!(hit.first_row, 1);
        assert_eq!(hit.source, 1);
        assert_eq!(hit.row, 1);
    }
}
