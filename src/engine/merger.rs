// ==========================================
// PHIBRA MAX WATER - 多数据集合并引擎
// ==========================================
// 职责: 多年度数据集 → 统一记录集
// 前置条件: 所有数据集列集合一致（按集合比较，不要求顺序）
// 红线: 同一 (地块, 品种, 年份) 跨数据集只允许出现一次
// ==========================================
// 输入: 有序数据集列表
// 输出: MergedDataset（schema 取首个数据集，记录按输入顺序拼接）
// ==========================================

use crate::domain::record::{Dataset, FieldRecord, MergedDataset};
use crate::importer::conflict_handler::ConflictHandler as DefaultConflictHandler;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::ConflictHandler;
use std::borrow::Borrow;
use tracing::{info, instrument, warn};

// ==========================================
// DatasetMerger - 合并引擎
// ==========================================
pub struct DatasetMerger {
    conflict_handler: Box<dyn ConflictHandler>,
}

impl Default for DatasetMerger {
    fn default() -> Self {
        Self::new(Box::new(DefaultConflictHandler))
    }
}

impl DatasetMerger {
    pub fn new(conflict_handler: Box<dyn ConflictHandler>) -> Self {
        Self { conflict_handler }
    }

    /// 合并数据集
    ///
    /// # 返回
    /// - Err(NoDatasets): 输入为空
    /// - Err(SchemaMismatch): 第一个列集合与首个数据集不同的数据集下标 + 列差异（升序）
    /// - Err(LayoutMismatch): 列集合相同但主键列/标签列角色不同
    /// - Err(DuplicateKey): 跨数据集的同年主键重复（报告第二次出现的位置）
    #[instrument(skip(self, datasets), fields(datasets = datasets.len()))]
    pub fn merge<D: Borrow<Dataset>>(&self, datasets: &[D]) -> ImportResult<MergedDataset> {
        let first: &Dataset = datasets.first().ok_or(ImportError::NoDatasets)?.borrow();

        // === 步骤 1: 结构一致性 ===
        for (idx, dataset) in datasets.iter().enumerate().skip(1) {
            let dataset: &Dataset = dataset.borrow();
            if !dataset.schema().same_columns(first.schema()) {
                let columns = first.schema().symmetric_difference(dataset.schema());
                warn!(dataset = idx, columns = ?columns, "数据集结构不一致");
                return Err(ImportError::SchemaMismatch {
                    dataset: idx,
                    columns,
                });
            }
            if dataset.layout() != first.layout() {
                warn!(dataset = idx, "数据集列角色不一致");
                return Err(ImportError::LayoutMismatch { dataset: idx });
            }
        }

        // === 步骤 2: 跨数据集主键冲突 ===
        let sources: Vec<&[FieldRecord]> = datasets
            .iter()
            .map(|d| Borrow::<Dataset>::borrow(d).records())
            .collect();
        if let Some(hit) = self.conflict_handler.first_cross_source_duplicate(&sources) {
            warn!(
                dataset = hit.source,
                row = hit.row,
                key = %hit.key,
                "跨数据集主键冲突"
            );
            return Err(ImportError::DuplicateKey {
                dataset: hit.source,
                row: hit.row,
                key: hit.key,
                first_dataset: hit.first_source,
                first_row: hit.first_row,
            });
        }

        // === 步骤 3: 拼接 ===
        let total: usize = sources.iter().map(|records| records.len()).sum();
        let mut records = Vec::with_capacity(total);
        for dataset_records in &sources {
            records.extend(dataset_records.iter().cloned());
        }
        let batch_ids = datasets
            .iter()
            .map(|d| Borrow::<Dataset>::borrow(d).batch_id())
            .collect();

        info!(records = records.len(), "数据集合并完成");
        Ok(MergedDataset::new(
            first.schema().clone(),
            first.layout().clone(),
            records,
            batch_ids,
        ))
    }
}

/// 使用默认冲突检测合并数据集
pub fn merge<D: Borrow<Dataset>>(datasets: &[D]) -> ImportResult<MergedDataset> {
    DatasetMerger::default().merge(datasets)
}
