// ==========================================
// PHIBRA MAX WATER - 聚合 API
// ==========================================
// 职责: 展示层调用入口（加载 → 合并 → 聚合）
// 并发: 多文件导入在 tokio 阻塞线程上并行，futures::join_all 汇合
// 缓存: 合并结果按批次 ID 序列缓存，条目整体写入、不可变
//       容量有上限，超出时按写入顺序淘汰；run() 的数据集用后即弃，不进缓存
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::AggregationConfigReader;
use crate::domain::aggregate::AggregateResult;
use crate::domain::record::{Dataset, MergedDataset, RawRow};
use crate::domain::schema::Schema;
use crate::engine::aggregator::{AggregateRequest, Aggregator};
use crate::engine::merger::DatasetMerger;
use crate::importer::dataset_loader::DatasetLoader;
use futures::future::join_all;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

// ==========================================
// MergeCache - 有界合并缓存（先进先出淘汰）
// ==========================================
#[derive(Default)]
struct MergeCache {
    entries: HashMap<Vec<Uuid>, Arc<MergedDataset>>,
    order: VecDeque<Vec<Uuid>>,
}

impl MergeCache {
    fn get(&self, key: &[Uuid]) -> Option<Arc<MergedDataset>> {
        self.entries.get(key).cloned()
    }

    /// 写入条目；同键已存在时返回已有条目
    fn insert(
        &mut self,
        key: Vec<Uuid>,
        merged: Arc<MergedDataset>,
        capacity: usize,
    ) -> Arc<MergedDataset> {
        if let Some(existing) = self.entries.get(&key) {
            return Arc::clone(existing);
        }
        if capacity == 0 {
            return merged;
        }

        while self.order.len() >= capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, Arc::clone(&merged));
        merged
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

// ==========================================
// AggregationApi - 聚合 API
// ==========================================
pub struct AggregationApi<C>
where
    C: AggregationConfigReader,
{
    config: Arc<C>,
    merger: DatasetMerger,
    aggregator: Aggregator,
    merge_cache: RwLock<MergeCache>,
}

impl<C> AggregationApi<C>
where
    C: AggregationConfigReader,
{
    pub fn new(config: Arc<C>) -> Self {
        Self {
            config,
            merger: DatasetMerger::default(),
            aggregator: Aggregator,
            merge_cache: RwLock::new(MergeCache::default()),
        }
    }

    /// 由原始行构建数据集（列角色来自配置）
    pub async fn load_rows(&self, rows: &[RawRow], schema: &Schema) -> ApiResult<Dataset> {
        let layout = self.config.get_column_layout().await?;
        Ok(DatasetLoader::new(layout).load(rows, schema)?)
    }

    /// 导入单个文件（表头即 schema）
    pub async fn import_file<P: AsRef<Path>>(&self, file_path: P) -> ApiResult<Dataset> {
        let layout = self.config.get_column_layout().await?;
        let path = file_path.as_ref().to_path_buf();

        tokio::task::spawn_blocking(move || DatasetLoader::new(layout).load_file(&path, None))
            .await
            .map_err(|e| ApiError::InternalError(format!("导入任务失败: {}", e)))?
            .map_err(ApiError::from)
    }

    /// 并行导入多个文件
    ///
    /// # 返回
    /// - 与输入顺序一致的逐文件结果；单个文件失败不影响其他文件
    #[instrument(skip(self, file_paths), fields(files = file_paths.len()))]
    pub async fn import_files(&self, file_paths: &[PathBuf]) -> ApiResult<Vec<ApiResult<Dataset>>> {
        let layout = self.config.get_column_layout().await?;

        let tasks = file_paths.iter().cloned().map(|path| {
            let layout = layout.clone();
            tokio::task::spawn_blocking(move || DatasetLoader::new(layout).load_file(&path, None))
        });

        let results: Vec<ApiResult<Dataset>> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(loaded) => loaded.map_err(ApiError::from),
                Err(e) => Err(ApiError::InternalError(format!("导入任务失败: {}", e))),
            })
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(files = results.len(), failed, "批量导入完成");
        Ok(results)
    }

    /// 合并数据集（启用缓存时相同批次序列直接复用）
    #[instrument(skip(self, datasets), fields(datasets = datasets.len()))]
    pub async fn merge(&self, datasets: &[Dataset]) -> ApiResult<Arc<MergedDataset>> {
        if !self.config.is_merge_cache_enabled().await? {
            return Ok(Arc::new(self.merger.merge(datasets)?));
        }

        let cache_key: Vec<Uuid> = datasets.iter().map(Dataset::batch_id).collect();
        if let Some(hit) = self.cached(&cache_key)? {
            debug!("合并缓存命中");
            return Ok(hit);
        }

        let capacity = self.config.get_merge_cache_capacity().await?;
        let merged = Arc::new(self.merger.merge(datasets)?);
        let mut cache = self
            .merge_cache
            .write()
            .map_err(|_| ApiError::InternalError("合并缓存锁已损坏".to_string()))?;
        Ok(cache.insert(cache_key, merged, capacity))
    }

    /// 聚合（request 为 None 时使用配置中的默认列）
    pub async fn aggregate(
        &self,
        merged: &MergedDataset,
        request: Option<AggregateRequest>,
    ) -> ApiResult<Vec<AggregateResult>> {
        let request = match request {
            Some(request) => request,
            None => self.config.get_default_aggregate_request().await?,
        };
        Ok(self.aggregator.aggregate(merged, &request)?)
    }

    /// 一次完成: 导入文件 → 合并 → 聚合
    ///
    /// 任一文件导入失败时按文件顺序返回第一个错误；
    /// 每次导入得到新批次 ID，合并结果不写入缓存
    #[instrument(skip(self, file_paths, request), fields(files = file_paths.len()))]
    pub async fn run(
        &self,
        file_paths: &[PathBuf],
        request: Option<AggregateRequest>,
    ) -> ApiResult<Vec<AggregateResult>> {
        let mut datasets = Vec::with_capacity(file_paths.len());
        for (path, result) in file_paths.iter().zip(self.import_files(file_paths).await?) {
            match result {
                Ok(dataset) => datasets.push(dataset),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "文件导入失败");
                    return Err(e);
                }
            }
        }

        let merged = self.merger.merge(&datasets)?;
        self.aggregate(&merged, request).await
    }

    /// 当前缓存条目数
    pub fn cached_merge_count(&self) -> usize {
        self.merge_cache.read().map(|cache| cache.len()).unwrap_or(0)
    }

    /// 清空合并缓存
    pub fn clear_merge_cache(&self) {
        if let Ok(mut cache) = self.merge_cache.write() {
            cache.clear();
        }
    }

    fn cached(&self, key: &[Uuid]) -> ApiResult<Option<Arc<MergedDataset>>> {
        let cache = self
            .merge_cache
            .read()
            .map_err(|_| ApiError::InternalError("合并缓存锁已损坏".to_string()))?;
        Ok(cache.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{config_keys, ConfigManager};
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn create_api() -> (TempDir, Arc<ConfigManager>, AggregationApi<ConfigManager>) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("config.db");
        let config = Arc::new(ConfigManager::new(db_path.to_str().unwrap()).unwrap());
        let api = AggregationApi::new(Arc::clone(&config));
        (dir, config, api)
    }

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_run_aggregates_files_with_default_columns() {
        let (_dir, _config, api) = create_api();
        let f1 = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,100,10,5\n");
        let f2 = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2023,50,10,15\n");

        let results = api
            .run(&[f1.path().to_path_buf(), f2.path().to_path_buf()], None)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].total_cost, 150.0);
        assert_eq!(results[0].efficiency.value(), Some(1.0));
        assert_eq!(results[0].years, vec![2022, 2023]);
    }

    #[tokio::test]
    async fn test_import_files_reports_each_file() {
        let (_dir, _config, api) = create_api();
        let good = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,100,10,5\n");
        let bad = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,abc,10,5\n");

        let results = api
            .import_files(&[good.path().to_path_buf(), bad.path().to_path_buf()])
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().len(), 1);
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.kind(), "VALIDATION");
        assert_eq!(err.location().unwrap().row, Some(0));
    }

    #[tokio::test]
    async fn test_merge_cache_reuses_result() {
        let (_dir, _config, api) = create_api();
        let schema = Schema::new(["field", "hybrid", "year", "cost", "water", "yield"]).unwrap();
        let row: RawRow = [
            ("field", "F1"),
            ("hybrid", "H1"),
            ("year", "2022"),
            ("cost", "1"),
            ("water", "2"),
            ("yield", "3"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let dataset = api.load_rows(&[row], &schema).await.unwrap();

        let first = api.merge(std::slice::from_ref(&dataset)).await.unwrap();
        let second = api.merge(std::slice::from_ref(&dataset)).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(api.cached_merge_count(), 1);

        api.clear_merge_cache();
        assert_eq!(api.cached_merge_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_runs_leave_cache_empty() {
        let (_dir, _config, api) = create_api();
        let file = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,100,10,5\n");
        let paths = [file.path().to_path_buf()];

        for _ in 0..100 {
            let results = api.run(&paths, None).await.unwrap();
            assert_eq!(results.len(), 1);
        }
        assert_eq!(api.cached_merge_count(), 0);
    }

    #[tokio::test]
    async fn test_merge_cache_evicts_oldest_entry() {
        let (_dir, config, api) = create_api();
        config
            .set_global_config_value(config_keys::MERGE_CACHE_CAPACITY, "2")
            .unwrap();
        let file = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,100,10,5\n");

        let mut datasets = Vec::new();
        for _ in 0..3 {
            datasets.push(api.import_file(file.path()).await.unwrap());
        }

        let first = api.merge(&datasets[0..1]).await.unwrap();
        api.merge(&datasets[1..2]).await.unwrap();
        api.merge(&datasets[2..3]).await.unwrap();
        assert_eq!(api.cached_merge_count(), 2);

        // 最早的条目已被淘汰，再次合并得到新实例
        let again = api.merge(&datasets[0..1]).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &again));
        assert_eq!(api.cached_merge_count(), 2);
    }

    #[tokio::test]
    async fn test_merge_cache_capacity_zero_stores_nothing() {
        let (_dir, config, api) = create_api();
        config
            .set_global_config_value(config_keys::MERGE_CACHE_CAPACITY, "0")
            .unwrap();
        let file = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,100,10,5\n");
        let dataset = api.import_file(file.path()).await.unwrap();

        api.merge(std::slice::from_ref(&dataset)).await.unwrap();
        assert_eq!(api.cached_merge_count(), 0);
    }

    #[tokio::test]
    async fn test_merge_cache_can_be_disabled() {
        let (_dir, config, api) = create_api();
        config
            .set_global_config_value(config_keys::MERGE_CACHE_ENABLED, "false")
            .unwrap();

        let file = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,100,10,5\n");
        let dataset = api.import_file(file.path()).await.unwrap();
        let first = api.merge(std::slice::from_ref(&dataset)).await.unwrap();
        let second = api.merge(std::slice::from_ref(&dataset)).await.unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(api.cached_merge_count(), 0);
    }

    #[tokio::test]
    async fn test_run_schema_mismatch_maps_to_api_kind() {
        let (_dir, _config, api) = create_api();
        let f1 = write_csv("field,hybrid,year,cost,water,yield\nF1,H1,2022,100,10,5\n");
        let f2 = write_csv("field,hybrid,year,cost,yield\nF2,H1,2022,100,5\n");

        let err = api
            .run(&[f1.path().to_path_buf(), f2.path().to_path_buf()], None)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "SCHEMA_MISMATCH");
        assert_eq!(err.location().unwrap().dataset, Some(1));
    }
}
