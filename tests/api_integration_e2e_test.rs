// ==========================================
// API 层端到端测试
// ==========================================
// 测试目标: 配置驱动的导入 → 合并（缓存）→ 聚合，错误响应结构
// ==========================================

mod test_helpers;

use phibra_water::api::{AggregationApi, ApiErrorResponse};
use phibra_water::config::{config_keys, ConfigManager};
use phibra_water::engine::AggregateRequest;
use phibra_water::logging;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};
use test_helpers::{create_test_config, insert_test_config, write_csv};

fn create_api() -> (NamedTempFile, Arc<ConfigManager>, AggregationApi<ConfigManager>) {
    let (temp_file, config) = create_test_config().unwrap();
    let config = Arc::new(config);
    let api = AggregationApi::new(Arc::clone(&config));
    (temp_file, config, api)
}

#[tokio::test]
async fn test_run_with_configured_columns() {
    logging::init_test();
    let (_temp_file, config, api) = create_api();
    insert_test_config(&config).unwrap();

    let dir = TempDir::new().unwrap();
    let header = "field,hybrid,year,notes,seed,labor,water,yield,acres";
    let files = vec![
        write_csv(dir.path(), "2022.csv", &format!("{header}\nF1,H1,2022,wet,10,10,1,2,5\n")),
        write_csv(dir.path(), "2023.csv", &format!("{header}\nF1,H1,2023,,20,0,1,4,5\n")),
    ];

    let results = api.run(&files, None).await.unwrap();

    assert_eq!(results.len(), 1);
    let r = &results[0];
    assert_eq!(r.total_cost, 40.0);
    assert_eq!(r.total_area, Some(10.0));
    assert_eq!(r.cost_per_area, Some(4.0));
    assert_eq!(r.efficiency.value(), Some(3.0));
}

#[tokio::test]
async fn test_import_files_concurrently_keeps_order() {
    let (_temp_file, _config, api) = create_api();
    let dir = TempDir::new().unwrap();

    let files: Vec<_> = (0..8)
        .map(|i| {
            write_csv(
                dir.path(),
                &format!("{i}.csv"),
                &format!("field,hybrid,year,cost,water,yield\nF{i},H1,2023,{i},1,1\n"),
            )
        })
        .collect();

    let results = api.import_files(&files).await.unwrap();
    assert_eq!(results.len(), 8);
    for (i, result) in results.iter().enumerate() {
        let dataset = result.as_ref().unwrap();
        assert_eq!(dataset.source(), Some(format!("{i}.csv").as_str()));
    }

    let datasets: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    let merged = api.merge(&datasets).await.unwrap();
    assert_eq!(merged.len(), 8);
    assert_eq!(api.cached_merge_count(), 1);
}

#[tokio::test]
async fn test_explicit_request_overrides_defaults() {
    let (_temp_file, _config, api) = create_api();
    let dir = TempDir::new().unwrap();
    let file = write_csv(
        dir.path(),
        "data.csv",
        "field,hybrid,year,seed,irrigation,bushels\nF1,H1,2023,7,2,10\n",
    );

    let dataset = api.import_file(&file).await.unwrap();
    let merged = api.merge(std::slice::from_ref(&dataset)).await.unwrap();

    // 默认列 cost 不存在
    let err = api.aggregate(&merged, None).await.unwrap_err();
    assert_eq!(err.kind(), "INVALID_INPUT");

    let request = AggregateRequest::new(["seed"], "irrigation", "bushels");
    let results = api.aggregate(&merged, Some(request)).await.unwrap();
    assert_eq!(results[0].total_cost, 7.0);
    assert_eq!(results[0].efficiency.value(), Some(5.0));
}

#[tokio::test]
async fn test_error_response_for_duplicate_key() {
    let (_temp_file, config, api) = create_api();
    config
        .set_global_config_value(config_keys::MERGE_CACHE_ENABLED, "false")
        .unwrap();
    let dir = TempDir::new().unwrap();
    let files = vec![
        write_csv(dir.path(), "a.csv", "field,hybrid,year,cost,water,yield\nF1,H1,2023,1,1,1\n"),
        write_csv(
            dir.path(),
            "b.csv",
            "field,hybrid,year,cost,water,yield\nF2,H1,2023,1,1,1\nF1,H1,2023,1,1,1\n",
        ),
    ];

    let err = api.run(&files, None).await.unwrap_err();
    let response: ApiErrorResponse = err.to_response();

    assert_eq!(response.code, "DUPLICATE_KEY");
    let location = response.location.unwrap();
    assert_eq!((location.dataset, location.row), (Some(1), Some(1)));
    assert_eq!(response.details.unwrap()["first_dataset"], 0);
    assert!(response.message.contains("(F1, H1, 2023)"));
}

#[tokio::test]
async fn test_missing_file_reported_per_file() {
    let (_temp_file, _config, api) = create_api();
    let dir = TempDir::new().unwrap();
    let good = write_csv(dir.path(), "ok.csv", "field,hybrid,year,cost,water,yield\nF1,H1,2023,1,1,1\n");
    let missing = dir.path().join("missing.csv");

    let results = api.import_files(&[good, missing.clone()]).await.unwrap();
    assert!(results[0].is_ok());
    assert_eq!(results[1].as_ref().unwrap_err().kind(), "NOT_FOUND");

    let err = api.run(&[missing], None).await.unwrap_err();
    assert_eq!(err.kind(), "NOT_FOUND");
}
