// ==========================================
// 配置管理集成测试
// ==========================================
// 测试目标: config_kv 读写、默认值、快照恢复
// ==========================================

mod test_helpers;

use phibra_water::config::{config_keys, AggregationConfigReader, ConfigManager};
use phibra_water::db::{read_schema_version, CURRENT_SCHEMA_VERSION};
use phibra_water::domain::ColumnRole;
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_config, insert_test_config};

#[tokio::test]
async fn test_defaults_when_store_is_empty() {
    let (_temp_file, config) = create_test_config().unwrap();

    let layout = config.get_column_layout().await.unwrap();
    assert_eq!(layout.role("field"), ColumnRole::FieldId);
    assert_eq!(layout.role("cost"), ColumnRole::Measure);

    let request = config.get_default_aggregate_request().await.unwrap();
    assert!(request.cost_columns.contains("cost"));
    assert_eq!(request.water_column, "water");
    assert_eq!(request.area_column, None);

    assert!(config.is_merge_cache_enabled().await.unwrap());
    assert_eq!(config.get_simulation_params().await.unwrap(), (42, 50));
}

#[tokio::test]
async fn test_configured_columns_are_used() {
    let (_temp_file, config) = create_test_config().unwrap();
    insert_test_config(&config).unwrap();

    let layout = config.get_column_layout().await.unwrap();
    assert_eq!(layout.role("notes"), ColumnRole::Label);

    let request = config.get_default_aggregate_request().await.unwrap();
    let costs: Vec<&str> = request.cost_columns.iter().map(String::as_str).collect();
    assert_eq!(costs, vec!["labor", "seed"]);
    assert_eq!(request.area_column.as_deref(), Some("acres"));
}

#[tokio::test]
async fn test_invalid_numeric_value_falls_back_to_default() {
    let (_temp_file, config) = create_test_config().unwrap();
    config
        .set_global_config_value(config_keys::IRRIGATION_PRICE, "cheap")
        .unwrap();
    config
        .set_global_config_value(config_keys::FERTILIZER_PRICE, "0.75")
        .unwrap();

    let prices = config.get_input_prices().await.unwrap();
    assert_eq!(prices.irrigation, 15.0);
    assert_eq!(prices.fertilizer, 0.75);
}

#[test]
fn test_snapshot_round_trip_restores_values() {
    let (_temp_file, config) = create_test_config().unwrap();
    insert_test_config(&config).unwrap();
    let snapshot = config.get_config_snapshot().unwrap();

    config
        .set_global_config_value(config_keys::WATER_COLUMN, "irrigation")
        .unwrap();
    let restored = config.restore_config_from_snapshot(&snapshot).unwrap();

    assert_eq!(restored, 5);
    assert_eq!(
        config
            .get_global_config_value(config_keys::WATER_COLUMN)
            .unwrap()
            .as_deref(),
        Some("water")
    );
    assert!(config.restore_config_from_snapshot("not json").is_err());
}

#[test]
fn test_shared_connection_gets_schema() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let shared = Arc::new(Mutex::new(conn));

    let config = ConfigManager::from_connection(Arc::clone(&shared)).unwrap();
    config.set_global_config_value(config_keys::MARKET_PRICE, "3.5").unwrap();

    let guard = shared.lock().unwrap();
    assert_eq!(read_schema_version(&guard).unwrap(), Some(CURRENT_SCHEMA_VERSION));
}
