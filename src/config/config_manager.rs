// ==========================================
// PHIBRA MAX WATER - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约定: 配置缺失或格式错误时使用默认值（格式错误记录告警）
// ==========================================

use crate::config::aggregation_config_trait::AggregationConfigReader;
use crate::db::{configure_sqlite_connection, ensure_config_schema, open_sqlite_connection};
use crate::domain::input_cost::InputPrices;
use crate::domain::schema::ColumnLayout;
use crate::engine::aggregator::AggregateRequest;
use crate::engine::irrigation::IrrigationThresholds;
use crate::importer::error::{ImportError, ImportResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例（自动建表）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_config_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 对传入连接再次应用统一 PRAGMA 并建表（幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ImportResult<Self> {
        {
            let conn_guard = Self::lock(&conn)?;
            configure_sqlite_connection(&conn_guard)?;
            ensure_config_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn lock(conn: &Arc<Mutex<Connection>>) -> ImportResult<MutexGuard<'_, Connection>> {
        conn.lock()
            .map_err(|e| ImportError::InternalError(format!("锁获取失败: {}", e)))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = Self::lock(&self.conn)?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![GLOBAL_SCOPE, key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ImportError::ConfigReadError {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// 写入 global scope 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = Self::lock(&self.conn)?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析配置值，格式错误时告警并使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> ImportResult<T>
    where
        T: FromStr + Copy,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(value) => Ok(value),
                Err(_) => {
                    warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }

    /// 读取列名列表（JSON 数组或逗号分隔）
    fn get_column_list(&self, key: &str, default: &[&str]) -> ImportResult<Vec<String>> {
        let raw = match self.get_global_config_value(key)? {
            Some(raw) => raw,
            None => return Ok(default.iter().map(|c| c.to_string()).collect()),
        };

        let trimmed = raw.trim();
        if trimmed.starts_with('[') {
            match serde_json::from_str::<Vec<String>>(trimmed) {
                Ok(columns) => return Ok(columns),
                Err(_) => {
                    warn!(config_key = key, raw_value = %raw, "列名列表 JSON 格式错误，使用默认值");
                    return Ok(default.iter().map(|c| c.to_string()).collect());
                }
            }
        }

        Ok(trimmed
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// 获取所有配置的快照（JSON 格式，按键升序）
    pub fn get_config_snapshot(&self) -> ImportResult<String> {
        let conn = Self::lock(&self.conn)?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&config_map).map_err(|e| ImportError::ConfigReadError {
            key: "snapshot".to_string(),
            message: e.to_string(),
        })
    }

    /// 从配置快照恢复配置（覆盖同名 global 配置）
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ImportResult<usize> {
        let config_map: BTreeMap<String, String> =
            serde_json::from_str(snapshot_json).map_err(|e| ImportError::ConfigReadError {
                key: "snapshot".to_string(),
                message: e.to_string(),
            })?;

        let mut conn = Self::lock(&self.conn)?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (key, value) in &config_map {
            count += tx.execute(
                "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
                params![GLOBAL_SCOPE, key, value],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// AggregationConfigReader Trait 实现
// ==========================================
#[async_trait]
impl AggregationConfigReader for ConfigManager {
    // ===== 列配置 =====

    async fn get_column_layout(&self) -> ImportResult<ColumnLayout> {
        let field = self.get_config_or_default(config_keys::FIELD_COLUMN, "field")?;
        let hybrid = self.get_config_or_default(config_keys::HYBRID_COLUMN, "hybrid")?;
        let year = self.get_config_or_default(config_keys::YEAR_COLUMN, "year")?;
        let labels = self.get_column_list(config_keys::LABEL_COLUMNS, &[])?;

        ColumnLayout::new(field.trim(), hybrid.trim(), year.trim(), labels)
    }

    async fn get_default_aggregate_request(&self) -> ImportResult<AggregateRequest> {
        let costs = self.get_column_list(config_keys::COST_COLUMNS, &["cost"])?;
        let water = self.get_config_or_default(config_keys::WATER_COLUMN, "water")?;
        let crop_yield = self.get_config_or_default(config_keys::YIELD_COLUMN, "yield")?;
        let area = self.get_config_or_default(config_keys::AREA_COLUMN, "")?;

        let request = AggregateRequest::new(costs, water.trim(), crop_yield.trim());
        Ok(if area.trim().is_empty() {
            request
        } else {
            request.with_area_column(area.trim())
        })
    }

    async fn is_merge_cache_enabled(&self) -> ImportResult<bool> {
        self.get_parsed_or_default(config_keys::MERGE_CACHE_ENABLED, true)
    }

    async fn get_merge_cache_capacity(&self) -> ImportResult<usize> {
        self.get_parsed_or_default(config_keys::MERGE_CACHE_CAPACITY, 16usize)
    }

    // ===== 投入品与灌溉 =====

    async fn get_input_prices(&self) -> ImportResult<InputPrices> {
        let defaults = InputPrices::default();
        Ok(InputPrices {
            irrigation: self.get_parsed_or_default(config_keys::IRRIGATION_PRICE, defaults.irrigation)?,
            fertilizer: self.get_parsed_or_default(config_keys::FERTILIZER_PRICE, defaults.fertilizer)?,
        })
    }

    async fn get_irrigation_thresholds(&self) -> ImportResult<IrrigationThresholds> {
        let defaults = IrrigationThresholds::default();
        Ok(IrrigationThresholds {
            soil_moisture_threshold: self.get_parsed_or_default(
                config_keys::SOIL_MOISTURE_THRESHOLD,
                defaults.soil_moisture_threshold,
            )?,
            qpf_threshold: self.get_parsed_or_default(config_keys::QPF_THRESHOLD, defaults.qpf_threshold)?,
            cost_per_acre_inch: self.get_parsed_or_default(
                config_keys::COST_PER_ACRE_INCH,
                defaults.cost_per_acre_inch,
            )?,
        })
    }

    // ===== 用水效率 =====

    async fn get_market_price(&self) -> ImportResult<f64> {
        self.get_parsed_or_default(config_keys::MARKET_PRICE, 2.0)
    }

    async fn get_baseline_yield(&self) -> ImportResult<f64> {
        self.get_parsed_or_default(config_keys::BASELINE_YIELD, 2.0)
    }

    async fn get_simulation_params(&self) -> ImportResult<(u64, usize)> {
        let seed = self.get_parsed_or_default(config_keys::SIMULATION_SEED, 42u64)?;
        let count = self.get_parsed_or_default(config_keys::SIMULATION_COUNT, 50usize)?;
        Ok((seed, count))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 列角色
    pub const FIELD_COLUMN: &str = "field_column";
    pub const HYBRID_COLUMN: &str = "hybrid_column";
    pub const YEAR_COLUMN: &str = "year_column";
    pub const LABEL_COLUMNS: &str = "label_columns"; // JSON 数组或逗号分隔

    // 聚合默认列
    pub const COST_COLUMNS: &str = "cost_columns"; // JSON 数组或逗号分隔
    pub const WATER_COLUMN: &str = "water_column";
    pub const YIELD_COLUMN: &str = "yield_column";
    pub const AREA_COLUMN: &str = "area_column"; // 空字符串表示不加权

    // 合并缓存
    pub const MERGE_CACHE_ENABLED: &str = "merge_cache_enabled";
    pub const MERGE_CACHE_CAPACITY: &str = "merge_cache_capacity";

    // 投入品单价
    pub const IRRIGATION_PRICE: &str = "irrigation_price";
    pub const FERTILIZER_PRICE: &str = "fertilizer_price";

    // 灌溉判定
    pub const SOIL_MOISTURE_THRESHOLD: &str = "soil_moisture_threshold";
    pub const QPF_THRESHOLD: &str = "qpf_threshold";
    pub const COST_PER_ACRE_INCH: &str = "cost_per_acre_inch";

    // 用水效率
    pub const MARKET_PRICE: &str = "market_price";
    pub const BASELINE_YIELD: &str = "baseline_yield";
    pub const SIMULATION_SEED: &str = "simulation_seed";
    pub const SIMULATION_COUNT: &str = "simulation_count";
}
