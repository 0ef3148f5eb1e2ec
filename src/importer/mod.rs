// ==========================================
// PHIBRA MAX WATER - 导入层
// ==========================================
// 职责: 外部表格数据导入，生成 Dataset / 投入日历 / 种植表 / 墒情读数
// 支持: Excel, CSV, 内存行
// ==========================================

// 模块声明
pub mod conflict_handler;
pub mod cost_sheet;
pub mod dataset_loader;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod sensor_sheet;

// 重导出核心类型
pub use conflict_handler::ConflictHandler as ConflictHandlerImpl;
pub use cost_sheet::{parse_sheet_date, FarmCalendar, PlantingRecord, PlantingSheet, WideCostSheet};
pub use dataset_loader::{load_dataset, DatasetLoader};
pub use dq_validator::DqValidator as DqValidatorImpl;
pub use error::{ImportError, ImportResult, ValidationReason};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use sensor_sheet::{SensorHybridSheet, SensorSheet};

// 重导出 Trait 接口
pub use importer_trait::{ConflictHandler, DqValidator, DuplicateHit, FieldMapper, FileParser};
