// ==========================================
// PHIBRA MAX WATER - 日志初始化
// ==========================================
// 输出: stderr（stdout 留给聚合结果 JSON）
// 环境变量:
// - RUST_LOG: 级别过滤（默认 info），例如 RUST_LOG=phibra_water=debug
// - PHIBRA_WATER_LOG_FORMAT: text（默认）| json
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志输出格式环境变量
pub const LOG_FORMAT_ENV: &str = "PHIBRA_WATER_LOG_FORMAT";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// 解析格式名（大小写不敏感，未知值按 Text 处理）
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }

    fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or(LogFormat::Text)
    }
}

/// 初始化日志系统（重复调用无副作用）
///
/// # 示例
/// ```no_run
/// phibra_water::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_line_number(true);

    let _ = match LogFormat::from_env() {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.with_target(true).try_init(),
    };
}

/// 测试用日志（debug 级别，输出交给测试框架捕获）
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
