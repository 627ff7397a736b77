// ==========================================
// FFE 规格项跟踪系统 - 日志初始化
// ==========================================
// 职责: 安装全局 tracing subscriber
// 级别: RUST_LOG（缺省 info）
// 格式: FFE_LOG_FORMAT=json 时逐行输出 JSON,否则为可读文本
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "FFE_LOG_FORMAT";

const DEFAULT_DIRECTIVE: &str = "info";
const TEST_DIRECTIVE: &str = "ffe_spec_tracker=debug";

fn wants_json() -> bool {
    matches!(std::env::var(LOG_FORMAT_ENV), Ok(v) if v.trim().eq_ignore_ascii_case("json"))
}

/// 初始化日志系统（进程内只调用一次）
///
/// ```no_run
/// ffe_spec_tracker::logging::init();
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let builder = fmt().with_env_filter(filter).with_target(true);

    if wants_json() {
        builder.json().with_current_span(false).init();
    } else {
        builder.with_line_number(true).init();
    }
}

/// 测试用: 输出交给 libtest 捕获,重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new(TEST_DIRECTIVE))
        .with_test_writer()
        .try_init();
}
