// ==========================================
// FFE 规格项跟踪系统 - 应用层
// ==========================================
// 职责: 组装仓储与配置,对外提供项目编辑会话入口
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
