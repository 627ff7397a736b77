// ==========================================
// FFE 规格项跟踪系统 - 配置层
// ==========================================
// 职责: 系统配置管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod workflow_config_trait;
pub mod workflow_settings;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use workflow_config_trait::WorkflowConfigReader;
pub use workflow_settings::WorkflowSettings;
