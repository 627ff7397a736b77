// ==========================================
// FFE 规格项跟踪系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口,组合引擎规则与持久化
// ==========================================

pub mod error;
pub mod spec_item_api;
pub mod validator;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use spec_item_api::{ItemDetails, LinkOutcome, NewSpecItem, SpecItemApi, SpecItemBackends};
pub use validator::InputValidator;
