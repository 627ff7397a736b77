// ==========================================
// FFE 规格项跟踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod patch;
pub mod requirement;
pub mod spec_item;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType, ALL_ACTION_TYPES};
pub use patch::SpecItemPatch;
pub use requirement::{Requirement, RequirementView, Supplier};
pub use spec_item::{ItemAnnotation, PricedComponent, RequirementLink, SpecItem};
pub use types::{PriceSide, SpecStatus, ALL_STATUSES, REQUIRES_APPROVAL};
