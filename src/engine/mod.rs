// ==========================================
// FFE 规格项跟踪系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 不做 I/O,只产出 patch 或投影
// ==========================================

pub mod aggregation;
pub mod error;
pub mod item_store;
pub mod linkage_graph;
pub mod pricing;
pub mod status_workflow;

// 重导出核心引擎
pub use aggregation::{AggregationEngine, FinancialSummary, ItemFilter};
pub use error::{WorkflowError, WorkflowResult};
pub use item_store::{LinkAdvice, OptionGroup, SpecItemStore};
pub use linkage_graph::LinkageGraph;
pub use pricing::{PriceEdit, PricingEngine};
pub use status_workflow::{StatusTransition, StatusWorkflow, DEFAULT_APPROVAL_FALLBACK};
