// ==========================================
// FFE 规格项跟踪系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 室内设计项目的家具/设备规格项生命周期管理
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 分层: domain -> engine -> repository/config -> api -> app
// ==========================================

pub mod domain;
pub mod engine;
pub mod repository;
pub mod config;
pub mod db;
pub mod logging;
pub mod i18n;
pub mod api;
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{PriceSide, SpecStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, ItemAnnotation, PricedComponent, Requirement, RequirementLink,
    RequirementView, SpecItem, SpecItemPatch, Supplier,
};

// 引擎
pub use engine::{
    AggregationEngine, FinancialSummary, ItemFilter, LinkageGraph, PriceEdit, PricingEngine,
    SpecItemStore, StatusWorkflow,
};

// API
pub use api::{ApiError, ApiResult, SpecItemApi};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "FFE 规格项跟踪系统";
