// ==========================================
// FFE 规格项跟踪系统 - 流程配置读取 Trait
// ==========================================
// 职责: 定义引擎所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::domain::types::SpecStatus;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::error::Error;

// ==========================================
// WorkflowConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait WorkflowConfigReader: Send + Sync {
    /// 撤销批准时的回退状态
    ///
    /// # 默认值
    /// - QUOTE_APPROVED
    async fn get_approval_fallback_status(&self) -> Result<SpecStatus, Box<dyn Error>>;

    /// 视为"已完结"的状态集合（统计待批准/缺 RRP 时排除）
    ///
    /// # 默认值
    /// - ["CONTRACTOR_TO_ORDER"]
    async fn get_resolved_statuses(&self) -> Result<BTreeSet<SpecStatus>, Box<dyn Error>>;

    /// 默认币种（规格项与供应商都没有币种时使用）
    ///
    /// # 默认值
    /// - CAD
    async fn get_default_currency(&self) -> Result<String, Box<dyn Error>>;

    /// 主币种（平均折扣率只在该币种分桶内计算）
    ///
    /// # 默认值
    /// - CAD
    async fn get_primary_currency(&self) -> Result<String, Box<dyn Error>>;
}
