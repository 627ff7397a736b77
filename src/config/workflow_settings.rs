// ==========================================
// FFE 规格项跟踪系统 - 流程配置快照
// ==========================================
// 职责: 会话打开时一次性读取配置,引擎只读快照
// ==========================================

use crate::config::workflow_config_trait::WorkflowConfigReader;
use crate::domain::types::SpecStatus;
use crate::engine::status_workflow::DEFAULT_APPROVAL_FALLBACK;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// 撤销批准时的回退状态
    pub approval_fallback_status: SpecStatus,
    /// 统计计数时排除的"已完结"状态
    pub resolved_statuses: BTreeSet<SpecStatus>,
    /// 默认币种
    pub default_currency: String,
    /// 主币种
    pub primary_currency: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            approval_fallback_status: DEFAULT_APPROVAL_FALLBACK,
            resolved_statuses: BTreeSet::from([SpecStatus::ContractorToOrder]),
            default_currency: "CAD".to_string(),
            primary_currency: "CAD".to_string(),
        }
    }
}

impl WorkflowSettings {
    /// 从配置读取器加载
    pub async fn load(reader: &dyn WorkflowConfigReader) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            approval_fallback_status: reader.get_approval_fallback_status().await?,
            resolved_statuses: reader.get_resolved_statuses().await?,
            default_currency: reader.get_default_currency().await?,
            primary_currency: reader.get_primary_currency().await?,
        })
    }

    /// 状态是否视为已完结
    pub fn is_resolved(&self, status: SpecStatus) -> bool {
        self.resolved_statuses.contains(&status)
    }
}
