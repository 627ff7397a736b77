// ==========================================
// FFE 规格项跟踪系统 - 操作日志领域模型
// ==========================================
// 红线: 所有成功写入都要留痕
// 用途: 审计追踪
// 对齐: action_log 表
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,               // 日志ID
    pub project_id: String,              // 所属项目
    pub item_id: Option<String>,         // 关联规格项（排序等批量操作可为None）
    pub action_type: ActionType,         // 操作类型
    pub action_ts: DateTime<Utc>,        // 操作时间
    pub actor: String,                   // 操作人
    pub payload_json: Option<JsonValue>, // 操作参数
}

impl ActionLog {
    /// 以当前时间构造日志
    pub fn new(
        project_id: &str,
        item_id: Option<&str>,
        action_type: ActionType,
        actor: &str,
        payload_json: Option<JsonValue>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            item_id: item_id.map(str::to_string),
            action_type,
            action_ts: Utc::now(),
            actor: actor.to_string(),
            payload_json,
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    CreateItem,    // 新建规格项
    DeleteItem,    // 删除规格项
    SetStatus,     // 修改状态
    SetApproval,   // 修改客户批准
    SetPrice,      // 修改价格字段
    SetDocCode,    // 修改文档编码
    UpdateDetails, // 修改基础信息
    SetFlag,       // 标记
    Link,          // 关联需求
    Group,         // 分组
    Ungroup,       // 取消分组
    Archive,       // 归档
    Reorder,       // 调整展示顺序
}

pub const ALL_ACTION_TYPES: [ActionType; 13] = [
    ActionType::CreateItem,
    ActionType::DeleteItem,
    ActionType::SetStatus,
    ActionType::SetApproval,
    ActionType::SetPrice,
    ActionType::SetDocCode,
    ActionType::UpdateDetails,
    ActionType::SetFlag,
    ActionType::Link,
    ActionType::Group,
    ActionType::Ungroup,
    ActionType::Archive,
    ActionType::Reorder,
];

impl ActionType {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ActionType::CreateItem => "CREATE_ITEM",
            ActionType::DeleteItem => "DELETE_ITEM",
            ActionType::SetStatus => "SET_STATUS",
            ActionType::SetApproval => "SET_APPROVAL",
            ActionType::SetPrice => "SET_PRICE",
            ActionType::SetDocCode => "SET_DOC_CODE",
            ActionType::UpdateDetails => "UPDATE_DETAILS",
            ActionType::SetFlag => "SET_FLAG",
            ActionType::Link => "LINK",
            ActionType::Group => "GROUP",
            ActionType::Ungroup => "UNGROUP",
            ActionType::Archive => "ARCHIVE",
            ActionType::Reorder => "REORDER",
        }
    }

    /// 从字符串解析操作类型
    pub fn from_db_str(s: &str) -> Option<Self> {
        ALL_ACTION_TYPES.into_iter().find(|t| t.to_db_str() == s)
    }
}
