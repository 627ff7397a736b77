// ==========================================
// FFE 规格项跟踪系统 - 引擎层错误类型
// ==========================================
// 职责: 纯规则校验失败（不涉及 I/O）
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::SpecStatus;
use thiserror::Error;

/// 引擎层规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// 目标状态需要客户批准,但规格项尚未批准
    #[error("状态 {status} 需要客户批准: item_id={item_id}")]
    ApprovalRequired { item_id: String, status: SpecStatus },

    /// 已归档规格项只能通过重新关联需求恢复
    #[error("规格项已归档,只能通过重新关联需求恢复: item_id={item_id}, 目标状态={status}")]
    ArchivedItem { item_id: String, status: SpecStatus },

    /// 文档编码与同项目其他未归档规格项冲突（忽略大小写）
    #[error("文档编码重复: doc_code={doc_code}, 冲突规格项={conflicting_item_id}")]
    DuplicateDocCode {
        doc_code: String,
        conflicting_item_id: String,
    },

    /// 撤销批准时的回退状态不合法
    #[error("无效的回退状态: {0}（不能是需批准状态或归档状态）")]
    InvalidFallbackStatus(SpecStatus),

    /// 价格字段取值非法
    #[error("价格字段错误 (field={field}): {message}")]
    InvalidPrice { field: String, message: String },

    /// 分组关系非法
    #[error("分组错误: {0}")]
    InvalidGrouping(String),
}

impl WorkflowError {
    /// 面向编辑者的提示文本（按当前 locale）
    ///
    /// 没有对应词条的错误沿用 Display 文本
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::ApprovalRequired { status, .. } => {
                let label = crate::i18n::display_label(status.to_db_str());
                crate::i18n::t_with_args("workflow.approval_required", &[("status", label.as_str())])
            }
            WorkflowError::DuplicateDocCode { doc_code, .. } => crate::i18n::t_with_args(
                "workflow.duplicate_doc_code",
                &[("doc_code", doc_code.as_str())],
            ),
            other => other.to_string(),
        }
    }
}

/// Result 类型别名
pub type WorkflowResult<T> = Result<T, WorkflowError>;
