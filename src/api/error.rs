// ==========================================
// FFE 规格项跟踪系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型,转换 Repository / Engine 错误为用户可读的错误
// 红线: 错误信息必须包含显式原因（规格项ID、状态、冲突对象）
// ==========================================

use crate::domain::types::SpecStatus;
use crate::engine::error::WorkflowError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 流程规则错误（在内存中拒绝,规格项保持不变）
    // ==========================================
    #[error("状态 {status} 需要客户批准: item_id={item_id}")]
    ApprovalRequired { item_id: String, status: SpecStatus },

    #[error("文档编码重复: doc_code={doc_code}, 已被规格项 {conflicting_item_id} 使用")]
    DuplicateDocCode {
        doc_code: String,
        conflicting_item_id: String,
    },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发控制错误
    // ==========================================
    #[error("版本冲突: item_id={item_id}, expected_version={expected}, actual_version={actual}")]
    VersionConflict {
        item_id: String,
        expected: i64,
        actual: i64,
    },

    // ==========================================
    // 数据访问错误（内存中的编辑已标记为未确认）
    // ==========================================
    #[error("持久化失败: {0}")]
    Persistence(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::OptimisticLockFailure {
                item_id,
                expected,
                actual,
            } => ApiError::VersionConflict {
                item_id,
                expected,
                actual,
            },
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::Persistence(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::LockError(msg)
            | RepositoryError::Busy(msg)
            | RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::SerializationError(msg) => ApiError::Persistence(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 WorkflowError 转换
// ==========================================
impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::ApprovalRequired { item_id, status } => {
                ApiError::ApprovalRequired { item_id, status }
            }
            WorkflowError::DuplicateDocCode {
                doc_code,
                conflicting_item_id,
            } => ApiError::DuplicateDocCode {
                doc_code,
                conflicting_item_id,
            },
            WorkflowError::InvalidFallbackStatus(status) => {
                ApiError::Config(format!("无效的回退状态: {}", status))
            }
            WorkflowError::InvalidPrice { field, message } => {
                ApiError::InvalidInput(format!("{}: {}", field, message))
            }
            WorkflowError::InvalidGrouping(msg) => ApiError::InvalidInput(msg),
            err @ WorkflowError::ArchivedItem { .. } => {
                ApiError::BusinessRuleViolation(err.to_string())
            }
        }
    }
}

impl ApiError {
    /// 是否为持久化层面的失败（调用方应重新读取规格项）
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Persistence(_) | ApiError::VersionConflict { .. } | ApiError::Other(_)
        )
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "SpecItem".to_string(),
            id: "I001".to_string(),
        };
        match ApiError::from(repo_err) {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("SpecItem"));
                assert!(msg.contains("I001"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }

        let repo_err = RepositoryError::OptimisticLockFailure {
            item_id: "I001".to_string(),
            expected: 1,
            actual: 2,
        };
        let api_err: ApiError = repo_err.into();
        assert!(api_err.is_persistence_failure());
        match api_err {
            ApiError::VersionConflict {
                item_id,
                expected,
                actual,
            } => {
                assert_eq!(item_id, "I001");
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected VersionConflict, got {:?}", other),
        }

        let api_err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(api_err, ApiError::Persistence(ref msg) if msg == "poisoned"));
    }

    #[test]
    fn test_workflow_error_conversion() {
        let api_err: ApiError = WorkflowError::ApprovalRequired {
            item_id: "I001".to_string(),
            status: SpecStatus::Ordered,
        }
        .into();
        assert!(!api_err.is_persistence_failure());
        assert!(api_err.to_string().contains("ORDERED"));

        let api_err: ApiError = WorkflowError::DuplicateDocCode {
            doc_code: "FF-01".to_string(),
            conflicting_item_id: "I002".to_string(),
        }
        .into();
        assert!(matches!(api_err, ApiError::DuplicateDocCode { .. }));
    }
}
