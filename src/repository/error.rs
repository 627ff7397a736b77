// ==========================================
// FFE 规格项跟踪系统 - 仓储层错误类型
// ==========================================
// 职责: 持久化失败的分类（乐观锁、约束、繁忙、数据格式）
// 工具: thiserror 派生宏
// ==========================================

use rusqlite::ErrorCode;
use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 并发控制 =====
    /// 条件更新未命中: 行存在但版本号已前进
    #[error("版本冲突: item_id={item_id}, 预期版本={expected}, 实际版本={actual}")]
    OptimisticLockFailure {
        item_id: String,
        expected: i64,
        actual: i64,
    },

    #[error("{entity}(id={id}) 不存在")]
    NotFound { entity: String, id: String },

    #[error("连接锁已中毒: {0}")]
    LockError(String),

    /// busy_timeout 内仍未拿到写锁
    #[error("数据库繁忙: {0}")]
    Busy(String),

    // ===== 约束 =====
    #[error("唯一约束冲突: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束冲突: {0}")]
    ForeignKeyViolation(String),

    #[error("SQL 执行失败: {0}")]
    DatabaseQueryError(String),

    // ===== 行数据 =====
    /// 存储值无法映射回领域类型（未知状态、非法金额文本等）
    #[error("字段 {field} 的存储值无效: {message}")]
    FieldValueError { field: String, message: String },

    #[error("JSON 列序列化失败: {0}")]
    SerializationError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                RepositoryError::Busy(message)
            }
            Some(ErrorCode::ConstraintViolation) if message.contains("UNIQUE") => {
                RepositoryError::UniqueConstraintViolation(message)
            }
            Some(ErrorCode::ConstraintViolation) if message.contains("FOREIGN KEY") => {
                RepositoryError::ForeignKeyViolation(message)
            }
            _ => RepositoryError::DatabaseQueryError(message),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    #[test]
    fn test_constraint_errors_are_classified() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id TEXT PRIMARY KEY);
             CREATE TABLE child (id TEXT PRIMARY KEY, parent_id TEXT NOT NULL REFERENCES parent(id));
             INSERT INTO parent (id) VALUES ('p1');",
        )
        .unwrap();

        let dup = conn
            .execute("INSERT INTO parent (id) VALUES (?1)", params!["p1"])
            .unwrap_err();
        assert!(matches!(
            RepositoryError::from(dup),
            RepositoryError::UniqueConstraintViolation(_)
        ));

        let orphan = conn
            .execute("INSERT INTO child (id, parent_id) VALUES ('c1', ?1)", params!["missing"])
            .unwrap_err();
        assert!(matches!(
            RepositoryError::from(orphan),
            RepositoryError::ForeignKeyViolation(_)
        ));

        let bad_sql = conn.execute("SELECT * FROM nowhere", []).unwrap_err();
        assert!(matches!(
            RepositoryError::from(bad_sql),
            RepositoryError::DatabaseQueryError(_)
        ));
    }
}
