use crate::db::open_sqlite_connection;
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{named_params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: 只追加,不提供修改与删除
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        Ok(Self::from_connection(Arc::new(Mutex::new(
            open_sqlite_connection(db_path)?,
        ))))
    }

    /// 与规格项仓储共用连接
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加一条操作日志,返回 action_id
    ///
    /// payload 以紧凑 JSON 文本存储
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let payload = log
            .payload_json
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.get_conn()?.execute(
            r#"INSERT INTO action_log
                   (action_id, project_id, item_id, action_type, action_ts, actor, payload_json)
               VALUES
                   (:action_id, :project_id, :item_id, :action_type, :action_ts, :actor, :payload)"#,
            named_params! {
                ":action_id": log.action_id,
                ":project_id": log.project_id,
                ":item_id": log.item_id,
                ":action_type": log.action_type.to_db_str(),
                ":action_ts": log.action_ts.to_rfc3339(),
                ":actor": log.actor,
                ":payload": payload,
            },
        )?;

        Ok(log.action_id.clone())
    }
}
