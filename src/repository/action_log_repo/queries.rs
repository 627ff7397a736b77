use super::core::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};

const SELECT_LOG: &str = "SELECT action_id, project_id, item_id, action_type, action_ts, actor, payload_json
                          FROM action_log";

impl ActionLogRepository {
    /// 规格项的操作日志（最新在前）
    pub fn find_by_item_id(&self, item_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_LOG} WHERE item_id = ?1 ORDER BY action_ts DESC, rowid DESC"
        ))?;
        let logs = stmt
            .query_map(params![item_id], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    /// 项目最近的 N 条日志
    pub fn find_recent(&self, project_id: &str, limit: i32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_LOG} WHERE project_id = ?1 ORDER BY action_ts DESC, rowid DESC LIMIT ?2"
        ))?;
        let logs = stmt
            .query_map(params![project_id, limit], log_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(logs)
    }

    pub fn count_by_action_type(
        &self,
        project_id: &str,
        action_type: ActionType,
    ) -> RepositoryResult<i64> {
        let count = self.get_conn()?.query_row(
            "SELECT COUNT(*) FROM action_log WHERE project_id = ?1 AND action_type = ?2",
            params![project_id, action_type.to_db_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn log_from_row(row: &Row) -> rusqlite::Result<ActionLog> {
    let raw_type: String = row.get(3)?;
    let action_type = ActionType::from_db_str(&raw_type).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("未知操作类型: {}", raw_type).into(),
        )
    })?;

    let raw_ts: String = row.get(4)?;
    let action_ts = DateTime::parse_from_rfc3339(&raw_ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    // 无法解析的 payload 视为缺失,不影响日志本身的读取
    let payload_json = row
        .get::<_, Option<String>>(6)?
        .and_then(|s| serde_json::from_str(&s).ok());

    Ok(ActionLog {
        action_id: row.get(0)?,
        project_id: row.get(1)?,
        item_id: row.get(2)?,
        action_type,
        action_ts,
        actor: row.get(5)?,
        payload_json,
    })
}
