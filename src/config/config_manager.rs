// ==========================================
// FFE 规格项跟踪系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::workflow_config_trait::WorkflowConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::SpecStatus;
use crate::engine::status_workflow::DEFAULT_APPROVAL_FALLBACK;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::sync::{Arc, Mutex, MutexGuard};

/// 当前只使用全局作用域
const GLOBAL_SCOPE: &str = "global";
const DEFAULT_CURRENCY_CODE: &str = "CAD";

fn normalize_currency(raw: &str) -> String {
    raw.trim().to_uppercase()
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            conn: Arc::new(Mutex::new(open_sqlite_connection(db_path)?)),
        })
    }

    /// 与仓储共用连接（对连接重新应用 PRAGMA,幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let guard = conn.lock().map_err(|e| format!("配置连接锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Box<dyn Error>> {
        self.conn
            .lock()
            .map_err(|e| format!("配置连接锁获取失败: {}", e).into())
    }

    /// 读取全局配置值；未配置时返回 None
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let value = self
            .lock()?
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入全局配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        self.lock()?.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        tracing::info!(key = %key, value = %value, "配置已更新");
        Ok(())
    }

    fn get_or(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 全部全局配置（按键排序的 JSON 对象）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1")?;
        let entries = stmt
            .query_map(params![GLOBAL_SCOPE], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<BTreeMap<String, String>>>()?;
        Ok(serde_json::to_string(&entries)?)
    }
}

#[async_trait]
impl WorkflowConfigReader for ConfigManager {
    async fn get_approval_fallback_status(&self) -> Result<SpecStatus, Box<dyn Error>> {
        let value = self.get_or(
            config_keys::APPROVAL_FALLBACK_STATUS,
            DEFAULT_APPROVAL_FALLBACK.to_db_str(),
        )?;
        SpecStatus::from_canonical(&value)
            .ok_or_else(|| Box::<dyn Error>::from(format!("无效的回退状态配置: {}", value)))
    }

    async fn get_resolved_statuses(&self) -> Result<BTreeSet<SpecStatus>, Box<dyn Error>> {
        let value =
            self.get_or(config_keys::RESOLVED_STATUSES, r#"["CONTRACTOR_TO_ORDER"]"#)?;
        let raw: Vec<String> = serde_json::from_str(&value)?;
        raw.iter()
            .map(|s| {
                SpecStatus::from_canonical(s)
                    .ok_or_else(|| Box::<dyn Error>::from(format!("无效的完结状态配置: {}", s)))
            })
            .collect()
    }

    async fn get_default_currency(&self) -> Result<String, Box<dyn Error>> {
        Ok(normalize_currency(
            &self.get_or(config_keys::DEFAULT_CURRENCY, DEFAULT_CURRENCY_CODE)?,
        ))
    }

    async fn get_primary_currency(&self) -> Result<String, Box<dyn Error>> {
        Ok(normalize_currency(
            &self.get_or(config_keys::PRIMARY_CURRENCY, DEFAULT_CURRENCY_CODE)?,
        ))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 审批
    pub const APPROVAL_FALLBACK_STATUS: &str = "approval_fallback_status";

    // 统计口径
    pub const RESOLVED_STATUSES: &str = "resolved_statuses"; // JSON 数组

    // 币种
    pub const DEFAULT_CURRENCY: &str = "default_currency";
    pub const PRIMARY_CURRENCY: &str = "primary_currency";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let cm = manager();
        assert_eq!(
            cm.get_approval_fallback_status().await.unwrap(),
            SpecStatus::QuoteApproved
        );
        assert_eq!(
            cm.get_resolved_statuses().await.unwrap(),
            BTreeSet::from([SpecStatus::ContractorToOrder])
        );
        assert_eq!(cm.get_default_currency().await.unwrap(), "CAD");
        assert_eq!(cm.get_config_snapshot().unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_overwrite_and_snapshot() {
        let cm = manager();
        cm.set_global_config_value(config_keys::DEFAULT_CURRENCY, "usd").unwrap();
        cm.set_global_config_value(config_keys::DEFAULT_CURRENCY, " eur ").unwrap();
        cm.set_global_config_value(config_keys::APPROVAL_FALLBACK_STATUS, "QUOTE_RECEIVED")
            .unwrap();

        assert_eq!(cm.get_default_currency().await.unwrap(), "EUR");
        assert_eq!(
            cm.get_approval_fallback_status().await.unwrap(),
            SpecStatus::QuoteReceived
        );

        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&cm.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[config_keys::DEFAULT_CURRENCY], " eur ");
    }

    #[tokio::test]
    async fn test_invalid_fallback_status_is_rejected() {
        let cm = manager();
        cm.set_global_config_value(config_keys::APPROVAL_FALLBACK_STATUS, "quote approved")
            .unwrap();
        assert!(cm.get_approval_fallback_status().await.is_err());
    }
}
