// ==========================================
// FFE 规格项跟踪系统 - SQLite 连接初始化与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为,避免部分连接未开启外键
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 集中维护建表语句,init_schema 可重复执行
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 旧库版本号低于此值时只告警,不做自动迁移
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id   TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key  TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id   TEXT NOT NULL REFERENCES config_scope(scope_id),
    key        TEXT NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS supplier (
    supplier_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    currency    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ffe_requirement (
    requirement_id TEXT PRIMARY KEY,
    project_id     TEXT NOT NULL,
    room_id        TEXT,
    section_id     TEXT,
    name           TEXT NOT NULL,
    created_at     TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_ffe_requirement_project
    ON ffe_requirement(project_id, room_id);

CREATE TABLE IF NOT EXISTS ffe_requirement_child (
    requirement_id TEXT NOT NULL REFERENCES ffe_requirement(requirement_id) ON DELETE CASCADE,
    seq            INTEGER NOT NULL,
    name           TEXT NOT NULL,
    PRIMARY KEY (requirement_id, seq)
);

CREATE TABLE IF NOT EXISTS spec_item (
    item_id                TEXT PRIMARY KEY,
    project_id             TEXT NOT NULL,
    name                   TEXT NOT NULL,
    sku                    TEXT,
    model                  TEXT,
    doc_code               TEXT,
    room_id                TEXT,
    section_id             TEXT,
    quantity               TEXT NOT NULL DEFAULT '1',
    unit_type              TEXT,
    trade_price            TEXT,
    trade_price_currency   TEXT,
    rrp                    TEXT,
    rrp_currency           TEXT,
    markup_percent         TEXT,
    trade_discount_percent TEXT,
    supplier_id            TEXT,
    components_json        TEXT NOT NULL DEFAULT '[]',
    status                 TEXT NOT NULL,
    client_approved        INTEGER NOT NULL DEFAULT 0,
    ffe_requirement_id     TEXT,
    annotations_json       TEXT NOT NULL DEFAULT '[]',
    sort_order             INTEGER NOT NULL DEFAULT 0,
    version                INTEGER NOT NULL DEFAULT 1,
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spec_item_project
    ON spec_item(project_id, sort_order);

CREATE TABLE IF NOT EXISTS spec_item_link (
    link_id        TEXT PRIMARY KEY,
    item_id        TEXT NOT NULL REFERENCES spec_item(item_id) ON DELETE CASCADE,
    requirement_id TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    UNIQUE (item_id, requirement_id)
);

CREATE INDEX IF NOT EXISTS idx_spec_item_link_requirement
    ON spec_item_link(requirement_id);

CREATE TABLE IF NOT EXISTS action_log (
    action_id    TEXT PRIMARY KEY,
    project_id   TEXT NOT NULL,
    item_id      TEXT,
    action_type  TEXT NOT NULL,
    action_ts    TEXT NOT NULL,
    actor        TEXT NOT NULL,
    payload_json TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_log_item
    ON action_log(item_id, action_ts);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
    VALUES ('global', 'GLOBAL', 'global');
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要每个连接单独开启
/// - busy_timeout 需要每个连接单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表（幂等）并记录当前 schema_version
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
