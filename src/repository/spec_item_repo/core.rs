use crate::db::open_sqlite_connection;
use crate::domain::patch::SpecItemPatch;
use crate::domain::spec_item::{ItemAnnotation, RequirementLink, SpecItem};
use crate::domain::types::SpecStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence::GroupingWrite;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};

// ==========================================
// SpecItemRepository - 规格项仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct SpecItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SpecItemRepository {
    /// 创建新的 SpecItemRepository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入规格项及其关联记录（同一事务）
    pub fn insert(&self, item: &SpecItem) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO spec_item (
                item_id, project_id, name, sku, model, doc_code, room_id, section_id,
                quantity, unit_type, trade_price, trade_price_currency, rrp, rrp_currency,
                markup_percent, trade_discount_percent, supplier_id, components_json,
                status, client_approved, ffe_requirement_id, annotations_json,
                sort_order, version, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                item.id,
                item.project_id,
                item.name,
                item.sku,
                item.model,
                item.doc_code,
                item.room_id,
                item.section_id,
                item.quantity.to_string(),
                item.unit_type,
                decimal_text(item.trade_price),
                item.trade_price_currency,
                decimal_text(item.rrp),
                item.rrp_currency,
                decimal_text(item.markup_percent),
                decimal_text(item.trade_discount_percent),
                item.supplier_id,
                serde_json::to_string(&item.components)?,
                item.status.to_db_str(),
                item.client_approved,
                item.ffe_requirement_id,
                serde_json::to_string(&item.annotations)?,
                item.sort_order,
                item.version,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;

        for link in &item.links {
            insert_link(&tx, &item.id, link)?;
        }

        tx.commit()?;
        Ok(())
    }

    /// 条件局部更新
    ///
    /// # 返回
    /// - Ok(new_version)
    ///
    /// # 错误
    /// - `RepositoryError::OptimisticLockFailure`: version 不匹配
    /// - `RepositoryError::NotFound`: item_id 不存在
    pub fn update_fields(
        &self,
        item_id: &str,
        expected_version: i64,
        patch: &SpecItemPatch,
    ) -> RepositoryResult<i64> {
        let columns = patch_columns(patch)?;
        let conn = self.get_conn()?;
        update_columns(&conn, item_id, expected_version, columns)
    }

    /// 删除规格项（spec_item_link 级联删除）
    pub fn delete(&self, item_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute("DELETE FROM spec_item WHERE item_id = ?1", params![item_id])?;
        if rows == 0 {
            return Err(not_found(item_id));
        }
        Ok(())
    }

    /// 归档: 状态、旧版关联、多对多关联在同一事务中提交
    pub fn archive(&self, item_id: &str, expected_version: i64) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            r#"UPDATE spec_item
               SET status = ?1, ffe_requirement_id = NULL, updated_at = ?2, version = version + 1
               WHERE item_id = ?3 AND version = ?4"#,
            params![
                SpecStatus::Archived.to_db_str(),
                Utc::now().to_rfc3339(),
                item_id,
                expected_version,
            ],
        )?;
        if rows == 0 {
            return Err(version_mismatch(&tx, item_id, expected_version));
        }

        tx.execute("DELETE FROM spec_item_link WHERE item_id = ?1", params![item_id])?;
        tx.commit()?;
        Ok(expected_version + 1)
    }

    /// 覆盖注解列表
    pub fn update_annotations(
        &self,
        item_id: &str,
        expected_version: i64,
        annotations: &[ItemAnnotation],
    ) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        update_columns(
            &conn,
            item_id,
            expected_version,
            vec![("annotations_json", Value::Text(serde_json::to_string(annotations)?))],
        )
    }

    /// 新增需求关联（可选地在同一事务中恢复状态）
    pub fn add_link(
        &self,
        item_id: &str,
        expected_version: i64,
        link: &RequirementLink,
        restore_status: Option<SpecStatus>,
    ) -> RepositoryResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut columns = Vec::new();
        if let Some(status) = restore_status {
            columns.push(("status", Value::Text(status.to_db_str().to_string())));
        }
        let new_version = update_columns(&tx, item_id, expected_version, columns)?;
        insert_link(&tx, item_id, link)?;

        tx.commit()?;
        Ok(new_version)
    }

    /// 批量写入分组注解（同一事务）
    pub fn update_groupings(&self, writes: &[GroupingWrite]) -> RepositoryResult<Vec<i64>> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut versions = Vec::with_capacity(writes.len());
        for write in writes {
            let version = update_columns(
                &tx,
                &write.item_id,
                write.expected_version,
                vec![(
                    "annotations_json",
                    Value::Text(serde_json::to_string(&write.annotations)?),
                )],
            )?;
            versions.push(version);
        }

        tx.commit()?;
        Ok(versions)
    }

    /// 按给定顺序写入 sort_order（从 0 开始）
    pub fn update_sort_orders(
        &self,
        project_id: &str,
        ordered_item_ids: &[String],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let mut count = 0;
        for (idx, item_id) in ordered_item_ids.iter().enumerate() {
            count += tx.execute(
                "UPDATE spec_item SET sort_order = ?1 WHERE item_id = ?2 AND project_id = ?3",
                params![idx as i64, item_id, project_id],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// 内部工具
// ==========================================

fn decimal_text(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

fn opt_text(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn opt_decimal(value: &Option<Decimal>) -> Value {
    match value {
        Some(d) => Value::Text(d.to_string()),
        None => Value::Null,
    }
}

fn not_found(item_id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "SpecItem".to_string(),
        id: item_id.to_string(),
    }
}

fn insert_link(conn: &Connection, item_id: &str, link: &RequirementLink) -> RepositoryResult<()> {
    conn.execute(
        "INSERT INTO spec_item_link (link_id, item_id, requirement_id, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![link.link_id, item_id, link.requirement_id, link.created_at.to_rfc3339()],
    )?;
    Ok(())
}

/// patch → (列名, 值),顺序与 `SpecItemPatch::changed_fields` 一致
pub(super) fn patch_columns(patch: &SpecItemPatch) -> RepositoryResult<Vec<(&'static str, Value)>> {
    let mut columns = Vec::new();
    if let Some(v) = &patch.name {
        columns.push(("name", Value::Text(v.clone())));
    }
    if let Some(v) = &patch.sku {
        columns.push(("sku", opt_text(v)));
    }
    if let Some(v) = &patch.model {
        columns.push(("model", opt_text(v)));
    }
    if let Some(v) = &patch.doc_code {
        columns.push(("doc_code", opt_text(v)));
    }
    if let Some(v) = &patch.room_id {
        columns.push(("room_id", opt_text(v)));
    }
    if let Some(v) = &patch.section_id {
        columns.push(("section_id", opt_text(v)));
    }
    if let Some(v) = &patch.quantity {
        columns.push(("quantity", Value::Text(v.to_string())));
    }
    if let Some(v) = &patch.unit_type {
        columns.push(("unit_type", opt_text(v)));
    }
    if let Some(v) = &patch.trade_price {
        columns.push(("trade_price", opt_decimal(v)));
    }
    if let Some(v) = &patch.trade_price_currency {
        columns.push(("trade_price_currency", opt_text(v)));
    }
    if let Some(v) = &patch.rrp {
        columns.push(("rrp", opt_decimal(v)));
    }
    if let Some(v) = &patch.rrp_currency {
        columns.push(("rrp_currency", opt_text(v)));
    }
    if let Some(v) = &patch.markup_percent {
        columns.push(("markup_percent", opt_decimal(v)));
    }
    if let Some(v) = &patch.trade_discount_percent {
        columns.push(("trade_discount_percent", opt_decimal(v)));
    }
    if let Some(v) = &patch.supplier_id {
        columns.push(("supplier_id", opt_text(v)));
    }
    if let Some(v) = &patch.components {
        columns.push(("components_json", Value::Text(serde_json::to_string(v)?)));
    }
    if let Some(v) = &patch.status {
        columns.push(("status", Value::Text(v.to_db_str().to_string())));
    }
    if let Some(v) = patch.client_approved {
        columns.push(("client_approved", Value::Integer(i64::from(v))));
    }
    if let Some(v) = &patch.annotations {
        columns.push(("annotations_json", Value::Text(serde_json::to_string(v)?)));
    }
    if let Some(v) = patch.sort_order {
        columns.push(("sort_order", Value::Integer(i64::from(v))));
    }
    Ok(columns)
}

/// 执行带版本条件的 UPDATE（总是刷新 updated_at 并递增 version）
fn update_columns(
    conn: &Connection,
    item_id: &str,
    expected_version: i64,
    columns: Vec<(&'static str, Value)>,
) -> RepositoryResult<i64> {
    let n = columns.len();
    let mut assignments: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(idx, (column, _))| format!("{} = ?{}", column, idx + 1))
        .collect();
    assignments.push(format!("updated_at = ?{}", n + 1));
    assignments.push("version = version + 1".to_string());

    let sql = format!(
        "UPDATE spec_item SET {} WHERE item_id = ?{} AND version = ?{}",
        assignments.join(", "),
        n + 2,
        n + 3
    );

    let mut values: Vec<Value> = columns.into_iter().map(|(_, value)| value).collect();
    values.push(Value::Text(Utc::now().to_rfc3339()));
    values.push(Value::Text(item_id.to_string()));
    values.push(Value::Integer(expected_version));

    let rows = conn.execute(&sql, params_from_iter(values.iter()))?;
    if rows == 0 {
        return Err(version_mismatch(conn, item_id, expected_version));
    }
    Ok(expected_version + 1)
}

/// 更新 0 行时判断是记录不存在还是版本冲突
fn version_mismatch(conn: &Connection, item_id: &str, expected_version: i64) -> RepositoryError {
    let actual: rusqlite::Result<i64> = conn.query_row(
        "SELECT version FROM spec_item WHERE item_id = ?1",
        params![item_id],
        |row| row.get(0),
    );

    match actual {
        Ok(actual) => RepositoryError::OptimisticLockFailure {
            item_id: item_id.to_string(),
            expected: expected_version,
            actual,
        },
        Err(rusqlite::Error::QueryReturnedNoRows) => not_found(item_id),
        Err(e) => e.into(),
    }
}
