// ==========================================
// FFE 规格项跟踪系统 - 供应商目录仓储
// ==========================================
// 对齐: supplier 表
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::requirement::Supplier;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::persistence::SupplierDirectory;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct SupplierRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SupplierRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 写入供应商（币种统一大写）
    pub fn upsert(&self, supplier: &Supplier) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"INSERT INTO supplier (supplier_id, name, currency) VALUES (?1, ?2, ?3)
               ON CONFLICT(supplier_id) DO UPDATE SET name = ?2, currency = ?3"#,
            params![
                supplier.supplier_id,
                supplier.name,
                supplier.currency.trim().to_uppercase(),
            ],
        )?;
        Ok(())
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<Supplier>> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT supplier_id, name, currency FROM supplier ORDER BY name, supplier_id")?;
        let suppliers = stmt
            .query_map([], map_supplier)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(suppliers)
    }

    pub fn find_by_id(&self, supplier_id: &str) -> RepositoryResult<Option<Supplier>> {
        let conn = self.get_conn()?;
        let supplier = conn
            .query_row(
                "SELECT supplier_id, name, currency FROM supplier WHERE supplier_id = ?1",
                params![supplier_id],
                map_supplier,
            )
            .optional()?;
        Ok(supplier)
    }
}

fn map_supplier(row: &rusqlite::Row) -> SqliteResult<Supplier> {
    Ok(Supplier {
        supplier_id: row.get(0)?,
        name: row.get(1)?,
        currency: row.get(2)?,
    })
}

#[async_trait]
impl SupplierDirectory for SupplierRepository {
    async fn list_suppliers(&self) -> RepositoryResult<Vec<Supplier>> {
        self.list_all()
    }

    async fn find_supplier(&self, supplier_id: &str) -> RepositoryResult<Option<Supplier>> {
        self.find_by_id(supplier_id)
    }
}
