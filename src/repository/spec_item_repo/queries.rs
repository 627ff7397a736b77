use super::core::SpecItemRepository;
use crate::domain::spec_item::{ItemAnnotation, PricedComponent, RequirementLink, SpecItem};
use crate::domain::types::SpecStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Result as SqliteResult, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

const SELECT_COLUMNS: &str = r#"
    item_id, project_id, name, sku, model, doc_code, room_id, section_id,
    quantity, unit_type, trade_price, trade_price_currency, rrp, rrp_currency,
    markup_percent, trade_discount_percent, supplier_id, components_json,
    status, client_approved, ffe_requirement_id, annotations_json,
    sort_order, version, created_at, updated_at
"#;

impl SpecItemRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 item_id 查询单个规格项（含关联记录）
    pub fn find_by_id(&self, item_id: &str) -> RepositoryResult<Option<SpecItem>> {
        let conn = self.get_conn()?;

        let sql = format!("SELECT {} FROM spec_item WHERE item_id = ?1", SELECT_COLUMNS);
        let row = conn
            .query_row(&sql, params![item_id], SpecItemRow::from_row)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT link_id, requirement_id, created_at
            FROM spec_item_link
            WHERE item_id = ?1
            ORDER BY created_at, rowid
            "#,
        )?;
        let raw_links = stmt
            .query_map(params![item_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let links = raw_links
            .into_iter()
            .map(|(link_id, requirement_id, created_at)| to_link(link_id, requirement_id, &created_at))
            .collect::<RepositoryResult<Vec<_>>>()?;

        row.into_domain(links).map(Some)
    }

    /// 查询项目下全部规格项（按 sort_order、创建时间）
    pub fn list_by_project(&self, project_id: &str) -> RepositoryResult<Vec<SpecItem>> {
        let conn = self.get_conn()?;

        let sql = format!(
            "SELECT {} FROM spec_item WHERE project_id = ?1 ORDER BY sort_order, created_at, item_id",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![project_id], SpecItemRow::from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut link_stmt = conn.prepare(
            r#"
            SELECT l.item_id, l.link_id, l.requirement_id, l.created_at
            FROM spec_item_link l
            JOIN spec_item s ON s.item_id = l.item_id
            WHERE s.project_id = ?1
            ORDER BY l.created_at, l.rowid
            "#,
        )?;
        let raw_links = link_stmt
            .query_map(params![project_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut links_by_item: HashMap<String, Vec<RequirementLink>> = HashMap::new();
        for (item_id, link_id, requirement_id, created_at) in raw_links {
            links_by_item
                .entry(item_id)
                .or_default()
                .push(to_link(link_id, requirement_id, &created_at)?);
        }

        rows.into_iter()
            .map(|row| {
                let links = links_by_item.remove(&row.item_id).unwrap_or_default();
                row.into_domain(links)
            })
            .collect()
    }
}

// ==========================================
// SpecItemRow - 原始行
// ==========================================
// 先按 TEXT 读出,再在 into_domain 中解析,解析失败报 FieldValueError
struct SpecItemRow {
    item_id: String,
    project_id: String,
    name: String,
    sku: Option<String>,
    model: Option<String>,
    doc_code: Option<String>,
    room_id: Option<String>,
    section_id: Option<String>,
    quantity: String,
    unit_type: Option<String>,
    trade_price: Option<String>,
    trade_price_currency: Option<String>,
    rrp: Option<String>,
    rrp_currency: Option<String>,
    markup_percent: Option<String>,
    trade_discount_percent: Option<String>,
    supplier_id: Option<String>,
    components_json: String,
    status: String,
    client_approved: bool,
    ffe_requirement_id: Option<String>,
    annotations_json: String,
    sort_order: i32,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl SpecItemRow {
    fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            item_id: row.get(0)?,
            project_id: row.get(1)?,
            name: row.get(2)?,
            sku: row.get(3)?,
            model: row.get(4)?,
            doc_code: row.get(5)?,
            room_id: row.get(6)?,
            section_id: row.get(7)?,
            quantity: row.get(8)?,
            unit_type: row.get(9)?,
            trade_price: row.get(10)?,
            trade_price_currency: row.get(11)?,
            rrp: row.get(12)?,
            rrp_currency: row.get(13)?,
            markup_percent: row.get(14)?,
            trade_discount_percent: row.get(15)?,
            supplier_id: row.get(16)?,
            components_json: row.get(17)?,
            status: row.get(18)?,
            client_approved: row.get(19)?,
            ffe_requirement_id: row.get(20)?,
            annotations_json: row.get(21)?,
            sort_order: row.get(22)?,
            version: row.get(23)?,
            created_at: row.get(24)?,
            updated_at: row.get(25)?,
        })
    }

    fn into_domain(self, links: Vec<RequirementLink>) -> RepositoryResult<SpecItem> {
        // 历史别名在此处归一化,数据库原值保持不变
        let status = SpecStatus::normalize(&self.status).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "status".to_string(),
                message: format!("未知状态: {} (item_id={})", self.status, self.item_id),
            }
        })?;
        if status.to_db_str() != self.status {
            tracing::debug!(item_id = %self.item_id, raw = %self.status, normalized = %status, "状态别名归一化");
        }

        let components: Vec<PricedComponent> =
            serde_json::from_str(&self.components_json).map_err(|e| RepositoryError::FieldValueError {
                field: "components_json".to_string(),
                message: e.to_string(),
            })?;
        let annotations: Vec<ItemAnnotation> =
            serde_json::from_str(&self.annotations_json).map_err(|e| RepositoryError::FieldValueError {
                field: "annotations_json".to_string(),
                message: e.to_string(),
            })?;

        Ok(SpecItem {
            quantity: parse_decimal("quantity", &self.quantity)?,
            trade_price: parse_opt_decimal("trade_price", self.trade_price.as_deref())?,
            rrp: parse_opt_decimal("rrp", self.rrp.as_deref())?,
            markup_percent: parse_opt_decimal("markup_percent", self.markup_percent.as_deref())?,
            trade_discount_percent: parse_opt_decimal(
                "trade_discount_percent",
                self.trade_discount_percent.as_deref(),
            )?,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.item_id,
            project_id: self.project_id,
            name: self.name,
            sku: self.sku,
            model: self.model,
            doc_code: self.doc_code,
            room_id: self.room_id,
            section_id: self.section_id,
            unit_type: self.unit_type,
            trade_price_currency: self.trade_price_currency,
            rrp_currency: self.rrp_currency,
            supplier_id: self.supplier_id,
            components,
            status,
            client_approved: self.client_approved,
            ffe_requirement_id: self.ffe_requirement_id,
            links,
            annotations,
            sort_order: self.sort_order,
            version: self.version,
        })
    }
}

fn to_link(link_id: String, requirement_id: String, created_at: &str) -> RepositoryResult<RequirementLink> {
    Ok(RequirementLink {
        link_id,
        requirement_id,
        created_at: parse_timestamp("spec_item_link.created_at", created_at)?,
    })
}

fn parse_decimal(field: &str, raw: &str) -> RepositoryResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("{} ({})", e, raw),
    })
}

fn parse_opt_decimal(field: &str, raw: Option<&str>) -> RepositoryResult<Option<Decimal>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_decimal(field, s).map(Some),
        None => Ok(None),
    }
}

fn parse_timestamp(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, raw),
        })
}
