// ==========================================
// FFE 规格项跟踪系统 - 规格项局部更新
// ==========================================
// 职责: 描述一次局部更新涉及的字段集合
// 说明: 外层 Option 表示"是否修改",内层 Option 表示"新值是否为空"
// 红线: 同一个 patch 中的字段必须在同一次持久化调用中提交
// ==========================================

use crate::domain::spec_item::{ItemAnnotation, PricedComponent, SpecItem};
use crate::domain::types::SpecStatus;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecItemPatch {
    pub name: Option<String>,
    pub sku: Option<Option<String>>,
    pub model: Option<Option<String>>,
    pub doc_code: Option<Option<String>>,
    pub room_id: Option<Option<String>>,
    pub section_id: Option<Option<String>>,
    pub quantity: Option<Decimal>,
    pub unit_type: Option<Option<String>>,
    pub trade_price: Option<Option<Decimal>>,
    pub trade_price_currency: Option<Option<String>>,
    pub rrp: Option<Option<Decimal>>,
    pub rrp_currency: Option<Option<String>>,
    pub markup_percent: Option<Option<Decimal>>,
    pub trade_discount_percent: Option<Option<Decimal>>,
    pub supplier_id: Option<Option<String>>,
    pub components: Option<Vec<PricedComponent>>,
    pub status: Option<SpecStatus>,
    pub client_approved: Option<bool>,
    pub annotations: Option<Vec<ItemAnnotation>>,
    pub sort_order: Option<i32>,
}

impl SpecItemPatch {
    /// 是否没有任何字段变更
    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }

    /// 本次变更涉及的字段名（数据库列名）
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.sku.is_some() {
            fields.push("sku");
        }
        if self.model.is_some() {
            fields.push("model");
        }
        if self.doc_code.is_some() {
            fields.push("doc_code");
        }
        if self.room_id.is_some() {
            fields.push("room_id");
        }
        if self.section_id.is_some() {
            fields.push("section_id");
        }
        if self.quantity.is_some() {
            fields.push("quantity");
        }
        if self.unit_type.is_some() {
            fields.push("unit_type");
        }
        if self.trade_price.is_some() {
            fields.push("trade_price");
        }
        if self.trade_price_currency.is_some() {
            fields.push("trade_price_currency");
        }
        if self.rrp.is_some() {
            fields.push("rrp");
        }
        if self.rrp_currency.is_some() {
            fields.push("rrp_currency");
        }
        if self.markup_percent.is_some() {
            fields.push("markup_percent");
        }
        if self.trade_discount_percent.is_some() {
            fields.push("trade_discount_percent");
        }
        if self.supplier_id.is_some() {
            fields.push("supplier_id");
        }
        if self.components.is_some() {
            fields.push("components_json");
        }
        if self.status.is_some() {
            fields.push("status");
        }
        if self.client_approved.is_some() {
            fields.push("client_approved");
        }
        if self.annotations.is_some() {
            fields.push("annotations_json");
        }
        if self.sort_order.is_some() {
            fields.push("sort_order");
        }
        fields
    }

    /// 将变更应用到内存中的规格项
    pub fn apply_to(&self, item: &mut SpecItem) {
        if let Some(v) = &self.name {
            item.name = v.clone();
        }
        if let Some(v) = &self.sku {
            item.sku = v.clone();
        }
        if let Some(v) = &self.model {
            item.model = v.clone();
        }
        if let Some(v) = &self.doc_code {
            item.doc_code = v.clone();
        }
        if let Some(v) = &self.room_id {
            item.room_id = v.clone();
        }
        if let Some(v) = &self.section_id {
            item.section_id = v.clone();
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = &self.unit_type {
            item.unit_type = v.clone();
        }
        if let Some(v) = self.trade_price {
            item.trade_price = v;
        }
        if let Some(v) = &self.trade_price_currency {
            item.trade_price_currency = v.clone();
        }
        if let Some(v) = self.rrp {
            item.rrp = v;
        }
        if let Some(v) = &self.rrp_currency {
            item.rrp_currency = v.clone();
        }
        if let Some(v) = self.markup_percent {
            item.markup_percent = v;
        }
        if let Some(v) = self.trade_discount_percent {
            item.trade_discount_percent = v;
        }
        if let Some(v) = &self.supplier_id {
            item.supplier_id = v.clone();
        }
        if let Some(v) = &self.components {
            item.components = v.clone();
        }
        if let Some(v) = self.status {
            item.status = v;
        }
        if let Some(v) = self.client_approved {
            item.client_approved = v;
        }
        if let Some(v) = &self.annotations {
            item.annotations = v.clone();
        }
        if let Some(v) = self.sort_order {
            item.sort_order = v;
        }
        item.updated_at = Utc::now();
    }
}
