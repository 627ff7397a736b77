// ==========================================
// FFE 规格项跟踪系统 - 规格项领域模型
// ==========================================
// 职责: 规格项实体、需求关联记录、注解联合体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

use crate::domain::types::SpecStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// SpecItem - 规格项
// ==========================================
// 用途: 为某项 FFE 需求选定的具体产品
// 对齐: spec_item 表 + spec_item_link 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecItem {
    // ===== 标识 =====
    pub id: String,                // 规格项ID（UUID）
    pub project_id: String,        // 所属项目
    pub name: String,              // 产品名称
    pub sku: Option<String>,       // SKU
    pub model: Option<String>,     // 型号
    pub doc_code: Option<String>,  // 文档编码（项目内唯一,忽略大小写）

    // ===== 位置 =====
    pub room_id: Option<String>,    // 房间（外部引用）
    pub section_id: Option<String>, // 分区（外部引用）

    // ===== 商务 =====
    pub quantity: Decimal,                      // 数量
    pub unit_type: Option<String>,              // 单位
    pub trade_price: Option<Decimal>,           // 采购价
    pub trade_price_currency: Option<String>,   // 采购价币种（存储值）
    pub rrp: Option<Decimal>,                   // 建议零售价
    pub rrp_currency: Option<String>,           // 零售价币种（存储值）
    pub markup_percent: Option<Decimal>,        // 加价率 %
    pub trade_discount_percent: Option<Decimal>, // 采购折扣 %
    pub supplier_id: Option<String>,            // 供应商（可选）
    pub components: Vec<PricedComponent>,       // 计价子部件

    // ===== 流程 =====
    pub status: SpecStatus,   // 规范状态
    pub client_approved: bool, // 客户是否批准

    // ===== 需求关联 =====
    pub ffe_requirement_id: Option<String>, // 旧版单一关联
    pub links: Vec<RequirementLink>,        // 多对多关联（按创建顺序）

    // ===== 注解 =====
    pub annotations: Vec<ItemAnnotation>,

    // ===== 排序与审计 =====
    pub sort_order: i32,           // 展示顺序（拖拽排序持久化结果）
    pub version: i64,              // 乐观并发版本号
    pub created_at: DateTime<Utc>, // 创建时间（选项编号依据）
    pub updated_at: DateTime<Utc>, // 更新时间
}

impl SpecItem {
    /// 创建一个处于 SELECTED 状态、尚未关联需求的新规格项
    pub fn new(project_id: &str, name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            name: name.to_string(),
            sku: None,
            model: None,
            doc_code: None,
            room_id: None,
            section_id: None,
            quantity: Decimal::ONE,
            unit_type: None,
            trade_price: None,
            trade_price_currency: None,
            rrp: None,
            rrp_currency: None,
            markup_percent: None,
            trade_discount_percent: None,
            supplier_id: None,
            components: Vec::new(),
            status: SpecStatus::Selected,
            client_approved: false,
            ffe_requirement_id: None,
            links: Vec::new(),
            annotations: Vec::new(),
            sort_order: 0,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否已归档
    pub fn is_archived(&self) -> bool {
        self.status == SpecStatus::Archived
    }

    /// 是否没有任何需求关联（旧版字段 + 多对多）
    pub fn has_no_links(&self) -> bool {
        self.ffe_requirement_id.is_none() && self.links.is_empty()
    }

    /// 所有关联的需求ID（去重,保持顺序）
    pub fn requirement_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for link in &self.links {
            if !ids.contains(&link.requirement_id) {
                ids.push(link.requirement_id.clone());
            }
        }
        if let Some(legacy) = &self.ffe_requirement_id {
            if !ids.contains(legacy) {
                ids.push(legacy.clone());
            }
        }
        ids
    }

    /// 当前标记（若有）
    pub fn flag(&self) -> Option<(&str, Option<&str>)> {
        self.annotations.iter().find_map(|a| match a {
            ItemAnnotation::Flagged { color, note } => Some((color.as_str(), note.as_deref())),
            _ => None,
        })
    }

    /// 当前分组注解（父项或子项）
    pub fn grouping(&self) -> Option<&ItemAnnotation> {
        self.annotations.iter().find(|a| a.is_grouping())
    }

    /// 作为子项时的父项ID
    pub fn parent_id(&self) -> Option<&str> {
        self.annotations.iter().find_map(|a| match a {
            ItemAnnotation::GroupChild { parent_id, .. } => Some(parent_id.as_str()),
            _ => None,
        })
    }

    /// 设置或清除标记（最多一个）
    pub fn set_flag(&mut self, flag: Option<(String, Option<String>)>) {
        self.annotations
            .retain(|a| !matches!(a, ItemAnnotation::Flagged { .. }));
        if let Some((color, note)) = flag {
            self.annotations.push(ItemAnnotation::Flagged { color, note });
        }
    }

    /// 设置分组注解（替换已有分组注解,最多一个）
    pub fn set_grouping(&mut self, grouping: ItemAnnotation) {
        debug_assert!(grouping.is_grouping());
        self.clear_grouping();
        self.annotations.push(grouping);
    }

    /// 清除分组注解,返回是否有变化
    pub fn clear_grouping(&mut self) -> bool {
        let before = self.annotations.len();
        self.annotations.retain(|a| !a.is_grouping());
        before != self.annotations.len()
    }
}

// ==========================================
// RequirementLink - 规格项 ↔ 需求 关联记录
// ==========================================
// 对齐: spec_item_link 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementLink {
    pub link_id: String,           // 关联记录ID
    pub requirement_id: String,    // FFE 需求ID
    pub created_at: DateTime<Utc>, // 关联时间
}

// ==========================================
// PricedComponent - 计价子部件
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedComponent {
    pub name: String,
    pub price: Decimal,
    pub quantity: Decimal,
}

// ==========================================
// ItemAnnotation - 注解联合体
// ==========================================
// 存储: spec_item.annotations_json（带 kind 标签的 JSON 数组）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemAnnotation {
    /// 人工标记
    Flagged { color: String, note: Option<String> },
    /// 分组父项（展示子项名称）
    GroupParent { child_names: Vec<String> },
    /// 分组子项（指向代表父行的规格项）
    GroupChild { parent_id: String, parent_name: String },
}

impl ItemAnnotation {
    /// 是否为分组类注解
    pub fn is_grouping(&self) -> bool {
        matches!(
            self,
            ItemAnnotation::GroupParent { .. } | ItemAnnotation::GroupChild { .. }
        )
    }
}
