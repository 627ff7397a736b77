// ==========================================
// FFE 规格项跟踪系统 - 外部目录模型
// ==========================================
// 职责: FFE 需求目录、供应商目录的只读模型
// 说明: 两者由外部系统维护,本系统只读取
// ==========================================

use serde::{Deserialize, Serialize};

// ==========================================
// Requirement - FFE 需求
// ==========================================
// 对齐: ffe_requirement 表 + ffe_requirement_child 表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub requirement_id: String,
    pub project_id: String,
    pub room_id: Option<String>,
    pub section_id: Option<String>,
    pub name: String,             // 如 "客厅沙发"
    pub child_items: Vec<String>, // 拆分出的子项名称
}

// ==========================================
// RequirementView - 带关联统计的需求视图
// ==========================================
// 红线: has_linked_specs / linked_specs_count 每次从关联索引重新计算,不落库
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementView {
    pub requirement: Requirement,
    pub has_linked_specs: bool,
    pub linked_specs_count: usize,
    pub linked_item_ids: Vec<String>,
}

// ==========================================
// Supplier - 供应商
// ==========================================
// 用途: 关联供应商时,其币种覆盖规格项自身存储的币种
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: String,
    pub name: String,
    pub currency: String,
}
