// ==========================================
// FFE 规格项跟踪系统 - 内存规格项仓
// ==========================================
// 职责: 以 id 为键保存单个项目的规格项,并同步维护关联图索引
// 红线: 所有修改都走 insert/update/remove,保证索引与数据一致
// ==========================================

use crate::domain::requirement::{Requirement, RequirementView};
use crate::domain::spec_item::SpecItem;
use crate::engine::linkage_graph::LinkageGraph;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// OptionGroup - 选项分组
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub requirement_id: String,
    /// 按创建顺序排列,下标 + 1 即选项编号
    pub item_ids: Vec<String>,
}

// ==========================================
// LinkAdvice - 关联提示（仅提示,不强制）
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAdvice {
    /// 关联前该需求已有的规格项数量
    pub existing_options: usize,
    /// 新规格项将成为的选项编号
    pub option_number: usize,
}

impl LinkAdvice {
    /// 是否会形成多选项
    pub fn creates_alternative(&self) -> bool {
        self.existing_options > 0
    }
}

// ==========================================
// SpecItemStore
// ==========================================
#[derive(Debug, Default, Clone)]
pub struct SpecItemStore {
    items: HashMap<String, SpecItem>,
    graph: LinkageGraph,
}

impl SpecItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从规格项列表构建（同时建立索引）
    pub fn from_items(items: Vec<SpecItem>) -> Self {
        let mut store = Self::new();
        for item in items {
            store.insert(item);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, item_id: &str) -> Option<&SpecItem> {
        self.items.get(item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.items.contains_key(item_id)
    }

    pub fn items(&self) -> impl Iterator<Item = &SpecItem> {
        self.items.values()
    }

    pub fn graph(&self) -> &LinkageGraph {
        &self.graph
    }

    /// 插入或整体替换规格项
    pub fn insert(&mut self, item: SpecItem) -> Option<SpecItem> {
        let previous = self.items.remove(&item.id);
        if let Some(old) = &previous {
            self.graph.unindex_item(old);
        }
        self.graph.index_item(&item);
        self.items.insert(item.id.clone(), item);
        previous
    }

    /// 原地修改规格项（修改前后自动重建该项索引）
    pub fn update<F>(&mut self, item_id: &str, mutate: F) -> Option<&SpecItem>
    where
        F: FnOnce(&mut SpecItem),
    {
        let mut item = self.items.remove(item_id)?;
        self.graph.unindex_item(&item);
        mutate(&mut item);
        self.graph.index_item(&item);
        self.items.insert(item_id.to_string(), item);
        self.items.get(item_id)
    }

    pub fn remove(&mut self, item_id: &str) -> Option<SpecItem> {
        let item = self.items.remove(item_id)?;
        self.graph.unindex_item(&item);
        Some(item)
    }

    /// 展示顺序: sort_order → 创建时间 → id
    pub fn display_order(&self) -> Vec<&SpecItem> {
        let mut items: Vec<&SpecItem> = self.items.values().collect();
        items.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        items
    }

    /// 按创建顺序排序的ID列表（与展示顺序无关）
    fn creation_ordered(&self, ids: Vec<String>) -> Vec<String> {
        let mut members: Vec<&SpecItem> = ids.iter().filter_map(|id| self.items.get(id)).collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        members.into_iter().map(|item| item.id.clone()).collect()
    }

    /// 全部选项分组（成员数 > 1 的主需求分区）
    pub fn option_groups(&self) -> Vec<OptionGroup> {
        self.graph
            .primary_requirements()
            .into_iter()
            .filter_map(|requirement_id| {
                let members = self.graph.primary_members(&requirement_id);
                if members.len() < 2 {
                    return None;
                }
                Some(OptionGroup {
                    item_ids: self.creation_ordered(members),
                    requirement_id,
                })
            })
            .collect()
    }

    /// 规格项的选项编号（1 起）；不在选项分组内时返回 None
    pub fn option_number(&self, item_id: &str) -> Option<usize> {
        let item = self.items.get(item_id)?;
        let primary = LinkageGraph::linked_requirement(item)?;
        let members = self.graph.primary_members(primary);
        if members.len() < 2 {
            return None;
        }
        self.creation_ordered(members)
            .iter()
            .position(|id| id == item_id)
            .map(|idx| idx + 1)
    }

    /// 关联前的提示: 该需求已有 N 个规格项 → 新项为选项 N+1
    pub fn link_advice(&self, requirement_id: &str, item_id: &str) -> LinkAdvice {
        let existing_options = self
            .graph
            .items_for_requirement(requirement_id)
            .iter()
            .filter(|id| id.as_str() != item_id)
            .count();
        LinkAdvice {
            existing_options,
            option_number: existing_options + 1,
        }
    }

    /// 需求视图（关联统计实时计算）
    pub fn requirement_view(&self, requirement: Requirement) -> RequirementView {
        let linked_item_ids = self.graph.items_for_requirement(&requirement.requirement_id);
        RequirementView {
            has_linked_specs: !linked_item_ids.is_empty(),
            linked_specs_count: linked_item_ids.len(),
            linked_item_ids,
            requirement,
        }
    }

    /// 父项下的子项（按展示顺序）
    pub fn children_of(&self, parent_id: &str) -> Vec<&SpecItem> {
        let ids = self.graph.children_of(parent_id);
        self.display_order()
            .into_iter()
            .filter(|item| ids.contains(&item.id))
            .collect()
    }

    /// 查找与给定文档编码冲突的未归档规格项（忽略大小写,排除自身）
    pub fn find_doc_code_conflict(&self, doc_code: &str, exclude_item_id: &str) -> Option<&SpecItem> {
        let wanted = doc_code.trim().to_lowercase();
        if wanted.is_empty() {
            return None;
        }
        self.items.values().find(|item| {
            item.id != exclude_item_id
                && !item.is_archived()
                && item
                    .doc_code
                    .as_deref()
                    .map(|code| code.trim().to_lowercase() == wanted)
                    .unwrap_or(false)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spec_item::RequirementLink;
    use chrono::{Duration, Utc};

    fn linked_item(name: &str, requirement_id: &str, created_offset_secs: i64) -> SpecItem {
        let mut item = SpecItem::new("P1", name);
        item.created_at = Utc::now() + Duration::seconds(created_offset_secs);
        item.links.push(RequirementLink {
            link_id: uuid::Uuid::new_v4().to_string(),
            requirement_id: requirement_id.to_string(),
            created_at: item.created_at,
        });
        item
    }

    #[test]
    fn test_option_numbers_follow_creation_not_display_order() {
        let a = linked_item("A", "R1", 0);
        let b = linked_item("B", "R1", 10);
        let (a_id, b_id) = (a.id.clone(), b.id.clone());
        let mut store = SpecItemStore::from_items(vec![b, a]);

        assert_eq!(store.option_number(&a_id), Some(1));
        assert_eq!(store.option_number(&b_id), Some(2));

        // 调整展示顺序: B 在前
        store.update(&b_id, |item| item.sort_order = 0);
        store.update(&a_id, |item| item.sort_order = 5);
        assert_eq!(store.display_order()[0].id, b_id);
        assert_eq!(store.option_number(&a_id), Some(1));
        assert_eq!(store.option_number(&b_id), Some(2));
    }

    #[test]
    fn test_single_member_is_not_an_option_group() {
        let a = linked_item("A", "R1", 0);
        let a_id = a.id.clone();
        let store = SpecItemStore::from_items(vec![a]);
        assert!(store.option_groups().is_empty());
        assert_eq!(store.option_number(&a_id), None);
    }

    #[test]
    fn test_option_groups_partition_by_primary_requirement() {
        let a = linked_item("A", "R1", 0);
        let b = linked_item("B", "R1", 1);
        let c = linked_item("C", "R2", 2);
        let store = SpecItemStore::from_items(vec![a.clone(), b.clone(), c]);
        let groups = store.option_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].requirement_id, "R1");
        assert_eq!(groups[0].item_ids, vec![a.id, b.id]);
    }

    #[test]
    fn test_link_advice_counts_existing_items() {
        let a = linked_item("A", "R1", 0);
        let b = linked_item("B", "R1", 1);
        let store = SpecItemStore::from_items(vec![a, b]);
        let advice = store.link_advice("R1", "NEW");
        assert_eq!(advice.existing_options, 2);
        assert_eq!(advice.option_number, 3);
        assert!(advice.creates_alternative());
        assert!(!store.link_advice("R9", "NEW").creates_alternative());
    }

    #[test]
    fn test_requirement_view_tracks_removal() {
        let a = linked_item("A", "R1", 0);
        let a_id = a.id.clone();
        let mut store = SpecItemStore::from_items(vec![a]);
        let requirement = Requirement {
            requirement_id: "R1".to_string(),
            project_id: "P1".to_string(),
            room_id: None,
            section_id: None,
            name: "Living Room Sofa".to_string(),
            child_items: vec![],
        };
        let view = store.requirement_view(requirement.clone());
        assert!(view.has_linked_specs);
        assert_eq!(view.linked_specs_count, 1);

        store.remove(&a_id);
        let view = store.requirement_view(requirement);
        assert!(!view.has_linked_specs);
        assert_eq!(view.linked_specs_count, 0);
    }

    #[test]
    fn test_doc_code_conflict_ignores_case_self_and_archived() {
        let mut a = SpecItem::new("P1", "A");
        a.doc_code = Some("LR-01".to_string());
        let mut archived = SpecItem::new("P1", "Old");
        archived.doc_code = Some("LR-02".to_string());
        archived.status = crate::domain::types::SpecStatus::Archived;
        let a_id = a.id.clone();
        let store = SpecItemStore::from_items(vec![a, archived]);

        assert_eq!(store.find_doc_code_conflict("lr-01", "OTHER").map(|i| i.id.clone()), Some(a_id.clone()));
        assert!(store.find_doc_code_conflict("LR-01", &a_id).is_none());
        assert!(store.find_doc_code_conflict("LR-02", "OTHER").is_none());
        assert!(store.find_doc_code_conflict("  ", "OTHER").is_none());
    }
}
