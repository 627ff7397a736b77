// ==========================================
// FFE 规格项跟踪系统 - 需求关联图
// ==========================================
// 职责: 维护 需求 → 规格项、主需求 → 规格项、父项 → 子项 三个二级索引
// 红线: 索引随每次插入/替换/删除增量维护,读取时不全表扫描
// 红线: linked_specs_count 只从索引计算,不单独存储
// ==========================================

use crate::domain::spec_item::SpecItem;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default, Clone)]
pub struct LinkageGraph {
    /// requirement_id → 关联到该需求的规格项（含全部关联记录与旧版字段）
    by_requirement: HashMap<String, BTreeSet<String>>,
    /// requirement_id → 以该需求为主需求的规格项（选项分组依据）
    by_primary: HashMap<String, BTreeSet<String>>,
    /// parent_id → 子项
    by_parent: HashMap<String, BTreeSet<String>>,
}

impl LinkageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 规格项的主需求
    ///
    /// # 规则
    /// - 优先取多对多关联中的第一条（创建顺序）
    /// - 否则回退到旧版单一关联字段
    pub fn linked_requirement(item: &SpecItem) -> Option<&str> {
        item.links
            .first()
            .map(|link| link.requirement_id.as_str())
            .or(item.ffe_requirement_id.as_deref())
    }

    /// 将规格项写入索引
    pub fn index_item(&mut self, item: &SpecItem) {
        for requirement_id in item.requirement_ids() {
            self.by_requirement
                .entry(requirement_id)
                .or_default()
                .insert(item.id.clone());
        }
        if let Some(primary) = Self::linked_requirement(item) {
            self.by_primary
                .entry(primary.to_string())
                .or_default()
                .insert(item.id.clone());
        }
        if let Some(parent_id) = item.parent_id() {
            self.by_parent
                .entry(parent_id.to_string())
                .or_default()
                .insert(item.id.clone());
        }
    }

    /// 将规格项从索引移除（必须传入索引时的同一版本）
    pub fn unindex_item(&mut self, item: &SpecItem) {
        for requirement_id in item.requirement_ids() {
            remove_from(&mut self.by_requirement, &requirement_id, &item.id);
        }
        if let Some(primary) = Self::linked_requirement(item) {
            remove_from(&mut self.by_primary, primary, &item.id);
        }
        if let Some(parent_id) = item.parent_id() {
            remove_from(&mut self.by_parent, parent_id, &item.id);
        }
    }

    /// 关联到某需求的规格项ID
    pub fn items_for_requirement(&self, requirement_id: &str) -> Vec<String> {
        self.by_requirement
            .get(requirement_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 以某需求为主需求的规格项ID
    pub fn primary_members(&self, requirement_id: &str) -> Vec<String> {
        self.by_primary
            .get(requirement_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 所有存在主需求成员的需求ID（有序）
    pub fn primary_requirements(&self) -> BTreeSet<String> {
        self.by_primary.keys().cloned().collect()
    }

    pub fn linked_specs_count(&self, requirement_id: &str) -> usize {
        self.by_requirement
            .get(requirement_id)
            .map(BTreeSet::len)
            .unwrap_or(0)
    }

    pub fn has_linked_specs(&self, requirement_id: &str) -> bool {
        self.linked_specs_count(requirement_id) > 0
    }

    /// 某父项下的子项ID
    pub fn children_of(&self, parent_id: &str) -> Vec<String> {
        self.by_parent
            .get(parent_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }
}

fn remove_from(index: &mut HashMap<String, BTreeSet<String>>, key: &str, item_id: &str) {
    if let Some(ids) = index.get_mut(key) {
        ids.remove(item_id);
        if ids.is_empty() {
            index.remove(key);
        }
    }
}
