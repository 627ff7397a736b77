// ==========================================
// FFE 规格项跟踪系统 - 规格项 API
// ==========================================
// 职责: 单个项目的编辑会话（状态流程、价格、需求关联、分组、汇总）
// 红线: 规则校验在内存中完成,失败时规格项保持不变且不发起持久化
// 红线: 同一命令派生出的字段必须在同一次持久化调用中提交
// 红线: 持久化失败只标记"未确认",不做盲目回滚,由 refetch_item / reload 恢复
// ==========================================

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::InputValidator;
use crate::config::WorkflowSettings;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::patch::SpecItemPatch;
use crate::domain::requirement::{RequirementView, Supplier};
use crate::domain::spec_item::{ItemAnnotation, PricedComponent, RequirementLink, SpecItem};
use crate::domain::types::{PriceSide, SpecStatus};
use crate::engine::aggregation::{AggregationEngine, FinancialSummary, ItemFilter};
use crate::engine::error::WorkflowError;
use crate::engine::item_store::{LinkAdvice, OptionGroup, SpecItemStore};
use crate::engine::pricing::{PriceEdit, PricingEngine};
use crate::engine::status_workflow::{StatusTransition, StatusWorkflow};
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::error::RepositoryError;
use crate::repository::persistence::{
    GroupingWrite, RequirementCatalog, SpecItemPersistence, SupplierDirectory,
};

// ==========================================
// SpecItemBackends - 会话依赖的外部接口
// ==========================================
#[derive(Clone)]
pub struct SpecItemBackends {
    pub persistence: Arc<dyn SpecItemPersistence>,
    pub requirements: Arc<dyn RequirementCatalog>,
    pub suppliers: Arc<dyn SupplierDirectory>,
    /// 为 None 时不记录操作日志
    pub action_log: Option<Arc<ActionLogRepository>>,
}

// ==========================================
// NewSpecItem - 新建规格项参数
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSpecItem {
    pub name: String,
    pub sku: Option<String>,
    pub model: Option<String>,
    pub doc_code: Option<String>,
    pub room_id: Option<String>,
    pub section_id: Option<String>,
    /// 为 None 时数量为 1
    pub quantity: Option<Decimal>,
    pub unit_type: Option<String>,
    pub supplier_id: Option<String>,
    /// 创建时关联的需求（零个或一个）
    pub requirement_id: Option<String>,
}

// ==========================================
// ItemDetails - 基础信息编辑
// ==========================================
// 说明: 外层 Option 表示"是否修改"；状态、批准、价格、文档编码、注解走专用命令
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemDetails {
    pub name: Option<String>,
    pub sku: Option<Option<String>>,
    pub model: Option<Option<String>>,
    pub room_id: Option<Option<String>>,
    pub section_id: Option<Option<String>>,
    pub quantity: Option<Decimal>,
    pub unit_type: Option<Option<String>>,
    pub supplier_id: Option<Option<String>>,
    pub components: Option<Vec<PricedComponent>>,
}

impl ItemDetails {
    fn into_patch(self) -> ApiResult<SpecItemPatch> {
        let name = match self.name {
            Some(raw) => Some(InputValidator::normalize_name(&raw)?),
            None => None,
        };
        if let Some(quantity) = self.quantity {
            InputValidator::ensure_quantity(quantity)?;
        }
        if let Some(components) = &self.components {
            InputValidator::ensure_components(components)?;
        }
        Ok(SpecItemPatch {
            name,
            sku: self.sku,
            model: self.model,
            room_id: self.room_id,
            section_id: self.section_id,
            quantity: self.quantity,
            unit_type: self.unit_type,
            supplier_id: self.supplier_id,
            components: self.components,
            ..Default::default()
        })
    }
}

// ==========================================
// LinkOutcome - 关联结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub item: SpecItem,
    /// 关联前的选项提示（仅提示,不强制）
    pub advice: LinkAdvice,
    /// 是否从归档状态恢复为 SELECTED
    pub restored_from_archive: bool,
    /// 已经关联过,本次未写入
    pub already_linked: bool,
}

// ==========================================
// SpecItemApi - 规格项编辑会话
// ==========================================
/// 规格项API
///
/// 职责：
/// 1. 持有单个项目的内存规格项仓（含关联图索引）
/// 2. 每个命令: 校验 → 内存生效 → 持久化 → 确认版本号 / 标记未确认
/// 3. ActionLog 记录（失败只告警）
///
/// 单编辑者模型: 所有命令取 `&mut self`,一次只执行一个
pub struct SpecItemApi {
    project_id: String,
    actor: String,
    backends: SpecItemBackends,
    workflow: StatusWorkflow,
    settings: WorkflowSettings,
    store: SpecItemStore,
    suppliers: HashMap<String, Supplier>,
    unconfirmed: BTreeSet<String>,
}

impl SpecItemApi {
    /// 打开项目编辑会话（读取规格项与供应商目录）
    ///
    /// # 错误
    /// - ApiError::Config: 配置的回退状态不合法
    /// - ApiError::Persistence: 读取失败
    pub async fn open(
        project_id: &str,
        actor: &str,
        backends: SpecItemBackends,
        settings: WorkflowSettings,
    ) -> ApiResult<Self> {
        let workflow = StatusWorkflow::new(settings.approval_fallback_status)?;

        let mut api = Self {
            project_id: project_id.to_string(),
            actor: actor.to_string(),
            backends,
            workflow,
            settings,
            store: SpecItemStore::new(),
            suppliers: HashMap::new(),
            unconfirmed: BTreeSet::new(),
        };
        api.reload().await?;

        info!(
            project_id = %api.project_id,
            items = api.store.len(),
            suppliers = api.suppliers.len(),
            "规格项会话已打开"
        );
        Ok(api)
    }

    // ==========================================
    // 只读访问
    // ==========================================

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn store(&self) -> &SpecItemStore {
        &self.store
    }

    pub fn item(&self, item_id: &str) -> Option<&SpecItem> {
        self.store.get(item_id)
    }

    /// 按展示顺序列出规格项
    pub fn items(&self) -> Vec<&SpecItem> {
        self.store.display_order()
    }

    /// 持久化失败、内存状态尚未确认的规格项
    pub fn is_unconfirmed(&self, item_id: &str) -> bool {
        self.unconfirmed.contains(item_id)
    }

    pub fn unconfirmed_items(&self) -> Vec<String> {
        self.unconfirmed.iter().cloned().collect()
    }

    pub fn supplier(&self, supplier_id: &str) -> Option<&Supplier> {
        self.suppliers.get(supplier_id)
    }

    // ==========================================
    // 状态流程
    // ==========================================

    /// 修改状态
    ///
    /// # 规则
    /// - 目标需要客户批准且未批准 → ApprovalRequired,规格项不变
    /// - 目标为 ARCHIVED → 走归档流程
    pub async fn set_status(&mut self, item_id: &str, new_status: SpecStatus) -> ApiResult<SpecItem> {
        let item = self.require_item(item_id)?;
        let old_status = item.status;

        let transition = match self.workflow.plan_status(item, new_status) {
            Ok(transition) => transition,
            Err(e) => {
                info!(item_id = %item_id, from = %old_status, to = %new_status, "状态切换被拒绝: {}", e);
                return Err(e.into());
            }
        };

        match transition {
            StatusTransition::NoChange => {
                debug!(item_id = %item_id, status = %new_status, "状态未变化");
                Ok(item.clone())
            }
            StatusTransition::Archive => self.archive(item_id).await,
            StatusTransition::Update(patch) => {
                self.commit_patch(
                    item_id,
                    patch,
                    ActionType::SetStatus,
                    json!({"from": old_status, "to": new_status}),
                )
                .await
            }
        }
    }

    /// 修改客户批准
    ///
    /// 撤销批准且当前状态需要批准时,状态回退与批准字段在同一次提交中写入
    pub async fn set_approval(&mut self, item_id: &str, approved: bool) -> ApiResult<SpecItem> {
        let item = self.require_item(item_id)?;
        let patch = self.workflow.plan_approval(item, approved);

        if patch.status.is_none() && item.client_approved == approved {
            debug!(item_id = %item_id, approved, "批准状态未变化");
            return Ok(item.clone());
        }

        let payload = json!({
            "approved": approved,
            "from_status": item.status,
            "reverted_to": patch.status,
        });
        if let Some(fallback) = patch.status {
            info!(item_id = %item_id, from = %item.status, to = %fallback, "撤销批准,状态自动回退");
        }

        self.commit_patch(item_id, patch, ActionType::SetApproval, payload)
            .await
    }

    /// 归档: status=ARCHIVED 并清空全部需求关联
    ///
    /// 重复归档不产生写入（未确认的规格项除外,会重新提交）
    pub async fn archive(&mut self, item_id: &str) -> ApiResult<SpecItem> {
        let item = self.require_item(item_id)?;
        let expected_version = item.version;
        let cleared_links = item.requirement_ids();

        let mut archived = item.clone();
        let changed = StatusWorkflow::apply_archive(&mut archived);
        if !changed && !self.unconfirmed.contains(item_id) {
            debug!(item_id = %item_id, "已归档,无需重复提交");
            return Ok(archived);
        }

        self.store.insert(archived);

        let result = self
            .backends
            .persistence
            .archive_item(item_id, expected_version)
            .await;
        self.confirm(item_id, result)?;

        info!(item_id = %item_id, cleared = cleared_links.len(), "规格项已归档");
        self.record(
            Some(item_id),
            ActionType::Archive,
            json!({"cleared_requirement_ids": cleared_links}),
        );
        self.snapshot(item_id)
    }

    // ==========================================
    // 价格
    // ==========================================

    /// 修改价格字段（主字段与派生字段一次提交）
    pub async fn set_price(&mut self, item_id: &str, edit: PriceEdit) -> ApiResult<SpecItem> {
        let item = self.require_item(item_id)?;
        let patch = PricingEngine::plan_edit(item, &edit)?;

        let payload = json!({
            "field": edit.field_name(),
            "edit": edit,
            "derived": patch.changed_fields(),
        });
        self.commit_patch(item_id, patch, ActionType::SetPrice, payload)
            .await
    }

    /// 规格项的有效币种（采购侧, 零售侧）
    pub fn effective_currencies(&self, item_id: &str) -> Option<(String, String)> {
        let item = self.store.get(item_id)?;
        let supplier_currency = item
            .supplier_id
            .as_ref()
            .and_then(|id| self.suppliers.get(id))
            .map(|s| s.currency.as_str());
        let default = self.settings.default_currency.as_str();
        Some((
            PricingEngine::effective_currency(item, PriceSide::Trade, supplier_currency, default),
            PricingEngine::effective_currency(item, PriceSide::Rrp, supplier_currency, default),
        ))
    }

    // ==========================================
    // 基础信息
    // ==========================================

    /// 新建规格项
    pub async fn create_item(&mut self, draft: NewSpecItem) -> ApiResult<SpecItem> {
        let name = InputValidator::normalize_name(&draft.name)?;
        let doc_code = InputValidator::normalize_doc_code(draft.doc_code.as_deref())?;

        let mut item = SpecItem::new(&self.project_id, &name);
        if let Some(code) = &doc_code {
            InputValidator::ensure_doc_code_unique(&self.store, &item.id, code)?;
        }
        if let Some(quantity) = draft.quantity {
            InputValidator::ensure_quantity(quantity)?;
            item.quantity = quantity;
        }
        if let Some(supplier_id) = &draft.supplier_id {
            self.ensure_supplier_known(supplier_id).await?;
        }
        if let Some(requirement_id) = &draft.requirement_id {
            self.ensure_requirement_in_project(requirement_id).await?;
        }

        item.sku = draft.sku;
        item.model = draft.model;
        item.doc_code = doc_code;
        item.room_id = draft.room_id;
        item.section_id = draft.section_id;
        item.unit_type = draft.unit_type;
        item.supplier_id = draft.supplier_id;
        item.sort_order = self
            .store
            .items()
            .map(|i| i.sort_order)
            .max()
            .map_or(0, |max| max + 1);

        let advice = draft.requirement_id.as_deref().map(|requirement_id| {
            item.links.push(RequirementLink {
                link_id: uuid::Uuid::new_v4().to_string(),
                requirement_id: requirement_id.to_string(),
                created_at: item.created_at,
            });
            self.store.link_advice(requirement_id, &item.id)
        });

        let item_id = item.id.clone();
        self.store.insert(item.clone());

        let result = self.backends.persistence.create_item(&item).await;
        self.confirm(&item_id, result.map(|_| item.version))?;

        info!(item_id = %item_id, name = %item.name, "规格项已创建");
        self.record(
            Some(&item_id),
            ActionType::CreateItem,
            json!({
                "name": item.name,
                "requirement_id": draft.requirement_id,
                "option_number": advice.map(|a| a.option_number),
            }),
        );
        self.snapshot(&item_id)
    }

    /// 删除规格项
    pub async fn delete_item(&mut self, item_id: &str) -> ApiResult<()> {
        let removed = self
            .store
            .remove(item_id)
            .ok_or_else(|| item_not_found(item_id))?;

        if let Err(e) = self.backends.persistence.delete_item(item_id).await {
            warn!(item_id = %item_id, error = %e, "删除规格项持久化失败,标记为未确认");
            self.unconfirmed.insert(item_id.to_string());
            return Err(e.into());
        }
        self.unconfirmed.remove(item_id);

        info!(item_id = %item_id, "规格项已删除");
        self.record(
            Some(item_id),
            ActionType::DeleteItem,
            json!({"name": removed.name}),
        );
        Ok(())
    }

    /// 修改文档编码（项目内唯一,忽略大小写）
    pub async fn set_doc_code(&mut self, item_id: &str, doc_code: Option<&str>) -> ApiResult<SpecItem> {
        let item = self.require_item(item_id)?;
        let normalized = InputValidator::normalize_doc_code(doc_code)?;
        if normalized == item.doc_code {
            return Ok(item.clone());
        }
        if let Some(code) = &normalized {
            InputValidator::ensure_doc_code_unique(&self.store, item_id, code)?;
        }

        let payload = json!({"from": item.doc_code, "to": normalized});
        let patch = SpecItemPatch {
            doc_code: Some(normalized),
            ..Default::default()
        };
        self.commit_patch(item_id, patch, ActionType::SetDocCode, payload)
            .await
    }

    /// 修改基础信息
    pub async fn update_details(&mut self, item_id: &str, details: ItemDetails) -> ApiResult<SpecItem> {
        self.require_item(item_id)?;
        if let Some(Some(supplier_id)) = &details.supplier_id {
            self.ensure_supplier_known(supplier_id).await?;
        }

        let patch = details.into_patch()?;
        if patch.is_empty() {
            return self.snapshot(item_id);
        }

        let payload = json!({"fields": patch.changed_fields()});
        self.commit_patch(item_id, patch, ActionType::UpdateDetails, payload)
            .await
    }

    /// 设置或清除标记（最多一个）
    pub async fn set_flag(
        &mut self,
        item_id: &str,
        color: Option<&str>,
        note: Option<&str>,
    ) -> ApiResult<SpecItem> {
        let item = self.require_item(item_id)?;
        let flag = match color.map(str::trim).filter(|c| !c.is_empty()) {
            Some(color) => Some((
                color.to_string(),
                note.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            )),
            None => None,
        };

        let mut flagged = item.clone();
        flagged.set_flag(flag.clone());
        if flagged.annotations == item.annotations {
            return Ok(item.clone());
        }

        let patch = SpecItemPatch {
            annotations: Some(flagged.annotations),
            ..Default::default()
        };
        self.commit_patch(item_id, patch, ActionType::SetFlag, json!({"flag": flag}))
            .await
    }

    // ==========================================
    // 需求关联与分组
    // ==========================================

    /// 关联需求前的选项提示（只读）
    pub fn link_advice(&self, item_id: &str, requirement_id: &str) -> LinkAdvice {
        self.store.link_advice(requirement_id, item_id)
    }

    /// 关联需求
    ///
    /// # 规则
    /// - 需求已有 N 个规格项时返回提示"选项 N+1",不阻止关联
    /// - 已归档的规格项重新关联后恢复为 SELECTED（同一次提交）
    /// - 恢复时文档编码已被未归档规格项占用 → DuplicateDocCode,规格项不变
    pub async fn link_to_requirement(
        &mut self,
        item_id: &str,
        requirement_id: &str,
    ) -> ApiResult<LinkOutcome> {
        let item = self.require_item(item_id)?;
        let advice = self.store.link_advice(requirement_id, item_id);

        if item.requirement_ids().iter().any(|id| id == requirement_id) {
            debug!(item_id = %item_id, requirement_id = %requirement_id, "已关联,跳过");
            return Ok(LinkOutcome {
                item: item.clone(),
                advice,
                restored_from_archive: false,
                already_linked: true,
            });
        }

        let restore_status = item.is_archived().then_some(SpecStatus::Selected);
        let expected_version = item.version;

        // 归档期间编码可能已被其他规格项占用,恢复前重新校验
        if restore_status.is_some() {
            if let Some(code) = item.doc_code.as_deref() {
                if let Err(e) = InputValidator::ensure_doc_code_unique(&self.store, item_id, code) {
                    info!(item_id = %item_id, doc_code = %code, "恢复归档被拒绝: {}", e);
                    return Err(e);
                }
            }
        }

        self.ensure_requirement_in_project(requirement_id).await?;

        if advice.creates_alternative() {
            info!(
                item_id = %item_id,
                requirement_id = %requirement_id,
                option_number = advice.option_number,
                "需求已有规格项,将形成多选项"
            );
        }

        let link = RequirementLink {
            link_id: uuid::Uuid::new_v4().to_string(),
            requirement_id: requirement_id.to_string(),
            created_at: chrono::Utc::now(),
        };
        let pending = link.clone();
        self.store.update(item_id, move |item| {
            item.links.push(pending);
            if let Some(status) = restore_status {
                item.status = status;
            }
            item.updated_at = chrono::Utc::now();
        });

        let result = self
            .backends
            .persistence
            .add_requirement_link(item_id, expected_version, &link, restore_status)
            .await;
        self.confirm(item_id, result)?;

        self.record(
            Some(item_id),
            ActionType::Link,
            json!({
                "requirement_id": requirement_id,
                "option_number": advice.option_number,
                "restored_from_archive": restore_status.is_some(),
            }),
        );

        Ok(LinkOutcome {
            item: self.snapshot(item_id)?,
            advice,
            restored_from_archive: restore_status.is_some(),
            already_linked: false,
        })
    }

    /// 分组: 子项指向父项,父项记录子项名称（同一次提交）
    pub async fn group_items(&mut self, parent_id: &str, child_ids: &[String]) -> ApiResult<Vec<SpecItem>> {
        let parent = self.require_item(parent_id)?.clone();
        if child_ids.is_empty() {
            return Err(WorkflowError::InvalidGrouping("子项列表为空".to_string()).into());
        }

        let mut seen = BTreeSet::new();
        let mut children = Vec::with_capacity(child_ids.len());
        for child_id in child_ids {
            if child_id == parent_id {
                return Err(WorkflowError::InvalidGrouping(format!(
                    "规格项 {} 不能作为自己的子项",
                    parent_id
                ))
                .into());
            }
            if !seen.insert(child_id.as_str()) {
                return Err(WorkflowError::InvalidGrouping(format!("子项重复: {}", child_id)).into());
            }
            children.push(self.require_item(child_id)?.clone());
        }
        if parent.parent_id().is_some() {
            return Err(WorkflowError::InvalidGrouping(format!(
                "规格项 {} 已是其他分组的子项",
                parent_id
            ))
            .into());
        }

        for child in &children {
            if !self.store.children_of(&child.id).is_empty() {
                return Err(WorkflowError::InvalidGrouping(format!(
                    "规格项 {} 是其他分组的父项,不能作为子项",
                    child.id
                ))
                .into());
            }
        }

        // 父项已有的其他子项保留在名称列表前部
        let mut child_names: Vec<String> = self
            .store
            .children_of(parent_id)
            .into_iter()
            .filter(|existing| !seen.contains(existing.id.as_str()))
            .map(|existing| existing.name.clone())
            .collect();
        child_names.extend(children.iter().map(|c| c.name.clone()));

        // 子项从原父项移出: 原父项去掉对应名称,无剩余子项时清除分组
        let mut detached: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for child in &children {
            if let Some(old_parent_id) = child.parent_id().filter(|id| *id != parent_id) {
                detached
                    .entry(old_parent_id.to_string())
                    .or_default()
                    .push(child.name.clone());
            }
        }

        let mut updated = Vec::with_capacity(children.len() + detached.len() + 1);
        let mut grouped_parent = parent.clone();
        grouped_parent.set_grouping(ItemAnnotation::GroupParent { child_names });
        updated.push(grouped_parent);
        for child in children {
            let mut grouped_child = child;
            grouped_child.set_grouping(ItemAnnotation::GroupChild {
                parent_id: parent.id.clone(),
                parent_name: parent.name.clone(),
            });
            updated.push(grouped_child);
        }
        for (old_parent_id, moved_names) in detached {
            let Some(old_parent) = self.store.get(&old_parent_id) else {
                continue;
            };
            let mut shrunk = old_parent.clone();
            if let Some(ItemAnnotation::GroupParent { child_names }) = old_parent.grouping() {
                let mut remaining = child_names.clone();
                for name in &moved_names {
                    if let Some(pos) = remaining.iter().position(|n| n == name) {
                        remaining.remove(pos);
                    }
                }
                if remaining.is_empty() {
                    shrunk.clear_grouping();
                } else {
                    shrunk.set_grouping(ItemAnnotation::GroupParent {
                        child_names: remaining,
                    });
                }
            }
            if shrunk.annotations != old_parent.annotations {
                debug!(old_parent_id = %old_parent_id, moved = moved_names.len(), "子项移出原分组");
                updated.push(shrunk);
            }
        }

        let writes: Vec<GroupingWrite> = updated
            .iter()
            .map(|item| GroupingWrite {
                item_id: item.id.clone(),
                expected_version: item.version,
                annotations: item.annotations.clone(),
            })
            .collect();
        let ids: Vec<String> = updated.iter().map(|item| item.id.clone()).collect();
        for item in updated {
            self.store.insert(item);
        }

        match self.backends.persistence.save_grouping(&writes).await {
            Ok(versions) => {
                for (item_id, version) in ids.iter().zip(versions) {
                    self.store.update(item_id, |item| item.version = version);
                    self.unconfirmed.remove(item_id);
                }
            }
            Err(e) => {
                warn!(parent_id = %parent_id, error = %e, "分组持久化失败,标记为未确认");
                self.unconfirmed.extend(ids.iter().cloned());
                return Err(e.into());
            }
        }

        info!(parent_id = %parent_id, children = child_ids.len(), "分组已保存");
        self.record(
            Some(parent_id),
            ActionType::Group,
            json!({"child_ids": child_ids}),
        );
        ids.iter().map(|id| self.snapshot(id)).collect()
    }

    /// 取消分组: 只清除该规格项的分组注解,需求关联不变
    pub async fn ungroup(&mut self, item_id: &str) -> ApiResult<SpecItem> {
        let item = self.require_item(item_id)?;
        let expected_version = item.version;
        let previous = item.grouping().cloned();

        let mut ungrouped = item.clone();
        if !ungrouped.clear_grouping() {
            return Ok(ungrouped);
        }
        let annotations = ungrouped.annotations.clone();
        ungrouped.updated_at = chrono::Utc::now();
        self.store.insert(ungrouped);

        let result = self
            .backends
            .persistence
            .ungroup_item(item_id, expected_version, &annotations)
            .await;
        self.confirm(item_id, result)?;

        self.record(Some(item_id), ActionType::Ungroup, json!({"previous": previous}));
        self.snapshot(item_id)
    }

    /// 父项下的子项（以父项索引为准）
    pub fn children_of(&self, parent_id: &str) -> Vec<&SpecItem> {
        self.store.children_of(parent_id)
    }

    /// 全部选项分组
    pub fn option_groups(&self) -> Vec<OptionGroup> {
        self.store.option_groups()
    }

    /// 规格项的选项编号（按创建顺序,与展示顺序无关）
    pub fn option_number(&self, item_id: &str) -> Option<usize> {
        self.store.option_number(item_id)
    }

    /// 需求视图（关联统计实时计算）
    pub async fn requirement_views(&self, room_id: Option<&str>) -> ApiResult<Vec<RequirementView>> {
        let requirements = self
            .backends
            .requirements
            .list_requirements(&self.project_id, room_id)
            .await?;
        Ok(requirements
            .into_iter()
            .map(|r| self.store.requirement_view(r))
            .collect())
    }

    // ==========================================
    // 展示顺序
    // ==========================================

    /// 保存展示顺序
    ///
    /// 给定ID依次排在最前,未列出的规格项保持原有相对顺序排在其后；
    /// 选项编号不受影响
    pub async fn reorder(&mut self, ordered_item_ids: &[String]) -> ApiResult<()> {
        let mut seen = BTreeSet::new();
        for item_id in ordered_item_ids {
            self.require_item(item_id)?;
            if !seen.insert(item_id.as_str()) {
                return Err(ApiError::InvalidInput(format!("排序列表中ID重复: {}", item_id)));
            }
        }

        let mut full_order: Vec<String> = ordered_item_ids.to_vec();
        full_order.extend(
            self.store
                .display_order()
                .into_iter()
                .filter(|item| !seen.contains(item.id.as_str()))
                .map(|item| item.id.clone()),
        );

        for (idx, item_id) in full_order.iter().enumerate() {
            let sort_order = idx as i32;
            self.store.update(item_id, |item| item.sort_order = sort_order);
        }

        if let Err(e) = self
            .backends
            .persistence
            .save_display_order(&self.project_id, &full_order)
            .await
        {
            warn!(project_id = %self.project_id, error = %e, "展示顺序持久化失败,标记为未确认");
            self.unconfirmed.extend(full_order.iter().cloned());
            return Err(e.into());
        }

        debug!(project_id = %self.project_id, count = full_order.len(), "展示顺序已保存");
        self.record(None, ActionType::Reorder, json!({"order": full_order}));
        Ok(())
    }

    // ==========================================
    // 汇总
    // ==========================================

    /// 按过滤条件计算分币种汇总
    pub fn compute_aggregates(&self, filter: &ItemFilter) -> FinancialSummary {
        AggregationEngine::compute(self.store.items(), filter, &self.suppliers, &self.settings)
    }

    // ==========================================
    // 重新读取
    // ==========================================

    /// 从持久化重新读取单个规格项（清除未确认标记）
    pub async fn refetch_item(&mut self, item_id: &str) -> ApiResult<Option<SpecItem>> {
        let fetched = self.backends.persistence.fetch_item(item_id).await?;
        self.unconfirmed.remove(item_id);
        match fetched {
            Some(item) => {
                debug!(item_id = %item_id, version = item.version, "规格项已重新读取");
                self.store.insert(item.clone());
                Ok(Some(item))
            }
            None => {
                self.store.remove(item_id);
                Ok(None)
            }
        }
    }

    /// 重新读取整个项目（规格项 + 供应商目录）
    pub async fn reload(&mut self) -> ApiResult<()> {
        let (items, suppliers) = futures::try_join!(
            self.backends.persistence.fetch_project_items(&self.project_id),
            self.backends.suppliers.list_suppliers(),
        )?;
        self.store = SpecItemStore::from_items(items);
        self.suppliers = index_suppliers(suppliers);
        self.unconfirmed.clear();
        Ok(())
    }

    /// 重新读取供应商目录
    pub async fn refresh_suppliers(&mut self) -> ApiResult<()> {
        let suppliers = self.backends.suppliers.list_suppliers().await?;
        self.suppliers = index_suppliers(suppliers);
        Ok(())
    }

    // ==========================================
    // 内部工具
    // ==========================================

    fn require_item(&self, item_id: &str) -> ApiResult<&SpecItem> {
        self.store.get(item_id).ok_or_else(|| item_not_found(item_id))
    }

    fn snapshot(&self, item_id: &str) -> ApiResult<SpecItem> {
        self.require_item(item_id).cloned()
    }

    async fn ensure_requirement_in_project(&self, requirement_id: &str) -> ApiResult<()> {
        match self
            .backends
            .requirements
            .find_requirement(requirement_id)
            .await?
        {
            Some(r) if r.project_id == self.project_id => Ok(()),
            Some(_) => Err(ApiError::InvalidInput(format!(
                "需求 {} 不属于项目 {}",
                requirement_id, self.project_id
            ))),
            None => Err(ApiError::NotFound(format!("需求(id={})不存在", requirement_id))),
        }
    }

    async fn ensure_supplier_known(&mut self, supplier_id: &str) -> ApiResult<()> {
        if self.suppliers.contains_key(supplier_id) {
            return Ok(());
        }
        match self.backends.suppliers.find_supplier(supplier_id).await? {
            Some(supplier) => {
                self.suppliers.insert(supplier.supplier_id.clone(), supplier);
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("供应商(id={})不存在", supplier_id))),
        }
    }

    /// 内存生效 → 持久化 → 确认
    async fn commit_patch(
        &mut self,
        item_id: &str,
        patch: SpecItemPatch,
        action_type: ActionType,
        payload: JsonValue,
    ) -> ApiResult<SpecItem> {
        let expected_version = self.require_item(item_id)?.version;
        self.store.update(item_id, |item| patch.apply_to(item));

        let result = self
            .backends
            .persistence
            .update_item(item_id, expected_version, &patch)
            .await;
        self.confirm(item_id, result)?;

        info!(
            item_id = %item_id,
            action = action_type.to_db_str(),
            fields = ?patch.changed_fields(),
            "规格项已更新"
        );
        self.record(Some(item_id), action_type, payload);
        self.snapshot(item_id)
    }

    /// 处理持久化结果: 成功写回新版本号,失败标记未确认
    fn confirm(&mut self, item_id: &str, result: Result<i64, RepositoryError>) -> ApiResult<()> {
        match result {
            Ok(version) => {
                self.store.update(item_id, |item| item.version = version);
                self.unconfirmed.remove(item_id);
                Ok(())
            }
            Err(e) => {
                warn!(item_id = %item_id, error = %e, "持久化失败,内存修改标记为未确认");
                self.unconfirmed.insert(item_id.to_string());
                Err(e.into())
            }
        }
    }

    /// 写操作日志（失败只告警,不影响命令结果）
    fn record(&self, item_id: Option<&str>, action_type: ActionType, payload: JsonValue) {
        let Some(repo) = &self.backends.action_log else {
            return;
        };
        let log = ActionLog::new(&self.project_id, item_id, action_type, &self.actor, Some(payload));
        if let Err(e) = repo.insert(&log) {
            warn!(action = action_type.to_db_str(), error = %e, "操作日志写入失败");
        }
    }
}

fn index_suppliers(suppliers: Vec<Supplier>) -> HashMap<String, Supplier> {
    suppliers
        .into_iter()
        .map(|s| (s.supplier_id.clone(), s))
        .collect()
}

fn item_not_found(item_id: &str) -> ApiError {
    ApiError::NotFound(format!("SpecItem(id={})不存在", item_id))
}
