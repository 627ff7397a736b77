// ==========================================
// FFE 规格项跟踪系统 - 状态流程引擎
// ==========================================
// 职责: 状态切换的批准闸门、撤销批准时的自动回退、归档
// 红线: 无状态、无 I/O,只产出 patch,由 API 层负责提交
// 红线: status ∈ 需批准集合 ⇒ client_approved = true
// ==========================================

use crate::domain::patch::SpecItemPatch;
use crate::domain::spec_item::SpecItem;
use crate::domain::types::SpecStatus;
use crate::engine::error::{WorkflowError, WorkflowResult};

/// 撤销批准时的默认回退状态（"待下单"）
pub const DEFAULT_APPROVAL_FALLBACK: SpecStatus = SpecStatus::QuoteApproved;

// ==========================================
// StatusTransition - 状态切换计划
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum StatusTransition {
    /// 普通字段更新
    Update(SpecItemPatch),
    /// 目标为归档,走归档流程（同时清空关联）
    Archive,
    /// 与当前状态相同,无需提交
    NoChange,
}

// ==========================================
// StatusWorkflow
// ==========================================
#[derive(Debug, Clone)]
pub struct StatusWorkflow {
    fallback_status: SpecStatus,
}

impl Default for StatusWorkflow {
    fn default() -> Self {
        Self {
            fallback_status: DEFAULT_APPROVAL_FALLBACK,
        }
    }
}

impl StatusWorkflow {
    /// 使用指定回退状态创建
    ///
    /// # 返回
    /// - Err(InvalidFallbackStatus): 回退状态本身需要批准或为归档
    pub fn new(fallback_status: SpecStatus) -> WorkflowResult<Self> {
        if fallback_status.requires_approval() || fallback_status == SpecStatus::Archived {
            return Err(WorkflowError::InvalidFallbackStatus(fallback_status));
        }
        Ok(Self { fallback_status })
    }

    pub fn fallback_status(&self) -> SpecStatus {
        self.fallback_status
    }

    /// 规划状态切换
    ///
    /// # 规则
    /// 1. 目标为 ARCHIVED → 走归档流程
    /// 2. 当前已归档 → ArchivedItem（只能通过重新关联需求恢复）
    /// 3. 目标需要批准且未批准 → ApprovalRequired,规格项保持不变
    /// 4. 与当前状态相同 → NoChange
    /// 5. 其他 → 只更新 status
    pub fn plan_status(
        &self,
        item: &SpecItem,
        new_status: SpecStatus,
    ) -> WorkflowResult<StatusTransition> {
        if new_status == SpecStatus::Archived {
            return Ok(StatusTransition::Archive);
        }

        if item.is_archived() {
            return Err(WorkflowError::ArchivedItem {
                item_id: item.id.clone(),
                status: new_status,
            });
        }

        if new_status.requires_approval() && !item.client_approved {
            return Err(WorkflowError::ApprovalRequired {
                item_id: item.id.clone(),
                status: new_status,
            });
        }

        if item.status == new_status {
            return Ok(StatusTransition::NoChange);
        }

        Ok(StatusTransition::Update(SpecItemPatch {
            status: Some(new_status),
            ..Default::default()
        }))
    }

    /// 规划批准切换
    ///
    /// # 规则
    /// - 撤销批准且当前状态需要批准 → 同一 patch 中回退状态
    /// - 其他情况只改 client_approved
    pub fn plan_approval(&self, item: &SpecItem, approved: bool) -> SpecItemPatch {
        let mut patch = SpecItemPatch {
            client_approved: Some(approved),
            ..Default::default()
        };
        if !approved && item.status.requires_approval() {
            patch.status = Some(self.fallback_status);
        }
        patch
    }

    /// 将归档应用到内存中的规格项
    ///
    /// 重复归档同样会重新清空关联
    ///
    /// # 返回
    /// - true: 有字段发生变化
    pub fn apply_archive(item: &mut SpecItem) -> bool {
        let changed = item.status != SpecStatus::Archived || !item.has_no_links();
        item.status = SpecStatus::Archived;
        item.ffe_requirement_id = None;
        item.links.clear();
        changed
    }

    /// 校验批准不变量
    pub fn satisfies_approval_invariant(item: &SpecItem) -> bool {
        !item.status.requires_approval() || item.client_approved
    }

    /// 校验归档不变量
    pub fn satisfies_archive_invariant(item: &SpecItem) -> bool {
        !item.is_archived() || item.has_no_links()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::spec_item::RequirementLink;
    use crate::domain::types::ALL_STATUSES;
    use chrono::Utc;

    fn item_with(status: SpecStatus, approved: bool) -> SpecItem {
        let mut item = SpecItem::new("P1", "Sofa");
        item.status = status;
        item.client_approved = approved;
        item
    }

    #[test]
    fn test_fallback_must_not_require_approval() {
        assert!(StatusWorkflow::new(SpecStatus::Ordered).is_err());
        assert!(StatusWorkflow::new(SpecStatus::Archived).is_err());
        assert!(StatusWorkflow::new(SpecStatus::ClientToOrder).is_ok());
    }

    #[test]
    fn test_gated_status_without_approval_is_rejected() {
        let workflow = StatusWorkflow::default();
        let item = item_with(SpecStatus::QuoteApproved, false);
        let err = workflow.plan_status(&item, SpecStatus::Ordered).unwrap_err();
        assert!(matches!(err, WorkflowError::ApprovalRequired { status: SpecStatus::Ordered, .. }));
    }

    #[test]
    fn test_gated_status_with_approval_is_allowed() {
        let workflow = StatusWorkflow::default();
        let item = item_with(SpecStatus::QuoteApproved, true);
        let plan = workflow.plan_status(&item, SpecStatus::Shipped).unwrap();
        match plan {
            StatusTransition::Update(patch) => {
                assert_eq!(patch.status, Some(SpecStatus::Shipped));
                assert_eq!(patch.changed_fields(), vec!["status"]);
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_same_status_is_no_change() {
        let workflow = StatusWorkflow::default();
        let item = item_with(SpecStatus::RfqSent, false);
        assert_eq!(
            workflow.plan_status(&item, SpecStatus::RfqSent).unwrap(),
            StatusTransition::NoChange
        );
    }

    #[test]
    fn test_archived_target_routes_to_archive() {
        let workflow = StatusWorkflow::default();
        let item = item_with(SpecStatus::Selected, false);
        assert_eq!(
            workflow.plan_status(&item, SpecStatus::Archived).unwrap(),
            StatusTransition::Archive
        );
    }

    #[test]
    fn test_archived_item_cannot_leave_archive_via_status() {
        let workflow = StatusWorkflow::default();
        let item = item_with(SpecStatus::Archived, true);
        for target in [SpecStatus::Selected, SpecStatus::Ordered, SpecStatus::Draft] {
            let err = workflow.plan_status(&item, target).unwrap_err();
            assert!(matches!(err, WorkflowError::ArchivedItem { status, .. } if status == target));
        }
        assert_eq!(
            workflow.plan_status(&item, SpecStatus::Archived).unwrap(),
            StatusTransition::Archive
        );
    }

    #[test]
    fn test_revoking_approval_reverts_gated_status_in_same_patch() {
        let workflow = StatusWorkflow::default();
        let item = item_with(SpecStatus::Delivered, true);
        let patch = workflow.plan_approval(&item, false);
        assert_eq!(patch.client_approved, Some(false));
        assert_eq!(patch.status, Some(DEFAULT_APPROVAL_FALLBACK));
    }

    #[test]
    fn test_revoking_approval_keeps_ungated_status() {
        let workflow = StatusWorkflow::default();
        let item = item_with(SpecStatus::ClientPaid, true);
        let patch = workflow.plan_approval(&item, false);
        assert_eq!(patch.status, None);
    }

    #[test]
    fn test_invariant_holds_for_every_status_and_approval_sequence() {
        let workflow = StatusWorkflow::new(SpecStatus::ClientToOrder).unwrap();
        for start in ALL_STATUSES {
            for approved in [true, false] {
                let mut item = item_with(start, true);
                for target in ALL_STATUSES {
                    match workflow.plan_status(&item, target) {
                        Ok(StatusTransition::Update(patch)) => patch.apply_to(&mut item),
                        Ok(StatusTransition::Archive) => {
                            StatusWorkflow::apply_archive(&mut item);
                        }
                        Ok(StatusTransition::NoChange) | Err(_) => {}
                    }
                    assert!(StatusWorkflow::satisfies_approval_invariant(&item));
                    workflow.plan_approval(&item, approved).apply_to(&mut item);
                    assert!(StatusWorkflow::satisfies_approval_invariant(&item));
                }
            }
        }
    }

    #[test]
    fn test_archive_clears_all_links_and_is_idempotent() {
        let mut item = item_with(SpecStatus::QuoteReceived, false);
        item.ffe_requirement_id = Some("R0".to_string());
        for (i, rid) in ["R1", "R2"].iter().enumerate() {
            item.links.push(RequirementLink {
                link_id: format!("L{}", i),
                requirement_id: rid.to_string(),
                created_at: Utc::now(),
            });
        }

        assert!(StatusWorkflow::apply_archive(&mut item));
        assert_eq!(item.status, SpecStatus::Archived);
        assert!(item.has_no_links());
        assert!(StatusWorkflow::satisfies_archive_invariant(&item));

        let snapshot = item.clone();
        assert!(!StatusWorkflow::apply_archive(&mut item));
        assert_eq!(item, snapshot);
    }
}
