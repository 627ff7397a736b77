use super::core::SpecItemRepository;
use crate::domain::patch::SpecItemPatch;
use crate::domain::spec_item::{ItemAnnotation, RequirementLink, SpecItem};
use crate::domain::types::SpecStatus;
use crate::repository::error::RepositoryResult;
use crate::repository::persistence::{GroupingWrite, SpecItemPersistence};
use async_trait::async_trait;

#[async_trait]
impl SpecItemPersistence for SpecItemRepository {
    async fn create_item(&self, item: &SpecItem) -> RepositoryResult<()> {
        self.insert(item)
    }

    async fn fetch_item(&self, item_id: &str) -> RepositoryResult<Option<SpecItem>> {
        self.find_by_id(item_id)
    }

    async fn fetch_project_items(&self, project_id: &str) -> RepositoryResult<Vec<SpecItem>> {
        self.list_by_project(project_id)
    }

    async fn update_item(
        &self,
        item_id: &str,
        expected_version: i64,
        patch: &SpecItemPatch,
    ) -> RepositoryResult<i64> {
        self.update_fields(item_id, expected_version, patch)
    }

    async fn delete_item(&self, item_id: &str) -> RepositoryResult<()> {
        self.delete(item_id)
    }

    async fn archive_item(&self, item_id: &str, expected_version: i64) -> RepositoryResult<i64> {
        self.archive(item_id, expected_version)
    }

    async fn ungroup_item(
        &self,
        item_id: &str,
        expected_version: i64,
        annotations: &[ItemAnnotation],
    ) -> RepositoryResult<i64> {
        self.update_annotations(item_id, expected_version, annotations)
    }

    async fn add_requirement_link(
        &self,
        item_id: &str,
        expected_version: i64,
        link: &RequirementLink,
        restore_status: Option<SpecStatus>,
    ) -> RepositoryResult<i64> {
        self.add_link(item_id, expected_version, link, restore_status)
    }

    async fn save_grouping(&self, writes: &[GroupingWrite]) -> RepositoryResult<Vec<i64>> {
        self.update_groupings(writes)
    }

    async fn save_display_order(
        &self,
        project_id: &str,
        ordered_item_ids: &[String],
    ) -> RepositoryResult<()> {
        self.update_sort_orders(project_id, ordered_item_ids)?;
        Ok(())
    }
}
