// ==========================================
// FFE 规格项跟踪系统 - 持久化接口 Trait
// ==========================================
// 职责: 定义 API 层依赖的持久化接口（不包含实现）
// 红线: 不包含业务逻辑,只描述数据读写
// 实现者: SpecItemRepository / RequirementRepository / SupplierRepository（SQLite）
// ==========================================

use crate::domain::patch::SpecItemPatch;
use crate::domain::requirement::{Requirement, Supplier};
use crate::domain::spec_item::{ItemAnnotation, RequirementLink, SpecItem};
use crate::domain::types::SpecStatus;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// GroupingWrite - 分组写入单元
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingWrite {
    pub item_id: String,
    pub expected_version: i64,
    pub annotations: Vec<ItemAnnotation>,
}

// ==========================================
// SpecItemPersistence
// ==========================================
// 约定: 所有写操作都以 expected_version 为前提,成功后返回新版本号
#[async_trait]
pub trait SpecItemPersistence: Send + Sync {
    /// 新建规格项（含其关联记录）
    async fn create_item(&self, item: &SpecItem) -> RepositoryResult<()>;

    /// 按ID读取（状态已归一化）
    async fn fetch_item(&self, item_id: &str) -> RepositoryResult<Option<SpecItem>>;

    /// 读取项目下全部规格项
    async fn fetch_project_items(&self, project_id: &str) -> RepositoryResult<Vec<SpecItem>>;

    /// 条件局部更新（patch 中的字段在同一条语句中提交）
    ///
    /// # 错误
    /// - OptimisticLockFailure: 版本不匹配
    /// - NotFound: 规格项不存在
    async fn update_item(
        &self,
        item_id: &str,
        expected_version: i64,
        patch: &SpecItemPatch,
    ) -> RepositoryResult<i64>;

    /// 删除规格项（关联记录级联删除）
    async fn delete_item(&self, item_id: &str) -> RepositoryResult<()>;

    /// 归档: status=ARCHIVED,清空旧版关联与全部多对多关联（同一事务）
    async fn archive_item(&self, item_id: &str, expected_version: i64) -> RepositoryResult<i64>;

    /// 取消分组: 写入去掉分组注解后的注解列表
    async fn ungroup_item(
        &self,
        item_id: &str,
        expected_version: i64,
        annotations: &[ItemAnnotation],
    ) -> RepositoryResult<i64>;

    /// 新增需求关联；restore_status 非空时在同一事务中写入状态
    async fn add_requirement_link(
        &self,
        item_id: &str,
        expected_version: i64,
        link: &RequirementLink,
        restore_status: Option<SpecStatus>,
    ) -> RepositoryResult<i64>;

    /// 批量写入分组注解（同一事务,按输入顺序返回新版本号）
    async fn save_grouping(&self, writes: &[GroupingWrite]) -> RepositoryResult<Vec<i64>>;

    /// 保存展示顺序（sort_order = 下标,不影响版本号）
    async fn save_display_order(
        &self,
        project_id: &str,
        ordered_item_ids: &[String],
    ) -> RepositoryResult<()>;
}

// ==========================================
// RequirementCatalog
// ==========================================
#[async_trait]
pub trait RequirementCatalog: Send + Sync {
    /// 项目下的需求（可按房间过滤）,子项名称按录入顺序
    async fn list_requirements(
        &self,
        project_id: &str,
        room_id: Option<&str>,
    ) -> RepositoryResult<Vec<Requirement>>;

    async fn find_requirement(&self, requirement_id: &str) -> RepositoryResult<Option<Requirement>>;
}

// ==========================================
// SupplierDirectory
// ==========================================
#[async_trait]
pub trait SupplierDirectory: Send + Sync {
    async fn list_suppliers(&self) -> RepositoryResult<Vec<Supplier>>;

    async fn find_supplier(&self, supplier_id: &str) -> RepositoryResult<Option<Supplier>>;
}
