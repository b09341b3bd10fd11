use std::collections::BTreeSet;

use async_trait::async_trait;
use tutela_core::{AppResult, DepartmentId, GroupId, RoleId};
use tutela_domain::ItemRef;

/// Port over the training catalog and its role, department and group links.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Returns whether the role exists.
    async fn role_exists(&self, role_id: RoleId) -> AppResult<bool>;

    /// Returns whether the department exists.
    async fn department_exists(&self, department_id: DepartmentId) -> AppResult<bool>;

    /// Returns whether the group exists.
    async fn group_exists(&self, group_id: GroupId) -> AppResult<bool>;

    /// Returns the department a role belongs to, used when a subject has no direct department.
    async fn role_department(&self, role_id: RoleId) -> AppResult<Option<DepartmentId>>;

    /// Returns items required by a role.
    async fn role_requirements(&self, role_id: RoleId) -> AppResult<BTreeSet<ItemRef>>;

    /// Returns items required by a department.
    async fn department_requirements(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<BTreeSet<ItemRef>>;

    /// Returns items required by a group.
    async fn group_requirements(&self, group_id: GroupId) -> AppResult<BTreeSet<ItemRef>>;

    /// Returns the subset of `items` linked to any role, department or group.
    async fn items_with_requirement_trail(
        &self,
        items: &BTreeSet<ItemRef>,
    ) -> AppResult<BTreeSet<ItemRef>>;
}
