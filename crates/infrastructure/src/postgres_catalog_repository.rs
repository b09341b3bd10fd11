use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use tutela_application::CatalogRepository;
use tutela_core::{AppResult, DepartmentId, GroupId, RoleId};
use tutela_domain::ItemRef;

use crate::postgres_support::{item_from_columns, storage_error};

/// PostgreSQL-backed catalog repository over the requirement link tables.
#[derive(Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, query: &'static str, id: uuid::Uuid, label: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(query)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|error| storage_error(&format!("failed to look up {label} '{id}'"), error))
    }

    async fn requirements(
        &self,
        query: &'static str,
        owner_id: uuid::Uuid,
        label: &str,
    ) -> AppResult<BTreeSet<ItemRef>> {
        let rows = sqlx::query_as::<_, RequirementRow>(query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                storage_error(
                    &format!("failed to load requirements of {label} '{owner_id}'"),
                    error,
                )
            })?;

        rows.into_iter()
            .map(|row| item_from_columns(row.item_type.as_str(), row.item_id))
            .collect()
    }
}

#[derive(Debug, FromRow)]
struct RequirementRow {
    item_type: String,
    item_id: uuid::Uuid,
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn role_exists(&self, role_id: RoleId) -> AppResult<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE id = $1)",
            role_id.as_uuid(),
            "role",
        )
        .await
    }

    async fn department_exists(&self, department_id: DepartmentId) -> AppResult<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM departments WHERE id = $1)",
            department_id.as_uuid(),
            "department",
        )
        .await
    }

    async fn group_exists(&self, group_id: GroupId) -> AppResult<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM user_groups WHERE id = $1)",
            group_id.as_uuid(),
            "group",
        )
        .await
    }

    async fn role_department(&self, role_id: RoleId) -> AppResult<Option<DepartmentId>> {
        let department_id = sqlx::query_scalar::<_, Option<uuid::Uuid>>(
            "SELECT department_id FROM roles WHERE id = $1",
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            storage_error(&format!("failed to load department of role '{role_id}'"), error)
        })?;

        Ok(department_id.flatten().map(DepartmentId::from_uuid))
    }

    async fn role_requirements(&self, role_id: RoleId) -> AppResult<BTreeSet<ItemRef>> {
        self.requirements(
            "SELECT item_type, item_id FROM role_assignments WHERE role_id = $1",
            role_id.as_uuid(),
            "role",
        )
        .await
    }

    async fn department_requirements(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<BTreeSet<ItemRef>> {
        self.requirements(
            "SELECT item_type, item_id FROM department_assignments WHERE department_id = $1",
            department_id.as_uuid(),
            "department",
        )
        .await
    }

    async fn group_requirements(&self, group_id: GroupId) -> AppResult<BTreeSet<ItemRef>> {
        self.requirements(
            "SELECT item_type, item_id FROM group_assignments WHERE group_id = $1",
            group_id.as_uuid(),
            "group",
        )
        .await
    }

    async fn items_with_requirement_trail(
        &self,
        items: &BTreeSet<ItemRef>,
    ) -> AppResult<BTreeSet<ItemRef>> {
        if items.is_empty() {
            return Ok(BTreeSet::new());
        }

        let item_types: Vec<&str> = items.iter().map(|item| item.item_type.as_str()).collect();
        let item_ids: Vec<uuid::Uuid> = items.iter().map(|item| item.item_id.as_uuid()).collect();
        let rows = sqlx::query_as::<_, RequirementRow>(
            r#"
            SELECT candidate.item_type, candidate.item_id
            FROM UNNEST($1::text[], $2::uuid[]) AS candidate(item_type, item_id)
            WHERE EXISTS (
                    SELECT 1 FROM role_assignments link
                    WHERE link.item_type = candidate.item_type AND link.item_id = candidate.item_id
                )
               OR EXISTS (
                    SELECT 1 FROM department_assignments link
                    WHERE link.item_type = candidate.item_type AND link.item_id = candidate.item_id
                )
               OR EXISTS (
                    SELECT 1 FROM group_assignments link
                    WHERE link.item_type = candidate.item_type AND link.item_id = candidate.item_id
                )
            "#,
        )
        .bind(item_types)
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| storage_error("failed to look up requirement links", error))?;

        rows.into_iter()
            .map(|row| item_from_columns(row.item_type.as_str(), row.item_id))
            .collect()
    }
}
