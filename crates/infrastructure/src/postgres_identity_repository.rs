use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use tutela_application::IdentityRepository;
use tutela_core::{AppResult, DepartmentId, GroupId, RoleId, SubjectId};
use tutela_domain::SubjectProfile;

use crate::postgres_support::storage_error;

/// PostgreSQL-backed identity repository over `users` and `user_group_members`.
#[derive(Clone)]
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SubjectRow {
    id: uuid::Uuid,
    role_id: Option<uuid::Uuid>,
    department_id: Option<uuid::Uuid>,
    group_ids: Vec<uuid::Uuid>,
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn find_subject(&self, subject_id: SubjectId) -> AppResult<Option<SubjectProfile>> {
        let row = sqlx::query_as::<_, SubjectRow>(
            r#"
            SELECT
                users.id,
                users.role_id,
                users.department_id,
                COALESCE(
                    ARRAY_AGG(members.group_id ORDER BY members.group_id)
                        FILTER (WHERE members.group_id IS NOT NULL),
                    ARRAY[]::UUID[]
                ) AS group_ids
            FROM users
            LEFT JOIN user_group_members members ON members.user_id = users.id
            WHERE users.id = $1
            GROUP BY users.id
            "#,
        )
        .bind(subject_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| storage_error(&format!("failed to load subject '{subject_id}'"), error))?;

        Ok(row.map(|row| SubjectProfile {
            subject_id: SubjectId::from_uuid(row.id),
            role_id: row.role_id.map(RoleId::from_uuid),
            department_id: row.department_id.map(DepartmentId::from_uuid),
            group_ids: row.group_ids.into_iter().map(GroupId::from_uuid).collect(),
        }))
    }

    async fn set_subject_role(
        &self,
        subject_id: SubjectId,
        role_id: Option<RoleId>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET role_id = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(subject_id.as_uuid())
        .bind(role_id.map(|role_id| role_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            storage_error(&format!("failed to set role for subject '{subject_id}'"), error)
        })?;

        Ok(())
    }

    async fn list_department_members(
        &self,
        department_id: DepartmentId,
    ) -> AppResult<Vec<SubjectId>> {
        let ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM users
            WHERE department_id = $1
            ORDER BY id
            "#,
        )
        .bind(department_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to list members of department '{department_id}'"),
                error,
            )
        })?;

        Ok(ids.into_iter().map(SubjectId::from_uuid).collect())
    }

    async fn list_group_members(&self, group_id: GroupId) -> AppResult<Vec<SubjectId>> {
        let ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT user_id
            FROM user_group_members
            WHERE group_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            storage_error(&format!("failed to list members of group '{group_id}'"), error)
        })?;

        Ok(ids.into_iter().map(SubjectId::from_uuid).collect())
    }

    async fn list_subjects(&self) -> AppResult<Vec<SubjectId>> {
        let ids = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|error| storage_error("failed to list subjects", error))?;

        Ok(ids.into_iter().map(SubjectId::from_uuid).collect())
    }
}
