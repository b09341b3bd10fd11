use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;

use tutela_application::{
    AppliedAssignmentChanges, AssignmentChangeSet, AssignmentRepository, CompletionTransition,
    DeleteGuard,
};
use tutela_core::{AppError, AppResult, AssignmentId, SubjectId};
use tutela_domain::{Assignment, AssignmentOrigin, ItemRef};

use crate::postgres_support::{item_from_columns, storage_error};


/// PostgreSQL-backed repository for `user_assignments`.
#[derive(Clone)]
pub struct PostgresAssignmentRepository {
    pool: PgPool,
}

impl PostgresAssignmentRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    item_type: String,
    item_id: uuid::Uuid,
    origin: String,
    assigned_at: DateTime<Utc>,
    due_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl AssignmentRow {
    fn into_assignment(self) -> AppResult<Assignment> {
        let origin = self.origin.parse::<AssignmentOrigin>().map_err(|error| {
            AppError::Internal(format!("corrupt assignment origin on '{}': {error}", self.id))
        })?;

        Ok(Assignment {
            assignment_id: AssignmentId::from_uuid(self.id),
            subject_id: SubjectId::from_uuid(self.user_id),
            item: item_from_columns(self.item_type.as_str(), self.item_id)?,
            origin,
            assigned_at: self.assigned_at,
            due_at: self.due_at,
            completed_at: self.completed_at,
        })
    }
}

const ASSIGNMENT_COLUMNS: &str =
    "id, user_id, item_type, item_id, origin, assigned_at, due_at, completed_at";

/// Serializes writers of one subject's rows until the transaction ends.
async fn lock_subject_rows(
    transaction: &mut Transaction<'_, Postgres>,
    subject_id: SubjectId,
) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("user_assignments:{subject_id}"))
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to lock assignments of subject '{subject_id}'"),
                error,
            )
        })?;
    Ok(())
}

#[async_trait]
impl AssignmentRepository for PostgresAssignmentRepository {
    async fn list_assignments(&self, subject_id: SubjectId) -> AppResult<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM user_assignments WHERE user_id = $1 ORDER BY assigned_at, id"
        ))
        .bind(subject_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to list assignments of subject '{subject_id}'"),
                error,
            )
        })?;

        rows.into_iter().map(AssignmentRow::into_assignment).collect()
    }

    async fn list_subjects_with_assignments(&self) -> AppResult<Vec<SubjectId>> {
        let ids = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT DISTINCT user_id FROM user_assignments ORDER BY user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| storage_error("failed to list subjects with assignments", error))?;

        Ok(ids.into_iter().map(SubjectId::from_uuid).collect())
    }

    async fn apply_changes(
        &self,
        subject_id: SubjectId,
        changes: AssignmentChangeSet,
    ) -> AppResult<AppliedAssignmentChanges> {
        let mut applied = AppliedAssignmentChanges::default();
        if changes.is_empty() {
            return Ok(applied);
        }

        let mut transaction = self.pool.begin().await.map_err(|error| {
            storage_error("failed to start assignment change transaction", error)
        })?;
        lock_subject_rows(&mut transaction, subject_id).await?;

        if !changes.delete.is_empty() {
            let ids: Vec<uuid::Uuid> = changes.delete.iter().map(AssignmentId::as_uuid).collect();
            let result = sqlx::query(
                r#"
                DELETE FROM user_assignments
                WHERE user_id = $1
                  AND id = ANY($2)
                  AND ($3 OR completed_at IS NULL)
                "#,
            )
            .bind(subject_id.as_uuid())
            .bind(ids)
            .bind(changes.delete_guard == DeleteGuard::Unrestricted)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                storage_error(
                    &format!("failed to delete assignments of subject '{subject_id}'"),
                    error,
                )
            })?;
            applied.deleted = u32::try_from(result.rows_affected()).unwrap_or(u32::MAX);
        }

        for row in &changes.insert {
            let result = sqlx::query(
                r#"
                INSERT INTO user_assignments (
                    id, user_id, item_type, item_id, origin, assigned_at, due_at
                )
                SELECT $1::UUID, $2::UUID, $3::TEXT, $4::UUID, $5::TEXT, $6::TIMESTAMPTZ, $7::TIMESTAMPTZ
                WHERE NOT EXISTS (
                    SELECT 1
                    FROM user_assignments
                    WHERE user_id = $2 AND item_type = $3 AND item_id = $4
                )
                "#,
            )
            .bind(row.assignment_id.as_uuid())
            .bind(subject_id.as_uuid())
            .bind(row.item.item_type.as_str())
            .bind(row.item.item_id.as_uuid())
            .bind(row.origin.as_str())
            .bind(row.assigned_at)
            .bind(row.due_at)
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                storage_error(
                    &format!("failed to insert assignment for subject '{subject_id}'"),
                    error,
                )
            })?;

            if result.rows_affected() == 0 {
                applied.skipped += 1;
            } else {
                applied.inserted += 1;
            }
        }

        transaction.commit().await.map_err(|error| {
            storage_error("failed to commit assignment change transaction", error)
        })?;

        debug!(
            subject_id = %subject_id,
            inserted = applied.inserted,
            skipped = applied.skipped,
            deleted = applied.deleted,
            "assignment changes committed"
        );
        Ok(applied)
    }

    async fn mark_completed(
        &self,
        subject_id: SubjectId,
        item: ItemRef,
        completed_at: DateTime<Utc>,
    ) -> AppResult<Option<CompletionTransition>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            storage_error("failed to start assignment completion transaction", error)
        })?;
        lock_subject_rows(&mut transaction, subject_id).await?;

        let target = sqlx::query_as::<_, AssignmentRow>(&format!(
            r#"
            SELECT {ASSIGNMENT_COLUMNS}
            FROM user_assignments
            WHERE user_id = $1 AND item_type = $2 AND item_id = $3
            ORDER BY (completed_at IS NULL), assigned_at, id
            LIMIT 1
            "#
        ))
        .bind(subject_id.as_uuid())
        .bind(item.item_type.as_str())
        .bind(item.item_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to load assignment '{item}' of subject '{subject_id}'"),
                error,
            )
        })?;

        let Some(mut target) = target else {
            return Ok(None);
        };

        let newly_completed = target.completed_at.is_none();
        if newly_completed {
            sqlx::query("UPDATE user_assignments SET completed_at = $2 WHERE id = $1")
                .bind(target.id)
                .bind(completed_at)
                .execute(&mut *transaction)
                .await
                .map_err(|error| {
                    storage_error(
                        &format!("failed to complete assignment '{}'", target.id),
                        error,
                    )
                })?;
            target.completed_at = Some(completed_at);
        }

        transaction.commit().await.map_err(|error| {
            storage_error("failed to commit assignment completion transaction", error)
        })?;

        Ok(Some(CompletionTransition {
            assignment: target.into_assignment()?,
            newly_completed,
        }))
    }
}
