use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tutela_application::ChangeLogRepository;
use tutela_core::{AppError, AppResult, RoleId, SubjectId};
use tutela_domain::{ChangeLogEntry, SyncTrigger};

use crate::postgres_support::{count_to_i32, storage_error};

/// PostgreSQL-backed append-only assignment change log.
#[derive(Clone)]
pub struct PostgresChangeLogRepository {
    pool: PgPool,
}

impl PostgresChangeLogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ChangeLogRow {
    user_id: uuid::Uuid,
    trigger_kind: String,
    old_role_id: Option<uuid::Uuid>,
    new_role_id: Option<uuid::Uuid>,
    assignments_removed: i32,
    assignments_added: i32,
    changed_at: DateTime<Utc>,
}

impl ChangeLogRow {
    fn into_entry(self) -> AppResult<ChangeLogEntry> {
        let trigger = self
            .trigger_kind
            .parse::<SyncTrigger>()
            .map_err(|error| AppError::Internal(format!("corrupt change log trigger: {error}")))?;
        let removed = u32::try_from(self.assignments_removed).map_err(|error| {
            AppError::Internal(format!("corrupt change log removed count: {error}"))
        })?;
        let added = u32::try_from(self.assignments_added).map_err(|error| {
            AppError::Internal(format!("corrupt change log added count: {error}"))
        })?;

        Ok(ChangeLogEntry {
            subject_id: SubjectId::from_uuid(self.user_id),
            trigger,
            old_role_id: self.old_role_id.map(RoleId::from_uuid),
            new_role_id: self.new_role_id.map(RoleId::from_uuid),
            assignments_removed: removed,
            assignments_added: added,
            changed_at: self.changed_at,
        })
    }
}

#[async_trait]
impl ChangeLogRepository for PostgresChangeLogRepository {
    async fn append_entry(&self, entry: ChangeLogEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO assignment_change_log (
                user_id,
                trigger_kind,
                old_role_id,
                new_role_id,
                assignments_removed,
                assignments_added,
                changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.subject_id.as_uuid())
        .bind(entry.trigger.as_str())
        .bind(entry.old_role_id.map(|role_id| role_id.as_uuid()))
        .bind(entry.new_role_id.map(|role_id| role_id.as_uuid()))
        .bind(count_to_i32(entry.assignments_removed)?)
        .bind(count_to_i32(entry.assignments_added)?)
        .bind(entry.changed_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!(
                    "failed to append change log entry for subject '{}'",
                    entry.subject_id
                ),
                error,
            )
        })?;

        Ok(())
    }

    async fn list_entries(
        &self,
        subject_id: SubjectId,
        limit: usize,
    ) -> AppResult<Vec<ChangeLogEntry>> {
        let capped_limit = i64::try_from(limit.clamp(1, 200)).unwrap_or(200);
        let rows = sqlx::query_as::<_, ChangeLogRow>(
            r#"
            SELECT
                user_id,
                trigger_kind,
                old_role_id,
                new_role_id,
                assignments_removed,
                assignments_added,
                changed_at
            FROM assignment_change_log
            WHERE user_id = $1
            ORDER BY changed_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(subject_id.as_uuid())
        .bind(capped_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to list change log of subject '{subject_id}'"),
                error,
            )
        })?;

        rows.into_iter().map(ChangeLogRow::into_entry).collect()
    }
}
