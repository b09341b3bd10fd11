use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use tutela_application::CompletionRepository;
use tutela_core::{AppResult, RoleId, SubjectId};
use tutela_domain::{CompletionRecord, ItemRef};

use crate::postgres_support::{item_from_columns, storage_error};

/// PostgreSQL-backed completion history.
#[derive(Clone)]
pub struct PostgresCompletionRepository {
    pool: PgPool,
}

impl PostgresCompletionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CompletionRow {
    user_id: uuid::Uuid,
    item_type: String,
    item_id: uuid::Uuid,
    completed_at: DateTime<Utc>,
    completed_under_role_id: Option<uuid::Uuid>,
}

#[derive(Debug, FromRow)]
struct CompletedItemRow {
    item_type: String,
    item_id: uuid::Uuid,
}

#[async_trait]
impl CompletionRepository for PostgresCompletionRepository {
    async fn record_completion(&self, record: CompletionRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO completion_records (
                user_id, item_type, item_id, completed_at, completed_under_role_id
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, item_type, item_id, completed_at) DO NOTHING
            "#,
        )
        .bind(record.subject_id.as_uuid())
        .bind(record.item.item_type.as_str())
        .bind(record.item.item_id.as_uuid())
        .bind(record.completed_at)
        .bind(record.completed_under_role_id.map(|role_id| role_id.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!(
                    "failed to record completion of '{}' for subject '{}'",
                    record.item, record.subject_id
                ),
                error,
            )
        })?;

        Ok(())
    }

    async fn has_completed(&self, subject_id: SubjectId, item: ItemRef) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM completion_records
                WHERE user_id = $1 AND item_type = $2 AND item_id = $3
            )
            "#,
        )
        .bind(subject_id.as_uuid())
        .bind(item.item_type.as_str())
        .bind(item.item_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to check completion of '{item}' for subject '{subject_id}'"),
                error,
            )
        })
    }

    async fn completed_items(&self, subject_id: SubjectId) -> AppResult<BTreeSet<ItemRef>> {
        let rows = sqlx::query_as::<_, CompletedItemRow>(
            r#"
            SELECT DISTINCT item_type, item_id
            FROM completion_records
            WHERE user_id = $1
            "#,
        )
        .bind(subject_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to list completed items of subject '{subject_id}'"),
                error,
            )
        })?;

        rows.into_iter()
            .map(|row| item_from_columns(row.item_type.as_str(), row.item_id))
            .collect()
    }

    async fn list_completions(&self, subject_id: SubjectId) -> AppResult<Vec<CompletionRecord>> {
        let rows = sqlx::query_as::<_, CompletionRow>(
            r#"
            SELECT user_id, item_type, item_id, completed_at, completed_under_role_id
            FROM completion_records
            WHERE user_id = $1
            ORDER BY completed_at DESC
            "#,
        )
        .bind(subject_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            storage_error(
                &format!("failed to list completions of subject '{subject_id}'"),
                error,
            )
        })?;

        rows.into_iter()
            .map(|row| {
                Ok(CompletionRecord {
                    subject_id: SubjectId::from_uuid(row.user_id),
                    item: item_from_columns(row.item_type.as_str(), row.item_id)?,
                    completed_at: row.completed_at,
                    completed_under_role_id: row.completed_under_role_id.map(RoleId::from_uuid),
                })
            })
            .collect()
    }
}
