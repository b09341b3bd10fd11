//! PostgreSQL advisory-lock coordinator for per-subject sync.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::{PgPool, Postgres};
use tokio::sync::Mutex;
use tracing::warn;
use tutela_application::{SubjectLease, SubjectLeaseCoordinator};
use tutela_core::AppResult;

use crate::postgres_support::storage_error;
use crate::redis_subject_lease_coordinator::validate_lease_request;

/// Subject leases backed by session-level advisory locks.
///
/// Every held lease pins one pooled connection until release. The lock dies with
/// its session, so a crashed holder frees the subject once the server notices the
/// disconnect. `lease_seconds` is validated but not enforced.
#[derive(Clone)]
pub struct PostgresSubjectLeaseCoordinator {
    pool: PgPool,
    held: Arc<Mutex<HashMap<String, PoolConnection<Postgres>>>>,
}

impl PostgresSubjectLeaseCoordinator {
    /// Creates one coordinator over the provided pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            held: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Pool size that leaves a working connection beside every pinned lease
    /// when up to `max_concurrency` subjects run at once.
    #[must_use]
    pub fn pool_size_for(max_concurrency: usize) -> u32 {
        u32::try_from(max_concurrency)
            .unwrap_or(u32::MAX)
            .saturating_mul(2)
            .saturating_add(2)
    }
}

/// Advisory key text; distinct from the per-transaction row lock key.
fn advisory_key(scope_key: &str) -> String {
    format!("subject_lease:{scope_key}")
}

#[async_trait]
impl SubjectLeaseCoordinator for PostgresSubjectLeaseCoordinator {
    async fn try_acquire_lease(
        &self,
        scope_key: &str,
        holder_id: &str,
        lease_seconds: u32,
    ) -> AppResult<Option<SubjectLease>> {
        validate_lease_request(scope_key, holder_id, lease_seconds)?;

        let mut connection = self.pool.acquire().await.map_err(|error| {
            storage_error("failed to acquire connection for subject lease", error)
        })?;

        let acquired = sqlx::query_scalar::<_, bool>(
            "SELECT pg_try_advisory_lock(hashtextextended($1, 0))",
        )
        .bind(advisory_key(scope_key))
        .fetch_one(&mut *connection)
        .await
        .map_err(|error| storage_error("failed to acquire subject lease", error))?;

        if !acquired {
            return Ok(None);
        }

        let token = format!("{holder_id}:{}", uuid::Uuid::new_v4());
        self.held.lock().await.insert(token.clone(), connection);

        Ok(Some(SubjectLease {
            scope_key: scope_key.to_owned(),
            token,
            holder_id: holder_id.to_owned(),
        }))
    }

    async fn release_lease(&self, lease: &SubjectLease) -> AppResult<()> {
        let Some(mut connection) = self.held.lock().await.remove(&lease.token) else {
            return Ok(());
        };

        let released = sqlx::query_scalar::<_, bool>(
            "SELECT pg_advisory_unlock(hashtextextended($1, 0))",
        )
        .bind(advisory_key(lease.scope_key.as_str()))
        .fetch_one(&mut *connection)
        .await;

        match released {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(
                    scope_key = %lease.scope_key,
                    holder_id = %lease.holder_id,
                    "subject lease was no longer held by its session"
                );
                Ok(())
            }
            Err(error) => {
                // Closing the session drops any advisory lock it still holds.
                drop(connection.detach());
                Err(storage_error("failed to release subject lease", error))
            }
        }
    }
}
