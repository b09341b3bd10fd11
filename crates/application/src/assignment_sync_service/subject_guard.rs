use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::{Instant, sleep, timeout};
use tracing::warn;
use tutela_core::{AppError, AppResult, SubjectId};

use crate::assignment_ports::SubjectLease;

use super::AssignmentSyncService;

const LEASE_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// In-process mutexes keyed by subject.
#[derive(Clone, Default)]
pub(super) struct SubjectLocks {
    entries: Arc<Mutex<HashMap<SubjectId, Weak<Mutex<()>>>>>,
}

impl SubjectLocks {
    async fn acquire(
        &self,
        subject_id: SubjectId,
        wait: Duration,
    ) -> AppResult<OwnedMutexGuard<()>> {
        let subject_mutex = {
            let mut entries = self.entries.lock().await;
            entries.retain(|_, entry| entry.strong_count() > 0);
            match entries.get(&subject_id).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let created = Arc::new(Mutex::new(()));
                    entries.insert(subject_id, Arc::downgrade(&created));
                    created
                }
            }
        };

        timeout(wait, subject_mutex.lock_owned())
            .await
            .map_err(|_| busy(subject_id))
    }

    #[cfg(test)]
    pub(super) async fn tracked_subjects(&self) -> usize {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.strong_count() > 0);
        entries.len()
    }
}

impl AssignmentSyncService {
    /// Runs `operation` while holding the subject's local mutex and, when configured, its lease.
    pub(super) async fn with_subject_guard<T, F, Fut>(
        &self,
        subject_id: SubjectId,
        operation: F,
    ) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let _local = self
            .subject_locks
            .acquire(subject_id, self.settings.lock_wait)
            .await?;
        let lease = self.acquire_subject_lease(subject_id).await?;

        let result = operation().await;

        if let (Some(coordinator), Some(lease)) = (&self.lease_coordinator, lease)
            && let Err(error) = coordinator.release_lease(&lease).await
        {
            warn!(
                subject_id = %subject_id,
                scope_key = %lease.scope_key,
                error = %error,
                "failed to release subject sync lease"
            );
        }

        result
    }

    async fn acquire_subject_lease(&self, subject_id: SubjectId) -> AppResult<Option<SubjectLease>> {
        let Some(coordinator) = &self.lease_coordinator else {
            return Ok(None);
        };

        let scope_key = subject_scope_key(subject_id);
        let deadline = Instant::now() + self.settings.lock_wait;
        loop {
            if let Some(lease) = coordinator
                .try_acquire_lease(
                    &scope_key,
                    &self.lease_holder_id,
                    self.settings.lease_seconds,
                )
                .await?
            {
                return Ok(Some(lease));
            }

            if Instant::now() + LEASE_RETRY_INTERVAL > deadline {
                return Err(busy(subject_id));
            }
            sleep(LEASE_RETRY_INTERVAL).await;
        }
    }
}

/// Returns the lease scope key for one subject.
pub(super) fn subject_scope_key(subject_id: SubjectId) -> String {
    format!("assignment_sync:{subject_id}")
}

fn busy(subject_id: SubjectId) -> AppError {
    AppError::Conflict(format!(
        "assignment sync already in progress for subject '{subject_id}'"
    ))
}
