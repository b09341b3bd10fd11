use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tutela_application::{SubjectLease, SubjectLeaseCoordinator};
use tutela_core::AppResult;

use crate::redis_subject_lease_coordinator::validate_lease_request;

#[derive(Debug, Clone)]
struct HeldLease {
    token: String,
    expires_at: Instant,
}

/// Process-local lease coordinator with expiry, for single-node deployments and tests.
#[derive(Clone, Default)]
pub struct InMemorySubjectLeaseCoordinator {
    leases: Arc<Mutex<HashMap<String, HeldLease>>>,
}

impl InMemorySubjectLeaseCoordinator {
    /// Creates an empty coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubjectLeaseCoordinator for InMemorySubjectLeaseCoordinator {
    async fn try_acquire_lease(
        &self,
        scope_key: &str,
        holder_id: &str,
        lease_seconds: u32,
    ) -> AppResult<Option<SubjectLease>> {
        validate_lease_request(scope_key, holder_id, lease_seconds)?;

        let now = Instant::now();
        let mut leases = self.leases.lock().await;
        if leases
            .get(scope_key)
            .is_some_and(|held| held.expires_at > now)
        {
            return Ok(None);
        }

        let token = format!("{holder_id}:{}", uuid::Uuid::new_v4());
        leases.insert(
            scope_key.to_owned(),
            HeldLease {
                token: token.clone(),
                expires_at: now + Duration::from_secs(u64::from(lease_seconds)),
            },
        );

        Ok(Some(SubjectLease {
            scope_key: scope_key.to_owned(),
            token,
            holder_id: holder_id.to_owned(),
        }))
    }

    async fn release_lease(&self, lease: &SubjectLease) -> AppResult<()> {
        let mut leases = self.leases.lock().await;
        if leases
            .get(&lease.scope_key)
            .is_some_and(|held| held.token == lease.token)
        {
            leases.remove(&lease.scope_key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tutela_application::SubjectLeaseCoordinator;

    use super::InMemorySubjectLeaseCoordinator;

    #[tokio::test]
    async fn second_holder_waits_until_release() {
        let coordinator = InMemorySubjectLeaseCoordinator::new();

        let first = coordinator.try_acquire_lease("subject:a", "api-1", 30).await;
        let second = coordinator.try_acquire_lease("subject:a", "api-2", 30).await;
        assert!(matches!(first, Ok(Some(_))));
        assert!(matches!(second, Ok(None)));

        if let Ok(Some(lease)) = first {
            assert!(coordinator.release_lease(&lease).await.is_ok());
        }
        let third = coordinator.try_acquire_lease("subject:a", "api-2", 30).await;
        assert!(matches!(third, Ok(Some(ref lease)) if lease.holder_id == "api-2"));
    }

    #[tokio::test]
    async fn stale_token_does_not_release_newer_lease() {
        let coordinator = InMemorySubjectLeaseCoordinator::new();
        let Ok(Some(mut stale)) = coordinator.try_acquire_lease("subject:b", "api-1", 30).await
        else {
            panic!("expected lease");
        };
        stale.token = "api-1:stale".to_owned();

        assert!(coordinator.release_lease(&stale).await.is_ok());
        let other = coordinator.try_acquire_lease("subject:b", "api-2", 30).await;
        assert!(matches!(other, Ok(None)));
    }

    #[tokio::test]
    async fn empty_scope_is_rejected() {
        let coordinator = InMemorySubjectLeaseCoordinator::new();
        assert!(coordinator.try_acquire_lease(" ", "api-1", 30).await.is_err());
        assert!(coordinator.try_acquire_lease("scope", "api-1", 0).await.is_err());
    }
}
