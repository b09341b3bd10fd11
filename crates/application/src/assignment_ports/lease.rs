use async_trait::async_trait;
use tutela_core::AppResult;

/// Lease held on one subject-sync scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectLease {
    /// Coordination scope key.
    pub scope_key: String,
    /// Lease token used for safe release.
    pub token: String,
    /// Lease holder identity.
    pub holder_id: String,
}

/// Cross-process coordination port serializing work on one subject.
#[async_trait]
pub trait SubjectLeaseCoordinator: Send + Sync {
    /// Attempts to acquire one lease for the given scope.
    async fn try_acquire_lease(
        &self,
        scope_key: &str,
        holder_id: &str,
        lease_seconds: u32,
    ) -> AppResult<Option<SubjectLease>>;

    /// Releases one lease using token compare-and-delete semantics.
    async fn release_lease(&self, lease: &SubjectLease) -> AppResult<()>;
}
