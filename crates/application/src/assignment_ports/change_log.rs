use async_trait::async_trait;
use tutela_core::{AppResult, SubjectId};
use tutela_domain::ChangeLogEntry;

/// Append-only audit trail of assignment changes.
#[async_trait]
pub trait ChangeLogRepository: Send + Sync {
    /// Appends one entry.
    async fn append_entry(&self, entry: ChangeLogEntry) -> AppResult<()>;

    /// Lists the most recent entries for one subject, newest first.
    async fn list_entries(&self, subject_id: SubjectId, limit: usize)
    -> AppResult<Vec<ChangeLogEntry>>;
}
