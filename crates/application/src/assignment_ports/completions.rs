use std::collections::BTreeSet;

use async_trait::async_trait;
use tutela_core::{AppResult, SubjectId};
use tutela_domain::{CompletionRecord, ItemRef};

/// Durable completion history, independent of assignment rows.
#[async_trait]
pub trait CompletionRepository: Send + Sync {
    /// Stores one completion. Recording the same (subject, item, completed_at) twice is a no-op.
    async fn record_completion(&self, record: CompletionRecord) -> AppResult<()>;

    /// Returns whether the subject ever completed the item.
    async fn has_completed(&self, subject_id: SubjectId, item: ItemRef) -> AppResult<bool>;

    /// Returns every item the subject ever completed.
    async fn completed_items(&self, subject_id: SubjectId) -> AppResult<BTreeSet<ItemRef>>;

    /// Lists completion records for one subject, newest first.
    async fn list_completions(&self, subject_id: SubjectId) -> AppResult<Vec<CompletionRecord>>;
}
