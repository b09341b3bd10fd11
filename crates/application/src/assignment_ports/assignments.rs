use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tutela_core::{AppResult, AssignmentId, SubjectId};
use tutela_domain::{Assignment, ItemRef, NewAssignment};

/// Restriction applied to deletes inside one change set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteGuard {
    /// Rows completed since the plan was computed are left in place.
    #[default]
    IncompleteOnly,
    /// Rows are deleted regardless of completion state.
    Unrestricted,
}

/// Delta applied to one subject's assignments as a single unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentChangeSet {
    /// Rows to insert; a row whose (subject, item) key already exists is skipped.
    pub insert: Vec<NewAssignment>,
    /// Assignment ids to delete.
    pub delete: Vec<AssignmentId>,
    /// Completion guard for deletes.
    pub delete_guard: DeleteGuard,
}

impl AssignmentChangeSet {
    /// Returns whether the change set carries no work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.delete.is_empty()
    }
}

/// Counts reported back by the store after applying one change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedAssignmentChanges {
    /// Rows inserted.
    pub inserted: u32,
    /// Inserts skipped because the key already existed.
    pub skipped: u32,
    /// Rows deleted.
    pub deleted: u32,
}

/// Result of marking one assignment as completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionTransition {
    /// Assignment row after the update.
    pub assignment: Assignment,
    /// True when this call set `completed_at`; false when it was already set.
    pub newly_completed: bool,
}

/// Port over the `user_assignments` store.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Lists all assignment rows of one subject, duplicates included.
    async fn list_assignments(&self, subject_id: SubjectId) -> AppResult<Vec<Assignment>>;

    /// Lists subjects owning at least one assignment row.
    async fn list_subjects_with_assignments(&self) -> AppResult<Vec<SubjectId>>;

    /// Applies one change set atomically: either every insert and delete lands or none does.
    async fn apply_changes(
        &self,
        subject_id: SubjectId,
        changes: AssignmentChangeSet,
    ) -> AppResult<AppliedAssignmentChanges>;

    /// Sets `completed_at` on the subject's row for `item`. The first completion wins.
    async fn mark_completed(
        &self,
        subject_id: SubjectId,
        item: ItemRef,
        completed_at: DateTime<Utc>,
    ) -> AppResult<Option<CompletionTransition>>;
}
