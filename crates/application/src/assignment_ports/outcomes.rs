use tutela_core::SubjectId;
use tutela_domain::{Assignment, CompletionRecord, ItemRef, RequirementSource, SubjectProfile};

/// Added, removed and skipped counters shared by every sync entry point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    /// Assignments inserted.
    pub added: u32,
    /// Assignments deleted.
    pub removed: u32,
    /// Required items not inserted because a row or a completion already covered them.
    pub skipped: u32,
}

impl SyncCounts {
    /// Returns whether nothing was added or removed.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.removed == 0
    }

    /// Adds another set of counters into this one.
    pub fn absorb(&mut self, other: Self) {
        self.added += other.added;
        self.removed += other.removed;
        self.skipped += other.skipped;
    }
}

/// Result of syncing a single subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Subject that was synced.
    pub subject_id: SubjectId,
    /// Applied counters.
    pub counts: SyncCounts,
    /// Completed rows kept although no longer required.
    pub retained_completed: u32,
}

impl SyncOutcome {
    /// Returns whether the sync changed nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.counts.is_noop()
    }
}

/// How a department or group sync treats existing assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BulkSyncMode {
    /// Only insert missing rows for the scope's requirements.
    #[default]
    Additive,
    /// Fully reconcile every member, deleting stale requirement rows too.
    FullReconcile,
}

/// Result of a department or group sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSyncSummary {
    /// Members considered.
    pub members: u32,
    /// Assignments inserted across all members.
    pub inserted: u32,
    /// Assignments deleted across all members.
    pub removed: u32,
    /// Required items skipped across all members.
    pub skipped: u32,
    /// Members with at least one inserted or deleted row.
    pub users_affected: u32,
    /// Members whose sync failed; the rest were still processed.
    pub failed_subjects: Vec<SubjectId>,
}

impl BulkSyncSummary {
    /// Returns totals in the shared counter shape.
    #[must_use]
    pub fn counts(&self) -> SyncCounts {
        SyncCounts {
            added: self.inserted,
            removed: self.removed,
            skipped: self.skipped,
        }
    }
}

/// Result of a duplicate repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceSummary {
    /// Subjects inspected.
    pub subjects_scanned: u32,
    /// Subjects that had at least one duplicate key.
    pub subjects_repaired: u32,
    /// Duplicate rows deleted.
    pub duplicates_removed: u32,
    /// Completions copied to history from deleted duplicates.
    pub completions_mirrored: u32,
    /// Subjects whose repair failed.
    pub failed_subjects: Vec<SubjectId>,
}

impl MaintenanceSummary {
    /// Returns totals in the shared counter shape.
    #[must_use]
    pub fn counts(&self) -> SyncCounts {
        SyncCounts {
            added: 0,
            removed: self.duplicates_removed,
            skipped: 0,
        }
    }
}

/// Whether the orphan pass only reports or also deletes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanCleanupMode {
    /// List orphans without touching them.
    #[default]
    Report,
    /// Delete the orphans that are still incomplete.
    Remove,
}

/// Result of an orphan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanReport {
    /// Subjects inspected.
    pub subjects_scanned: u32,
    /// Orphaned rows found.
    pub orphans: Vec<Assignment>,
    /// Rows actually deleted; zero in report mode.
    pub removed: u32,
    /// Subjects whose pass failed.
    pub failed_subjects: Vec<SubjectId>,
}

impl OrphanReport {
    /// Returns totals in the shared counter shape.
    #[must_use]
    pub fn counts(&self) -> SyncCounts {
        SyncCounts {
            added: 0,
            removed: self.removed,
            skipped: 0,
        }
    }
}

/// One required item and every source that requires it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequirement {
    /// Required item.
    pub item: ItemRef,
    /// Role, department or group links requiring it.
    pub sources: Vec<RequirementSource>,
}

/// Read model describing a subject's training state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingStatus {
    /// Subject and memberships.
    pub subject: SubjectProfile,
    /// Currently required items.
    pub requirements: Vec<ResolvedRequirement>,
    /// Current assignment rows.
    pub assignments: Vec<Assignment>,
    /// Completions of required items that have no assignment row.
    pub completed_history: Vec<CompletionRecord>,
}
