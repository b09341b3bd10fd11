use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use tutela_application::{
    AssignmentSyncService, IdentityRepository, MaintenanceSummary, OrphanCleanupMode,
    OrphanReport, SyncCounts, SyncOutcome,
};
use tutela_core::{AppResult, SubjectId};

/// One scheduled sweep over every subject.
#[derive(Clone)]
pub struct MaintenancePass {
    engine: AssignmentSyncService,
    identity: Arc<dyn IdentityRepository>,
    max_concurrency: usize,
    orphan_mode: OrphanCleanupMode,
}

#[derive(Debug, Default)]
pub struct PassSummary {
    pub duplicates: MaintenanceSummary,
    pub subjects_synced: u32,
    pub sync_counts: SyncCounts,
    pub sync_failures: Vec<SubjectId>,
    pub orphans: OrphanReport,
}

impl MaintenancePass {
    pub fn new(
        engine: AssignmentSyncService,
        identity: Arc<dyn IdentityRepository>,
        max_concurrency: usize,
        orphan_mode: OrphanCleanupMode,
    ) -> Self {
        Self {
            engine,
            identity,
            max_concurrency: max_concurrency.max(1),
            orphan_mode,
        }
    }

    /// Repairs duplicates, fully syncs every subject, then runs the orphan pass.
    ///
    /// Duplicates go first so the full sync never sees two rows for one key.
    pub async fn run(&self) -> AppResult<PassSummary> {
        let duplicates = self.engine.reconcile_duplicates(None).await?;

        let subjects = self.identity.list_subjects().await?;
        let tasks: Vec<_> = subjects
            .into_iter()
            .map(|subject_id| async move { (subject_id, self.engine.sync_subject(subject_id).await) })
            .collect();
        let results: Vec<(SubjectId, AppResult<SyncOutcome>)> = stream::iter(tasks)
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut summary = PassSummary {
            duplicates,
            ..PassSummary::default()
        };
        for (subject_id, result) in results {
            match result {
                Ok(outcome) => {
                    summary.subjects_synced += 1;
                    summary.sync_counts.absorb(outcome.counts);
                }
                Err(error) => {
                    warn!(
                        subject_id = %subject_id,
                        error = %error,
                        "scheduled subject sync failed"
                    );
                    summary.sync_failures.push(subject_id);
                }
            }
        }

        summary.orphans = self.engine.cleanup_orphans(None, self.orphan_mode).await?;

        info!(
            duplicates_removed = summary.duplicates.duplicates_removed,
            subjects_synced = summary.subjects_synced,
            added = summary.sync_counts.added,
            removed = summary.sync_counts.removed,
            sync_failures = summary.sync_failures.len(),
            orphans = summary.orphans.orphans.len(),
            orphans_removed = summary.orphans.removed,
            "maintenance pass finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests;
