use std::collections::BTreeSet;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use tutela_core::{AppResult, SubjectId};
use tutela_domain::{
    Assignment, ChangeLogEntry, CompletionRecord, SyncTrigger, find_orphans, plan_duplicate_repair,
};

use crate::assignment_ports::{
    AssignmentChangeSet, DeleteGuard, MaintenanceSummary, OrphanCleanupMode, OrphanReport,
};

use super::{AssignmentSyncService, count};

/// Outcome of repairing one subject.
#[derive(Default)]
struct DuplicateRepair {
    removed: u32,
    mirrored: u32,
}

impl AssignmentSyncService {
    /// Collapses duplicate (subject, item) rows to a single row per key.
    ///
    /// A completed row is preferred as the survivor, then the earliest assigned
    /// one. Completions carried by deleted rows are copied into the completion
    /// history before the rows go away.
    pub async fn reconcile_duplicates(
        &self,
        subject_id: Option<SubjectId>,
    ) -> AppResult<MaintenanceSummary> {
        let subjects = self.maintenance_targets(subject_id).await?;
        let mut summary = MaintenanceSummary::default();

        let tasks: Vec<_> = subjects
            .into_iter()
            .map(|subject_id| async move {
                (subject_id, self.repair_subject_duplicates(subject_id).await)
            })
            .collect();
        let results: Vec<(SubjectId, AppResult<DuplicateRepair>)> = stream::iter(tasks)
            .buffer_unordered(self.settings.max_concurrency)
            .collect()
            .await;

        for (subject_id, result) in results {
            summary.subjects_scanned += 1;
            match result {
                Ok(repair) => {
                    if repair.removed > 0 {
                        summary.subjects_repaired += 1;
                    }
                    summary.duplicates_removed += repair.removed;
                    summary.completions_mirrored += repair.mirrored;
                }
                Err(error) => {
                    warn!(
                        subject_id = %subject_id,
                        error = %error,
                        "duplicate assignment repair failed for subject"
                    );
                    summary.failed_subjects.push(subject_id);
                }
            }
        }

        info!(
            subjects_scanned = summary.subjects_scanned,
            subjects_repaired = summary.subjects_repaired,
            duplicates_removed = summary.duplicates_removed,
            completions_mirrored = summary.completions_mirrored,
            "duplicate assignment repair finished"
        );
        Ok(summary)
    }

    /// Finds incomplete, non-manual rows whose item no current source requires.
    ///
    /// Report mode lists them only. Remove mode deletes them and logs one entry per
    /// affected subject. Subjects missing from the identity store require nothing.
    pub async fn cleanup_orphans(
        &self,
        subject_id: Option<SubjectId>,
        mode: OrphanCleanupMode,
    ) -> AppResult<OrphanReport> {
        let subjects = self.maintenance_targets(subject_id).await?;
        let mut report = OrphanReport::default();

        let tasks: Vec<_> = subjects
            .into_iter()
            .map(|subject_id| async move {
                (subject_id, self.cleanup_subject_orphans(subject_id, mode).await)
            })
            .collect();
        let results: Vec<(SubjectId, AppResult<(Vec<Assignment>, u32)>)> = stream::iter(tasks)
            .buffer_unordered(self.settings.max_concurrency)
            .collect()
            .await;

        for (subject_id, result) in results {
            report.subjects_scanned += 1;
            match result {
                Ok((orphans, removed)) => {
                    report.orphans.extend(orphans);
                    report.removed += removed;
                }
                Err(error) => {
                    warn!(
                        subject_id = %subject_id,
                        error = %error,
                        "orphan assignment pass failed for subject"
                    );
                    report.failed_subjects.push(subject_id);
                }
            }
        }

        report
            .orphans
            .sort_by_key(|row| (row.subject_id, row.item, row.assigned_at));

        info!(
            mode = ?mode,
            subjects_scanned = report.subjects_scanned,
            orphans = report.orphans.len(),
            removed = report.removed,
            "orphan assignment pass finished"
        );
        Ok(report)
    }

    async fn maintenance_targets(&self, subject_id: Option<SubjectId>) -> AppResult<Vec<SubjectId>> {
        match subject_id {
            Some(subject_id) => Ok(vec![subject_id]),
            None => self.assignments.list_subjects_with_assignments().await,
        }
    }

    async fn repair_subject_duplicates(&self, subject_id: SubjectId) -> AppResult<DuplicateRepair> {
        self.with_subject_guard(subject_id, || async {
            let current = self.assignments.list_assignments(subject_id).await?;
            let plan = plan_duplicate_repair(&current);
            if plan.is_noop() {
                return Ok(DuplicateRepair::default());
            }

            let role_id = self
                .identity
                .find_subject(subject_id)
                .await?
                .and_then(|profile| profile.role_id);

            let mut mirrored = 0;
            for row in &plan.to_delete {
                let Some(completed_at) = row.completed_at else {
                    continue;
                };
                self.completions
                    .record_completion(CompletionRecord {
                        subject_id,
                        item: row.item,
                        completed_at,
                        completed_under_role_id: role_id,
                    })
                    .await?;
                mirrored += 1;
            }

            let applied = self
                .assignments
                .apply_changes(
                    subject_id,
                    AssignmentChangeSet {
                        insert: Vec::new(),
                        delete: plan.to_delete.iter().map(|row| row.assignment_id).collect(),
                        delete_guard: DeleteGuard::Unrestricted,
                    },
                )
                .await?;

            if applied.deleted > 0 {
                self.record_change(ChangeLogEntry {
                    subject_id,
                    trigger: SyncTrigger::DuplicateRepair,
                    old_role_id: role_id,
                    new_role_id: role_id,
                    assignments_removed: applied.deleted,
                    assignments_added: 0,
                    changed_at: Utc::now(),
                })
                .await;
            }

            Ok(DuplicateRepair {
                removed: applied.deleted,
                mirrored,
            })
        })
        .await
    }

    async fn cleanup_subject_orphans(
        &self,
        subject_id: SubjectId,
        mode: OrphanCleanupMode,
    ) -> AppResult<(Vec<Assignment>, u32)> {
        self.with_subject_guard(subject_id, || async {
            let profile = self.identity.find_subject(subject_id).await?;
            let required = match &profile {
                Some(profile) => self.resolver.resolve(profile).await?,
                None => BTreeSet::new(),
            };
            let current = self.assignments.list_assignments(subject_id).await?;
            let orphans = find_orphans(&current, &required);

            if mode == OrphanCleanupMode::Report || orphans.is_empty() {
                return Ok((orphans, 0));
            }

            let applied = self
                .assignments
                .apply_changes(
                    subject_id,
                    AssignmentChangeSet {
                        insert: Vec::new(),
                        delete: orphans.iter().map(|row| row.assignment_id).collect(),
                        delete_guard: DeleteGuard::IncompleteOnly,
                    },
                )
                .await?;

            if applied.deleted > 0 {
                let role_id = profile.as_ref().and_then(|profile| profile.role_id);
                self.record_change(ChangeLogEntry {
                    subject_id,
                    trigger: SyncTrigger::OrphanCleanup,
                    old_role_id: role_id,
                    new_role_id: role_id,
                    assignments_removed: applied.deleted,
                    assignments_added: 0,
                    changed_at: Utc::now(),
                })
                .await;
            }

            info!(
                subject_id = %subject_id,
                orphans = count(orphans.len()),
                removed = applied.deleted,
                "orphan assignments removed"
            );
            Ok((orphans, applied.deleted))
        })
        .await
    }
}
