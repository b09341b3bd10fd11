use std::collections::BTreeSet;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use tutela_core::{AppError, AppResult, DepartmentId, GroupId, SubjectId};
use tutela_domain::{ChangeLogEntry, ItemRef, SubjectProfile, SyncTrigger};

use crate::assignment_ports::{BulkSyncMode, BulkSyncSummary, SyncCounts};

use super::{AssignmentSyncService, ReconcileScope};

/// Department or group targeted by a bulk sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkScope {
    Department(DepartmentId),
    Group(GroupId),
}

impl BulkScope {
    fn trigger(self) -> SyncTrigger {
        match self {
            Self::Department(_) => SyncTrigger::DepartmentSync,
            Self::Group(_) => SyncTrigger::GroupSync,
        }
    }

    fn still_applies_to(self, profile: &SubjectProfile) -> bool {
        match self {
            Self::Department(department_id) => profile.department_id == Some(department_id),
            Self::Group(group_id) => profile.group_ids.contains(&group_id),
        }
    }
}

/// Per-member result inside one bulk run.
enum MemberResult {
    Synced(SyncCounts),
    Left,
}

impl AssignmentSyncService {
    /// Brings every member of a department in line with the department's requirements.
    ///
    /// The default additive mode inserts missing rows only. Running it twice yields
    /// zero inserts on the second run.
    pub async fn sync_department(
        &self,
        department_id: DepartmentId,
        mode: BulkSyncMode,
    ) -> AppResult<BulkSyncSummary> {
        if !self.catalog.department_exists(department_id).await? {
            return Err(AppError::NotFound(format!(
                "department '{department_id}' does not exist"
            )));
        }

        let required = self.catalog.department_requirements(department_id).await?;
        let members = self.identity.list_department_members(department_id).await?;
        self.sync_members(BulkScope::Department(department_id), mode, &required, members)
            .await
    }

    /// Brings every member of a group in line with the group's requirements.
    pub async fn sync_group(
        &self,
        group_id: GroupId,
        mode: BulkSyncMode,
    ) -> AppResult<BulkSyncSummary> {
        if !self.catalog.group_exists(group_id).await? {
            return Err(AppError::NotFound(format!(
                "group '{group_id}' does not exist"
            )));
        }

        let required = self.catalog.group_requirements(group_id).await?;
        let members = self.identity.list_group_members(group_id).await?;
        self.sync_members(BulkScope::Group(group_id), mode, &required, members)
            .await
    }

    async fn sync_members(
        &self,
        scope: BulkScope,
        mode: BulkSyncMode,
        required: &BTreeSet<ItemRef>,
        members: Vec<SubjectId>,
    ) -> AppResult<BulkSyncSummary> {
        let mut summary = BulkSyncSummary::default();

        let tasks: Vec<_> = members
            .into_iter()
            .map(|subject_id| async move {
                let result = self.sync_member(scope, mode, required, subject_id).await;
                (subject_id, result)
            })
            .collect();
        let results: Vec<(SubjectId, AppResult<MemberResult>)> = stream::iter(tasks)
            .buffer_unordered(self.settings.max_concurrency)
            .collect()
            .await;

        for (subject_id, result) in results {
            match result {
                Ok(MemberResult::Synced(counts)) => {
                    summary.members += 1;
                    summary.inserted += counts.added;
                    summary.removed += counts.removed;
                    summary.skipped += counts.skipped;
                    if !counts.is_noop() {
                        summary.users_affected += 1;
                    }
                }
                Ok(MemberResult::Left) => {}
                Err(error) => {
                    summary.members += 1;
                    warn!(
                        subject_id = %subject_id,
                        scope = ?scope,
                        error = %error,
                        "bulk assignment sync failed for subject"
                    );
                    summary.failed_subjects.push(subject_id);
                }
            }
        }

        info!(
            scope = ?scope,
            mode = ?mode,
            members = summary.members,
            inserted = summary.inserted,
            removed = summary.removed,
            users_affected = summary.users_affected,
            failed = summary.failed_subjects.len(),
            "bulk assignment sync finished"
        );
        Ok(summary)
    }

    async fn sync_member(
        &self,
        scope: BulkScope,
        mode: BulkSyncMode,
        required: &BTreeSet<ItemRef>,
        subject_id: SubjectId,
    ) -> AppResult<MemberResult> {
        self.with_subject_guard(subject_id, || async {
            let Some(profile) = self.identity.find_subject(subject_id).await? else {
                return Ok(MemberResult::Left);
            };
            // Membership may have changed between listing and locking.
            if !scope.still_applies_to(&profile) {
                return Ok(MemberResult::Left);
            }

            let applied = match mode {
                BulkSyncMode::Additive => {
                    self.reconcile_against(subject_id, required, ReconcileScope::AdditiveOnly)
                        .await?
                }
                BulkSyncMode::FullReconcile => {
                    self.reconcile_subject(&profile, ReconcileScope::Full)
                        .await?
                }
            };
            let counts = applied.counts();

            if !counts.is_noop() {
                self.record_change(ChangeLogEntry {
                    subject_id,
                    trigger: scope.trigger(),
                    old_role_id: profile.role_id,
                    new_role_id: profile.role_id,
                    assignments_removed: counts.removed,
                    assignments_added: counts.added,
                    changed_at: Utc::now(),
                })
                .await;
            }

            Ok(MemberResult::Synced(counts))
        })
        .await
    }
}
