use chrono::Utc;
use tracing::{debug, info};
use tutela_core::{AppError, AppResult, RoleId, SubjectId};
use tutela_domain::{ChangeLogEntry, SyncTrigger};

use crate::assignment_ports::SyncOutcome;

use super::{AssignmentSyncService, ReconcileScope};

impl AssignmentSyncService {
    /// Reconciles one subject's assignments with its current requirements.
    ///
    /// Running it twice in a row yields a no-op on the second call. A change log
    /// entry is written only when rows were added or removed.
    pub async fn sync_subject(&self, subject_id: SubjectId) -> AppResult<SyncOutcome> {
        self.with_subject_guard(subject_id, || async {
            let profile = self.load_subject(subject_id).await?;
            let applied = self
                .reconcile_subject(&profile, ReconcileScope::Full)
                .await?;
            let outcome = applied.outcome(subject_id);

            if outcome.is_noop() {
                debug!(subject_id = %subject_id, "subject assignments already in sync");
                return Ok(outcome);
            }

            self.record_change(ChangeLogEntry {
                subject_id,
                trigger: SyncTrigger::SubjectSync,
                old_role_id: profile.role_id,
                new_role_id: profile.role_id,
                assignments_removed: outcome.counts.removed,
                assignments_added: outcome.counts.added,
                changed_at: Utc::now(),
            })
            .await;

            info!(
                subject_id = %subject_id,
                added = outcome.counts.added,
                removed = outcome.counts.removed,
                skipped = outcome.counts.skipped,
                retained_completed = outcome.retained_completed,
                "subject assignments synced"
            );
            Ok(outcome)
        })
        .await
    }

    /// Persists a new role for the subject and reconciles against it.
    ///
    /// The role is stored first. If reconciliation then fails, repeating the call
    /// (or a plain `sync_subject`) converges the assignments.
    pub async fn change_role(
        &self,
        subject_id: SubjectId,
        new_role_id: Option<RoleId>,
    ) -> AppResult<SyncOutcome> {
        if let Some(role_id) = new_role_id
            && !self.catalog.role_exists(role_id).await?
        {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' does not exist"
            )));
        }

        self.with_subject_guard(subject_id, || async {
            let mut profile = self.load_subject(subject_id).await?;
            let old_role_id = profile.role_id;

            self.identity
                .set_subject_role(subject_id, new_role_id)
                .await?;
            profile.role_id = new_role_id;

            let applied = self
                .reconcile_subject(&profile, ReconcileScope::Full)
                .await?;
            let outcome = applied.outcome(subject_id);

            self.record_change(ChangeLogEntry {
                subject_id,
                trigger: SyncTrigger::RoleChange,
                old_role_id,
                new_role_id,
                assignments_removed: outcome.counts.removed,
                assignments_added: outcome.counts.added,
                changed_at: Utc::now(),
            })
            .await;

            info!(
                subject_id = %subject_id,
                old_role_id = ?old_role_id,
                new_role_id = ?new_role_id,
                added = outcome.counts.added,
                removed = outcome.counts.removed,
                "subject role changed"
            );
            Ok(outcome)
        })
        .await
    }
}
