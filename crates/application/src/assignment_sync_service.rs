use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use tutela_core::{AppError, AppResult, SubjectId};
use tutela_domain::{
    Assignment, AssignmentSchedule, ChangeLogEntry, ItemRef, ReconciliationPlan, SubjectProfile,
    plan_additions, plan_reconciliation, unrequired_legacy_items,
};

use crate::assignment_ports::{
    AppliedAssignmentChanges, AssignmentChangeSet, AssignmentRepository, CatalogRepository,
    ChangeLogRepository, CompletionRepository, DeleteGuard, IdentityRepository,
    SubjectLeaseCoordinator, SyncCounts, SyncOutcome,
};
use crate::requirement_resolver::RequirementResolver;
use crate::sync_settings::SyncSettings;

mod bulk;
mod completion;
mod maintenance;
mod subject_guard;
mod subject_sync;


use subject_guard::SubjectLocks;

/// Keeps assignment rows in line with role, department and group requirements.
#[derive(Clone)]
pub struct AssignmentSyncService {
    identity: Arc<dyn IdentityRepository>,
    catalog: Arc<dyn CatalogRepository>,
    resolver: RequirementResolver,
    assignments: Arc<dyn AssignmentRepository>,
    completions: Arc<dyn CompletionRepository>,
    change_log: Arc<dyn ChangeLogRepository>,
    settings: SyncSettings,
    subject_locks: SubjectLocks,
    lease_coordinator: Option<Arc<dyn SubjectLeaseCoordinator>>,
    lease_holder_id: String,
}

/// Which half of reconciliation a subject run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReconcileScope {
    Full,
    AdditiveOnly,
}

/// Plan plus the store's applied counts for one subject run.
struct AppliedPlan {
    plan: ReconciliationPlan,
    applied: AppliedAssignmentChanges,
}

impl AppliedPlan {
    fn counts(&self) -> SyncCounts {
        SyncCounts {
            added: self.applied.inserted,
            removed: self.applied.deleted,
            skipped: self.applied.skipped + count(self.plan.already_satisfied.len()),
        }
    }

    fn outcome(&self, subject_id: SubjectId) -> SyncOutcome {
        SyncOutcome {
            subject_id,
            counts: self.counts(),
            retained_completed: count(self.plan.retained_completed.len()),
        }
    }
}

impl AssignmentSyncService {
    /// Creates a sync service.
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityRepository>,
        catalog: Arc<dyn CatalogRepository>,
        assignments: Arc<dyn AssignmentRepository>,
        completions: Arc<dyn CompletionRepository>,
        change_log: Arc<dyn ChangeLogRepository>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            identity,
            resolver: RequirementResolver::new(catalog.clone()),
            catalog,
            assignments,
            completions,
            change_log,
            settings,
            subject_locks: SubjectLocks::default(),
            lease_coordinator: None,
            lease_holder_id: "local".to_owned(),
        }
    }

    /// Adds cross-process serialization through a lease coordinator.
    #[must_use]
    pub fn with_lease_coordinator(
        mut self,
        lease_coordinator: Arc<dyn SubjectLeaseCoordinator>,
        holder_id: impl Into<String>,
    ) -> Self {
        self.lease_coordinator = Some(lease_coordinator);
        self.lease_holder_id = holder_id.into();
        self
    }

    async fn load_subject(&self, subject_id: SubjectId) -> AppResult<SubjectProfile> {
        self.identity
            .find_subject(subject_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("subject '{subject_id}' does not exist")))
    }

    async fn reconcile_subject(
        &self,
        profile: &SubjectProfile,
        scope: ReconcileScope,
    ) -> AppResult<AppliedPlan> {
        let required = self.resolver.resolve(profile).await?;
        self.reconcile_against(profile.subject_id, &required, scope)
            .await
    }

    async fn reconcile_against(
        &self,
        subject_id: SubjectId,
        required: &BTreeSet<ItemRef>,
        scope: ReconcileScope,
    ) -> AppResult<AppliedPlan> {
        let current = self.assignments.list_assignments(subject_id).await?;
        let completed_items = self.completions.completed_items(subject_id).await?;
        let schedule = AssignmentSchedule::starting_at(Utc::now(), self.settings.default_due_days);

        let plan = match scope {
            ReconcileScope::Full => {
                let trailed_items = self.trailed_legacy_items(&current, required).await?;
                plan_reconciliation(
                    subject_id,
                    required,
                    &current,
                    &completed_items,
                    &trailed_items,
                    schedule,
                )
            }
            ReconcileScope::AdditiveOnly => {
                plan_additions(subject_id, required, &current, &completed_items, schedule)
            }
        };

        if plan.is_noop() {
            return Ok(AppliedPlan {
                plan,
                applied: AppliedAssignmentChanges::default(),
            });
        }

        let applied = self
            .assignments
            .apply_changes(
                subject_id,
                AssignmentChangeSet {
                    insert: plan.to_insert.clone(),
                    delete: plan.to_delete.clone(),
                    delete_guard: DeleteGuard::IncompleteOnly,
                },
            )
            .await?;

        Ok(AppliedPlan { plan, applied })
    }

    /// Legacy rows whose item still appears in some requirement table.
    async fn trailed_legacy_items(
        &self,
        current: &[Assignment],
        required: &BTreeSet<ItemRef>,
    ) -> AppResult<BTreeSet<ItemRef>> {
        let candidates = unrequired_legacy_items(current, required);
        if candidates.is_empty() {
            return Ok(candidates);
        }
        self.catalog.items_with_requirement_trail(&candidates).await
    }

    /// Appends one change log entry. A failed append never fails the sync that produced it.
    async fn record_change(&self, entry: ChangeLogEntry) {
        let subject_id = entry.subject_id;
        let trigger = entry.trigger;
        if let Err(error) = self.change_log.append_entry(entry).await {
            warn!(
                subject_id = %subject_id,
                trigger = trigger.as_str(),
                error = %error,
                "failed to append assignment change log entry"
            );
        }
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}
