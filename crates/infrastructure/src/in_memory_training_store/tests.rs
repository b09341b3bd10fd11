use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tutela_application::{
    AssignmentChangeSet, AssignmentRepository, AssignmentSyncService, BulkSyncMode,
    CompletionRepository, DeleteGuard, SyncSettings,
};
use tutela_core::{AssignmentId, DepartmentId, ItemId, RoleId, SubjectId};
use tutela_domain::{Assignment, AssignmentOrigin, ItemRef, NewAssignment, SubjectProfile};

use super::InMemoryTrainingStore;
use crate::InMemorySubjectLeaseCoordinator;

fn service(store: &Arc<InMemoryTrainingStore>) -> AssignmentSyncService {
    AssignmentSyncService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        SyncSettings::default(),
    )
}

fn raw_row(subject_id: SubjectId, item: ItemRef, completed: bool, age_days: i64) -> Assignment {
    let assigned_at = Utc::now() - Duration::days(age_days);
    Assignment {
        assignment_id: AssignmentId::new(),
        subject_id,
        item,
        origin: AssignmentOrigin::Legacy,
        assigned_at,
        due_at: None,
        completed_at: completed.then_some(assigned_at + Duration::hours(1)),
    }
}

async fn items_of(store: &InMemoryTrainingStore, subject_id: SubjectId) -> BTreeSet<ItemRef> {
    store
        .list_assignments(subject_id)
        .await
        .map(|rows| rows.into_iter().map(|row| row.item).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn colliding_insert_is_reported_as_skipped() {
    let store = InMemoryTrainingStore::new();
    let subject_id = SubjectId::new();
    let item = ItemRef::module(ItemId::new());
    store.insert_raw_assignment(raw_row(subject_id, item, false, 1)).await;

    let applied = store
        .apply_changes(
            subject_id,
            AssignmentChangeSet {
                insert: vec![NewAssignment::from_requirement(
                    subject_id,
                    item,
                    Utc::now(),
                    None,
                )],
                delete: Vec::new(),
                delete_guard: DeleteGuard::IncompleteOnly,
            },
        )
        .await;

    assert!(matches!(applied, Ok(applied) if applied.inserted == 0 && applied.skipped == 1));
}

#[tokio::test]
async fn guarded_delete_keeps_completed_rows() {
    let store = InMemoryTrainingStore::new();
    let subject_id = SubjectId::new();
    let done = raw_row(subject_id, ItemRef::module(ItemId::new()), true, 3);
    let open = raw_row(subject_id, ItemRef::document(ItemId::new()), false, 3);
    let ids = vec![done.assignment_id, open.assignment_id];
    store.insert_raw_assignment(done).await;
    store.insert_raw_assignment(open).await;

    let applied = store
        .apply_changes(
            subject_id,
            AssignmentChangeSet {
                insert: Vec::new(),
                delete: ids,
                delete_guard: DeleteGuard::IncompleteOnly,
            },
        )
        .await;

    assert!(matches!(applied, Ok(applied) if applied.deleted == 1));
    assert_eq!(store.list_assignments(subject_id).await.map(|rows| rows.len()).ok(), Some(1));
}

#[tokio::test]
async fn injected_failure_leaves_rows_untouched() {
    let store = InMemoryTrainingStore::new();
    let subject_id = SubjectId::new();
    store.fail_next_apply();

    let applied = store
        .apply_changes(
            subject_id,
            AssignmentChangeSet {
                insert: vec![NewAssignment::from_requirement(
                    subject_id,
                    ItemRef::module(ItemId::new()),
                    Utc::now(),
                    None,
                )],
                delete: Vec::new(),
                delete_guard: DeleteGuard::IncompleteOnly,
            },
        )
        .await;

    assert!(matches!(applied, Err(ref error) if error.is_transient()));
    assert!(items_of(&store, subject_id).await.is_empty());
}

#[tokio::test]
async fn completion_records_are_idempotent() {
    let store = InMemoryTrainingStore::new();
    let subject_id = SubjectId::new();
    let item = ItemRef::document(ItemId::new());
    let record = tutela_domain::CompletionRecord {
        subject_id,
        item,
        completed_at: Utc::now(),
        completed_under_role_id: None,
    };

    assert!(store.record_completion(record.clone()).await.is_ok());
    assert!(store.record_completion(record).await.is_ok());

    assert_eq!(store.list_completions(subject_id).await.map(|rows| rows.len()).ok(), Some(1));
    assert!(matches!(store.has_completed(subject_id, item).await, Ok(true)));
}

#[tokio::test]
async fn department_scenario_runs_end_to_end() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let department_id = DepartmentId::new();
    let item = ItemRef::module(ItemId::new());
    store.insert_department(department_id).await;
    store.add_department_requirement(department_id, item).await;
    for _ in 0..10 {
        store
            .insert_subject(SubjectProfile::new(SubjectId::new()).with_department(department_id))
            .await;
    }
    let engine = service(&store);

    let first = engine
        .sync_department(department_id, BulkSyncMode::Additive)
        .await;
    let second = engine
        .sync_department(department_id, BulkSyncMode::Additive)
        .await;

    assert!(matches!(first, Ok(ref summary) if summary.inserted == 10 && summary.users_affected == 10));
    assert!(matches!(second, Ok(ref summary) if summary.inserted == 0));
}

#[tokio::test]
async fn role_change_scenario_with_lease_coordinator() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let (role_a, role_b) = (RoleId::new(), RoleId::new());
    let (m1, m2) = (ItemRef::module(ItemId::new()), ItemRef::module(ItemId::new()));
    store.insert_role(role_a, None).await;
    store.insert_role(role_b, None).await;
    store.add_role_requirement(role_a, m1).await;
    store.add_role_requirement(role_b, m2).await;
    let subject_id = SubjectId::new();
    store
        .insert_subject(SubjectProfile::new(subject_id).with_role(role_a))
        .await;
    let engine = service(&store)
        .with_lease_coordinator(Arc::new(InMemorySubjectLeaseCoordinator::new()), "test-node");

    assert!(engine.sync_subject(subject_id).await.is_ok());
    let outcome = engine.change_role(subject_id, Some(role_b)).await;

    assert!(matches!(
        outcome,
        Ok(ref outcome) if outcome.counts.added == 1 && outcome.counts.removed == 1
    ));
    assert_eq!(items_of(&store, subject_id).await, BTreeSet::from([m2]));

    let log = engine.change_log(subject_id, 10).await;
    assert!(matches!(log, Ok(ref entries) if entries.len() == 2));
}

#[tokio::test]
async fn orphans_of_removed_subject_are_cleaned() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let subject_id = SubjectId::new();
    store.insert_subject(SubjectProfile::new(subject_id)).await;
    store
        .insert_raw_assignment(raw_row(subject_id, ItemRef::module(ItemId::new()), false, 5))
        .await;
    store.remove_subject(subject_id).await;
    let engine = service(&store);

    let report = engine
        .cleanup_orphans(None, tutela_application::OrphanCleanupMode::Remove)
        .await;

    assert!(matches!(report, Ok(ref report) if report.removed == 1 && report.orphans.len() == 1));
    assert!(items_of(&store, subject_id).await.is_empty());
}
