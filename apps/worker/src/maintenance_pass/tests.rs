use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tutela_application::{
    AssignmentRepository, AssignmentSyncService, OrphanCleanupMode, SyncSettings,
};
use tutela_core::{AssignmentId, ItemId, RoleId, SubjectId};
use tutela_domain::{Assignment, AssignmentOrigin, ItemRef, SubjectProfile};
use tutela_infrastructure::InMemoryTrainingStore;

use super::MaintenancePass;

fn pass(store: &Arc<InMemoryTrainingStore>, orphan_mode: OrphanCleanupMode) -> MaintenancePass {
    let engine = AssignmentSyncService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        SyncSettings::default(),
    );
    MaintenancePass::new(engine, store.clone(), 2, orphan_mode)
}

fn legacy_row(subject_id: SubjectId, item: ItemRef, age_days: i64) -> Assignment {
    Assignment {
        assignment_id: AssignmentId::new(),
        subject_id,
        item,
        origin: AssignmentOrigin::Legacy,
        assigned_at: Utc::now() - Duration::days(age_days),
        due_at: None,
        completed_at: None,
    }
}

async fn items_of(store: &InMemoryTrainingStore, subject_id: SubjectId) -> Vec<ItemRef> {
    let mut items: Vec<ItemRef> = store
        .list_assignments(subject_id)
        .await
        .map(|rows| rows.into_iter().map(|row| row.item).collect())
        .unwrap_or_default();
    items.sort();
    items
}

#[tokio::test]
async fn pass_repairs_duplicates_before_syncing() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let role_id = RoleId::new();
    let (kept, missing) = (ItemRef::module(ItemId::new()), ItemRef::document(ItemId::new()));
    store.insert_role(role_id, None).await;
    store.add_role_requirement(role_id, kept).await;
    store.add_role_requirement(role_id, missing).await;
    let subject_id = SubjectId::new();
    store
        .insert_subject(SubjectProfile::new(subject_id).with_role(role_id))
        .await;
    store.insert_raw_assignment(legacy_row(subject_id, kept, 10)).await;
    store.insert_raw_assignment(legacy_row(subject_id, kept, 2)).await;

    let summary = pass(&store, OrphanCleanupMode::Report).run().await;

    assert!(matches!(
        summary,
        Ok(ref summary) if summary.duplicates.duplicates_removed == 1
            && summary.subjects_synced == 1
            && summary.sync_counts.added == 1
            && summary.sync_failures.is_empty()
    ));
    let mut expected = vec![kept, missing];
    expected.sort();
    assert_eq!(items_of(&store, subject_id).await, expected);
}

#[tokio::test]
async fn second_pass_changes_nothing() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let role_id = RoleId::new();
    store.insert_role(role_id, None).await;
    store
        .add_role_requirement(role_id, ItemRef::module(ItemId::new()))
        .await;
    for _ in 0..5 {
        store
            .insert_subject(SubjectProfile::new(SubjectId::new()).with_role(role_id))
            .await;
    }
    let pass = pass(&store, OrphanCleanupMode::Remove);

    let first = pass.run().await;
    let second = pass.run().await;

    assert!(matches!(first, Ok(ref summary) if summary.sync_counts.added == 5));
    assert!(matches!(
        second,
        Ok(ref summary) if summary.sync_counts.is_noop()
            && summary.duplicates.duplicates_removed == 0
            && summary.orphans.removed == 0
    ));
}

#[tokio::test]
async fn removal_mode_drops_legacy_orphans() {
    let store = Arc::new(InMemoryTrainingStore::new());
    let subject_id = SubjectId::new();
    store.insert_subject(SubjectProfile::new(subject_id)).await;
    let stale = ItemRef::module(ItemId::new());
    store.insert_raw_assignment(legacy_row(subject_id, stale, 30)).await;

    let report_only = pass(&store, OrphanCleanupMode::Report).run().await;
    let after_report: BTreeSet<ItemRef> = items_of(&store, subject_id).await.into_iter().collect();
    let removal = pass(&store, OrphanCleanupMode::Remove).run().await;

    assert!(matches!(report_only, Ok(ref summary) if summary.orphans.orphans.len() == 1));
    assert_eq!(after_report, BTreeSet::from([stale]));
    assert!(matches!(removal, Ok(ref summary) if summary.orphans.removed == 1));
    assert!(items_of(&store, subject_id).await.is_empty());
}
