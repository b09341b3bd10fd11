use std::collections::BTreeSet;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tutela_core::{AssignmentId, ItemId, SubjectId};

use super::{
    AssignmentSchedule, find_orphans, plan_additions, plan_duplicate_repair, plan_reconciliation,
    unrequired_legacy_items,
};
use crate::{Assignment, AssignmentOrigin, ItemRef};

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn row(subject_id: SubjectId, item: ItemRef, origin: AssignmentOrigin) -> Assignment {
    Assignment {
        assignment_id: AssignmentId::new(),
        subject_id,
        item,
        origin,
        assigned_at: at(8),
        due_at: None,
        completed_at: None,
    }
}

fn schedule() -> AssignmentSchedule {
    AssignmentSchedule::starting_at(at(12), None)
}

#[test]
fn inserts_missing_and_deletes_stale_requirement_rows() {
    let subject_id = SubjectId::new();
    let x = ItemRef::module(ItemId::new());
    let y = ItemRef::module(ItemId::new());
    let z = ItemRef::document(ItemId::new());
    let current = vec![
        row(subject_id, x, AssignmentOrigin::Requirement),
        row(subject_id, y, AssignmentOrigin::Requirement),
    ];
    let required = BTreeSet::from([y, z]);

    let plan = plan_reconciliation(
        subject_id,
        &required,
        &current,
        &BTreeSet::new(),
        &BTreeSet::new(),
        schedule(),
    );

    assert_eq!(plan.to_delete, vec![current[0].assignment_id]);
    assert_eq!(plan.to_insert.len(), 1);
    assert_eq!(plan.to_insert[0].item, z);
    assert_eq!(plan.to_insert[0].assigned_at, at(12));
}

#[test]
fn completed_rows_are_retained_even_when_not_required() {
    let subject_id = SubjectId::new();
    let x = ItemRef::module(ItemId::new());
    let mut completed = row(subject_id, x, AssignmentOrigin::Requirement);
    completed.completed_at = Some(at(9));
    let current = vec![completed.clone()];

    let plan = plan_reconciliation(
        subject_id,
        &BTreeSet::new(),
        &current,
        &BTreeSet::new(),
        &BTreeSet::new(),
        schedule(),
    );

    assert!(plan.to_delete.is_empty());
    assert_eq!(plan.retained_completed, vec![completed.assignment_id]);
    assert!(plan.is_noop());
}

#[test]
fn previously_completed_items_are_not_resurrected() {
    let subject_id = SubjectId::new();
    let x = ItemRef::module(ItemId::new());
    let required = BTreeSet::from([x]);
    let completed_items = BTreeSet::from([x]);

    let plan = plan_reconciliation(
        subject_id,
        &required,
        &[],
        &completed_items,
        &BTreeSet::new(),
        schedule(),
    );

    assert!(plan.to_insert.is_empty());
    assert_eq!(plan.already_satisfied, vec![x]);
}

#[test]
fn manual_and_legacy_rows_are_left_to_orphan_pass() {
    let subject_id = SubjectId::new();
    let current = vec![
        row(subject_id, ItemRef::module(ItemId::new()), AssignmentOrigin::Manual),
        row(subject_id, ItemRef::module(ItemId::new()), AssignmentOrigin::Legacy),
    ];

    let plan = plan_reconciliation(
        subject_id,
        &BTreeSet::new(),
        &current,
        &BTreeSet::new(),
        &BTreeSet::new(),
        schedule(),
    );

    assert!(plan.is_noop());
}

#[test]
fn legacy_rows_with_requirement_trail_are_reconciled() {
    let subject_id = SubjectId::new();
    let x = ItemRef::module(ItemId::new());
    let y = ItemRef::module(ItemId::new());
    let z = ItemRef::document(ItemId::new());
    let current = vec![
        row(subject_id, x, AssignmentOrigin::Legacy),
        row(subject_id, y, AssignmentOrigin::Legacy),
    ];
    let required = BTreeSet::from([y, z]);
    let trailed_items = unrequired_legacy_items(&current, &required);
    assert_eq!(trailed_items, BTreeSet::from([x]));

    let plan = plan_reconciliation(
        subject_id,
        &required,
        &current,
        &BTreeSet::new(),
        &trailed_items,
        schedule(),
    );

    assert_eq!(plan.to_insert.len(), 1);
    assert_eq!(plan.to_delete, vec![current[0].assignment_id]);
}

#[test]
fn additions_never_delete() {
    let subject_id = SubjectId::new();
    let stale = row(
        subject_id,
        ItemRef::module(ItemId::new()),
        AssignmentOrigin::Requirement,
    );
    let wanted = ItemRef::document(ItemId::new());

    let plan = plan_additions(
        subject_id,
        &BTreeSet::from([wanted]),
        &[stale],
        &BTreeSet::new(),
        schedule(),
    );

    assert!(plan.to_delete.is_empty());
    assert_eq!(plan.to_insert.len(), 1);
}

#[test]
fn schedule_applies_due_days() {
    let schedule = AssignmentSchedule::starting_at(at(0), Some(14));
    assert_eq!(schedule.due_at, Some(at(0) + Duration::days(14)));
}

#[test]
fn duplicate_repair_prefers_completed_row() {
    let subject_id = SubjectId::new();
    let item = ItemRef::module(ItemId::new());
    let mut earliest_incomplete = row(subject_id, item, AssignmentOrigin::Requirement);
    earliest_incomplete.assigned_at = at(1);
    let mut later_completed = row(subject_id, item, AssignmentOrigin::Legacy);
    later_completed.assigned_at = at(5);
    later_completed.completed_at = Some(at(6));

    let plan = plan_duplicate_repair(&[earliest_incomplete.clone(), later_completed.clone()]);

    assert_eq!(plan.to_delete, vec![earliest_incomplete]);
}

#[test]
fn duplicate_repair_keeps_earliest_when_none_completed() {
    let subject_id = SubjectId::new();
    let item = ItemRef::document(ItemId::new());
    let mut first = row(subject_id, item, AssignmentOrigin::Legacy);
    first.assigned_at = at(2);
    let mut second = row(subject_id, item, AssignmentOrigin::Requirement);
    second.assigned_at = at(3);
    let unrelated = row(
        subject_id,
        ItemRef::module(ItemId::new()),
        AssignmentOrigin::Requirement,
    );

    let plan = plan_duplicate_repair(&[second.clone(), first.clone(), unrelated]);

    assert_eq!(plan.to_delete, vec![second]);
}

#[test]
fn duplicates_are_scoped_per_subject() {
    let item = ItemRef::module(ItemId::new());
    let rows = vec![
        row(SubjectId::new(), item, AssignmentOrigin::Requirement),
        row(SubjectId::new(), item, AssignmentOrigin::Requirement),
    ];

    assert!(plan_duplicate_repair(&rows).is_noop());
}

#[test]
fn orphans_exclude_manual_completed_and_required_rows() {
    let subject_id = SubjectId::new();
    let required_item = ItemRef::module(ItemId::new());
    let legacy_orphan = row(
        subject_id,
        ItemRef::module(ItemId::new()),
        AssignmentOrigin::Legacy,
    );
    let manual = row(
        subject_id,
        ItemRef::module(ItemId::new()),
        AssignmentOrigin::Manual,
    );
    let mut completed = row(
        subject_id,
        ItemRef::document(ItemId::new()),
        AssignmentOrigin::Requirement,
    );
    completed.completed_at = Some(at(4));
    let required_row = row(subject_id, required_item, AssignmentOrigin::Requirement);

    let orphans = find_orphans(
        &[legacy_orphan.clone(), manual, completed, required_row],
        &BTreeSet::from([required_item]),
    );

    assert_eq!(orphans, vec![legacy_orphan]);
}
