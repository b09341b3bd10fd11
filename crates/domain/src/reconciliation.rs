//! Pure planning for assignment reconciliation, duplicate repair and orphan detection.
//!
//! Nothing here performs I/O. Callers load the current rows, plan, then apply the
//! plan atomically against the assignment store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use tutela_core::{AssignmentId, SubjectId};

use crate::{Assignment, AssignmentOrigin, ItemRef, NewAssignment};

/// Timestamps stamped onto rows inserted by one plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentSchedule {
    /// Assignment timestamp for new rows.
    pub assigned_at: DateTime<Utc>,
    /// Due date for new rows, if the deployment sets one.
    pub due_at: Option<DateTime<Utc>>,
}

impl AssignmentSchedule {
    /// Schedule starting at `assigned_at`, due `due_days` later when set.
    #[must_use]
    pub fn starting_at(assigned_at: DateTime<Utc>, due_days: Option<u32>) -> Self {
        Self {
            assigned_at,
            due_at: due_days.map(|days| assigned_at + chrono::Duration::days(i64::from(days))),
        }
    }
}

/// Delta that brings one subject's assignment rows in line with its requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Rows to insert for required items with no row and no recorded completion.
    pub to_insert: Vec<NewAssignment>,
    /// Incomplete rows with a requirement trail that are no longer required.
    pub to_delete: Vec<AssignmentId>,
    /// Required items without a row that the subject already completed.
    pub already_satisfied: Vec<ItemRef>,
    /// Rows that are no longer required but kept because they are completed.
    pub retained_completed: Vec<AssignmentId>,
}

impl ReconciliationPlan {
    /// Returns true when applying the plan would not mutate the store.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_insert.is_empty() && self.to_delete.is_empty()
    }
}

/// Returns the distinct item keys held by `assignments`.
#[must_use]
pub fn assigned_items(assignments: &[Assignment]) -> BTreeSet<ItemRef> {
    assignments.iter().map(|assignment| assignment.item).collect()
}

/// Plans a full reconciliation of `current` against `required`.
///
/// Completed rows are never scheduled for deletion. Manual rows, and legacy rows
/// whose item is in no requirement table (`trailed_items`), are left for the
/// explicit orphan pass. Items the subject completed earlier are not re-inserted
/// as incomplete rows.
#[must_use]
pub fn plan_reconciliation(
    subject_id: SubjectId,
    required: &BTreeSet<ItemRef>,
    current: &[Assignment],
    completed_items: &BTreeSet<ItemRef>,
    trailed_items: &BTreeSet<ItemRef>,
    schedule: AssignmentSchedule,
) -> ReconciliationPlan {
    let mut plan = plan_additions(subject_id, required, current, completed_items, schedule);

    for assignment in current {
        if required.contains(&assignment.item) {
            continue;
        }

        if assignment.is_completed() {
            plan.retained_completed.push(assignment.assignment_id);
        } else if is_reconcilable(assignment, trailed_items) {
            plan.to_delete.push(assignment.assignment_id);
        }
    }

    plan
}

/// Returns incomplete legacy rows that no current requirement covers.
///
/// Their items are the candidates to check for a requirement trail before a
/// full reconciliation.
#[must_use]
pub fn unrequired_legacy_items(
    current: &[Assignment],
    required: &BTreeSet<ItemRef>,
) -> BTreeSet<ItemRef> {
    current
        .iter()
        .filter(|assignment| {
            assignment.origin == AssignmentOrigin::Legacy
                && !assignment.is_completed()
                && !required.contains(&assignment.item)
        })
        .map(|assignment| assignment.item)
        .collect()
}

fn is_reconcilable(assignment: &Assignment, trailed_items: &BTreeSet<ItemRef>) -> bool {
    match assignment.origin {
        AssignmentOrigin::Requirement => true,
        AssignmentOrigin::Legacy => trailed_items.contains(&assignment.item),
        AssignmentOrigin::Manual => false,
    }
}

/// Plans only the additive half of a reconciliation.
#[must_use]
pub fn plan_additions(
    subject_id: SubjectId,
    required: &BTreeSet<ItemRef>,
    current: &[Assignment],
    completed_items: &BTreeSet<ItemRef>,
    schedule: AssignmentSchedule,
) -> ReconciliationPlan {
    let present = assigned_items(current);
    let mut plan = ReconciliationPlan::default();

    for item in required.difference(&present) {
        if completed_items.contains(item) {
            plan.already_satisfied.push(*item);
        } else {
            plan.to_insert.push(NewAssignment::from_requirement(
                subject_id,
                *item,
                schedule.assigned_at,
                schedule.due_at,
            ));
        }
    }

    plan
}

/// Outcome of grouping assignment rows by `(subject, item)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateRepairPlan {
    /// Redundant rows to delete.
    pub to_delete: Vec<Assignment>,
}

impl DuplicateRepairPlan {
    /// Returns true when no duplicates were found.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_delete.is_empty()
    }
}

/// Picks one survivor per duplicated key.
///
/// A completed row always wins over incomplete ones (earliest completion first);
/// otherwise the earliest assignment wins. Remaining ties fall back to the row id.
#[must_use]
pub fn plan_duplicate_repair(assignments: &[Assignment]) -> DuplicateRepairPlan {
    let mut groups: BTreeMap<(SubjectId, ItemRef), Vec<&Assignment>> = BTreeMap::new();
    for assignment in assignments {
        groups
            .entry((assignment.subject_id, assignment.item))
            .or_default()
            .push(assignment);
    }

    let mut plan = DuplicateRepairPlan::default();
    for rows in groups.into_values() {
        if rows.len() < 2 {
            continue;
        }

        let Some(keeper) = rows.iter().min_by_key(|row| {
            (
                row.completed_at.is_none(),
                row.completed_at,
                row.assigned_at,
                row.assignment_id,
            )
        }) else {
            continue;
        };

        let keeper_id = keeper.assignment_id;
        plan.to_delete.extend(
            rows.into_iter()
                .filter(|row| row.assignment_id != keeper_id)
                .cloned(),
        );
    }

    plan
}

/// Returns incomplete, non-manual rows whose item is not required.
#[must_use]
pub fn find_orphans(assignments: &[Assignment], required: &BTreeSet<ItemRef>) -> Vec<Assignment> {
    assignments
        .iter()
        .filter(|assignment| {
            !required.contains(&assignment.item)
                && assignment.origin != AssignmentOrigin::Manual
                && !assignment.is_completed()
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests;
