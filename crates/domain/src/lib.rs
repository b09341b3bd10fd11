//! Domain entities, invariants and reconciliation planning.

#![forbid(unsafe_code)]

mod assignment;
mod change_log;
mod item;
pub mod reconciliation;
mod subject;

pub use assignment::{Assignment, AssignmentOrigin, CompletionRecord, NewAssignment};
pub use change_log::{ChangeLogEntry, SyncTrigger};
pub use item::{ItemRef, ItemType};
pub use reconciliation::{
    AssignmentSchedule, DuplicateRepairPlan, ReconciliationPlan, assigned_items, find_orphans,
    plan_additions, plan_duplicate_repair, plan_reconciliation, unrequired_legacy_items,
};
pub use subject::{RequirementSource, SubjectProfile};
