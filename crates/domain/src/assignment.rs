use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tutela_core::{AppError, AssignmentId, RoleId, SubjectId};

use crate::ItemRef;

/// How an assignment row came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentOrigin {
    /// Created by reconciliation from a role, department or group requirement.
    Requirement,
    /// Assigned ad hoc by an administrator.
    Manual,
    /// Imported or of unknown provenance.
    Legacy,
}

impl AssignmentOrigin {
    /// Returns a stable storage value for this origin.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Requirement => "requirement",
            Self::Manual => "manual",
            Self::Legacy => "legacy",
        }
    }
}

impl FromStr for AssignmentOrigin {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "requirement" => Ok(Self::Requirement),
            "manual" => Ok(Self::Manual),
            "legacy" => Ok(Self::Legacy),
            _ => Err(AppError::Validation(format!(
                "unknown assignment origin value '{value}'"
            ))),
        }
    }
}

/// Persisted per-subject assignment of one training item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Row identifier.
    pub assignment_id: AssignmentId,
    /// Owning subject.
    pub subject_id: SubjectId,
    /// Assigned item.
    pub item: ItemRef,
    /// Provenance of the row.
    pub origin: AssignmentOrigin,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Optional due date.
    pub due_at: Option<DateTime<Utc>>,
    /// Completion timestamp; never cleared once set.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Returns whether the subject has finished this item.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Insert payload for one assignment row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAssignment {
    /// Identifier to persist.
    pub assignment_id: AssignmentId,
    /// Owning subject.
    pub subject_id: SubjectId,
    /// Assigned item.
    pub item: ItemRef,
    /// Provenance of the row.
    pub origin: AssignmentOrigin,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Optional due date.
    pub due_at: Option<DateTime<Utc>>,
}

impl NewAssignment {
    /// Creates a requirement-originated insert payload.
    #[must_use]
    pub fn from_requirement(
        subject_id: SubjectId,
        item: ItemRef,
        assigned_at: DateTime<Utc>,
        due_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            assignment_id: AssignmentId::new(),
            subject_id,
            item,
            origin: AssignmentOrigin::Requirement,
            assigned_at,
            due_at,
        }
    }

    /// Materializes the persisted row shape.
    #[must_use]
    pub fn into_assignment(self) -> Assignment {
        Assignment {
            assignment_id: self.assignment_id,
            subject_id: self.subject_id,
            item: self.item,
            origin: self.origin,
            assigned_at: self.assigned_at,
            due_at: self.due_at,
            completed_at: None,
        }
    }
}

/// Append-only mirror of one completion; survives assignment deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    /// Subject that completed the item.
    pub subject_id: SubjectId,
    /// Completed item.
    pub item: ItemRef,
    /// Completion timestamp.
    pub completed_at: DateTime<Utc>,
    /// Role the subject held at completion time.
    pub completed_under_role_id: Option<RoleId>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use tutela_core::{ItemId, SubjectId};

    use super::{AssignmentOrigin, NewAssignment};
    use crate::ItemRef;

    #[test]
    fn origin_roundtrip_storage_value() {
        for origin in [
            AssignmentOrigin::Requirement,
            AssignmentOrigin::Manual,
            AssignmentOrigin::Legacy,
        ] {
            let restored = AssignmentOrigin::from_str(origin.as_str());
            assert!(matches!(restored, Ok(value) if value == origin));
        }
    }

    #[test]
    fn new_assignment_materializes_incomplete_row() {
        let assignment = NewAssignment::from_requirement(
            SubjectId::new(),
            ItemRef::module(ItemId::new()),
            Utc::now(),
            None,
        )
        .into_assignment();

        assert!(!assignment.is_completed());
        assert_eq!(assignment.origin, AssignmentOrigin::Requirement);
    }
}
