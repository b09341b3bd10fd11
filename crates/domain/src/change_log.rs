use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tutela_core::{AppError, RoleId, SubjectId};

/// Operation that produced a change log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    /// Explicit per-subject reconciliation.
    SubjectSync,
    /// Role change followed by reconciliation.
    RoleChange,
    /// Department bulk sync.
    DepartmentSync,
    /// Group bulk sync.
    GroupSync,
    /// Duplicate assignment repair.
    DuplicateRepair,
    /// Explicit orphan cleanup.
    OrphanCleanup,
}

impl SyncTrigger {
    /// Returns a stable storage value for this trigger.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubjectSync => "assignment.subject_sync",
            Self::RoleChange => "assignment.role_change",
            Self::DepartmentSync => "assignment.department_sync",
            Self::GroupSync => "assignment.group_sync",
            Self::DuplicateRepair => "assignment.duplicate_repair",
            Self::OrphanCleanup => "assignment.orphan_cleanup",
        }
    }
}

impl FromStr for SyncTrigger {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "assignment.subject_sync" => Ok(Self::SubjectSync),
            "assignment.role_change" => Ok(Self::RoleChange),
            "assignment.department_sync" => Ok(Self::DepartmentSync),
            "assignment.group_sync" => Ok(Self::GroupSync),
            "assignment.duplicate_repair" => Ok(Self::DuplicateRepair),
            "assignment.orphan_cleanup" => Ok(Self::OrphanCleanup),
            _ => Err(AppError::Validation(format!(
                "unknown sync trigger value '{value}'"
            ))),
        }
    }
}

/// Append-only audit row describing one applied assignment delta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Subject whose assignments changed.
    pub subject_id: SubjectId,
    /// Operation that produced the change.
    pub trigger: SyncTrigger,
    /// Role before the operation.
    pub old_role_id: Option<RoleId>,
    /// Role after the operation.
    pub new_role_id: Option<RoleId>,
    /// Number of assignment rows removed.
    pub assignments_removed: u32,
    /// Number of assignment rows added.
    pub assignments_added: u32,
    /// Time the change was applied.
    pub changed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::SyncTrigger;

    #[test]
    fn trigger_roundtrip_storage_value() {
        let restored = SyncTrigger::from_str(SyncTrigger::RoleChange.as_str());
        assert!(matches!(restored, Ok(SyncTrigger::RoleChange)));
    }

    #[test]
    fn unknown_trigger_is_rejected() {
        assert!(SyncTrigger::from_str("assignment.unknown").is_err());
    }
}
