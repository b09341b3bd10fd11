use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::dto::AssignmentResponse;

/// Incoming payload for a role change; `null` clears the role.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/change-role-request.ts"
)]
pub struct ChangeRoleRequest {
    pub role_id: Option<String>,
}

/// Incoming payload for marking one item complete.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/complete-assignment-request.ts"
)]
pub struct CompleteAssignmentRequest {
    pub item_type: String,
    pub item_id: String,
}

/// Counters of a single-subject sync or role change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/subject-sync-response.ts"
)]
pub struct SubjectSyncResponse {
    pub subject_id: String,
    pub added: u32,
    pub removed: u32,
    pub skipped: u32,
    pub retained_completed: u32,
    pub noop: bool,
}

/// Where a required item comes from.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/requirement-source-response.ts"
)]
pub struct RequirementSourceResponse {
    pub kind: String,
    pub id: String,
}

/// One currently required item.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/requirement-response.ts"
)]
pub struct RequirementResponse {
    pub item_type: String,
    pub item_id: String,
    pub sources: Vec<RequirementSourceResponse>,
}

/// Historical completion of an item.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/completion-response.ts"
)]
pub struct CompletionResponse {
    pub item_type: String,
    pub item_id: String,
    pub completed_at: String,
    pub completed_under_role_id: Option<String>,
}

/// Training view of one subject.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/training-status-response.ts"
)]
pub struct TrainingStatusResponse {
    pub subject_id: String,
    pub role_id: Option<String>,
    pub department_id: Option<String>,
    pub group_ids: Vec<String>,
    pub requirements: Vec<RequirementResponse>,
    pub assignments: Vec<AssignmentResponse>,
    pub completed_history: Vec<CompletionResponse>,
}

/// API representation of a change log entry.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/change-log-entry-response.ts"
)]
pub struct ChangeLogEntryResponse {
    pub subject_id: String,
    pub trigger: String,
    pub old_role_id: Option<String>,
    pub new_role_id: Option<String>,
    pub assignments_added: u32,
    pub assignments_removed: u32,
    pub changed_at: String,
}
