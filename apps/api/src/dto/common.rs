use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use ts_rs::TS;
use tutela_domain::Assignment;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub postgres: HealthDependencyStatus,
    pub redis: HealthDependencyStatus,
}

/// State of one backing dependency.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-dependency-status.ts"
)]
pub struct HealthDependencyStatus {
    pub status: &'static str,
    pub detail: Option<String>,
}

/// API representation of one assignment row.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assignment-response.ts"
)]
pub struct AssignmentResponse {
    pub assignment_id: String,
    pub subject_id: String,
    pub item_type: String,
    pub item_id: String,
    pub origin: String,
    pub assigned_at: String,
    pub due_at: Option<String>,
    pub completed_at: Option<String>,
}

impl From<Assignment> for AssignmentResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            assignment_id: assignment.assignment_id.to_string(),
            subject_id: assignment.subject_id.to_string(),
            item_type: assignment.item.item_type.as_str().to_owned(),
            item_id: assignment.item.item_id.to_string(),
            origin: assignment.origin.as_str().to_owned(),
            assigned_at: format_timestamp(assignment.assigned_at),
            due_at: assignment.due_at.map(format_timestamp),
            completed_at: assignment.completed_at.map(format_timestamp),
        }
    }
}

pub(super) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
