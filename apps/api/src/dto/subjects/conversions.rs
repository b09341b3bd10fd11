use tutela_application::{ResolvedRequirement, SyncOutcome, TrainingStatus};
use tutela_domain::{ChangeLogEntry, CompletionRecord, RequirementSource};

use super::types::{
    ChangeLogEntryResponse, CompletionResponse, RequirementResponse, RequirementSourceResponse,
    SubjectSyncResponse, TrainingStatusResponse,
};
use crate::dto::common::format_timestamp;

impl From<SyncOutcome> for SubjectSyncResponse {
    fn from(outcome: SyncOutcome) -> Self {
        Self {
            subject_id: outcome.subject_id.to_string(),
            added: outcome.counts.added,
            removed: outcome.counts.removed,
            skipped: outcome.counts.skipped,
            retained_completed: outcome.retained_completed,
            noop: outcome.is_noop(),
        }
    }
}

impl From<RequirementSource> for RequirementSourceResponse {
    fn from(source: RequirementSource) -> Self {
        let id = match source {
            RequirementSource::Role(role_id) => role_id.to_string(),
            RequirementSource::Department(department_id) => department_id.to_string(),
            RequirementSource::Group(group_id) => group_id.to_string(),
        };

        Self {
            kind: source.kind().to_owned(),
            id,
        }
    }
}

impl From<ResolvedRequirement> for RequirementResponse {
    fn from(requirement: ResolvedRequirement) -> Self {
        Self {
            item_type: requirement.item.item_type.as_str().to_owned(),
            item_id: requirement.item.item_id.to_string(),
            sources: requirement.sources.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<CompletionRecord> for CompletionResponse {
    fn from(record: CompletionRecord) -> Self {
        Self {
            item_type: record.item.item_type.as_str().to_owned(),
            item_id: record.item.item_id.to_string(),
            completed_at: format_timestamp(record.completed_at),
            completed_under_role_id: record.completed_under_role_id.map(|id| id.to_string()),
        }
    }
}

impl From<TrainingStatus> for TrainingStatusResponse {
    fn from(status: TrainingStatus) -> Self {
        Self {
            subject_id: status.subject.subject_id.to_string(),
            role_id: status.subject.role_id.map(|id| id.to_string()),
            department_id: status.subject.department_id.map(|id| id.to_string()),
            group_ids: status
                .subject
                .group_ids
                .iter()
                .map(ToString::to_string)
                .collect(),
            requirements: status.requirements.into_iter().map(Into::into).collect(),
            assignments: status.assignments.into_iter().map(Into::into).collect(),
            completed_history: status
                .completed_history
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }
}

impl From<ChangeLogEntry> for ChangeLogEntryResponse {
    fn from(entry: ChangeLogEntry) -> Self {
        Self {
            subject_id: entry.subject_id.to_string(),
            trigger: entry.trigger.as_str().to_owned(),
            old_role_id: entry.old_role_id.map(|id| id.to_string()),
            new_role_id: entry.new_role_id.map(|id| id.to_string()),
            assignments_added: entry.assignments_added,
            assignments_removed: entry.assignments_removed,
            changed_at: format_timestamp(entry.changed_at),
        }
    }
}
