use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;
use tutela_core::{AppError, AppResult, SubjectId};
use tutela_domain::{
    Assignment, ChangeLogEntry, CompletionRecord, ItemRef, assigned_items,
};

use crate::assignment_ports::{ResolvedRequirement, TrainingStatus};

use super::AssignmentSyncService;

const MAX_CHANGE_LOG_LIMIT: usize = 200;

impl AssignmentSyncService {
    /// Marks the subject's assignment for `item` as completed and records it in history.
    ///
    /// Completing an already completed assignment keeps the first timestamp.
    pub async fn complete_assignment(
        &self,
        subject_id: SubjectId,
        item: ItemRef,
    ) -> AppResult<Assignment> {
        self.with_subject_guard(subject_id, || async {
            let profile = self.load_subject(subject_id).await?;
            let transition = self
                .assignments
                .mark_completed(subject_id, item, Utc::now())
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "subject '{subject_id}' has no assignment for '{item}'"
                    ))
                })?;

            let assignment = transition.assignment;
            let completed_at = assignment.completed_at.ok_or_else(|| {
                AppError::Internal(format!(
                    "assignment '{}' was not marked completed",
                    assignment.assignment_id
                ))
            })?;

            // Rows completed before history existed are backfilled on the next completion call.
            if transition.newly_completed || !self.completions.has_completed(subject_id, item).await? {
                self.completions
                    .record_completion(CompletionRecord {
                        subject_id,
                        item,
                        completed_at,
                        completed_under_role_id: profile.role_id,
                    })
                    .await?;
            }

            info!(
                subject_id = %subject_id,
                item = %item,
                newly_completed = transition.newly_completed,
                "assignment completed"
            );
            Ok(assignment)
        })
        .await
    }

    /// Returns required items, current rows and completed history for one subject.
    pub async fn training_status(&self, subject_id: SubjectId) -> AppResult<TrainingStatus> {
        let subject = self.load_subject(subject_id).await?;
        let resolved = self.resolver.resolve_with_sources(&subject).await?;
        let assignments = self.assignments.list_assignments(subject_id).await?;
        let present = assigned_items(&assignments);

        let mut latest: BTreeMap<ItemRef, CompletionRecord> = BTreeMap::new();
        for record in self.completions.list_completions(subject_id).await? {
            if !resolved.contains_key(&record.item) || present.contains(&record.item) {
                continue;
            }
            match latest.get(&record.item) {
                Some(existing) if existing.completed_at >= record.completed_at => {}
                _ => {
                    latest.insert(record.item, record);
                }
            }
        }

        Ok(TrainingStatus {
            subject,
            requirements: resolved
                .into_iter()
                .map(|(item, sources)| ResolvedRequirement { item, sources })
                .collect(),
            assignments,
            completed_history: latest.into_values().collect(),
        })
    }

    /// Lists recent change log entries for one subject, newest first.
    pub async fn change_log(
        &self,
        subject_id: SubjectId,
        limit: usize,
    ) -> AppResult<Vec<ChangeLogEntry>> {
        if limit == 0 {
            return Err(AppError::Validation(
                "change log limit must be greater than zero".to_owned(),
            ));
        }

        self.load_subject(subject_id).await?;
        self.change_log
            .list_entries(subject_id, limit.min(MAX_CHANGE_LOG_LIMIT))
            .await
    }
}
