use serde::{Deserialize, Serialize};
use ts_rs::TS;
use tutela_application::{MaintenanceSummary, OrphanCleanupMode, OrphanReport};

use super::AssignmentResponse;

/// Incoming payload for duplicate repair; omit `subject_id` to scan everyone.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/reconcile-duplicates-request.ts"
)]
pub struct ReconcileDuplicatesRequest {
    pub subject_id: Option<String>,
}

/// Incoming payload for the orphan pass.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/cleanup-orphans-request.ts"
)]
pub struct CleanupOrphansRequest {
    pub subject_id: Option<String>,
    #[serde(default)]
    pub remove: bool,
}

impl CleanupOrphansRequest {
    #[must_use]
    pub fn mode(&self) -> OrphanCleanupMode {
        if self.remove {
            OrphanCleanupMode::Remove
        } else {
            OrphanCleanupMode::Report
        }
    }
}

/// Totals of a duplicate repair pass.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/duplicate-repair-response.ts"
)]
pub struct DuplicateRepairResponse {
    pub subjects_scanned: u32,
    pub subjects_repaired: u32,
    pub added: u32,
    pub removed: u32,
    pub skipped: u32,
    pub completions_mirrored: u32,
    pub failed_subjects: Vec<String>,
    pub noop: bool,
}

impl From<MaintenanceSummary> for DuplicateRepairResponse {
    fn from(summary: MaintenanceSummary) -> Self {
        let counts = summary.counts();
        Self {
            subjects_scanned: summary.subjects_scanned,
            subjects_repaired: summary.subjects_repaired,
            added: counts.added,
            removed: counts.removed,
            skipped: counts.skipped,
            completions_mirrored: summary.completions_mirrored,
            failed_subjects: summary
                .failed_subjects
                .iter()
                .map(ToString::to_string)
                .collect(),
            noop: counts.is_noop(),
        }
    }
}

/// Orphans found, and removed when requested.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/orphan-report-response.ts"
)]
pub struct OrphanReportResponse {
    pub subjects_scanned: u32,
    pub orphans: Vec<AssignmentResponse>,
    pub added: u32,
    pub removed: u32,
    pub skipped: u32,
    pub failed_subjects: Vec<String>,
    pub noop: bool,
}

impl From<OrphanReport> for OrphanReportResponse {
    fn from(report: OrphanReport) -> Self {
        let counts = report.counts();
        Self {
            subjects_scanned: report.subjects_scanned,
            added: counts.added,
            removed: counts.removed,
            skipped: counts.skipped,
            failed_subjects: report
                .failed_subjects
                .iter()
                .map(ToString::to_string)
                .collect(),
            noop: counts.is_noop(),
            orphans: report.orphans.into_iter().map(Into::into).collect(),
        }
    }
}
