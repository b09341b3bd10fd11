use serde::{Deserialize, Serialize};
use ts_rs::TS;
use tutela_application::{BulkSyncMode, BulkSyncSummary};

/// Incoming payload for department and group syncs.
#[derive(Debug, Default, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/bulk-sync-request.ts"
)]
pub struct BulkSyncRequest {
    #[serde(default)]
    pub full_reconcile: bool,
}

impl BulkSyncRequest {
    #[must_use]
    pub fn mode(&self) -> BulkSyncMode {
        if self.full_reconcile {
            BulkSyncMode::FullReconcile
        } else {
            BulkSyncMode::Additive
        }
    }
}

/// Totals of a department or group sync.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/bulk-sync-response.ts"
)]
pub struct BulkSyncResponse {
    pub members: u32,
    pub added: u32,
    pub removed: u32,
    pub skipped: u32,
    pub users_affected: u32,
    pub failed_subjects: Vec<String>,
    pub noop: bool,
}

impl From<BulkSyncSummary> for BulkSyncResponse {
    fn from(summary: BulkSyncSummary) -> Self {
        let counts = summary.counts();
        Self {
            members: summary.members,
            added: counts.added,
            removed: counts.removed,
            skipped: counts.skipped,
            users_affected: summary.users_affected,
            failed_subjects: summary
                .failed_subjects
                .iter()
                .map(ToString::to_string)
                .collect(),
            noop: counts.is_noop(),
        }
    }
}
