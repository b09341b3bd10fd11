mod bulk;
mod common;
mod maintenance;
mod subjects;

pub use bulk::{BulkSyncRequest, BulkSyncResponse};
pub use common::{AssignmentResponse, HealthDependencyStatus, HealthResponse};
pub use maintenance::{
    CleanupOrphansRequest, DuplicateRepairResponse, OrphanReportResponse,
    ReconcileDuplicatesRequest,
};
pub use subjects::{
    ChangeLogEntryResponse, ChangeRoleRequest, CompleteAssignmentRequest, SubjectSyncResponse,
    TrainingStatusResponse,
};

#[cfg(test)]
mod tests {
    use super::{
        AssignmentResponse, BulkSyncRequest, BulkSyncResponse, ChangeLogEntryResponse,
        ChangeRoleRequest, CleanupOrphansRequest, CompleteAssignmentRequest,
        DuplicateRepairResponse, HealthDependencyStatus, HealthResponse, OrphanReportResponse,
        ReconcileDuplicatesRequest, SubjectSyncResponse, TrainingStatusResponse,
    };

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        ChangeRoleRequest::export(&config)?;
        CompleteAssignmentRequest::export(&config)?;
        BulkSyncRequest::export(&config)?;
        ReconcileDuplicatesRequest::export(&config)?;
        CleanupOrphansRequest::export(&config)?;
        SubjectSyncResponse::export(&config)?;
        TrainingStatusResponse::export(&config)?;
        super::subjects::RequirementResponse::export(&config)?;
        super::subjects::RequirementSourceResponse::export(&config)?;
        super::subjects::CompletionResponse::export(&config)?;
        ChangeLogEntryResponse::export(&config)?;
        AssignmentResponse::export(&config)?;
        BulkSyncResponse::export(&config)?;
        DuplicateRepairResponse::export(&config)?;
        OrphanReportResponse::export(&config)?;
        HealthDependencyStatus::export(&config)?;
        HealthResponse::export(&config)?;
        ErrorResponse::export(&config)?;

        Ok(())
    }
}
