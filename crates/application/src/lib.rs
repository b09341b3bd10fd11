//! Application services and ports.

#![forbid(unsafe_code)]

mod assignment_ports;
mod assignment_sync_service;
mod requirement_resolver;
mod sync_settings;

pub use assignment_ports::{
    AppliedAssignmentChanges, AssignmentChangeSet, AssignmentRepository, BulkSyncMode,
    BulkSyncSummary, CatalogRepository, ChangeLogRepository, CompletionRepository,
    CompletionTransition, DeleteGuard, IdentityRepository, MaintenanceSummary, OrphanCleanupMode,
    OrphanReport, ResolvedRequirement, SubjectLease, SubjectLeaseCoordinator, SyncCounts,
    SyncOutcome, TrainingStatus,
};
pub use assignment_sync_service::AssignmentSyncService;
pub use requirement_resolver::RequirementResolver;
pub use sync_settings::SyncSettings;
