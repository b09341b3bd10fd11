mod assignments;
mod catalog;
mod change_log;
mod completions;
mod identity;
mod lease;
mod outcomes;

pub use assignments::{
    AppliedAssignmentChanges, AssignmentChangeSet, AssignmentRepository, CompletionTransition,
    DeleteGuard,
};
pub use catalog::CatalogRepository;
pub use change_log::ChangeLogRepository;
pub use completions::CompletionRepository;
pub use identity::IdentityRepository;
pub use lease::{SubjectLease, SubjectLeaseCoordinator};
pub use outcomes::{
    BulkSyncMode, BulkSyncSummary, MaintenanceSummary, OrphanCleanupMode, OrphanReport,
    ResolvedRequirement, SyncCounts, SyncOutcome, TrainingStatus,
};
