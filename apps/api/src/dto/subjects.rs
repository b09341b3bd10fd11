mod conversions;
mod types;

pub use types::{
    ChangeLogEntryResponse, ChangeRoleRequest, CompleteAssignmentRequest, CompletionResponse,
    RequirementResponse, RequirementSourceResponse, SubjectSyncResponse, TrainingStatusResponse,
};
