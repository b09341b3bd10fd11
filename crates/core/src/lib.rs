//! Shared primitives for all Rust crates in Tutela.

#![forbid(unsafe_code)]

/// Typed identifiers shared across services.
pub mod ids;

use thiserror::Error;

pub use ids::{AssignmentId, DepartmentId, GroupId, ItemId, RoleId, SubjectId};

/// Result type used across Tutela crates.
pub type AppResult<T> = Result<T, AppError>;

/// Common application error categories.
#[derive(Debug, Error)]
pub enum AppError {
    /// Invalid input or violated invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Write operation conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller is not authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Backing store is temporarily unreachable; the operation was not applied.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns true when retrying the same operation may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::AppError;

    #[test]
    fn unavailable_errors_are_transient() {
        assert!(AppError::Unavailable("pool timed out".to_owned()).is_transient());
        assert!(!AppError::NotFound("subject".to_owned()).is_transient());
    }

    #[test]
    fn error_display_includes_category() {
        let error = AppError::Unavailable("connection reset".to_owned());
        assert_eq!(error.to_string(), "store unavailable: connection reset");
    }
}
