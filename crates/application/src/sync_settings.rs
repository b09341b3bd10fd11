use std::time::Duration;

use tutela_core::{AppError, AppResult};

/// Tunables for the assignment sync engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// How long a caller waits for the per-subject guard before giving up with a conflict.
    pub lock_wait: Duration,
    /// Lease lifetime requested from the distributed coordinator.
    pub lease_seconds: u32,
    /// Upper bound on subjects processed concurrently by bulk operations.
    pub max_concurrency: usize,
    /// Days until a newly inserted assignment is due; `None` leaves `due_at` empty.
    pub default_due_days: Option<u32>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            lock_wait: Duration::from_millis(5_000),
            lease_seconds: 30,
            max_concurrency: 8,
            default_due_days: None,
        }
    }
}

impl SyncSettings {
    /// Validates ranges.
    pub fn validate(&self) -> AppResult<()> {
        if self.lock_wait.is_zero() {
            return Err(AppError::Validation(
                "sync lock wait must be greater than zero".to_owned(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(AppError::Validation(
                "sync max concurrency must be greater than zero".to_owned(),
            ));
        }
        if self.lease_seconds == 0 {
            return Err(AppError::Validation(
                "sync lease seconds must be greater than zero".to_owned(),
            ));
        }
        if self.default_due_days == Some(0) {
            return Err(AppError::Validation(
                "assignment default due days must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }
}
