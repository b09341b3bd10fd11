//! Shared helpers for PostgreSQL adapters.

use tutela_core::{AppError, AppResult, ItemId};
use tutela_domain::{ItemRef, ItemType};

/// Maps one sqlx error to an application error with context.
///
/// Pool exhaustion, a closed pool, I/O failures and server-side disconnects are
/// transient.
pub(crate) fn storage_error(context: &str, error: sqlx::Error) -> AppError {
    let transient = match &error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(database_error) => database_error
            .code()
            .is_some_and(|code| is_transient_sqlstate(code.as_ref())),
        _ => false,
    };

    if transient {
        AppError::Unavailable(format!("{context}: {error}"))
    } else {
        AppError::Internal(format!("{context}: {error}"))
    }
}

/// Connection exceptions, shutdowns, connection exhaustion and aborted
/// transactions that are safe to retry.
fn is_transient_sqlstate(code: &str) -> bool {
    code.starts_with("08")
        || matches!(code, "57P01" | "57P02" | "57P03" | "53300" | "40001" | "40P01")
}

/// Rebuilds an item reference from its stored columns.
pub(crate) fn item_from_columns(item_type: &str, item_id: uuid::Uuid) -> AppResult<ItemRef> {
    let item_type = item_type
        .parse::<ItemType>()
        .map_err(|error| AppError::Internal(format!("corrupt stored item type: {error}")))?;
    Ok(ItemRef::new(item_type, ItemId::from_uuid(item_id)))
}

/// Converts a count into the `INT` column range.
pub(crate) fn count_to_i32(value: u32) -> AppResult<i32> {
    i32::try_from(value)
        .map_err(|error| AppError::Validation(format!("count exceeds storage range: {error}")))
}

#[cfg(test)]
mod tests {
    use super::{is_transient_sqlstate, item_from_columns, storage_error};
    use tutela_core::AppError;
    use tutela_domain::ItemType;

    #[test]
    fn pool_timeouts_are_transient() {
        let error = storage_error("failed to list assignments", sqlx::Error::PoolTimedOut);
        assert!(matches!(error, AppError::Unavailable(_)));
    }

    #[test]
    fn server_disconnect_codes_are_transient() {
        for code in ["08006", "08003", "57P01", "57P03", "40P01"] {
            assert!(is_transient_sqlstate(code), "{code} should be transient");
        }
        for code in ["23505", "42P01", "22P02"] {
            assert!(!is_transient_sqlstate(code), "{code} should not be transient");
        }
    }

    #[test]
    fn row_not_found_is_internal() {
        let error = storage_error("failed to load subject", sqlx::Error::RowNotFound);
        assert!(matches!(error, AppError::Internal(_)));
    }

    #[test]
    fn stored_item_columns_decode() {
        let item = item_from_columns("document", uuid::Uuid::nil());
        assert!(matches!(item, Ok(item) if item.item_type == ItemType::Document));
        assert!(item_from_columns("video", uuid::Uuid::nil()).is_err());
    }
}
