//! Translation of sqlx errors into [`StoreError`].

use order_engine_core::error::StoreError;

/// SQLSTATE for `serialization_failure`.
pub const SERIALIZATION_FAILURE: &str = "40001";

/// SQLSTATE for `deadlock_detected`.
pub const DEADLOCK_DETECTED: &str = "40P01";

/// Map a sqlx error to a store error.
///
/// Serialization failures and deadlocks become [`StoreError::Conflict`] so
/// the caller retries the whole transaction; everything else is a
/// [`StoreError::Database`].
pub(crate) fn map_sqlx(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if let Some(code) = db_err.code() {
            if is_transient(&code) {
                metrics::counter!("store_transient_conflicts_total", "sqlstate" => code.to_string())
                    .increment(1);
                tracing::warn!(sqlstate = %code, error = %db_err, "Transient database conflict");
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
    }
    StoreError::Database(err.to_string())
}

/// Whether a SQLSTATE marks a conflict that a retry can resolve.
#[must_use]
pub fn is_transient(sqlstate: &str) -> bool {
    sqlstate == SERIALIZATION_FAILURE || sqlstate == DEADLOCK_DETECTED
}

/// Whether `err` is a unique constraint violation (SQLSTATE 23505).
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_and_deadlock_are_transient() {
        assert!(is_transient("40001"));
        assert!(is_transient("40P01"));
        assert!(!is_transient("23505"));
        assert!(!is_transient("42P01"));
    }

    #[test]
    fn non_database_errors_are_not_retryable() {
        let err = map_sqlx(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_retryable());
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
