//! Error types for the PostgreSQL backend.

use pgdb_core::{TenantErrorKind, TenantStateError, TenantStep};
use sqlx_core::error::Error as SqlxError;

/// Insufficient privilege (42501).
pub const PG_INSUFFICIENT_PRIVILEGE: &str = "42501";

/// Database already exists (42P04).
pub const PG_DUPLICATE_DATABASE: &str = "42P04";

/// Role or other object already exists (42710).
pub const PG_DUPLICATE_OBJECT: &str = "42710";

/// Unique violation (23505), raised by concurrent catalog inserts.
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Maps a sqlx error onto the tenant error taxonomy by SQLSTATE.
#[must_use]
pub fn classify(err: &SqlxError) -> TenantErrorKind {
    match err {
        SqlxError::Database(db_err) => match db_err.code().as_deref() {
            Some(PG_INSUFFICIENT_PRIVILEGE) => TenantErrorKind::Permission,
            Some(PG_DUPLICATE_DATABASE | PG_DUPLICATE_OBJECT | PG_UNIQUE_VIOLATION) => {
                TenantErrorKind::Duplicate
            }
            // 28: invalid authorization
            Some(code) if code.starts_with("28") => TenantErrorKind::Permission,
            // 08: connection exception, 53: insufficient resources
            Some(code) if code.starts_with("08") || code.starts_with("53") => {
                TenantErrorKind::Transient
            }
            // admin shutdown, crash shutdown, cannot connect now
            Some("57P01" | "57P02" | "57P03") => TenantErrorKind::Transient,
            _ => TenantErrorKind::Server,
        },
        SqlxError::Io(_)
        | SqlxError::Tls(_)
        | SqlxError::PoolTimedOut
        | SqlxError::PoolClosed
        | SqlxError::WorkerCrashed => TenantErrorKind::Transient,
        _ => TenantErrorKind::Server,
    }
}

/// Wraps a sqlx error as a failure of `step`, keeping the server message.
#[must_use]
pub fn tenant_error(step: TenantStep, err: &SqlxError) -> TenantStateError {
    TenantStateError::new(step, classify(err), err.to_string())
}

/// Errors specific to the PostgreSQL backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx_core::error::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PostgresError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Connection(e) => classify(e) == TenantErrorKind::Transient,
            Self::Config { .. } => false,
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PostgresError::config("invalid URL");
        assert!(err.to_string().contains("Configuration error"));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_non_database_errors_are_classified() {
        assert_eq!(classify(&SqlxError::PoolTimedOut), TenantErrorKind::Transient);
        assert_eq!(classify(&SqlxError::PoolClosed), TenantErrorKind::Transient);
        assert_eq!(classify(&SqlxError::RowNotFound), TenantErrorKind::Server);

        let io = SqlxError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert_eq!(classify(&io), TenantErrorKind::Transient);
        assert!(!has_pg_error_code(&io, PG_INSUFFICIENT_PRIVILEGE));
    }

    #[test]
    fn test_tenant_error_keeps_step_and_message() {
        let err = tenant_error(TenantStep::Role, &SqlxError::PoolTimedOut);
        assert_eq!(err.step, TenantStep::Role);
        assert_eq!(err.kind, TenantErrorKind::Transient);
        assert!(err.message.contains("timed out"));
    }
}
