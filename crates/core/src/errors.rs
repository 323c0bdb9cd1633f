//! Core error types for the SmartDecision chat engine.
//!
//! This module defines database-agnostic error types. Storage-specific errors
//! (from Diesel, SQLite, etc.) are converted to these types by the storage layer.

use serde::Serialize;
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the chat engine.
///
/// Every variant maps onto one [`ErrorKind`], which is what HTTP-facing
/// collaborators use to pick a status code.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Cannot delete default configuration: {0}")]
    CannotDeleteDefault(String),

    #[error("File storage error: {0}")]
    Io(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// This enum uses `String` for all error details, allowing the storage layer
/// to convert storage-specific errors (Diesel, SQLite, etc.) into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to establish a database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to create or configure the connection pool.
    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique constraint was violated (e.g., duplicate key).
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// A foreign key constraint was violated.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A database transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Database migration failed.
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Internal/unexpected database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),
}

/// Caller-facing classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    InvalidInput,
    UpstreamFailure,
    StorageFailure,
    CannotDeleteDefault,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::UpstreamFailure => "UPSTREAM_FAILURE",
            ErrorKind::StorageFailure => "STORAGE_FAILURE",
            ErrorKind::CannotDeleteDefault => "CANNOT_DELETE_DEFAULT",
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Database(DatabaseError::NotFound(_)) => ErrorKind::NotFound,
            Error::Database(_) => ErrorKind::StorageFailure,
            Error::Validation(_) => ErrorKind::InvalidInput,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::CannotDeleteDefault(_) => ErrorKind::CannotDeleteDefault,
            Error::Io(_) | Error::Unexpected(_) => ErrorKind::StorageFailure,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Error::Database(DatabaseError::NotFound(what.into()))
    }

    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Error::Validation(ValidationError::InvalidInput(reason.into()))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Database(DatabaseError::NotFound(_)))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Unexpected(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::not_found("session").kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::Database(DatabaseError::QueryFailed("boom".into())).kind(),
            ErrorKind::StorageFailure
        );
        assert_eq!(Error::invalid_input("bad").kind(), ErrorKind::InvalidInput);
        assert_eq!(
            Error::Forbidden("config".into()).kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            Error::CannotDeleteDefault("cfg".into()).kind(),
            ErrorKind::CannotDeleteDefault
        );
    }

    #[test]
    fn test_io_error_is_storage_failure() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::Other, "disk").into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
        assert!(err.to_string().contains("disk"));
    }
}
