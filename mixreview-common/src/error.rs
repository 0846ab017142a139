//! Common error types for Mix Review

use thiserror::Error;

/// Common result type for Mix Review operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the service
///
/// `NotFound` covers both "row absent" and "row outside the caller's scope";
/// callers must not be able to tell the two apart.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found, or not visible to the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation failure
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing, invalid or expired admin credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Action disallowed by policy
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Password hashing or token signing failure
    #[error("Credential error: {0}")]
    Credential(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "DATABASE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::BadRequest(_) => "BAD_REQUEST",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::Credential(_) => "CREDENTIAL_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// True when a sqlx error is a UNIQUE / PRIMARY KEY constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// True when a sqlx error is a FOREIGN KEY constraint violation
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_foreign_key_violation(),
        _ => false,
    }
}
