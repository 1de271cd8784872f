//! Error handling module for the CRM store.
//!
//! Provides a centralized error type with stable error codes. Remote failures are
//! caught inside the store; only validation and provisioning errors reach callers.

use thiserror::Error;

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CONFLICT: &str = "CONFLICT";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const PROVISIONING_ERROR: &str = "PROVISIONING_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// Credentials rejected or no session
    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(String),
    /// Row not found
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    /// Required fields missing or out of domain
    #[error("VALIDATION_ERROR: {0}")]
    Validation(String),
    /// Uniqueness violation (e.g. duplicate email)
    #[error("CONFLICT: {0}")]
    Conflict(String),
    /// Remote store failure
    #[error("DATABASE_ERROR: {0}")]
    Database(String),
    /// Atomic user provisioning failed
    #[error("PROVISIONING_ERROR: {0}")]
    Provisioning(String),
    /// Anything else
    #[error("INTERNAL_ERROR: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => codes::UNAUTHORIZED,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Provisioning(_) => codes::PROVISIONING_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::Database(msg)
            | AppError::Provisioning(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(db.message().to_string())
            }
            other => AppError::Database(format!("Database error: {}", other)),
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("Credential hashing error: {:?}", err);
        AppError::Internal(format!("Credential hashing error: {}", err))
    }
}
