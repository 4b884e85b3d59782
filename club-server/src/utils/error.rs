//! Unified error handling
//!
//! Every engine operation returns [`AppResult`]; failures carry a
//! human-readable reason and a category the boundary can map to a response:
//!
//! | Variant      | Meaning                                              |
//! |--------------|------------------------------------------------------|
//! | `Validation` | malformed or missing input, no retry                 |
//! | `NotFound`   | referenced shift/register/worker/row absent          |
//! | `Conflict`   | state raced or already in the target state           |
//! | `Integrity`  | financial payload internally inconsistent            |
//! | `Database`   | datastore failure, transaction rolled back           |
//! | `Internal`   | unexpected failure, logged with context              |

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

// ========== Helper Constructors ==========

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller may refresh state and retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<shared::request::RequestError> for AppError {
    fn from(e: shared::request::RequestError) -> Self {
        AppError::Validation(e.0)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}
