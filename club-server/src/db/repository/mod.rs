//! Repository Module
//!
//! CRUD operations over the SQLite tables. Free functions taking the pool
//! (reads, single-statement writes) or a transaction (multi-statement
//! flows owned by the services).

pub mod advance;
pub mod delivery;
pub mod employee_shift;
pub mod jornada;
pub mod payment;
pub mod register;
pub mod roster;
pub mod salary;

use crate::utils::AppError;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.is_unique_violation() {
                return RepoError::Duplicate(db.message().to_string());
            }
        }
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::Conflict(msg),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Transaction alias used across repositories
pub type SqliteTx<'c> = sqlx::Transaction<'c, sqlx::Sqlite>;
