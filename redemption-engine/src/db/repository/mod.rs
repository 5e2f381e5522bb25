//! Repository Module
//!
//! Persistence operations over the engine's SQLite tables. The conditional
//! UPDATE statements in these modules are the concurrency enforcement
//! layer: every contended counter moves through a single guarded statement
//! (or a transaction whose first statement takes the write lock), and
//! `rows_affected() == 0` is the conflict signal.

pub mod discount;
pub mod gift_card;
pub mod inventory;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for shared::RedemptionError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => shared::RedemptionError::NotFound(what),
            RepoError::Database(detail) => shared::RedemptionError::Storage(detail),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
