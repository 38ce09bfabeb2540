//! Unified error types for rowguard.
//!
//! This module collapses the detailed core errors into the handful of
//! categories a caller actually branches on.

use rowguard_core::{BackendError, ConflictRecord};
use thiserror::Error;

/// All rowguard errors.
///
/// A stale write is always [`Error::Conflict`], whether the backend reported
/// zero affected rows or a serialization failure.
#[derive(Debug, Error)]
pub enum Error {
    /// Row changed since it was read; reload and decide again
    #[error("conflict: {0}")]
    Conflict(ConflictRecord),

    /// Row does not exist (never did, or was deleted)
    #[error("not found: {0}")]
    NotFound(String),

    /// Version bytes did not match the column's format
    #[error("invalid version token: {0}")]
    InvalidToken(String),

    /// Backend failure unrelated to optimistic locking
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// Session used outside its transaction rules
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for rowguard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Only conflicts are: a fresh unit of work that reloads the row may
    /// succeed. The library itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Conflict details, if this is a conflict
    pub fn conflict(&self) -> Option<&ConflictRecord> {
        match self {
            Error::Conflict(record) => Some(record),
            _ => None,
        }
    }
}

// Convert from internal core errors
impl From<rowguard_core::Error> for Error {
    fn from(e: rowguard_core::Error) -> Self {
        use rowguard_core::Error as CoreError;
        match e {
            CoreError::StaleState(record) => Error::Conflict(record),
            CoreError::RowNotFound(key) => Error::NotFound(key.to_string()),
            err @ CoreError::MalformedToken { .. } => Error::InvalidToken(err.to_string()),
            CoreError::Backend(err) => Error::Backend(err),
            err @ (CoreError::UnexpectedRowCount { .. } | CoreError::UnattributedVersion { .. }) => {
                Error::Backend(BackendError::new(err.to_string()))
            }
            err @ (CoreError::InvalidSnapshot { .. }
            | CoreError::NotManaged(_)
            | CoreError::TransactionNotActive { .. }
            | CoreError::TransactionAlreadyActive
            | CoreError::RollbackOnly) => Error::Transaction(err.to_string()),
            err @ CoreError::UnknownColumnType(_) => Error::Config(err.to_string()),
            CoreError::Config(msg) => Error::Config(msg),
        }
    }
}
