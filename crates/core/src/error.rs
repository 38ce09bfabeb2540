//! Error types for the optimistic locking protocol
//!
//! [`Error`] is the single error type returned by codecs, the detector and
//! sessions. [`BackendError`] is what a row store reports when a statement
//! fails; the detector inspects it against the dialect's serialization
//! failure signature before deciding whether it is a conflict.

use crate::conflict::ConflictRecord;
use crate::types::EntityKey;
use thiserror::Error;

/// Result type for rowguard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a row store for one statement
///
/// Mirrors what a database driver exposes: an optional vendor error code
/// (SQL Server's 3960), an optional five-character SQL state (`40001`), and
/// the server's message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (vendor code: {vendor_code:?}, sql state: {sql_state:?})")]
pub struct BackendError {
    /// Vendor-specific error number
    pub vendor_code: Option<i32>,
    /// ANSI SQL state
    pub sql_state: Option<String>,
    /// Server message
    pub message: String,
}

impl BackendError {
    /// Error carrying only a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            vendor_code: None,
            sql_state: None,
            message: message.into(),
        }
    }

    /// Attach a vendor error code
    pub fn with_vendor_code(mut self, code: i32) -> Self {
        self.vendor_code = Some(code);
        self
    }

    /// Attach a SQL state
    pub fn with_sql_state(mut self, state: impl Into<String>) -> Self {
        self.sql_state = Some(state.into());
        self
    }
}

/// All rowguard errors
#[derive(Debug, Error)]
pub enum Error {
    /// Version column bytes do not match the codec's layout
    #[error("malformed {column_type} token: expected {expected} bytes, got {actual}")]
    MalformedToken {
        /// Column type name of the codec that rejected the bytes
        column_type: &'static str,
        /// Width the codec requires
        expected: usize,
        /// Width that was presented
        actual: usize,
    },

    /// No codec registered under this column type name
    #[error("unknown version column type: {0}")]
    UnknownColumnType(String),

    /// Row was updated or deleted by another unit of work
    #[error("row was updated or deleted by another transaction: {0}")]
    StaleState(ConflictRecord),

    /// Conditioned write matched more than the one row it addresses
    #[error("unexpected row count for {key}: expected 1, got {actual}")]
    UnexpectedRowCount {
        /// Addressed row
        key: EntityKey,
        /// Rows the backend reported
        actual: u64,
    },

    /// Backend applied a write but the row's new version cannot be tied to it
    #[error("version of {key} after {statement} cannot be attributed to it: {reason}")]
    UnattributedVersion {
        /// Written row
        key: EntityKey,
        /// Applied statement
        statement: &'static str,
        /// Why the version is unknown
        reason: &'static str,
    },

    /// Row does not exist
    #[error("row not found: {0}")]
    RowNotFound(EntityKey),

    /// Snapshot was invalidated by an earlier conflict and must be reloaded
    #[error("snapshot of {key} is invalid ({reason}); reload it in a new session")]
    InvalidSnapshot {
        /// Entity whose snapshot is unusable
        key: EntityKey,
        /// Why the snapshot was invalidated
        reason: String,
    },

    /// Entity is not managed by this session
    #[error("entity {0} is not managed by this session")]
    NotManaged(EntityKey),

    /// Operation requires an active transaction
    #[error("transaction not active ({state})")]
    TransactionNotActive {
        /// Current transaction state
        state: String,
    },

    /// `begin` called while a transaction is running
    #[error("transaction already active")]
    TransactionAlreadyActive,

    /// Transaction saw a conflict; only rollback is allowed
    #[error("transaction is marked rollback-only")]
    RollbackOnly,

    /// Backend failure that is not a write conflict
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::StaleState(_))
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RowNotFound(_))
    }

    /// Conflict record carried by a stale-state error
    pub fn conflict(&self) -> Option<&ConflictRecord> {
        match self {
            Error::StaleState(record) => Some(record),
            _ => None,
        }
    }
}
