//! Conflict records
//!
//! A [`ConflictRecord`] is what a caller receives when a conditioned write is
//! rejected because the row moved on underneath its snapshot.

use crate::token::RowVersion;
use crate::types::EntityKey;

/// Kind of conditioned write that was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteKind {
    /// Conditioned update
    Update,
    /// Conditioned delete
    Delete,
}

impl WriteKind {
    /// Statement name for messages
    pub const fn name(&self) -> &'static str {
        match self {
            WriteKind::Update => "update",
            WriteKind::Delete => "delete",
        }
    }
}

/// How the backend signalled the conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictCause {
    /// Zero rows affected while the row still exists
    ZeroRowsAffected,
    /// Row was deleted; reported as a conflict when callers do not
    /// distinguish the two
    RowDeleted,
    /// Backend raised its serialization failure
    SerializationFailure {
        /// Vendor error number, if reported
        vendor_code: Option<i32>,
        /// SQL state, if reported
        sql_state: Option<String>,
    },
}

/// A rejected conditioned write
///
/// Carries the identity of the entity, the token the write was conditioned
/// on, and what the backend reported. Both causes mean the same thing to the
/// caller: reload and decide again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    /// Entity whose write was rejected
    pub key: EntityKey,
    /// Token the write was conditioned on
    pub expected: RowVersion,
    /// Rejected statement
    pub write: WriteKind,
    /// Backend signal
    pub cause: ConflictCause,
}

impl ConflictRecord {
    /// True if the backend reported the conflict as a serialization failure
    pub fn is_serialization_failure(&self) -> bool {
        matches!(self.cause, ConflictCause::SerializationFailure { .. })
    }
}

impl std::fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} conditioned on {}",
            self.write.name(),
            self.key,
            self.expected
        )?;
        match &self.cause {
            ConflictCause::ZeroRowsAffected => write!(f, " affected no rows"),
            ConflictCause::RowDeleted => write!(f, " found the row deleted"),
            ConflictCause::SerializationFailure {
                vendor_code,
                sql_state,
            } => {
                write!(f, " failed serialization")?;
                if let Some(code) = vendor_code {
                    write!(f, " (error {})", code)?;
                }
                if let Some(state) = sql_state {
                    write!(f, " (state {})", state)?;
                }
                Ok(())
            }
        }
    }
}
