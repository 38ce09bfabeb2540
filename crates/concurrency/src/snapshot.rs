//! Entity snapshots
//!
//! A snapshot is what one session knows about one row: its key, the version
//! token it last saw, and the payload as loaded or last written. Snapshots
//! are owned by the session that created them and die with its unit of work.
//!
//! ```text
//! Loaded --applied--> Loaded (refreshed token)
//! Loaded --conflict--> Invalid
//! Loaded --not found--> Invalid
//! ```
//!
//! `Invalid` is terminal: the row has to be reloaded in a new unit of work.

use rowguard_core::{EntityKey, Error, Payload, Result, RowVersion};

/// Why a snapshot can no longer be written through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Another unit of work changed the row
    Conflict,
    /// The row was deleted
    NotFound,
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidReason::Conflict => write!(f, "concurrently modified"),
            InvalidReason::NotFound => write!(f, "row deleted"),
        }
    }
}

/// Snapshot lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotState {
    /// Token is the latest this unit of work knows of
    Loaded,
    /// A conditioned write against this snapshot was rejected
    Invalid(InvalidReason),
}

/// What one unit of work knows about one row
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    key: EntityKey,
    version: RowVersion,
    payload: Payload,
    state: SnapshotState,
}

impl EntitySnapshot {
    /// Snapshot of a freshly loaded or inserted row
    pub fn loaded(key: EntityKey, version: RowVersion, payload: Payload) -> Self {
        Self {
            key,
            version,
            payload,
            state: SnapshotState::Loaded,
        }
    }

    /// Row identity
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Token the next conditioned write must present
    pub fn version(&self) -> &RowVersion {
        &self.version
    }

    /// Payload as loaded or last written
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Lifecycle state
    pub fn state(&self) -> SnapshotState {
        self.state
    }

    /// Check if writes may still be conditioned on this snapshot
    pub fn is_valid(&self) -> bool {
        self.state == SnapshotState::Loaded
    }

    /// Fail with [`Error::InvalidSnapshot`] unless the snapshot is usable
    pub fn ensure_valid(&self) -> Result<()> {
        match self.state {
            SnapshotState::Loaded => Ok(()),
            SnapshotState::Invalid(reason) => Err(Error::InvalidSnapshot {
                key: self.key.clone(),
                reason: reason.to_string(),
            }),
        }
    }

    /// Record an applied write: the next write is conditioned on `version`
    pub(crate) fn refresh(&mut self, version: RowVersion, payload: Payload) {
        self.version = version;
        self.payload = payload;
    }

    pub(crate) fn invalidate(&mut self, reason: InvalidReason) {
        self.state = SnapshotState::Invalid(reason);
    }
}
