//! # rowguard
//!
//! Optimistic locking on backend-generated row versions.
//!
//! Every update and delete is conditioned on the version token the unit of
//! work last saw for the row. The backend evaluates the condition and the
//! mutation atomically and generates a fresh token on every successful write;
//! rowguard only carries the token and classifies what the backend reports.
//!
//! ## Quick Start
//!
//! ```ignore
//! use rowguard::prelude::*;
//!
//! let factory = rowguard::open_in_memory(Dialect::SqlServer)?;
//!
//! let mut session = factory.open_session();
//! session.begin()?;
//! let key = session.save("Person", json!({"name": "Bob"}))?;
//! session.commit()?;
//!
//! let mut session = factory.open_session();
//! session.begin()?;
//! session.load(&key)?;
//! session.update(&key, json!({"name": "Robert"}))?;
//! match session.commit() {
//!     Ok(_) => {}
//!     Err(e) if e.is_conflict() => session.rollback()?, // reload and decide again
//!     Err(e) => return Err(e.into()),
//! }
//! ```
//!
//! ## Outcomes
//!
//! A conditioned write has three outcomes: applied (with a new token),
//! conflict (the row moved on), and not found (the row is gone). A backend
//! serialization failure is reported as a conflict, so callers see one
//! signal whichever way the backend detects the race.
//!
//! ## Crates
//!
//! - `rowguard-core` - tokens, codecs, dialects, outcomes, conflict records
//! - `rowguard-storage` - the [`RowStore`] backend interface and [`MemoryRowStore`]
//! - `rowguard-concurrency` - [`StaleWriteDetector`], [`Session`], [`SessionFactory`]

#![warn(missing_docs)]

mod error;

pub mod prelude;

pub use error::{Error, Result};

// Re-export core types
pub use rowguard_core::{
    BackendError, BinaryVersionCodec, ColumnTypeRegistry, ConflictCause, ConflictRecord,
    ConflictReporting, Dialect, DialectCapabilities, EntityKey, FailureSignature, Outcome,
    Payload, RowVersion, VersionCodec, WriteKind,
};

/// Detailed error type of the component crates
pub use rowguard_core::Error as CoreError;

// Re-export storage
pub use rowguard_storage::{InsertResult, MemoryRowStore, RawRow, RowStore, UpdateResult};

// Re-export the unit of work
pub use rowguard_concurrency::{
    EntitySnapshot, FlushReport, InvalidReason, LockingConfig, Session, SessionFactory,
    SessionFactoryBuilder, SnapshotState, StaleWriteDetector, TransactionStatus, WriteReport,
};

use std::sync::Arc;

/// Session factory over a fresh in-memory store with default configuration
pub fn open_in_memory(dialect: Dialect) -> Result<SessionFactory<MemoryRowStore>> {
    open_in_memory_with(dialect, LockingConfig::default())
}

/// Session factory over a fresh in-memory store
pub fn open_in_memory_with(
    dialect: Dialect,
    config: LockingConfig,
) -> Result<SessionFactory<MemoryRowStore>> {
    let factory = SessionFactory::builder()
        .store(Arc::new(MemoryRowStore::new(dialect)))
        .config(config)
        .build()?;
    Ok(factory)
}
