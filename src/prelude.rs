//! Convenient imports for rowguard.
//!
//! ```ignore
//! use rowguard::prelude::*;
//!
//! let factory = rowguard::open_in_memory(Dialect::SqlServer)?;
//! let mut session = factory.open_session();
//! ```

// Error handling
pub use crate::error::{Error, Result};

// Unit of work
pub use crate::{LockingConfig, Session, SessionFactory, TransactionStatus};

// Core types
pub use crate::{ConflictCause, ConflictRecord, Dialect, EntityKey, Outcome, Payload, RowVersion};

// Backend
pub use crate::{MemoryRowStore, RowStore};

// Re-export serde_json for convenience
pub use serde_json::json;
