//! Storage layer for rowguard
//!
//! This crate defines the backend interface the locking protocol drives and
//! ships an in-memory backend:
//! - RowStore: select / insert / version-conditioned update and delete
//! - MemoryRowStore: DashMap-sharded tables with a database-wide row version
//!   counter, atomic condition evaluation, and per-dialect conflict reporting

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod store;

pub use memory::{MemoryRowStore, StatementStats};
pub use store::{InsertResult, RawRow, RowStore, StoreResult, UpdateResult};
