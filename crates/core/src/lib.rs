//! Core types for rowguard
//!
//! This crate defines the vocabulary of the optimistic locking protocol:
//! - RowVersion: opaque backend-generated version token
//! - VersionCodec: translation between version columns and tokens
//! - ColumnTypeRegistry: codec lookup by SQL column type name
//! - Dialect: backend identity and capability flags
//! - Outcome / ConflictRecord: what a conditioned write reports

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod conflict;
pub mod dialect;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod token;
pub mod types;

pub use codec::{BinaryVersionCodec, VersionCodec};
pub use conflict::{ConflictCause, ConflictRecord, WriteKind};
pub use dialect::{ConflictReporting, Dialect, DialectCapabilities, FailureSignature};
pub use error::{BackendError, Error, Result};
pub use outcome::Outcome;
pub use registry::ColumnTypeRegistry;
pub use token::RowVersion;
pub use types::{EntityKey, Payload};
