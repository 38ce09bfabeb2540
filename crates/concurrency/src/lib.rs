//! Optimistic locking for rowguard
//!
//! This crate turns version-conditioned writes into a unit of work:
//! - StaleWriteDetector: conditioned update/delete and outcome classification
//! - EntitySnapshot: the token and payload one session last saw for a row
//! - Session: begin/flush/commit/rollback with rollback-only on conflict
//! - SessionFactory: resolves codec and dialect capabilities once
//! - LockingConfig: TOML-loadable settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod detector;
pub mod factory;
pub mod session;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use config::LockingConfig;
pub use detector::{StaleWriteDetector, WriteReport};
pub use factory::{SessionFactory, SessionFactoryBuilder};
pub use session::{FlushReport, Session, TransactionStatus};
pub use snapshot::{EntitySnapshot, InvalidReason, SnapshotState};
