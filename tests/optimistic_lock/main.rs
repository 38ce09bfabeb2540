//! Optimistic Locking Test Suite
//!
//! End-to-end scenarios through sessions sharing one in-memory store: two
//! units of work racing on a row, deletes against a moved-on row, repeated
//! writes in one session, serialization-failure backends, and real threads
//! contending on one token.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test optimistic_lock
//!
//! # Run the thread contention scenarios only
//! cargo test --test optimistic_lock contention::
//! ```

mod common;

mod contention;
mod sequential_writes;
mod serialization_failure;
mod stale_delete;
