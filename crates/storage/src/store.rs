//! Row store interface
//!
//! [`RowStore`] is the narrow slice of a persistence backend that the
//! optimistic locking protocol needs. Version columns travel as raw bytes;
//! decoding them is the codec's job, not the store's.
//!
//! # Atomicity
//!
//! `update_if_version` and `delete_if_version` must evaluate the version
//! condition and apply the mutation as one step, the way a single
//! `UPDATE ... WHERE id = ? AND version = ?` statement does. The detector
//! takes no locks of its own and relies on this.

use rowguard_core::{BackendError, Dialect, EntityKey, Payload};

/// Result type for row store statements
pub type StoreResult<T> = Result<T, BackendError>;

/// A row as read from the backend
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Version column bytes
    pub version: Vec<u8>,
    /// Field document
    pub payload: Payload,
}

/// Result of an insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertResult {
    /// Key assigned to the new row
    pub key: EntityKey,
    /// Version generated for the row, when the statement hands it back
    pub generated_version: Option<Vec<u8>>,
}

/// Result of a conditioned update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// Rows matched by key and version
    pub rows_affected: u64,
    /// Version generated by the update
    ///
    /// Required whenever the update applied. A later read could observe
    /// another writer's version, so the detector never substitutes one.
    pub generated_version: Option<Vec<u8>>,
}

impl UpdateResult {
    /// Update that applied and generated `version`
    pub fn applied(version: Vec<u8>) -> Self {
        Self {
            rows_affected: 1,
            generated_version: Some(version),
        }
    }

    /// Update that matched nothing
    pub fn unmatched() -> Self {
        Self {
            rows_affected: 0,
            generated_version: None,
        }
    }
}

/// Backend statements used by the locking protocol
pub trait RowStore: Send + Sync {
    /// Backend identity, used to resolve capability flags
    fn dialect(&self) -> Dialect;

    /// Insert a row; the backend assigns the id and the first version
    ///
    /// Backends that do not hand the version back have it read with
    /// [`select`](Self::select); the read is only trusted if the row still
    /// holds the inserted payload.
    fn insert(&self, entity: &str, payload: &Payload) -> StoreResult<InsertResult>;

    /// Read a row by key
    fn select(&self, key: &EntityKey) -> StoreResult<Option<RawRow>>;

    /// Check whether a row exists
    fn exists(&self, key: &EntityKey) -> StoreResult<bool> {
        Ok(self.select(key)?.is_some())
    }

    /// `UPDATE ... SET payload WHERE key AND version = expected`
    fn update_if_version(
        &self,
        key: &EntityKey,
        expected: &[u8],
        payload: &Payload,
    ) -> StoreResult<UpdateResult>;

    /// `DELETE ... WHERE key AND version = expected`, returning rows affected
    fn delete_if_version(&self, key: &EntityKey, expected: &[u8]) -> StoreResult<u64>;
}
