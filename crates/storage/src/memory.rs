//! In-memory row store
//!
//! Tables are sharded by entity name in a DashMap; rows within a table live
//! in an FxHashMap keyed by id. A conditioned write holds the table's shard
//! guard while it compares the version and applies the mutation, so the pair
//! is atomic with respect to every other statement on that table.
//!
//! # Row Versions
//!
//! Like SQL Server's `rowversion`, versions are drawn from one database-wide
//! counter and stored as 8 big-endian bytes. Every insert and every applied
//! update takes the next value, so a row never sees the same version twice.
//!
//! # Conflict Reporting
//!
//! A failed version condition is reported the way the configured dialect
//! reports it: zero rows affected, or the dialect's serialization failure.
//! Tests can also queue arbitrary backend failures with
//! [`MemoryRowStore::inject_failure`].

use crate::store::{InsertResult, RawRow, RowStore, StoreResult, UpdateResult};
use byteorder::{BigEndian, ByteOrder};
use dashmap::DashMap;
use parking_lot::Mutex;
use rowguard_core::{
    BackendError, ConflictReporting, Dialect, DialectCapabilities, EntityKey, Payload,
};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Width of a stored row version
pub const ROW_VERSION_WIDTH: usize = 8;

#[derive(Debug, Clone)]
struct StoredRow {
    version: [u8; ROW_VERSION_WIDTH],
    payload: Payload,
}

/// Rows of one entity
#[derive(Debug, Default)]
struct Table {
    rows: FxHashMap<u64, StoredRow>,
    last_id: u64,
}

/// Statement counters
#[derive(Debug, Default)]
struct Counters {
    selects: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

/// Point-in-time copy of the statement counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatementStats {
    /// Selects and existence checks issued
    pub selects: u64,
    /// Inserts issued
    pub inserts: u64,
    /// Conditioned and unconditioned updates issued
    pub updates: u64,
    /// Conditioned deletes issued
    pub deletes: u64,
}

/// In-memory backend with backend-generated row versions
///
/// # Example
///
/// ```
/// use rowguard_core::Dialect;
/// use rowguard_storage::{MemoryRowStore, RowStore};
///
/// let store = MemoryRowStore::new(Dialect::SqlServer);
/// let inserted = store.insert("Person", &serde_json::json!({"name": "Bob"})).unwrap();
/// assert!(store.exists(&inserted.key).unwrap());
/// ```
pub struct MemoryRowStore {
    /// Per-entity tables
    tables: DashMap<String, Table>,
    /// Database-wide row version counter
    version: AtomicU64,
    /// Flags of the emulated backend
    capabilities: DialectCapabilities,
    /// Failures returned by the next conditioned writes, oldest first
    injected: Mutex<VecDeque<BackendError>>,
    counters: Counters,
}

impl MemoryRowStore {
    /// Create an empty store emulating `dialect`
    pub fn new(dialect: Dialect) -> Self {
        Self {
            tables: DashMap::new(),
            version: AtomicU64::new(0),
            capabilities: dialect.capabilities(),
            injected: Mutex::new(VecDeque::new()),
            counters: Counters::default(),
        }
    }

    /// Start the version counter at `initial` (the next version is `initial + 1`)
    pub fn with_initial_version(dialect: Dialect, initial: u64) -> Self {
        let store = Self::new(dialect);
        store.version.store(initial, Ordering::Release);
        store
    }

    /// Highest version handed out so far
    #[inline]
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    #[inline]
    fn next_version(&self) -> [u8; ROW_VERSION_WIDTH] {
        let value = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        let mut bytes = [0u8; ROW_VERSION_WIDTH];
        BigEndian::write_u64(&mut bytes, value);
        bytes
    }

    /// Queue a failure for the next conditioned update or delete
    ///
    /// Failures are returned in the order they were queued, one per
    /// statement, before the version condition is evaluated.
    pub fn inject_failure(&self, err: BackendError) {
        self.injected.lock().push_back(err);
    }

    fn take_injected(&self) -> Option<BackendError> {
        self.injected.lock().pop_front()
    }

    /// Unconditionally rewrite a row, as an out-of-band writer would
    ///
    /// Returns the new version bytes, or `None` if the row does not exist.
    pub fn touch(&self, key: &EntityKey, payload: Option<Payload>) -> Option<Vec<u8>> {
        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        let mut table = self.tables.get_mut(key.entity())?;
        let row = table.rows.get_mut(&key.id())?;
        row.version = self.next_version();
        if let Some(payload) = payload {
            row.payload = payload;
        }
        trace!(key = %key, "unconditioned update");
        Some(row.version.to_vec())
    }

    /// Number of rows stored for an entity
    pub fn row_count(&self, entity: &str) -> usize {
        self.tables
            .get(entity)
            .map(|table| table.rows.len())
            .unwrap_or(0)
    }

    /// Snapshot of the statement counters
    pub fn stats(&self) -> StatementStats {
        StatementStats {
            selects: self.counters.selects.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            updates: self.counters.updates.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    /// How a failed condition is surfaced under the emulated dialect
    fn condition_failed(&self, key: &EntityKey, statement: &str) -> StoreResult<()> {
        match self.capabilities.conflict_reporting {
            ConflictReporting::AffectedRows => Ok(()),
            ConflictReporting::SerializationFailure => {
                Err(self.capabilities.serialization_failure_error(format!(
                    "{} of {} aborted due to a concurrent update",
                    statement, key
                )))
            }
        }
    }
}

impl RowStore for MemoryRowStore {
    fn dialect(&self) -> Dialect {
        self.capabilities.dialect
    }

    fn insert(&self, entity: &str, payload: &Payload) -> StoreResult<InsertResult> {
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        let mut table = self.tables.entry(entity.to_string()).or_default();
        table.last_id += 1;
        let id = table.last_id;
        let version = self.next_version();
        table.rows.insert(
            id,
            StoredRow {
                version,
                payload: payload.clone(),
            },
        );

        let key = EntityKey::new(entity, id);
        trace!(key = %key, "insert");
        Ok(InsertResult {
            key,
            generated_version: self
                .capabilities
                .generates_version_on_insert
                .then(|| version.to_vec()),
        })
    }

    fn select(&self, key: &EntityKey) -> StoreResult<Option<RawRow>> {
        self.counters.selects.fetch_add(1, Ordering::Relaxed);
        Ok(self.tables.get(key.entity()).and_then(|table| {
            table.rows.get(&key.id()).map(|row| RawRow {
                version: row.version.to_vec(),
                payload: row.payload.clone(),
            })
        }))
    }

    fn exists(&self, key: &EntityKey) -> StoreResult<bool> {
        self.counters.selects.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .tables
            .get(key.entity())
            .map(|table| table.rows.contains_key(&key.id()))
            .unwrap_or(false))
    }

    fn update_if_version(
        &self,
        key: &EntityKey,
        expected: &[u8],
        payload: &Payload,
    ) -> StoreResult<UpdateResult> {
        self.counters.updates.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.take_injected() {
            return Err(err);
        }

        let Some(mut table) = self.tables.get_mut(key.entity()) else {
            return Ok(UpdateResult::unmatched());
        };
        let Some(row) = table.rows.get_mut(&key.id()) else {
            return Ok(UpdateResult::unmatched());
        };
        if row.version.as_slice() != expected {
            drop(table);
            self.condition_failed(key, "update")?;
            return Ok(UpdateResult::unmatched());
        }

        row.version = self.next_version();
        row.payload = payload.clone();
        trace!(key = %key, "conditioned update applied");
        Ok(UpdateResult::applied(row.version.to_vec()))
    }

    fn delete_if_version(&self, key: &EntityKey, expected: &[u8]) -> StoreResult<u64> {
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.take_injected() {
            return Err(err);
        }

        let Some(mut table) = self.tables.get_mut(key.entity()) else {
            return Ok(0);
        };
        let matches = match table.rows.get(&key.id()) {
            Some(row) => row.version.as_slice() == expected,
            None => return Ok(0),
        };
        if !matches {
            drop(table);
            self.condition_failed(key, "delete")?;
            return Ok(0);
        }

        table.rows.remove(&key.id());
        trace!(key = %key, "conditioned delete applied");
        Ok(1)
    }
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new(Dialect::SqlServer)
    }
}

impl std::fmt::Debug for MemoryRowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRowStore")
            .field("dialect", &self.capabilities.dialect)
            .field("table_count", &self.tables.len())
            .field("version", &self.current_version())
            .finish()
    }
}
