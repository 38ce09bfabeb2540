//! Unit of work
//!
//! A [`Session`] owns the snapshots of every row it has loaded or saved and
//! writes changes back through the [`StaleWriteDetector`] on flush. Each
//! write is conditioned on the token the session last saw for that row; an
//! applied write refreshes the token, so several flushes within one
//! transaction never need to reload.
//!
//! ## Transaction States
//!
//! ```text
//! Idle --begin--> Active --commit--> Committed
//!                   |  \--rollback--> RolledBack
//!                   |
//!                conflict
//!                   v
//!             RollbackOnly --rollback--> RolledBack
//! ```
//!
//! A conflict poisons the transaction: flush and commit fail with
//! [`Error::RollbackOnly`] until the caller rolls back, matching backends
//! that abort the transaction on a serialization failure. The core never
//! retries; the caller reloads in a fresh transaction and decides again.
//!
//! Snapshots are discarded on commit, rollback and clear. Nothing is cached
//! across units of work.

use crate::config::LockingConfig;
use crate::detector::StaleWriteDetector;
use crate::snapshot::{EntitySnapshot, InvalidReason};
use rowguard_core::{
    ConflictCause, ConflictRecord, EntityKey, Error, Outcome, Payload, Result, RowVersion,
    WriteKind,
};
use rowguard_storage::RowStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Transaction state of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// No transaction started yet
    Idle,
    /// Transaction running; reads and writes allowed
    Active,
    /// A write was rejected; only rollback is allowed
    RollbackOnly {
        /// What poisoned the transaction
        reason: String,
    },
    /// Transaction committed
    Committed,
    /// Transaction rolled back
    RolledBack,
}

impl TransactionStatus {
    /// State name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            TransactionStatus::Idle => "idle",
            TransactionStatus::Active => "active",
            TransactionStatus::RollbackOnly { .. } => "rollback-only",
            TransactionStatus::Committed => "committed",
            TransactionStatus::RolledBack => "rolled back",
        }
    }

    /// A transaction has begun and not yet ended
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Active | TransactionStatus::RollbackOnly { .. }
        )
    }
}

/// Rows written by one flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Conditioned updates applied
    pub updated: usize,
    /// Conditioned deletes applied (or skipped as already deleted)
    pub deleted: usize,
}

#[derive(Debug)]
struct ManagedEntity {
    snapshot: EntitySnapshot,
    current: Payload,
    delete_scheduled: bool,
}

impl ManagedEntity {
    fn new(snapshot: EntitySnapshot) -> Self {
        let current = snapshot.payload().clone();
        Self {
            snapshot,
            current,
            delete_scheduled: false,
        }
    }

    fn needs_write(&self) -> bool {
        self.delete_scheduled || &self.current != self.snapshot.payload()
    }
}

/// One unit of work
pub struct Session<S: RowStore + ?Sized> {
    detector: StaleWriteDetector<S>,
    config: Arc<LockingConfig>,
    status: TransactionStatus,
    entities: BTreeMap<EntityKey, ManagedEntity>,
}

impl<S: RowStore + ?Sized> Session<S> {
    /// Create a session writing through `detector`
    pub fn new(detector: StaleWriteDetector<S>, config: Arc<LockingConfig>) -> Self {
        Self {
            detector,
            config,
            status: TransactionStatus::Idle,
            entities: BTreeMap::new(),
        }
    }

    /// Current transaction state
    pub fn status(&self) -> &TransactionStatus {
        &self.status
    }

    /// Start a transaction
    ///
    /// Snapshots taken by reads outside a transaction are discarded; the
    /// transaction reloads what it touches.
    pub fn begin(&mut self) -> Result<()> {
        if self.status.is_active() {
            return Err(Error::TransactionAlreadyActive);
        }
        self.entities.clear();
        self.status = TransactionStatus::Active;
        debug!("transaction started");
        Ok(())
    }

    /// Insert a new row and manage it
    ///
    /// The insert runs immediately; the snapshot carries the version the
    /// backend generated for the row.
    pub fn save(&mut self, entity: &str, payload: Payload) -> Result<EntityKey> {
        self.require_writable()?;
        let (key, version) = self.detector.insert(entity, &payload)?;
        let snapshot = EntitySnapshot::loaded(key.clone(), version, payload);
        self.entities.insert(key.clone(), ManagedEntity::new(snapshot));
        Ok(key)
    }

    /// Managed payload of a row, loading it on first access
    ///
    /// Returns `None` if the row does not exist or is scheduled for deletion.
    pub fn get(&mut self, key: &EntityKey) -> Result<Option<&Payload>> {
        if !self.entities.contains_key(key) {
            match self.detector.load(key)? {
                Some((version, payload)) => {
                    let snapshot = EntitySnapshot::loaded(key.clone(), version, payload);
                    self.entities.insert(key.clone(), ManagedEntity::new(snapshot));
                }
                None => return Ok(None),
            }
        }

        let Some(entity) = self.entities.get(key) else {
            return Ok(None);
        };
        entity.snapshot.ensure_valid()?;
        if entity.delete_scheduled {
            return Ok(None);
        }
        Ok(Some(&entity.current))
    }

    /// Like [`get`](Self::get), but a missing row is [`Error::RowNotFound`]
    pub fn load(&mut self, key: &EntityKey) -> Result<&Payload> {
        self.get(key)?
            .ok_or_else(|| Error::RowNotFound(key.clone()))
    }

    /// Replace the payload of a managed row
    ///
    /// Nothing is written until the next flush, and only if the payload
    /// differs from the snapshot.
    pub fn update(&mut self, key: &EntityKey, payload: Payload) -> Result<()> {
        self.require_writable()?;
        let entity = self
            .entities
            .get_mut(key)
            .filter(|entity| !entity.delete_scheduled)
            .ok_or_else(|| Error::NotManaged(key.clone()))?;
        entity.snapshot.ensure_valid()?;
        entity.current = payload;
        Ok(())
    }

    /// Schedule a conditioned delete for the next flush
    ///
    /// An unmanaged row is loaded first so the delete is conditioned on the
    /// version current at that moment.
    pub fn delete(&mut self, key: &EntityKey) -> Result<()> {
        self.require_writable()?;
        if let Some(entity) = self.entities.get_mut(key) {
            entity.snapshot.ensure_valid()?;
            entity.delete_scheduled = true;
            return Ok(());
        }

        let (version, payload) = self
            .detector
            .load(key)?
            .ok_or_else(|| Error::RowNotFound(key.clone()))?;
        let mut entity = ManagedEntity::new(EntitySnapshot::loaded(key.clone(), version, payload));
        entity.delete_scheduled = true;
        self.entities.insert(key.clone(), entity);
        Ok(())
    }

    /// Write every pending change, in key order
    ///
    /// Stops at the first rejected write. The rejected row's snapshot becomes
    /// invalid and the transaction becomes rollback-only; rows written before
    /// it keep their refreshed tokens.
    pub fn flush(&mut self) -> Result<FlushReport> {
        self.require_writable()?;

        let pending: Vec<EntityKey> = self
            .entities
            .iter()
            .filter(|(_, entity)| entity.needs_write())
            .map(|(key, _)| key.clone())
            .collect();

        let mut summary = FlushReport::default();
        for key in pending {
            let Some(entity) = self.entities.get(&key) else {
                continue;
            };
            entity.snapshot.ensure_valid()?;
            let expected = entity.snapshot.version().clone();

            if entity.delete_scheduled {
                let report = match self.detector.delete_with_report(&key, &expected) {
                    Ok(report) => report,
                    Err(err) => return Err(self.poison(err)),
                };
                match report.outcome {
                    Outcome::Applied(()) => {
                        self.entities.remove(&key);
                        summary.deleted += 1;
                    }
                    Outcome::NotFound if self.config.ignore_delete_of_missing => {
                        debug!(key = %key, "row already deleted");
                        self.entities.remove(&key);
                        summary.deleted += 1;
                    }
                    Outcome::NotFound => {
                        return Err(self.reject(key, expected, WriteKind::Delete, None))
                    }
                    Outcome::Conflict => {
                        let cause = report.cause.unwrap_or(ConflictCause::ZeroRowsAffected);
                        return Err(self.reject(key, expected, WriteKind::Delete, Some(cause)));
                    }
                }
            } else {
                let payload = entity.current.clone();
                let report = match self.detector.update_with_report(&key, &expected, &payload) {
                    Ok(report) => report,
                    Err(err) => return Err(self.poison(err)),
                };
                match report.outcome {
                    Outcome::Applied(version) => {
                        if let Some(entity) = self.entities.get_mut(&key) {
                            entity.snapshot.refresh(version, payload);
                        }
                        summary.updated += 1;
                    }
                    Outcome::NotFound => {
                        return Err(self.reject(key, expected, WriteKind::Update, None))
                    }
                    Outcome::Conflict => {
                        let cause = report.cause.unwrap_or(ConflictCause::ZeroRowsAffected);
                        return Err(self.reject(key, expected, WriteKind::Update, Some(cause)));
                    }
                }
            }
        }

        debug!(
            updated = summary.updated,
            deleted = summary.deleted,
            "flushed"
        );
        Ok(summary)
    }

    /// Flush, end the transaction, and discard every snapshot
    pub fn commit(&mut self) -> Result<FlushReport> {
        self.require_writable()?;
        let summary = self.flush()?;
        self.entities.clear();
        self.status = TransactionStatus::Committed;
        debug!("transaction committed");
        Ok(summary)
    }

    /// End the transaction and discard every snapshot and pending change
    pub fn rollback(&mut self) -> Result<()> {
        if !self.status.is_active() {
            return Err(Error::TransactionNotActive {
                state: self.status.name().to_string(),
            });
        }
        let discarded = self.entities.len();
        self.entities.clear();
        self.status = TransactionStatus::RolledBack;
        debug!(discarded, "transaction rolled back");
        Ok(())
    }

    /// Discard every snapshot and pending change; the transaction continues
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Check whether a row is managed by this session
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entities.contains_key(key)
    }

    /// Token the next write to `key` will be conditioned on
    pub fn version_of(&self, key: &EntityKey) -> Option<&RowVersion> {
        self.entities.get(key).map(|entity| entity.snapshot.version())
    }

    /// Snapshot held for `key`
    pub fn snapshot(&self, key: &EntityKey) -> Option<&EntitySnapshot> {
        self.entities.get(key).map(|entity| &entity.snapshot)
    }

    /// Number of rows a flush would write
    pub fn pending_writes(&self) -> usize {
        self.entities
            .values()
            .filter(|entity| entity.needs_write())
            .count()
    }

    /// Check whether a flush would write anything
    pub fn is_dirty(&self) -> bool {
        self.pending_writes() > 0
    }

    /// End the session
    pub fn close(self) {}

    fn require_writable(&self) -> Result<()> {
        match &self.status {
            TransactionStatus::Active => Ok(()),
            TransactionStatus::RollbackOnly { .. } => Err(Error::RollbackOnly),
            other => Err(Error::TransactionNotActive {
                state: other.name().to_string(),
            }),
        }
    }

    fn mark_rollback_only(&mut self, reason: String) {
        warn!(reason = %reason, "transaction marked rollback-only");
        self.status = TransactionStatus::RollbackOnly { reason };
    }

    /// Backend failure during flush: the transaction's state is unknown
    fn poison(&mut self, err: Error) -> Error {
        self.mark_rollback_only(err.to_string());
        err
    }

    /// Turn a stale outcome into the caller's signal and invalidate the row
    ///
    /// `cause` is `None` for a vanished row.
    fn reject(
        &mut self,
        key: EntityKey,
        expected: RowVersion,
        write: WriteKind,
        cause: Option<ConflictCause>,
    ) -> Error {
        let (reason, err) = match cause {
            Some(cause) => (
                InvalidReason::Conflict,
                Error::StaleState(ConflictRecord {
                    key: key.clone(),
                    expected,
                    write,
                    cause,
                }),
            ),
            None if self.config.unify_not_found => (
                InvalidReason::NotFound,
                Error::StaleState(ConflictRecord {
                    key: key.clone(),
                    expected,
                    write,
                    cause: ConflictCause::RowDeleted,
                }),
            ),
            None => (InvalidReason::NotFound, Error::RowNotFound(key.clone())),
        };

        if let Some(entity) = self.entities.get_mut(&key) {
            entity.snapshot.invalidate(reason);
        }
        self.mark_rollback_only(err.to_string());
        err
    }
}

impl<S: RowStore + ?Sized> Drop for Session<S> {
    fn drop(&mut self) {
        if self.status == TransactionStatus::Active && self.is_dirty() {
            warn!(
                pending = self.pending_writes(),
                "session dropped with unflushed changes"
            );
        }
    }
}

impl<S: RowStore + ?Sized> std::fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("status", &self.status)
            .field("managed", &self.entities.len())
            .field("detector", &self.detector)
            .finish()
    }
}
