//! Stale-write detection
//!
//! The detector wraps every update and delete in a version precondition and
//! classifies what the backend reports:
//!
//! ```text
//! rows_affected == 1            -> Applied(new token)
//! rows_affected == 0, row found -> Conflict (zero rows affected)
//! rows_affected == 0, row gone  -> NotFound
//! serialization failure         -> Conflict (same signal, different cause)
//! any other backend error       -> Err(Error::Backend)
//! ```
//!
//! The detector never retries, holds no tokens between calls, and takes no
//! locks: the backend evaluates the condition and the mutation atomically.
//! Capability flags are resolved once, when the detector is built.
//!
//! The new token of an applied update must come back from the update
//! itself. A separate read could observe a later writer's token, and the
//! next write conditioned on it would silently overwrite that writer.

use rowguard_core::{
    BackendError, ConflictCause, DialectCapabilities, EntityKey, Error, Outcome, Payload,
    Result, RowVersion, VersionCodec, WriteKind,
};
use rowguard_storage::RowStore;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Outcome of a conditioned write plus how a conflict was signalled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport<T> {
    /// Backend-independent outcome
    pub outcome: Outcome<T>,
    /// Backend signal behind a `Conflict`
    pub cause: Option<ConflictCause>,
}

impl<T> WriteReport<T> {
    fn applied(value: T) -> Self {
        Self {
            outcome: Outcome::Applied(value),
            cause: None,
        }
    }

    fn conflict(cause: ConflictCause) -> Self {
        Self {
            outcome: Outcome::Conflict,
            cause: Some(cause),
        }
    }

    fn not_found() -> Self {
        Self {
            outcome: Outcome::NotFound,
            cause: None,
        }
    }
}

/// Version-conditioned writes against a row store
pub struct StaleWriteDetector<S: RowStore + ?Sized> {
    store: Arc<S>,
    codec: Arc<dyn VersionCodec>,
    capabilities: DialectCapabilities,
}

impl<S: RowStore + ?Sized> StaleWriteDetector<S> {
    /// Build a detector, resolving the store's dialect capabilities once
    pub fn new(store: Arc<S>, codec: Arc<dyn VersionCodec>) -> Self {
        let capabilities = store.dialect().capabilities();
        debug!(
            dialect = %capabilities.dialect,
            column_type = codec.column_type(),
            "stale-write detector ready"
        );
        Self {
            store,
            codec,
            capabilities,
        }
    }

    /// Capability flags this detector branches on
    pub fn capabilities(&self) -> &DialectCapabilities {
        &self.capabilities
    }

    /// Codec used for the version column
    pub fn codec(&self) -> &Arc<dyn VersionCodec> {
        &self.codec
    }

    /// Underlying row store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Read a row and decode its version
    pub fn load(&self, key: &EntityKey) -> Result<Option<(RowVersion, Payload)>> {
        match self.store.select(key)? {
            Some(row) => {
                let version = self.codec.decode(&row.version)?;
                debug!(key = %key, version = %version, "loaded");
                Ok(Some((version, row.payload)))
            }
            None => Ok(None),
        }
    }

    /// Insert a row and capture the version the backend generated for it
    ///
    /// Backends that do not hand the version back from the insert are asked
    /// for it with a follow-up select, which only counts if the row still
    /// holds the inserted payload.
    pub fn insert(&self, entity: &str, payload: &Payload) -> Result<(EntityKey, RowVersion)> {
        let inserted = self.store.insert(entity, payload)?;
        let raw = match inserted.generated_version {
            Some(raw) if self.capabilities.generates_version_on_insert => raw,
            _ => self.reselect_inserted(&inserted.key, payload)?,
        };
        let version = self.codec.decode(&raw)?;
        debug!(key = %inserted.key, version = %version, "inserted");
        Ok((inserted.key, version))
    }

    /// Update a row only if its stored version is still `expected`
    pub fn conditioned_update(
        &self,
        key: &EntityKey,
        expected: &RowVersion,
        payload: &Payload,
    ) -> Result<Outcome<RowVersion>> {
        Ok(self.update_with_report(key, expected, payload)?.outcome)
    }

    /// Delete a row only if its stored version is still `expected`
    pub fn conditioned_delete(&self, key: &EntityKey, expected: &RowVersion) -> Result<Outcome<()>> {
        Ok(self.delete_with_report(key, expected)?.outcome)
    }

    /// [`conditioned_update`](Self::conditioned_update) with the conflict cause
    pub fn update_with_report(
        &self,
        key: &EntityKey,
        expected: &RowVersion,
        payload: &Payload,
    ) -> Result<WriteReport<RowVersion>> {
        let condition = self.codec.encode(expected)?;
        let report = match self.store.update_if_version(key, condition, payload) {
            Ok(result) => match result.rows_affected {
                0 => self.classify_unmatched(key)?,
                1 => match result.generated_version {
                    Some(raw) => WriteReport::applied(self.codec.decode(&raw)?),
                    None => {
                        error!(key = %key, "applied update returned no version");
                        return Err(Error::UnattributedVersion {
                            key: key.clone(),
                            statement: WriteKind::Update.name(),
                            reason: "backend did not return the generated version",
                        });
                    }
                },
                actual => {
                    return Err(Error::UnexpectedRowCount {
                        key: key.clone(),
                        actual,
                    })
                }
            },
            Err(err) => self.classify_failure(key, err)?,
        };
        self.log_report(key, expected, WriteKind::Update, &report);
        Ok(report)
    }

    /// [`conditioned_delete`](Self::conditioned_delete) with the conflict cause
    pub fn delete_with_report(
        &self,
        key: &EntityKey,
        expected: &RowVersion,
    ) -> Result<WriteReport<()>> {
        let condition = self.codec.encode(expected)?;
        let report = match self.store.delete_if_version(key, condition) {
            Ok(0) => self.classify_unmatched(key)?,
            Ok(1) => WriteReport::applied(()),
            Ok(actual) => {
                return Err(Error::UnexpectedRowCount {
                    key: key.clone(),
                    actual,
                })
            }
            Err(err) => self.classify_failure(key, err)?,
        };
        self.log_report(key, expected, WriteKind::Delete, &report);
        Ok(report)
    }

    /// Zero rows affected: tell a moved-on row from a vanished one
    fn classify_unmatched<T>(&self, key: &EntityKey) -> Result<WriteReport<T>> {
        if self.store.exists(key)? {
            Ok(WriteReport::conflict(ConflictCause::ZeroRowsAffected))
        } else {
            Ok(WriteReport::not_found())
        }
    }

    /// The dialect's serialization failure is a conflict; anything else is not
    fn classify_failure<T>(&self, key: &EntityKey, err: BackendError) -> Result<WriteReport<T>> {
        if self.capabilities.is_serialization_failure(&err) {
            return Ok(WriteReport::conflict(ConflictCause::SerializationFailure {
                vendor_code: err.vendor_code,
                sql_state: err.sql_state,
            }));
        }
        error!(key = %key, dialect = %self.capabilities.dialect, error = %err, "conditioned write failed");
        Err(Error::Backend(err))
    }

    /// Version of a row this detector just inserted
    ///
    /// A changed payload means another writer got in before the read and the
    /// version is theirs.
    fn reselect_inserted(&self, key: &EntityKey, payload: &Payload) -> Result<Vec<u8>> {
        let row = self
            .store
            .select(key)?
            .ok_or_else(|| Error::RowNotFound(key.clone()))?;
        if &row.payload != payload {
            error!(key = %key, "inserted row rewritten before its version was read");
            return Err(Error::UnattributedVersion {
                key: key.clone(),
                statement: "insert",
                reason: "row was rewritten before its version was read",
            });
        }
        Ok(row.version)
    }

    fn log_report<T>(
        &self,
        key: &EntityKey,
        expected: &RowVersion,
        write: WriteKind,
        report: &WriteReport<T>,
    ) {
        match &report.outcome {
            Outcome::Applied(_) => {
                debug!(key = %key, expected = %expected, write = write.name(), "conditioned write applied")
            }
            outcome => warn!(
                key = %key,
                expected = %expected,
                write = write.name(),
                outcome = outcome.label(),
                cause = ?report.cause,
                "stale write rejected"
            ),
        }
    }
}

impl<S: RowStore + ?Sized> Clone for StaleWriteDetector<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: Arc::clone(&self.codec),
            capabilities: self.capabilities,
        }
    }
}

impl<S: RowStore + ?Sized> std::fmt::Debug for StaleWriteDetector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleWriteDetector")
            .field("dialect", &self.capabilities.dialect)
            .field("column_type", &self.codec.column_type())
            .finish()
    }
}
