//! Row store wrapper for tests

use parking_lot::Mutex;
use rowguard_core::{Dialect, EntityKey, Payload};
use rowguard_storage::{InsertResult, MemoryRowStore, RawRow, RowStore, StoreResult, UpdateResult};

/// Memory store whose statements never hand back generated versions
///
/// It can also let another writer rewrite a row right after the next
/// insert or applied update, before the caller gets to read it.
#[derive(Debug)]
pub(crate) struct WithholdingStore {
    inner: MemoryRowStore,
    after_insert: Mutex<Option<Payload>>,
    after_update: Mutex<Option<Payload>>,
}

impl WithholdingStore {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            inner: MemoryRowStore::new(dialect),
            after_insert: Mutex::new(None),
            after_update: Mutex::new(None),
        }
    }

    pub(crate) fn inner(&self) -> &MemoryRowStore {
        &self.inner
    }

    /// Rewrite the next inserted row with `payload`
    pub(crate) fn interleave_next_insert(&self, payload: Payload) {
        *self.after_insert.lock() = Some(payload);
    }

    /// Rewrite the row of the next applied update with `payload`
    pub(crate) fn interleave_next_update(&self, payload: Payload) {
        *self.after_update.lock() = Some(payload);
    }
}

impl RowStore for WithholdingStore {
    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    fn insert(&self, entity: &str, payload: &Payload) -> StoreResult<InsertResult> {
        let mut inserted = self.inner.insert(entity, payload)?;
        inserted.generated_version = None;
        if let Some(other) = self.after_insert.lock().take() {
            self.inner.touch(&inserted.key, Some(other));
        }
        Ok(inserted)
    }

    fn select(&self, key: &EntityKey) -> StoreResult<Option<RawRow>> {
        self.inner.select(key)
    }

    fn update_if_version(
        &self,
        key: &EntityKey,
        expected: &[u8],
        payload: &Payload,
    ) -> StoreResult<UpdateResult> {
        let mut result = self.inner.update_if_version(key, expected, payload)?;
        if result.rows_affected == 1 {
            result.generated_version = None;
            if let Some(other) = self.after_update.lock().take() {
                self.inner.touch(key, Some(other));
            }
        }
        Ok(result)
    }

    fn delete_if_version(&self, key: &EntityKey, expected: &[u8]) -> StoreResult<u64> {
        self.inner.delete_if_version(key, expected)
    }
}
