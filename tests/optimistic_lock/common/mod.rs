//! Shared test utilities

#![allow(dead_code)]

use rowguard::prelude::*;
use std::sync::Arc;

/// Install a fmt subscriber that writes through the test harness
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Factory over a fresh in-memory store
pub fn factory(dialect: Dialect) -> SessionFactory<MemoryRowStore> {
    init_tracing();
    rowguard::open_in_memory(dialect).expect("factory should build")
}

/// Factory over a fresh in-memory store, shareable across threads
pub fn shared_factory(dialect: Dialect) -> Arc<SessionFactory<MemoryRowStore>> {
    Arc::new(factory(dialect))
}

/// Commit a new `Person` row in its own session
pub fn seed_person(factory: &SessionFactory<MemoryRowStore>, name: &str) -> EntityKey {
    let mut session = factory.open_session();
    session.begin().unwrap();
    let key = session.save("Person", json!({ "name": name })).unwrap();
    session.commit().unwrap();
    key
}

/// Change a row in a separate, committed unit of work
pub fn rename_elsewhere(factory: &SessionFactory<MemoryRowStore>, key: &EntityKey, name: &str) {
    let mut other = factory.open_session();
    other.begin().unwrap();
    other.load(key).unwrap();
    other.update(key, json!({ "name": name })).unwrap();
    other.commit().unwrap();
}

/// Name stored for a row, read in a fresh unit of work
pub fn stored_name(factory: &SessionFactory<MemoryRowStore>, key: &EntityKey) -> Option<String> {
    let mut session = factory.open_session();
    let name = session
        .get(key)
        .unwrap()
        .and_then(|payload| payload["name"].as_str().map(str::to_string));
    name
}

/// Version bytes currently stored for a row
pub fn stored_version(factory: &SessionFactory<MemoryRowStore>, key: &EntityKey) -> Option<Vec<u8>> {
    factory.store().select(key).unwrap().map(|row| row.version)
}
