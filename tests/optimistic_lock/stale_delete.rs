//! Stale Delete Tests
//!
//! A delete conditioned on an old token must report a conflict while the row
//! still exists, and not-found only once it is really gone.

use crate::common::*;
use rowguard::prelude::*;
use rowguard::{CoreError, LockingConfig, WriteKind};

#[test]
fn test_delete_after_concurrent_update_conflicts() {
    let factory = factory(Dialect::SqlServer);
    let key = seed_person(&factory, "Bob");

    let mut first = factory.open_session();
    first.begin().unwrap();
    first.get(&key).unwrap();

    rename_elsewhere(&factory, &key, "Robert");

    first.delete(&key).unwrap();
    let err = first.flush().unwrap_err();
    assert!(err.is_conflict(), "expected conflict, got {err}");
    assert!(!err.is_not_found());
    assert_eq!(err.conflict().unwrap().write, WriteKind::Delete);

    first.rollback().unwrap();
    assert_eq!(factory.store().row_count("Person"), 1);
}

#[test]
fn test_delete_with_current_token_removes_row() {
    let factory = factory(Dialect::SqlServer);
    let key = seed_person(&factory, "Bob");

    let mut session = factory.open_session();
    session.begin().unwrap();
    session.delete(&key).unwrap();
    assert_eq!(session.commit().unwrap().deleted, 1);

    assert_eq!(stored_name(&factory, &key), None);
}

#[test]
fn test_delete_of_row_deleted_elsewhere_is_not_found() {
    let factory = factory(Dialect::SqlServer);
    let key = seed_person(&factory, "Bob");

    let mut first = factory.open_session();
    first.begin().unwrap();
    first.load(&key).unwrap();

    let mut other = factory.open_session();
    other.begin().unwrap();
    other.delete(&key).unwrap();
    other.commit().unwrap();

    first.delete(&key).unwrap();
    let err = first.flush().unwrap_err();
    assert!(matches!(err, CoreError::RowNotFound(ref k) if k == &key));

    let facade: rowguard::Error = err.into();
    assert!(facade.is_not_found());
    assert!(!facade.is_retryable());
}

#[test]
fn test_unified_not_found_reports_conflict() {
    init_tracing();
    let factory = rowguard::open_in_memory_with(
        Dialect::SqlServer,
        LockingConfig::default().with_unified_not_found(true),
    )
    .unwrap();
    let key = seed_person(&factory, "Bob");

    let mut first = factory.open_session();
    first.begin().unwrap();
    first.load(&key).unwrap();

    let mut other = factory.open_session();
    other.begin().unwrap();
    other.delete(&key).unwrap();
    other.commit().unwrap();

    first.update(&key, json!({"name": "Bobby"})).unwrap();
    let err = first.flush().unwrap_err();
    assert_eq!(err.conflict().unwrap().cause, ConflictCause::RowDeleted);
}

#[test]
fn test_ignored_delete_of_missing_row_commits() {
    init_tracing();
    let factory = rowguard::open_in_memory_with(
        Dialect::SqlServer,
        LockingConfig::default().with_ignore_delete_of_missing(true),
    )
    .unwrap();
    let key = seed_person(&factory, "Bob");

    let mut first = factory.open_session();
    first.begin().unwrap();
    first.load(&key).unwrap();

    let mut other = factory.open_session();
    other.begin().unwrap();
    other.delete(&key).unwrap();
    other.commit().unwrap();

    first.delete(&key).unwrap();
    assert_eq!(first.commit().unwrap().deleted, 1);
}

#[test]
fn test_delete_of_unknown_row_fails_immediately() {
    let factory = factory(Dialect::SqlServer);
    let mut session = factory.open_session();
    session.begin().unwrap();

    let err = session.delete(&EntityKey::new("Person", 99)).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(session.status(), &TransactionStatus::Active);
}
