//! Serialization Failure Tests
//!
//! Backends that abort a stale write with a serialization failure instead of
//! reporting zero rows must look the same to the caller.

use crate::common::*;
use rowguard::prelude::*;
use rowguard::{BackendError, CoreError, WriteKind};

/// Run the two-writer race under `dialect` and return the loser's error
fn lose_race(dialect: Dialect) -> CoreError {
    let factory = factory(dialect);
    let key = seed_person(&factory, "Bob");

    let mut first = factory.open_session();
    first.begin().unwrap();
    first.load(&key).unwrap();
    rename_elsewhere(&factory, &key, "Robert");

    first.update(&key, json!({"name": "Bobby"})).unwrap();
    let err = first.flush().unwrap_err();
    assert!(matches!(first.commit(), Err(CoreError::RollbackOnly)));
    first.rollback().unwrap();
    err
}

#[test]
fn test_snapshot_isolation_conflict_carries_vendor_code() {
    let err = lose_race(Dialect::SqlServerSnapshot);
    let record = err.conflict().unwrap();
    assert!(record.is_serialization_failure());
    assert_eq!(
        record.cause,
        ConflictCause::SerializationFailure {
            vendor_code: Some(3960),
            sql_state: None,
        }
    );
}

#[test]
fn test_cockroach_conflict_carries_sql_state() {
    let err = lose_race(Dialect::CockroachDb);
    let record = err.conflict().unwrap();
    assert_eq!(
        record.cause,
        ConflictCause::SerializationFailure {
            vendor_code: None,
            sql_state: Some("40001".to_string()),
        }
    );
}

#[test]
fn test_both_signals_are_the_same_to_callers() {
    for dialect in Dialect::ALL {
        let core = lose_race(dialect);
        assert!(core.is_conflict(), "{dialect}");
        let err: rowguard::Error = core.into();
        assert!(err.is_conflict() && err.is_retryable(), "{dialect}");
        assert_eq!(err.conflict().unwrap().write, WriteKind::Update);
    }
}

#[test]
fn test_vendor_code_on_affected_rows_dialect_is_conflict() {
    // Plain SQL Server still raises 3960 when the database runs SNAPSHOT
    let factory = factory(Dialect::SqlServer);
    let key = seed_person(&factory, "Bob");

    let mut session = factory.open_session();
    session.begin().unwrap();
    session.load(&key).unwrap();
    factory.store().inject_failure(
        BackendError::new("snapshot isolation transaction aborted due to update conflict")
            .with_vendor_code(3960),
    );

    session.delete(&key).unwrap();
    let err = session.flush().unwrap_err();
    assert!(err.conflict().unwrap().is_serialization_failure());
    assert_eq!(factory.store().row_count("Person"), 1);
}

#[test]
fn test_other_backend_errors_are_not_conflicts() {
    let factory = factory(Dialect::CockroachDb);
    let key = seed_person(&factory, "Bob");

    let mut session = factory.open_session();
    session.begin().unwrap();
    session.load(&key).unwrap();
    factory
        .store()
        .inject_failure(BackendError::new("relation does not exist").with_sql_state("42P01"));

    session.update(&key, json!({"name": "Robert"})).unwrap();
    let err: rowguard::Error = session.flush().unwrap_err().into();
    assert!(matches!(err, rowguard::Error::Backend(ref e) if e.sql_state.as_deref() == Some("42P01")));
    assert!(!err.is_retryable());
}
