//! Thread Contention Tests
//!
//! Several threads load the same row at the same token and race to write it.
//! Exactly one write per token may win; every other writer sees a conflict.

use crate::common::*;
use parking_lot::Mutex;
use rowguard::prelude::*;
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 8;

/// Returns (winners, conflicts, not found)
fn race(dialect: Dialect, delete: bool) -> (usize, usize, usize) {
    let factory = shared_factory(dialect);
    let key = seed_person(&factory, "Bob");
    let barrier = Arc::new(Barrier::new(WRITERS));
    let results = Arc::new(Mutex::new(Vec::with_capacity(WRITERS)));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            let results = Arc::clone(&results);
            let key = key.clone();
            thread::spawn(move || {
                let mut session = factory.open_session();
                session.begin().unwrap();
                session.load(&key).unwrap();

                barrier.wait();

                if delete {
                    session.delete(&key).unwrap();
                } else {
                    session.update(&key, json!({ "writer": i })).unwrap();
                }
                let result = session.commit().map(|_| ());
                if result.is_err() {
                    session.rollback().unwrap();
                }
                results.lock().push(result);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let results = results.lock();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(err) if err.is_conflict()))
        .count();
    let missing = results
        .iter()
        .filter(|r| matches!(r, Err(err) if err.is_not_found()))
        .count();
    (winners, conflicts, missing)
}

#[test]
fn test_one_update_wins() {
    for dialect in Dialect::ALL {
        let (winners, conflicts, missing) = race(dialect, false);
        assert_eq!(winners, 1, "{dialect}");
        assert_eq!(conflicts, WRITERS - 1, "{dialect}");
        assert_eq!(missing, 0, "{dialect}");
    }
}

#[test]
fn test_one_delete_wins() {
    for dialect in Dialect::ALL {
        let (winners, conflicts, missing) = race(dialect, true);
        assert_eq!(winners, 1, "{dialect}");
        // Losers find the row gone
        assert_eq!(conflicts, 0, "{dialect}");
        assert_eq!(missing, WRITERS - 1, "{dialect}");
    }
}

#[test]
fn test_disjoint_rows_never_conflict() {
    let factory = shared_factory(Dialect::SqlServer);
    let keys: Vec<_> = (0..WRITERS)
        .map(|i| seed_person(&factory, &format!("p{i}")))
        .collect();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = keys
        .into_iter()
        .map(|key| {
            let factory = Arc::clone(&factory);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut session = factory.open_session();
                session.begin().unwrap();
                session.load(&key).unwrap();
                barrier.wait();
                for n in 0..10 {
                    session.update(&key, json!({ "n": n })).unwrap();
                    session.flush().unwrap();
                }
                session.commit().unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(factory.store().row_count("Person"), WRITERS);
}
