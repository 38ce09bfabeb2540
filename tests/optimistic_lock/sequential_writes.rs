//! Sequential Write Tests
//!
//! One session writing the same row repeatedly conditions each write on the
//! token its previous write produced, without reloading.

use crate::common::*;
use rowguard::prelude::*;

#[test]
fn test_three_flushes_without_reload() {
    for dialect in Dialect::ALL {
        let factory = factory(dialect);
        let key = seed_person(&factory, "Bob");

        let mut session = factory.open_session();
        session.begin().unwrap();
        session.load(&key).unwrap();
        let selects_after_load = factory.store().stats().selects;

        let mut seen = vec![session.version_of(&key).cloned().unwrap()];
        for name in ["Rob", "Robert", "Bobby"] {
            session.update(&key, json!({ "name": name })).unwrap();
            assert_eq!(session.flush().unwrap().updated, 1, "{dialect}");

            let token = session.version_of(&key).cloned().unwrap();
            assert!(!seen.contains(&token), "{dialect}: token reused");
            assert_eq!(stored_version(&factory, &key).unwrap(), token.as_bytes());
            seen.push(token);
        }
        session.commit().unwrap();

        // Only the stored_version calls above read the row again
        assert_eq!(factory.store().stats().selects, selects_after_load + 3, "{dialect}");
        assert_eq!(stored_name(&factory, &key).as_deref(), Some("Bobby"));
    }
}

#[test]
fn test_insert_then_update_in_one_session() {
    let factory = factory(Dialect::CockroachDb);

    let mut session = factory.open_session();
    session.begin().unwrap();
    let key = session.save("Person", json!({"name": "Bob"})).unwrap();
    let inserted = session.version_of(&key).cloned().unwrap();
    assert_eq!(stored_version(&factory, &key).unwrap(), inserted.as_bytes());

    session.update(&key, json!({"name": "Robert"})).unwrap();
    session.commit().unwrap();

    assert_eq!(stored_name(&factory, &key).as_deref(), Some("Robert"));
}

#[test]
fn test_tokens_are_unique_across_rows() {
    let factory = factory(Dialect::SqlServer);

    let mut session = factory.open_session();
    session.begin().unwrap();
    let a = session.save("Person", json!({"name": "A"})).unwrap();
    let b = session.save("Person", json!({"name": "B"})).unwrap();
    let c = session.save("Address", json!({"city": "Oslo"})).unwrap();

    let tokens = [&a, &b, &c].map(|key| session.version_of(key).cloned().unwrap());
    assert_ne!(tokens[0], tokens[1]);
    assert_ne!(tokens[1], tokens[2]);
    assert_ne!(tokens[0], tokens[2]);
    session.commit().unwrap();
}

#[test]
fn test_flush_order_follows_keys() {
    let factory = factory(Dialect::SqlServer);
    let first = seed_person(&factory, "A");
    let second = seed_person(&factory, "B");

    let mut session = factory.open_session();
    session.begin().unwrap();
    session.load(&second).unwrap();
    session.load(&first).unwrap();

    // Make the second row stale; the first row is written before it fails
    rename_elsewhere(&factory, &second, "B2");
    session.update(&second, json!({"name": "B3"})).unwrap();
    session.update(&first, json!({"name": "A3"})).unwrap();

    let err = session.flush().unwrap_err();
    assert_eq!(err.conflict().unwrap().key, second);
    assert_eq!(stored_name(&factory, &first).as_deref(), Some("A3"));
}
