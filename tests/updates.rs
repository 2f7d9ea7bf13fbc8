//! Update operators applied through the database, with index maintenance.

use emberdb::{Config, Database, ErrorKind, FindOptions, IndexField, IndexOptions};
use serde_json::json;

fn db() -> Database {
    Database::open_in_memory(Config::default()).unwrap()
}

fn json_of(db: &Database, id: i64) -> serde_json::Value {
    db.find_by_id("c", id).unwrap().unwrap().to_json()
}

#[test]
fn set_is_idempotent_and_reports_no_change() {
    let db = db();
    db.insert("c", json!({"_id": 1, "a": 1})).unwrap();
    assert!(db.update_by_id("c", 1, json!({"$set": {"a": 2, "b.c": "x"}})).unwrap());
    assert!(!db.update_by_id("c", 1, json!({"$set": {"a": 2, "b.c": "x"}})).unwrap());
    assert_eq!(json_of(&db, 1), json!({"_id": 1, "a": 2, "b": {"c": "x"}}));

    let err = db.update_by_id("c", 9, json!({"$set": {"a": 1}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DocumentNotFound);
}

#[test]
fn numeric_operators() {
    let db = db();
    db.insert("c", json!({"_id": 1, "n": 5, "f": 1.5, "lo": 3, "hi": 3})).unwrap();
    db.update_by_id(
        "c",
        1,
        json!({"$inc": {"n": 2, "f": 1, "fresh": 4}, "$mul": {"lo": 2}, "$min": {"hi": 1}, "$max": {"lo": 100}}),
    )
    .unwrap();
    // $mul runs before $max
    assert_eq!(json_of(&db, 1), json!({"_id": 1, "n": 7, "f": 2.5, "fresh": 4, "lo": 100, "hi": 1}));

    db.insert("c", json!({"_id": 2, "n": "text"})).unwrap();
    let err = db.update_by_id("c", 2, json!({"$inc": {"n": 1}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidQuery);
    assert_eq!(json_of(&db, 2), json!({"_id": 2, "n": "text"}));
}

#[test]
fn array_operators() {
    let db = db();
    db.insert("c", json!({"_id": 1, "tags": ["a"], "nums": [1, 5, 9, 5], "q": [1, 2, 3]})).unwrap();
    db.update_by_id(
        "c",
        1,
        json!({
            "$push": {"tags": {"$each": ["b", "a"]}},
            "$addToSet": {"set": {"$each": [1, 1, 2]}},
            "$pull": {"nums": 5},
            "$pop": {"q": -1}
        }),
    )
    .unwrap();
    assert_eq!(
        json_of(&db, 1),
        json!({"_id": 1, "tags": ["a", "b", "a"], "set": [1, 2], "nums": [1, 9], "q": [2, 3]})
    );

    db.update_by_id("c", 1, json!({"$pull": {"nums": {"$gt": 4}}})).unwrap();
    assert_eq!(json_of(&db, 1)["nums"], json!([1]));

    let err = db.update_by_id("c", 1, json!({"$push": {"_id": 3}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidQuery);
}

#[test]
fn rename_and_unset() {
    let db = db();
    db.insert("c", json!({"_id": 1, "old": {"x": 1}, "gone": true, "keep": 0})).unwrap();
    db.update_by_id("c", 1, json!({"$rename": {"old": "new"}, "$unset": {"gone": ""}})).unwrap();
    assert_eq!(json_of(&db, 1), json!({"_id": 1, "new": {"x": 1}, "keep": 0}));
}

#[test]
fn update_many_counts_modified_documents() {
    let db = db();
    for i in 0..10 {
        db.insert("c", json!({"_id": i, "group": i % 2, "seen": false})).unwrap();
    }
    db.update_by_id("c", 0, json!({"$set": {"seen": true}})).unwrap();

    let changed = db.update_many("c", json!({"group": 0}), json!({"$set": {"seen": true}})).unwrap();
    assert_eq!(changed, 4);
    assert_eq!(db.count_matching("c", json!({"seen": true})).unwrap(), 5);

    // a failing operator leaves every document untouched
    db.insert("c", json!({"_id": 20, "group": 0, "seen": "no"})).unwrap();
    let err = db.update_many("c", json!({"group": 0}), json!({"$inc": {"seen": 1}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidQuery);
    assert_eq!(db.count_matching("c", json!({"seen": true})).unwrap(), 5);
}

#[test]
fn updates_move_index_entries() {
    let db = db();
    db.create_index("c", vec![IndexField::asc("status")], IndexOptions::default()).unwrap();
    for i in 0..6 {
        db.insert("c", json!({"_id": i, "status": "new"})).unwrap();
    }
    db.update_many("c", json!({"_id": {"$in": [1, 3]}}), json!({"$set": {"status": "done"}})).unwrap();

    let done = db.find("c", json!({"status": "done"}), FindOptions::new()).unwrap();
    assert_eq!(done.len(), 2);
    assert_eq!(db.count_matching("c", json!({"status": "new"})).unwrap(), 4);
    assert!(db.explain("c", json!({"status": "done"})).unwrap().to_string().starts_with("IXSCAN"));
}

#[test]
fn unique_index_guards_updates() {
    let db = db();
    db.create_index("c", vec![IndexField::asc("email")], IndexOptions::unique()).unwrap();
    db.insert("c", json!({"_id": 1, "email": "a"})).unwrap();
    db.insert("c", json!({"_id": 2, "email": "b"})).unwrap();

    let err = db.update_by_id("c", 2, json!({"$set": {"email": "a"}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateKey);
    assert_eq!(json_of(&db, 2)["email"], json!("b"));
    assert_eq!(db.count_matching("c", json!({"email": "a"})).unwrap(), 1);
}

#[test]
fn delete_many_reports_removed() {
    let db = db();
    for i in 0..8 {
        db.insert("c", json!({"_id": i, "n": i})).unwrap();
    }
    assert_eq!(db.delete_many("c", json!({"n": {"$gte": 5}})).unwrap(), 3);
    assert_eq!(db.delete_many("c", json!({"n": {"$gte": 5}})).unwrap(), 0);
    assert_eq!(db.count("c").unwrap(), 5);
}

#[test]
fn positional_writes_far_past_the_end_are_rejected() {
    let db = db();
    db.insert("c", json!({"_id": 1, "a": []})).unwrap();

    for path in ["a.18446744073709551615", "a.1000000000", "a.99999999999999999999999"] {
        let err = db.update_by_id("c", 1, json!({"$set": {path: 1}})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidQuery, "{}", path);
    }
    assert_eq!(json_of(&db, 1), json!({"_id": 1, "a": []}));

    db.update_by_id("c", 1, json!({"$set": {"a.2.k": 1}})).unwrap();
    assert_eq!(json_of(&db, 1), json!({"_id": 1, "a": [null, null, {"k": 1}]}));
}

#[test]
fn update_many_is_all_or_nothing_on_unique_conflicts() {
    let db = db();
    db.create_index("c", vec![IndexField::asc("k")], IndexOptions::unique()).unwrap();
    db.insert("c", json!({"_id": 1, "k": 1, "g": true})).unwrap();
    db.insert("c", json!({"_id": 2, "k": 2, "g": true})).unwrap();
    db.insert("c", json!({"_id": 3, "k": 3, "g": false})).unwrap();

    // the batch collides with itself
    let err = db.update_many("c", json!({"g": true}), json!({"$set": {"k": 9}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateKey);
    assert_eq!(json_of(&db, 1), json!({"_id": 1, "k": 1, "g": true}));
    assert_eq!(json_of(&db, 2), json!({"_id": 2, "k": 2, "g": true}));

    // the last document in the batch collides with one outside it
    let err = db.update_many("c", json!({"g": true}), json!({"$inc": {"k": 1}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DuplicateKey);
    assert_eq!(json_of(&db, 1)["k"], json!(1));
    assert_eq!(json_of(&db, 2)["k"], json!(2));

    for k in 1..=3 {
        let hits = db.find("c", json!({"k": k}), FindOptions::new()).unwrap();
        assert_eq!(hits.len(), 1, "k = {}", k);
    }
    assert_eq!(db.count_matching("c", json!({"k": {"$gte": 4}})).unwrap(), 0);

    // a batch without collisions moves every key
    assert_eq!(db.update_many("c", json!({}), json!({"$inc": {"k": 10}})).unwrap(), 3);
    assert_eq!(db.count_matching("c", json!({"k": {"$gt": 10}})).unwrap(), 3);
}
