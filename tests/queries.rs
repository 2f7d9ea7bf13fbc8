//! Filter language, sorting and paging, checked against both planner paths.

use emberdb::{Config, Database, DocumentId, ErrorKind, FindOptions, IndexField, IndexOptions, SortOrder};
use serde_json::{json, Value as Json};

fn seeded(indexed: bool) -> Database {
    let db = Database::open_in_memory(Config::default()).unwrap();
    if indexed {
        db.create_index("people", vec![IndexField::asc("age")], IndexOptions::default()).unwrap();
        db.create_index("people", vec![IndexField::asc("city"), IndexField::asc("age")], IndexOptions::default())
            .unwrap();
        db.create_index("people", vec![IndexField::asc("tags")], IndexOptions::default()).unwrap();
        db.create_index("people", vec![IndexField::asc("scores")], IndexOptions::default()).unwrap();
    }
    let people = [
        json!({"_id": 1, "name": "Ada", "age": 36, "city": "London", "tags": ["math", "engines"], "scores": [1, 10]}),
        json!({"_id": 2, "name": "Grace", "age": 85, "city": "New York", "tags": ["navy", "cobol"], "scores": [4]}),
        json!({"_id": 3, "name": "Alan", "age": 41, "city": "London", "tags": ["math", "logic"], "scores": [2, 3]}),
        json!({"_id": 4, "name": "Edsger", "age": 72, "city": "Austin", "tags": [], "scores": 7}),
        json!({"_id": 5, "name": "Barbara", "age": 29.5, "city": "Boston"}),
        json!({"_id": 6, "name": "Ken", "age": null, "city": "Berkeley", "tags": ["unix"]}),
        json!({"_id": 7, "name": "Dennis", "city": "Berkeley", "tags": ["unix", "c"]}),
        json!({"_id": 8, "name": "Hedy", "age": "unknown", "city": "Vienna"}),
    ];
    for person in people {
        db.insert("people", person).unwrap();
    }
    db
}

fn ids(db: &Database, filter: Json) -> Vec<i64> {
    let mut out: Vec<i64> = db
        .find("people", filter, FindOptions::new())
        .unwrap()
        .into_iter()
        .map(|d| match d.id() {
            Some(DocumentId::Int(n)) => n,
            other => panic!("unexpected id {:?}", other),
        })
        .collect();
    out.sort();
    out
}

fn both(filter: Json) -> Vec<i64> {
    let plain = ids(&seeded(false), filter.clone());
    let indexed = ids(&seeded(true), filter.clone());
    assert_eq!(plain, indexed, "index and scan disagree on {}", filter);
    plain
}

#[test]
fn equality_and_ranges() {
    assert_eq!(both(json!({"city": "London"})), vec![1, 3]);
    assert_eq!(both(json!({"age": 36})), vec![1]);
    assert_eq!(both(json!({"age": 36.0})), vec![1]);
    assert_eq!(both(json!({"age": {"$gte": 40, "$lt": 80}})), vec![3, 4]);
    assert_eq!(both(json!({"age": {"$lt": 30}})), vec![5]);
    // string ages never compare with numeric bounds
    assert_eq!(both(json!({"age": {"$gt": 0}})), vec![1, 2, 3, 4, 5]);
    assert_eq!(both(json!({"age": {"$gt": "a"}})), vec![8]);
    assert_eq!(both(json!({"city": "London", "age": {"$gt": 40}})), vec![3]);
}

#[test]
fn membership_and_negation() {
    assert_eq!(both(json!({"age": {"$in": [36, 72, 99]}})), vec![1, 4]);
    assert_eq!(both(json!({"city": {"$nin": ["London", "Berkeley"]}})), vec![2, 4, 5, 8]);
    assert_eq!(both(json!({"city": {"$ne": "Berkeley"}})), vec![1, 2, 3, 4, 5, 8]);
    assert_eq!(both(json!({"age": {"$not": {"$gte": 40}}})), vec![1, 5, 6, 7, 8]);
}

#[test]
fn null_matches_missing_and_explicit_null() {
    assert_eq!(both(json!({"age": null})), vec![6, 7]);
    assert_eq!(both(json!({"age": {"$exists": false}})), vec![7]);
    assert_eq!(both(json!({"age": {"$exists": true}})), vec![1, 2, 3, 4, 5, 6, 8]);
    assert_eq!(both(json!({"age": {"$ne": null}})), vec![1, 2, 3, 4, 5, 8]);
    assert_eq!(both(json!({"age": {"$type": "null"}})), vec![6]);
}

#[test]
fn array_fields() {
    assert_eq!(both(json!({"tags": "math"})), vec![1, 3]);
    assert_eq!(both(json!({"tags": {"$all": ["unix", "c"]}})), vec![7]);
    assert_eq!(both(json!({"tags": {"$size": 0}})), vec![4]);
    assert_eq!(both(json!({"tags": {"$size": 2}})), vec![1, 2, 3, 7]);
    assert_eq!(both(json!({"tags": ["unix", "c"]})), vec![7]);
    assert_eq!(both(json!({"tags": {"$elemMatch": {"$regex": "^co"}}})), vec![2]);
    assert_eq!(both(json!({"tags": {"$type": "array"}})), vec![1, 2, 3, 4, 6, 7]);
}

#[test]
fn array_ranges_let_each_bound_pick_its_own_element() {
    assert_eq!(both(json!({"scores": {"$gt": 3, "$lt": 5}})), vec![1, 2]);
    assert_eq!(both(json!({"scores": {"$gte": 2, "$lte": 3}})), vec![1, 3]);
    assert_eq!(both(json!({"scores": {"$lt": 2}})), vec![1]);
    assert_eq!(both(json!({"scores": {"$elemMatch": {"$gt": 3, "$lt": 5}}})), vec![2]);
}

#[test]
fn logical_operators_and_regex() {
    assert_eq!(both(json!({"$or": [{"city": "Austin"}, {"age": {"$gt": 80}}]})), vec![2, 4]);
    assert_eq!(both(json!({"$and": [{"city": "Berkeley"}, {"tags": "c"}]})), vec![7]);
    assert_eq!(both(json!({"$nor": [{"city": "London"}, {"tags": "unix"}]})), vec![2, 4, 5, 8]);
    assert_eq!(both(json!({"name": {"$regex": "^a", "$options": "i"}})), vec![1, 3]);
    assert_eq!(both(json!({"name": {"$regex": "^a"}})), Vec::<i64>::new());
}

#[test]
fn sort_skip_and_limit() {
    let db = seeded(true);
    let names = |options: FindOptions| -> Vec<String> {
        db.find("people", json!({"age": {"$type": "number"}}), options)
            .unwrap()
            .into_iter()
            .map(|d| d.get_field("name").and_then(|v| v.as_str()).unwrap().to_string())
            .collect()
    };
    let by_age = FindOptions::new().sort_by("age", SortOrder::Asc).unwrap();
    assert_eq!(names(by_age.clone()), ["Barbara", "Ada", "Alan", "Edsger", "Grace"]);
    assert_eq!(names(by_age.skip(1).limit(2)), ["Ada", "Alan"]);

    let by_city = FindOptions::new()
        .sort_by("city", SortOrder::Desc)
        .unwrap()
        .sort_by("age", SortOrder::Asc)
        .unwrap();
    assert_eq!(names(by_city), ["Grace", "Ada", "Alan", "Barbara", "Edsger"]);
}

#[test]
fn find_one_and_cursor_agree_with_find() {
    let db = seeded(true);
    let one = db.find_one("people", json!({"city": "Berkeley"})).unwrap().unwrap();
    assert_eq!(one.id(), Some(DocumentId::Int(6)));
    assert!(db.find_one("people", json!({"city": "Paris"})).unwrap().is_none());

    let streamed: Vec<_> = db
        .find_iter("people", json!({"tags": "math"}), FindOptions::new())
        .unwrap()
        .map(|d| d.unwrap().id().unwrap())
        .collect();
    assert_eq!(streamed, vec![DocumentId::Int(1), DocumentId::Int(3)]);
}

#[test]
fn plans_pick_indexes_and_id_lookups() {
    let db = seeded(true);
    assert_eq!(db.explain("people", json!({"_id": 3})).unwrap().to_string(), "IDLOOKUP (1 ids)");
    assert_eq!(db.explain("people", json!({"name": "Ada"})).unwrap().to_string(), "COLLSCAN");
    assert!(db.explain("people", json!({"age": {"$in": [1, 2]}})).unwrap().to_string().starts_with("IXSCAN"));
    assert_eq!(db.explain("people", json!({"$or": [{"age": 1}, {"name": "x"}]})).unwrap().to_string(), "COLLSCAN");
}

#[test]
fn malformed_filters_are_rejected() {
    let db = seeded(false);
    for filter in [
        json!({"age": {"$near": 1}}),
        json!({"$where": "true"}),
        json!({"age": {"$in": 3}}),
        json!({"name": {"$regex": "("}}),
        json!({"$or": []}),
        json!([1, 2]),
    ] {
        let err = db.find("people", filter.clone(), FindOptions::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidQuery, "{}", filter);
    }
}
