//! Shared handles across threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use emberdb::{Config, Database, DistanceMetric, ErrorKind, FindOptions, IndexField, IndexOptions, VectorConfig};
use serde_json::json;
use tempfile::tempdir;

#[test]
fn parallel_writers_to_separate_collections() {
    let db = Arc::new(Database::open_in_memory(Config::default()).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let name = format!("c{}", t);
                for i in 0..250 {
                    db.insert(&name, json!({"_id": i, "thread": t})).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    for t in 0..4 {
        assert_eq!(db.count(&format!("c{}", t)).unwrap(), 250);
    }
    assert_eq!(db.stats().total_documents, 1000);
}

#[test]
fn racing_writers_never_both_claim_a_unique_key() {
    for _ in 0..20 {
        let db = Arc::new(Database::open_in_memory(Config::default()).unwrap());
        db.create_index("users", vec![IndexField::asc("email")], IndexOptions::unique()).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let results: Vec<_> = (0..2)
            .map(|t| {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    db.insert("users", json!({"email": "same@x.io", "writer": t}))
                })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(ok, 1);
        let failed = results.iter().find_map(|r| r.as_ref().err()).unwrap();
        assert_eq!(failed.kind, ErrorKind::DuplicateKey);
        assert_eq!(db.count("users").unwrap(), 1);
    }
}

#[test]
fn readers_run_alongside_a_writer() {
    let db = Arc::new(Database::open_in_memory(Config::default()).unwrap());
    for i in 0..100 {
        db.insert("c", json!({"_id": i, "even": i % 2 == 0})).unwrap();
    }

    let writer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            for i in 100..400 {
                db.insert("c", json!({"_id": i, "even": i % 2 == 0})).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..3)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for _ in 0..50 {
                    let evens = db.find("c", json!({"even": true}), FindOptions::new()).unwrap();
                    assert!(evens.len() >= 50);
                    assert!(evens.iter().all(|d| d.get_field("even").and_then(|v| v.as_bool()) == Some(true)));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(db.count_matching("c", json!({"even": true})).unwrap(), 200);
}

#[test]
fn sync_interleaves_with_writers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("busy.db");
    {
        let db = Arc::new(Database::open(&path, Config::default(), emberdb::OpenMode::Create).unwrap());
        db.create_vector_collection("v", VectorConfig::new(2, DistanceMetric::Euclidean)).unwrap();
        let writers: Vec<_> = (0..2)
            .map(|t| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for i in 0..200 {
                        db.insert("c", json!({"_id": t * 1000 + i})).unwrap();
                        db.insert_vector("v", vec![t as f32, i as f32], None).unwrap();
                    }
                })
            })
            .collect();
        for _ in 0..10 {
            db.sync().unwrap();
        }
        for writer in writers {
            writer.join().unwrap();
        }
    }

    let db = Database::open(&path, Config::default(), emberdb::OpenMode::Open).unwrap();
    assert_eq!(db.count("c").unwrap(), 400);
    assert_eq!(db.vector_stats("v").unwrap().count, 400);
    assert_eq!(db.search("v", &[1.0, 17.0], 1).unwrap()[0].score, 0.0);
}

#[test]
fn vector_searches_do_not_wait_for_each_other() {
    let db = Arc::new(Database::open_in_memory(Config::default()).unwrap());
    db.create_vector_collection("emb", VectorConfig::new(2, DistanceMetric::Euclidean)).unwrap();
    for i in 0..20 {
        db.insert_vector("emb", vec![i as f32, 1.0], None).unwrap();
    }

    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let channels = Mutex::new((entered_tx, done_rx));
    let overlapped = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&overlapped);
    // the first search stays inside the provider until the second one is done
    db.register_embedding_provider("emb", move |_: &str| -> emberdb::Result<Vec<f32>> {
        let (entered, done) = &*channels.lock().unwrap();
        entered.send(()).ok();
        if done.recv_timeout(Duration::from_secs(10)).is_ok() {
            seen.store(true, Ordering::SeqCst);
        }
        Ok(vec![5.0, 1.0])
    })
    .unwrap();

    let text_search = {
        let db = Arc::clone(&db);
        thread::spawn(move || db.search_text("emb", "five", 1).unwrap())
    };
    entered_rx.recv().unwrap();
    let hits = db.search("emb", &[12.0, 1.0], 1).unwrap();
    done_tx.send(()).unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(text_search.join().unwrap().len(), 1);
    assert!(overlapped.load(Ordering::SeqCst));
}
