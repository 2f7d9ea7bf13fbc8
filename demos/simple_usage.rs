/// Complete emberdb API Demo
///
/// Demonstrates all major database operations:
/// - CRUD on schema-free documents
/// - Filters, sorting and secondary indexes
/// - Update operators
/// - Vector search with metadata filters
/// - Sync, compaction and statistics

use emberdb::{
    CompressionMode, Config, Database, DistanceMetric, FindOptions, IndexField, IndexOptions, OpenMode, SortOrder,
    VectorConfig,
};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("\n╔═══════════════════════════════════════════════╗");
    println!("║    emberdb Database - Complete API Demo       ║");
    println!("╚═══════════════════════════════════════════════╝\n");

    // Step 1: Create database
    println!("Creating database...");
    let dir = std::env::temp_dir().join("emberdb-demo");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("demo.db");
    let _ = std::fs::remove_file(&path);
    let db = Database::open(&path, Config::default(), OpenMode::Create)?;
    println!("Done! ({})\n", path.display());

    // Step 2: INSERT - Add documents
    println!("Step 2: INSERT - Adding documents...");
    db.insert("books", json!({"_id": 1, "title": "Rust Programming", "year": 2018, "tags": ["rust", "systems"]}))?;
    db.insert("books", json!({"_id": 2, "title": "Database Systems", "year": 2009, "tags": ["db"]}))?;
    db.insert("books", json!({"_id": 3, "title": "Web Development", "year": 2021, "tags": ["web", "rust"]}))?;
    let generated = db.insert("books", json!({"title": "Untitled Draft", "draft": true}))?;
    println!("  Inserted 4 documents (generated id {})\n", generated);

    // Step 3: INDEXES
    println!("Step 3: INDEXES - Creating secondary indexes...");
    let year = db.create_index("books", vec![IndexField::desc("year")], IndexOptions::default())?;
    let title = db.create_index("books", vec![IndexField::asc("title")], IndexOptions::unique())?;
    println!("  Created {} and {}\n", year, title);

    // Step 4: FIND - Different query types
    println!("Step 4: FIND - Querying documents...");
    let rust = db.find("books", json!({"tags": "rust"}), FindOptions::new())?;
    println!("  tags = rust: {} results", rust.len());

    let recent = json!({"year": {"$gte": 2010}});
    println!("  plan for {}: {}", recent, db.explain("books", recent.clone())?);
    let options = FindOptions::new().sort_by("year", SortOrder::Desc)?;
    for doc in db.find("books", recent, options)? {
        println!("    {}", doc.to_json());
    }

    let either = db.count_matching("books", json!({"$or": [{"draft": true}, {"year": {"$lt": 2010}}]}))?;
    println!("  drafts or pre-2010: {}\n", either);

    // Step 5: UPDATE - Modify documents
    println!("Step 5: UPDATE - Updating documents...");
    db.update_by_id("books", 2, json!({"$set": {"title": "Advanced Databases"}, "$push": {"tags": "internals"}}))?;
    let touched = db.update_many("books", json!({"tags": "rust"}), json!({"$inc": {"editions": 1}}))?;
    println!("  Updated document 2, bumped {} rust books", touched);
    if let Err(e) = db.update_by_id("books", 3, json!({"$set": {"title": "Rust Programming"}})) {
        println!("  Unique index rejected a duplicate title: {}", e);
    }
    println!();

    // Step 6: DELETE - Remove a document
    println!("Step 6: DELETE - Removing documents...");
    db.delete("books", generated)?;
    println!("  Deleted the draft, {} books left\n", db.count("books")?);

    // Step 7: VECTORS - Nearest neighbour search
    println!("Step 7: VECTORS - Similarity search...");
    let config = VectorConfig::new(4, DistanceMetric::Cosine).with_compression(CompressionMode::Quantized);
    db.create_vector_collection("embeddings", config)?;
    for (i, vector) in [[0.9, 0.1, 0.0, 0.0], [0.0, 0.8, 0.2, 0.0], [0.7, 0.3, 0.1, 0.0]].iter().enumerate() {
        let metadata = json!({"book": i + 1, "lang": if i == 1 { "de" } else { "en" }});
        db.insert_vector("embeddings", vector.to_vec(), Some(metadata.try_into()?))?;
    }
    for hit in db.search_filtered("embeddings", &[1.0, 0.0, 0.0, 0.0], 2, json!({"lang": "en"}))? {
        println!("  {} score={:.4}", hit.id, hit.score);
    }
    println!();

    // Step 8: COMPACT - Clean up deleted records
    println!("Step 8: COMPACT - Cleaning up...");
    db.sync()?;
    let compaction = db.compact()?;
    println!(
        "  {} -> {} pages in {} ms\n",
        compaction.pages_before, compaction.pages_after, compaction.duration_ms
    );

    // Step 9: STATS - Detailed statistics
    println!("Step 9: STATISTICS - Database metrics:");
    println!("  ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let stats = db.stats();
    println!("  Total Documents:     {}", stats.total_documents);
    println!("  Generation:          {}", stats.generation);
    println!("  Heap Pages:          {}", stats.heap.pages);
    println!("  Garbage Ratio:       {:.2}", stats.heap.garbage_ratio);
    println!("  Cache Hits/Misses:   {}/{}", stats.pager.cache_hits, stats.pager.cache_misses);
    for collection in &stats.collections {
        println!("  {}: {} docs, {} indexes", collection.name, collection.documents, collection.indexes.len());
    }
    for vectors in &stats.vector_collections {
        println!(
            "  {}: {} vectors, {} layers, ratio {:.2}",
            vectors.name, vectors.count, vectors.layers, vectors.compression_ratio
        );
    }

    db.close()?;

    println!("\n╔════════════════════════════════════════╗");
    println!("║    All API Operations Completed!      ║");
    println!("╚════════════════════════════════════════╝\n");

    Ok(())
}
