use serde::{Serialize, Deserialize};
use crate::index::IndexInfo;
use crate::storage::{HeapStats, PagerStats};
use crate::vector::VectorStats;

/// Database statistics for monitoring
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    // General info
    pub path: Option<String>,  // None in memory
    pub generation: u64,
    pub uptime_secs: u64,

    // Contents
    pub collections: Vec<CollectionStats>,
    pub vector_collections: Vec<VectorStats>,
    pub total_documents: usize,

    // Storage
    pub pager: PagerStats,
    pub heap: HeapStats,
    pub last_compaction_secs: Option<u64>,  // seconds since the last compaction
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionStats {
    pub name: String,
    pub documents: usize,
    pub data_bytes: u64,  // encoded documents plus record headers
    pub indexes: Vec<IndexInfo>,
}

/// Outcome of a compaction pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactionStats {
    pub pages_before: usize,
    pub pages_after: usize,
    pub live_bytes: u64,
    pub garbage_ratio_before: f64,
    pub garbage_ratio_after: f64,
    pub duration_ms: u64,
}

impl CompactionStats {
    pub fn pages_reclaimed(&self) -> usize {
        self.pages_before.saturating_sub(self.pages_after)
    }
}
