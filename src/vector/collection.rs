use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::codec::document::{decode_document, encode_document};
use crate::codec::vector::VectorPayload;
use crate::compression::delta::DeltaCodebook;
use crate::compression::quantize::QuantizedVector;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, VectorId};
use crate::query::ast::Query;
use crate::storage::catalog::{VectorCollectionCatalog, VectorEntryRecord};
use crate::storage::heap::RecordHeap;
use crate::storage::page::RecordPtr;
use crate::vector::config::{CompressionMode, DistanceMetric, VectorConfig};
use crate::vector::embedding::EmbeddingProvider;
use crate::vector::hnsw::{HnswGraph, HnswParams};

struct VectorEntry {
    payload: Option<RecordPtr>,
    text: Option<RecordPtr>,
    metadata_record: Option<RecordPtr>,
    metadata: Option<Document>,
    node: Option<u32>,
}

/// A vector as read back by `get`
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    pub id: VectorId,
    pub vector: Option<Vec<f32>>,  // None while the source text awaits embedding
    pub text: Option<String>,
    pub metadata: Option<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub id: VectorId,
    pub score: f32,
    pub metadata: Option<Document>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorStats {
    pub name: String,
    pub count: usize,
    pub dimensions: usize,
    pub metric: DistanceMetric,
    pub compression: CompressionMode,
    pub layers: usize,
    pub entry_point: Option<VectorId>,
    pub payload_bytes: u64,
    pub raw_bytes: u64,
    pub compression_ratio: f64,
    pub pending_texts: usize,
}

/// Fixed-dimension vectors with optional metadata, searchable through an
/// HNSW graph. Records live in the shared heap; the graph adjacency is
/// written as one compressed record at checkpoint time.
pub struct VectorCollection {
    name: String,
    config: VectorConfig,
    heap: Arc<RecordHeap>,
    graph: HnswGraph,
    entries: BTreeMap<u64, VectorEntry>,
    pending: BTreeSet<u64>,
    next_id: u64,
    codebook: DeltaCodebook,
    graph_record: Option<RecordPtr>,
    graph_dirty: bool,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl VectorCollection {
    pub fn new(name: &str, config: VectorConfig, heap: Arc<RecordHeap>) -> Result<Self> {
        config.validate()?;
        Ok(VectorCollection {
            name: name.to_string(),
            graph: HnswGraph::new(HnswParams::from(&config)),
            config,
            heap,
            entries: BTreeMap::new(),
            pending: BTreeSet::new(),
            next_id: 0,
            codebook: DeltaCodebook::new(),
            graph_record: None,
            graph_dirty: false,
            provider: None,
        })
    }

    /// Reloads a collection from its catalog entry. A missing or unusable
    /// graph record is rebuilt from the stored vectors.
    pub fn restore(catalog: VectorCollectionCatalog, heap: Arc<RecordHeap>) -> Result<Self> {
        let mut collection = Self::new(&catalog.name, catalog.config, heap)?;
        collection.next_id = catalog.next_id;
        collection.codebook = catalog.codebook.unwrap_or_default();

        let mut vectors: HashMap<u64, Vec<f32>> = HashMap::new();
        for record in catalog.entries {
            for ptr in [record.payload, record.text, record.metadata].into_iter().flatten() {
                collection.heap.adopt(&ptr);
            }
            let metadata = match record.metadata {
                Some(ptr) => Some(decode_document(&collection.heap.read(ptr)?)?),
                None => None,
            };
            match record.payload {
                Some(ptr) => {
                    vectors.insert(record.id, collection.decode_payload(ptr)?);
                }
                None if record.text.is_some() => {
                    collection.pending.insert(record.id);
                }
                None => return Err(Error::corrupt(format!("vector {} has neither payload nor text", record.id))),
            }
            collection.entries.insert(
                record.id,
                VectorEntry {
                    payload: record.payload,
                    text: record.text,
                    metadata_record: record.metadata,
                    metadata,
                    node: None,
                },
            );
        }

        if let Some(ptr) = catalog.graph {
            collection.heap.adopt(&ptr);
            collection.graph_record = Some(ptr);
            let params = HnswParams::from(&collection.config);
            let restored = collection
                .heap
                .read(ptr)
                .and_then(|bytes| HnswGraph::from_bytes(params, &bytes, |id| vectors.get(&id).cloned()));
            match restored {
                Ok(graph) if graph.len() == vectors.len() => collection.graph = graph,
                Ok(_) => warn!(collection = %collection.name, "graph does not cover every vector, rebuilding"),
                Err(e) => warn!(collection = %collection.name, error = %e, "graph record unusable, rebuilding"),
            }
        }

        if collection.graph.len() == vectors.len() && !vectors.is_empty() {
            let live: Vec<u32> = collection.graph.live_nodes().collect();
            for idx in live {
                let id = collection.graph.node(idx).vector_id;
                if let Some(entry) = collection.entries.get_mut(&id) {
                    entry.node = Some(idx);
                }
            }
        } else if !vectors.is_empty() {
            collection.graph = HnswGraph::new(HnswParams::from(&collection.config));
            let mut ordered: Vec<(u64, Vec<f32>)> = vectors.into_iter().collect();
            ordered.sort_by_key(|(id, _)| *id);
            for (id, vector) in ordered {
                let node = collection.graph.insert(id, vector);
                if let Some(entry) = collection.entries.get_mut(&id) {
                    entry.node = Some(node);
                }
            }
            collection.graph_dirty = true;
        }

        debug!(
            collection = %collection.name,
            vectors = collection.graph.len(),
            pending = collection.pending.len(),
            "restored vector collection"
        );
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &VectorConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn register_provider(&mut self, provider: Arc<dyn EmbeddingProvider>) {
        self.provider = Some(provider);
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimensions {
            return Err(Error::new(
                ErrorKind::DimensionMismatch,
                format!(
                    "collection '{}' expects {} dimensions, got {}",
                    self.name,
                    self.config.dimensions,
                    vector.len()
                ),
            ));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::new(ErrorKind::InvalidArgument, "vector components must be finite".to_string()));
        }
        Ok(())
    }

    fn decode_payload(&self, ptr: RecordPtr) -> Result<Vec<f32>> {
        let bytes = self.heap.read(ptr)?;
        match VectorPayload::decode(&bytes, self.config.dimensions)? {
            VectorPayload::Raw(values) => Ok(values),
            VectorPayload::Quantized(q) => Ok(q.dequantize()),
            VectorPayload::Delta(delta) => self
                .codebook
                .decode(&delta)
                .ok_or_else(|| Error::corrupt(format!("delta payload references missing reference {}", delta.reference))),
            VectorPayload::Text(_) => Err(Error::corrupt("text stored where a vector payload was expected")),
        }
    }

    /// Stores the vector in the collection's compression mode and returns
    /// the record plus the vector as it reads back
    fn store_vector(&mut self, vector: Vec<f32>) -> Result<(RecordPtr, Vec<f32>)> {
        let (payload, stored) = match self.config.compression {
            CompressionMode::None | CompressionMode::LazyEmbedding => {
                (VectorPayload::Raw(vector.clone()), vector)
            }
            CompressionMode::Quantized => {
                let q = QuantizedVector::quantize(&vector);
                let stored = q.dequantize();
                (VectorPayload::Quantized(q), stored)
            }
            CompressionMode::Delta => {
                let delta = self.codebook.encode(&vector);
                let stored = self
                    .codebook
                    .decode(&delta)
                    .ok_or_else(|| Error::corrupt("delta codebook lost a reference"))?;
                (VectorPayload::Delta(delta), stored)
            }
        };
        let ptr = self.heap.append(&payload.encode(self.config.dimensions))?;
        Ok((ptr, stored))
    }

    fn store_metadata(&self, metadata: Option<&Document>) -> Result<Option<RecordPtr>> {
        metadata.map(|doc| self.heap.append(&encode_document(doc))).transpose()
    }

    pub fn insert(&mut self, vector: Vec<f32>, metadata: Option<Document>) -> Result<VectorId> {
        self.check_dimensions(&vector)?;
        let id = self.next_id;
        let metadata_record = self.store_metadata(metadata.as_ref())?;
        let (payload, stored) = match self.store_vector(vector) {
            Ok(stored) => stored,
            Err(e) => {
                if let Some(record) = metadata_record {
                    self.heap.release(record);
                }
                return Err(e);
            }
        };
        let node = self.graph.insert(id, stored);

        self.entries.insert(
            id,
            VectorEntry { payload: Some(payload), text: None, metadata_record, metadata, node: Some(node) },
        );
        self.next_id += 1;
        self.graph_dirty = true;
        Ok(VectorId(id))
    }

    /// Stores raw text; it is embedded and indexed on the next search
    pub fn insert_text(&mut self, text: &str, metadata: Option<Document>) -> Result<VectorId> {
        if self.config.compression != CompressionMode::LazyEmbedding {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("collection '{}' does not store text ({} compression)", self.name, self.config.compression),
            ));
        }
        let id = self.next_id;
        let metadata_record = self.store_metadata(metadata.as_ref())?;
        let text_record = match self.heap.append(&VectorPayload::Text(text.to_string()).encode(self.config.dimensions)) {
            Ok(record) => record,
            Err(e) => {
                if let Some(record) = metadata_record {
                    self.heap.release(record);
                }
                return Err(e);
            }
        };

        self.entries.insert(
            id,
            VectorEntry { payload: None, text: Some(text_record), metadata_record, metadata, node: None },
        );
        self.pending.insert(id);
        self.next_id += 1;
        Ok(VectorId(id))
    }

    fn provider(&self) -> Result<Arc<dyn EmbeddingProvider>> {
        self.provider.clone().ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidState,
                format!("no embedding provider registered for '{}'", self.name),
            )
        })
    }

    fn read_text(&self, ptr: RecordPtr) -> Result<String> {
        match VectorPayload::decode(&self.heap.read(ptr)?, self.config.dimensions)? {
            VectorPayload::Text(text) => Ok(text),
            _ => Err(Error::corrupt("vector payload stored where text was expected")),
        }
    }

    /// Embeds every pending text and adds it to the graph
    pub fn embed_pending(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let provider = self.provider()?;
        let pending: Vec<u64> = self.pending.iter().copied().collect();
        for id in &pending {
            let Some(text_record) = self.entries.get(id).and_then(|e| e.text) else {
                self.pending.remove(id);
                continue;
            };
            let text = self.read_text(text_record)?;
            let vector = provider.embed(&text)?;
            self.check_dimensions(&vector)?;

            let (payload, stored) = self.store_vector(vector)?;
            let node = self.graph.insert(*id, stored);
            if let Some(entry) = self.entries.get_mut(id) {
                entry.payload = Some(payload);
                entry.node = Some(node);
            }
            self.pending.remove(id);
            self.graph_dirty = true;
        }
        debug!(collection = %self.name, embedded = pending.len(), "embedded pending texts");
        Ok(pending.len())
    }

    pub fn get(&self, id: VectorId) -> Result<Option<StoredVector>> {
        let Some(entry) = self.entries.get(&id.0) else {
            return Ok(None);
        };
        let text = match entry.text {
            Some(ptr) => Some(self.read_text(ptr)?),
            None => None,
        };
        Ok(Some(StoredVector {
            id,
            vector: entry.node.map(|node| self.graph.vector(node).to_vec()),
            text,
            metadata: entry.metadata.clone(),
        }))
    }

    fn missing(&self, id: VectorId) -> Error {
        Error::new(
            ErrorKind::DocumentNotFound,
            format!("vector {} not found in '{}'", id.0, self.name),
        )
    }

    pub fn update_metadata(&mut self, id: VectorId, metadata: Option<Document>) -> Result<()> {
        if !self.entries.contains_key(&id.0) {
            return Err(self.missing(id));
        }
        let record = self.store_metadata(metadata.as_ref())?;
        let Some(entry) = self.entries.get_mut(&id.0) else {
            return Err(self.missing(id));
        };
        let old = std::mem::replace(&mut entry.metadata_record, record);
        entry.metadata = metadata;
        if let Some(old) = old {
            self.heap.release(old);
        }
        Ok(())
    }

    pub fn delete(&mut self, id: VectorId) -> Result<()> {
        let entry = self.entries.remove(&id.0).ok_or_else(|| self.missing(id))?;
        if let Some(node) = entry.node {
            self.graph.remove(node);
            self.graph_dirty = true;
        }
        self.pending.remove(&id.0);
        for ptr in [entry.payload, entry.text, entry.metadata_record].into_iter().flatten() {
            self.heap.release(ptr);
        }
        Ok(())
    }

    /// k nearest neighbours, best first. The metadata filter only sees the
    /// candidates reached by the traversal, so fewer than `k` may come back.
    pub fn search(&self, query: &[f32], k: usize, filter: Option<&Query>) -> Result<Vec<SearchHit>> {
        self.check_dimensions(query)?;
        if self.has_pending() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                format!("'{}' has texts waiting to be embedded", self.name),
            ));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let empty = Document::new();
        let accept = |idx: u32| match filter {
            None => true,
            Some(query) => {
                let id = self.graph.node(idx).vector_id;
                let metadata = self.entries.get(&id).and_then(|e| e.metadata.as_ref());
                query.matches(metadata.unwrap_or(&empty))
            }
        };
        let ef = self.config.ef_search.max(k);
        let hits = self
            .graph
            .search_filtered(query, k, ef, accept)
            .into_iter()
            .map(|(distance, idx)| {
                let id = self.graph.node(idx).vector_id;
                SearchHit {
                    id: VectorId(id),
                    score: self.config.metric.score(distance),
                    metadata: self.entries.get(&id).and_then(|e| e.metadata.clone()),
                }
            })
            .collect();
        Ok(hits)
    }

    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.provider()?.embed(text)?;
        self.check_dimensions(&vector)?;
        Ok(vector)
    }

    pub fn stats(&self) -> VectorStats {
        let payload_bytes: u64 = self
            .entries
            .values()
            .flat_map(|e| [e.payload, e.text])
            .flatten()
            .map(|ptr| ptr.len as u64)
            .sum();
        let raw_bytes = (self.graph.len() * self.config.dimensions * 4) as u64;
        VectorStats {
            name: self.name.clone(),
            count: self.entries.len(),
            dimensions: self.config.dimensions,
            metric: self.config.metric,
            compression: self.config.compression,
            layers: self.graph.layers(),
            entry_point: self.graph.entry_point().map(|idx| VectorId(self.graph.node(idx).vector_id)),
            payload_bytes,
            raw_bytes,
            compression_ratio: if payload_bytes == 0 { 1.0 } else { raw_bytes as f64 / payload_bytes as f64 },
            pending_texts: self.pending.len(),
        }
    }

    /// Re-appends every record during compaction and rebuilds the arena densely
    pub fn relocate(&mut self) -> Result<()> {
        let heap = Arc::clone(&self.heap);
        let moved = |ptr: &mut Option<RecordPtr>| -> Result<()> {
            if let Some(old) = *ptr {
                *ptr = Some(heap.append(&heap.read(old)?)?);
            }
            Ok(())
        };
        for entry in self.entries.values_mut() {
            moved(&mut entry.payload)?;
            moved(&mut entry.text)?;
            moved(&mut entry.metadata_record)?;
        }

        let (graph, remap) = self.graph.compacted();
        for entry in self.entries.values_mut() {
            entry.node = entry.node.and_then(|old| remap.get(old as usize).copied().flatten());
        }
        self.graph = graph;
        self.graph_record = None;
        self.graph_dirty = true;
        Ok(())
    }

    /// Writes the graph if it changed and describes the collection for the catalog
    pub fn checkpoint(&mut self) -> Result<VectorCollectionCatalog> {
        if self.graph_dirty || (self.graph_record.is_none() && !self.graph.is_empty()) {
            let record = if self.graph.arena_len() == 0 {
                None
            } else {
                Some(self.heap.append(&self.graph.to_bytes()?)?)
            };
            if let Some(old) = std::mem::replace(&mut self.graph_record, record) {
                self.heap.release(old);
            }
            self.graph_dirty = false;
        }

        Ok(VectorCollectionCatalog {
            name: self.name.clone(),
            config: self.config.clone(),
            next_id: self.next_id,
            codebook: (self.config.compression == CompressionMode::Delta).then(|| self.codebook.clone()),
            entries: self
                .entries
                .iter()
                .map(|(id, e)| VectorEntryRecord {
                    id: *id,
                    payload: e.payload,
                    text: e.text,
                    metadata: e.metadata_record,
                })
                .collect(),
            graph: self.graph_record,
        })
    }

    /// Releases every record; used when the collection is dropped
    pub fn release_all(&mut self) {
        for entry in self.entries.values() {
            for ptr in [entry.payload, entry.text, entry.metadata_record].into_iter().flatten() {
                self.heap.release(ptr);
            }
        }
        if let Some(ptr) = self.graph_record.take() {
            self.heap.release(ptr);
        }
        self.entries.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::{MemoryBackend, PageBackend};
    use crate::storage::page::PageId;
    use crate::storage::pager::Pager;
    use serde_json::json;

    fn heap() -> Arc<RecordHeap> {
        let pager = Pager::new(Box::new(MemoryBackend::new()), 4096, 64, 1, Vec::new()).unwrap();
        Arc::new(RecordHeap::new(Arc::new(pager)))
    }

    fn collection(dims: usize, metric: DistanceMetric, mode: CompressionMode) -> VectorCollection {
        let config = VectorConfig::new(dims, metric).with_compression(mode);
        VectorCollection::new("v", config, heap()).unwrap()
    }

    fn meta(value: serde_json::Value) -> Option<Document> {
        Some(Document::try_from(value).unwrap())
    }

    /// Accepts nothing; every page that leaves the cache fails to write
    struct UnwritableBackend;

    impl PageBackend for UnwritableBackend {
        fn read_page(&mut self, id: PageId, _buf: &mut [u8]) -> Result<()> {
            Err(Error::new(ErrorKind::Io, format!("cannot read {}", id)))
        }

        fn write_page(&mut self, id: PageId, _data: &[u8]) -> Result<()> {
            Err(Error::new(ErrorKind::Io, format!("cannot write {}", id)))
        }

        fn sync(&mut self) -> Result<()> {
            Ok(())
        }

        fn len_pages(&self) -> u64 {
            0
        }

        fn is_durable(&self) -> bool {
            false
        }
    }

    #[test]
    fn failed_payload_write_releases_metadata() {
        // one cached page: a payload spanning three pages has to evict
        let pager = Pager::new(Box::new(UnwritableBackend), 512, 1, 1, Vec::new()).unwrap();
        let heap = Arc::new(RecordHeap::new(Arc::new(pager)));
        let config = VectorConfig::new(300, DistanceMetric::Euclidean);
        let mut c = VectorCollection::new("v", config, Arc::clone(&heap)).unwrap();

        let err = c.insert(vec![0.5; 300], meta(json!({"tag": "a"}))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Io);
        assert_eq!(heap.stats().live_bytes, 0);
        assert!(c.is_empty());
    }

    #[test]
    fn rejects_wrong_dimensions() {
        let mut c = collection(3, DistanceMetric::Euclidean, CompressionMode::None);
        assert_eq!(c.insert(vec![1.0, 2.0], None).unwrap_err().kind, ErrorKind::DimensionMismatch);
        c.insert(vec![1.0, 2.0, 3.0], None).unwrap();
        assert_eq!(c.search(&[1.0], 1, None).unwrap_err().kind, ErrorKind::DimensionMismatch);
    }

    #[test]
    fn exact_vector_comes_back_first() {
        let mut c = collection(2, DistanceMetric::Euclidean, CompressionMode::None);
        c.insert(vec![1.0, 0.0], meta(json!({"tag": "a"}))).unwrap();
        let target = c.insert(vec![0.0, 1.0], meta(json!({"tag": "b"}))).unwrap();
        c.insert(vec![-1.0, 0.0], meta(json!({"tag": "a"}))).unwrap();

        let hits = c.search(&[0.0, 1.0], 2, None).unwrap();
        assert_eq!(hits[0].id, target);
        assert!(hits[0].score.abs() < 1e-6);
        assert!(hits[0].score <= hits[1].score);

        let filter = crate::query::parser::QueryParser::parse_json(json!({"tag": "a"})).unwrap();
        let hits = c.search(&[0.0, 1.0], 3, Some(&filter)).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.id != target));
    }

    #[test]
    fn dot_product_scores_descend() {
        let mut c = collection(2, DistanceMetric::DotProduct, CompressionMode::None);
        c.insert(vec![1.0, 0.0], None).unwrap();
        c.insert(vec![3.0, 0.0], None).unwrap();
        let hits = c.search(&[1.0, 0.0], 2, None).unwrap();
        assert_eq!(hits[0].id, VectorId(1));
        assert!((hits[0].score - 3.0).abs() < 1e-6);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn delete_and_metadata_updates() {
        let mut c = collection(2, DistanceMetric::Cosine, CompressionMode::None);
        let a = c.insert(vec![1.0, 0.0], None).unwrap();
        let b = c.insert(vec![0.0, 1.0], None).unwrap();
        c.update_metadata(b, meta(json!({"k": 1}))).unwrap();
        assert_eq!(c.get(b).unwrap().unwrap().metadata, meta(json!({"k": 1})));

        c.delete(a).unwrap();
        assert_eq!(c.delete(a).unwrap_err().kind, ErrorKind::DocumentNotFound);
        assert_eq!(c.update_metadata(a, None).unwrap_err().kind, ErrorKind::DocumentNotFound);
        let hits = c.search(&[1.0, 0.0], 5, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, b);
    }

    #[test]
    fn quantized_vectors_stay_within_bounds() {
        let mut c = collection(32, DistanceMetric::Euclidean, CompressionMode::Quantized);
        let v: Vec<f32> = (0..32).map(|i| i as f32 / 31.0 * 3.0 - 1.0).collect();
        let id = c.insert(v.clone(), None).unwrap();
        let stored = c.get(id).unwrap().unwrap().vector.unwrap();
        for (a, b) in v.iter().zip(&stored) {
            assert!((a - b).abs() <= 3.0 / 510.0 + 1e-5);
        }
        let stats = c.stats();
        assert!(stats.compression_ratio > 1.0);
    }

    #[test]
    fn lazy_texts_need_a_provider() {
        let mut c = collection(2, DistanceMetric::Euclidean, CompressionMode::LazyEmbedding);
        let id = c.insert_text("hello", None).unwrap();
        assert!(c.has_pending());
        assert_eq!(c.embed_pending().unwrap_err().kind, ErrorKind::InvalidState);
        assert_eq!(c.search(&[0.0, 0.0], 1, None).unwrap_err().kind, ErrorKind::InvalidState);

        let provider = |text: &str| -> Result<Vec<f32>> { Ok(vec![text.len() as f32, 1.0]) };
        c.register_provider(Arc::new(provider));
        assert_eq!(c.embed_pending().unwrap(), 1);
        let stored = c.get(id).unwrap().unwrap();
        assert_eq!(stored.vector, Some(vec![5.0, 1.0]));
        assert_eq!(stored.text.as_deref(), Some("hello"));
        assert_eq!(c.search(&c.embed_query("howdy").unwrap(), 1, None).unwrap()[0].id, id);
    }

    #[test]
    fn restore_rebuilds_from_checkpoint() {
        let heap = heap();
        let config = VectorConfig::new(3, DistanceMetric::Euclidean).with_compression(CompressionMode::Delta);
        let mut c = VectorCollection::new("v", config, Arc::clone(&heap)).unwrap();
        for i in 0..40 {
            let f = i as f32;
            c.insert(vec![f, f * 0.5, -f], meta(json!({"i": i}))).unwrap();
        }
        c.delete(VectorId(3)).unwrap();
        let catalog = c.checkpoint().unwrap();

        let restored = VectorCollection::restore(catalog, heap).unwrap();
        assert_eq!(restored.len(), 39);
        let hits = restored.search(&[10.0, 5.0, -10.0], 1, None).unwrap();
        assert_eq!(hits[0].id, VectorId(10));
        assert_eq!(hits[0].metadata, meta(json!({"i": 10})));
    }
}
