use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};
use crate::collection::{Collection, Cursor};
use crate::core::config::{Config, OpenMode, SyncMode};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::{CompactionStats, DatabaseStats};
use crate::core::types::{Document, DocumentId, VectorId};
use crate::core::value::Value;
use crate::index::{IndexDefinition, IndexField, IndexInfo, IndexOptions};
use crate::query::{ExecutionPlan, FindOptions, Query, QueryParser};
use crate::storage::backend::{FileBackend, MemoryBackend};
use crate::storage::catalog::Catalog;
use crate::storage::file_lock::FileLock;
use crate::storage::page::{DatabaseHeader, PageId, RecordPtr};
use crate::storage::{Pager, RecordHeap};
use crate::update::UpdateExpression;
use crate::vector::{EmbeddingProvider, SearchHit, StoredVector, VectorCollection, VectorConfig, VectorStats};

/// Location that selects a store with no backing file
pub const MEMORY_PATH: &str = ":memory:";

#[derive(Default)]
struct Meta {
    generation: u64,
    catalog: Option<RecordPtr>,  // catalog record referenced by the durable header
    last_compaction: Option<Instant>,
}

/// Embedded document store with secondary indexes and vector search.
///
/// Lock order: `gate` -> collection maps -> one collection -> heap -> pager.
/// Mutations hold `gate` shared; `sync` and `compact` hold it exclusively so
/// they see every collection at rest.
pub struct Database {
    path: Option<PathBuf>,
    config: Config,
    pager: Arc<Pager>,
    heap: Arc<RecordHeap>,
    collections: RwLock<HashMap<String, Arc<RwLock<Collection>>>>,
    vectors: RwLock<HashMap<String, Arc<RwLock<VectorCollection>>>>,
    gate: RwLock<()>,
    meta: Mutex<Meta>,
    started: Instant,
    closed: bool,
    _lock: Option<FileLock>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Opens the store at `path`; `":memory:"` selects an in-memory store.
    pub fn open(path: impl AsRef<Path>, config: Config, mode: OpenMode) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();
        if path.as_os_str() == MEMORY_PATH {
            return Self::open_in_memory(config);
        }

        let exists = path.exists();
        if !exists && mode == OpenMode::Open {
            return Err(Error::new(
                ErrorKind::NotFound,
                format!("no database at {}", path.display()),
            ));
        }

        let lock = FileLock::acquire(path)?;
        let db = if exists {
            Self::load(path, config, lock)?
        } else {
            Self::initialize(path, config, lock)?
        };
        info!(
            path = %path.display(),
            collections = db.collections.read().len(),
            vector_collections = db.vectors.read().len(),
            "database opened"
        );
        Ok(db)
    }

    pub fn open_in_memory(config: Config) -> Result<Self> {
        config.validate()?;
        let pager = Arc::new(Pager::new(
            Box::new(MemoryBackend::new()),
            config.page_size,
            config.cache_pages,
            1,
            Vec::new(),
        )?);
        let heap = Arc::new(RecordHeap::new(Arc::clone(&pager)));
        debug!(page_size = config.page_size, "in-memory database opened");
        Ok(Self::assemble(None, config, pager, heap, Meta::default(), None))
    }

    /// Builds the handle once every fallible step is done, since dropping
    /// a handle syncs it
    fn assemble(
        path: Option<PathBuf>,
        config: Config,
        pager: Arc<Pager>,
        heap: Arc<RecordHeap>,
        meta: Meta,
        lock: Option<FileLock>,
    ) -> Self {
        Database {
            path,
            config,
            pager,
            heap,
            collections: RwLock::new(HashMap::new()),
            vectors: RwLock::new(HashMap::new()),
            gate: RwLock::new(()),
            meta: Mutex::new(meta),
            started: Instant::now(),
            closed: false,
            _lock: lock,
        }
    }

    fn initialize(path: &Path, config: Config, lock: FileLock) -> Result<Self> {
        let backend = FileBackend::create(path, config.page_size)?;
        let pager = Arc::new(Pager::new(Box::new(backend), config.page_size, config.cache_pages, 1, Vec::new())?);
        let header = DatabaseHeader::new(config.page_size as u32);
        pager.sync(Some(header.encode(config.page_size)))?;
        let heap = Arc::new(RecordHeap::new(Arc::clone(&pager)));
        Ok(Self::assemble(Some(path.to_path_buf()), config, pager, heap, Meta::default(), Some(lock)))
    }

    fn load(path: &Path, mut config: Config, lock: FileLock) -> Result<Self> {
        // 1. Page size comes from the file, not the config
        let prefix = FileBackend::read_prefix(path, Config::MIN_PAGE_SIZE)?;
        let provisional = DatabaseHeader::decode(&prefix)?;
        let page_size = provisional.page_size as usize;
        if !page_size.is_power_of_two() || page_size < Config::MIN_PAGE_SIZE {
            return Err(Error::corrupt(format!("header declares page size {}", page_size)));
        }
        if page_size != config.page_size {
            debug!(file = page_size, configured = config.page_size, "using the file's page size");
            config.page_size = page_size;
        }

        // 2. Re-read page 0 through the pager so its checksum is verified
        let backend = FileBackend::open(path, page_size)?;
        let pager = Arc::new(Pager::new(
            Box::new(backend),
            page_size,
            config.cache_pages,
            provisional.page_count,
            Vec::new(),
        )?);
        let header = DatabaseHeader::decode(&pager.read(PageId::HEADER)?)?;
        let meta = Meta { generation: header.generation, catalog: header.catalog, last_compaction: None };
        let Some(catalog_ptr) = header.catalog else {
            let heap = Arc::new(RecordHeap::new(Arc::clone(&pager)));
            return Ok(Self::assemble(Some(path.to_path_buf()), config, pager, heap, meta, Some(lock)));
        };

        // 3. Catalog, then the pages it accounts for; everything else is free
        let reader = RecordHeap::new(Arc::clone(&pager));
        let catalog = Catalog::decode(&reader.read(catalog_ptr)?)?;
        let mut owned: BTreeSet<PageId> = catalog.heap_pages.iter().copied().collect();
        owned.extend(reader.record_pages(catalog_ptr)?);
        if owned.iter().any(|p| *p == PageId::HEADER || p.0 >= header.page_count) {
            return Err(Error::corrupt("catalog claims pages outside the store"));
        }
        let free: Vec<PageId> = (1..header.page_count).map(PageId).filter(|p| !owned.contains(p)).collect();
        pager.restore_free_list(free);

        // 4. Collections adopt their records into the restored heap
        let heap = Arc::new(RecordHeap::restore(Arc::clone(&pager), owned.into_iter().collect(), 0));
        heap.adopt(&catalog_ptr);
        let mut collections = HashMap::new();
        for entry in catalog.collections {
            let collection = Collection::restore(entry, Arc::clone(&heap))?;
            collections.insert(collection.name().to_string(), Arc::new(RwLock::new(collection)));
        }
        let mut vectors = HashMap::new();
        for entry in catalog.vector_collections {
            let collection = VectorCollection::restore(entry, Arc::clone(&heap))?;
            vectors.insert(collection.name().to_string(), Arc::new(RwLock::new(collection)));
        }

        let db = Self::assemble(Some(path.to_path_buf()), config, pager, heap, meta, Some(lock));
        *db.collections.write() = collections;
        *db.vectors.write() = vectors;
        Ok(db)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.is_none()
    }

    // ---- write path ----

    /// Runs a mutation under the shared gate, then applies the sync mode
    /// and the auto-compaction policy
    fn mutate<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let out = {
            let _gate = self.gate.read();
            f()?
        };
        self.after_write()?;
        Ok(out)
    }

    fn after_write(&self) -> Result<()> {
        if self.config.sync_mode == SyncMode::Immediate {
            self.sync()?;
        }
        if self.compaction_due() {
            self.compact()?;
        }
        Ok(())
    }

    fn compaction_due(&self) -> bool {
        if !self.config.auto_compaction {
            return false;
        }
        let interval = Duration::from_secs(self.config.compaction_interval_secs);
        let elapsed = {
            let meta = self.meta.lock();
            meta.last_compaction.unwrap_or(self.started).elapsed()
        };
        elapsed >= interval && self.heap.stats().garbage_ratio > self.config.compaction_garbage_ratio
    }

    fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains('\0') {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("invalid collection name {:?}", name),
            ));
        }
        Ok(())
    }

    fn collection(&self, name: &str) -> Result<Arc<RwLock<Collection>>> {
        self.collections.read().get(name).cloned().ok_or_else(|| {
            Error::new(ErrorKind::CollectionNotFound, format!("collection '{}' does not exist", name))
        })
    }

    /// Writes to a missing collection create it
    fn collection_for_write(&self, name: &str) -> Result<Arc<RwLock<Collection>>> {
        if let Some(existing) = self.collections.read().get(name) {
            return Ok(Arc::clone(existing));
        }
        Self::validate_name(name)?;
        let mut collections = self.collections.write();
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(Collection::new(name, Arc::clone(&self.heap)))));
        Ok(Arc::clone(collection))
    }

    fn vector_collection(&self, name: &str) -> Result<Arc<RwLock<VectorCollection>>> {
        self.vectors.read().get(name).cloned().ok_or_else(|| {
            Error::new(ErrorKind::CollectionNotFound, format!("vector collection '{}' does not exist", name))
        })
    }

    fn parse_filter(filter: impl Into<Value>) -> Result<Query> {
        QueryParser::parse(&filter.into())
    }

    fn parse_document(doc: impl Into<Value>) -> Result<Document> {
        Document::from_value(doc.into())
    }

    // ---- collections ----

    pub fn create_collection(&self, name: &str) -> Result<()> {
        Self::validate_name(name)?;
        self.mutate(|| {
            let mut collections = self.collections.write();
            if collections.contains_key(name) {
                return Err(Error::new(
                    ErrorKind::CollectionExists,
                    format!("collection '{}' already exists", name),
                ));
            }
            collections.insert(
                name.to_string(),
                Arc::new(RwLock::new(Collection::new(name, Arc::clone(&self.heap)))),
            );
            Ok(())
        })
    }

    pub fn drop_collection(&self, name: &str) -> Result<()> {
        self.mutate(|| {
            let removed = self.collections.write().remove(name).ok_or_else(|| {
                Error::new(ErrorKind::CollectionNotFound, format!("collection '{}' does not exist", name))
            })?;
            removed.write().release_all();
            info!(collection = name, "collection dropped");
            Ok(())
        })
    }

    /// `(name, document count)` sorted by name
    pub fn list_collections(&self) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> = self
            .collections
            .read()
            .iter()
            .map(|(name, c)| (name.clone(), c.read().len()))
            .collect();
        out.sort();
        out
    }

    // ---- documents ----

    pub fn insert(&self, collection: &str, doc: impl Into<Value>) -> Result<DocumentId> {
        let doc = Self::parse_document(doc)?;
        self.mutate(|| self.collection_for_write(collection)?.write().insert(doc))
    }

    /// Inserts every document or none of them
    pub fn insert_many<I, D>(&self, collection: &str, docs: I) -> Result<Vec<DocumentId>>
    where
        I: IntoIterator<Item = D>,
        D: Into<Value>,
    {
        let docs = docs.into_iter().map(Self::parse_document).collect::<Result<Vec<_>>>()?;
        self.mutate(|| self.collection_for_write(collection)?.write().insert_many(docs))
    }

    pub fn find_by_id(&self, collection: &str, id: impl Into<DocumentId>) -> Result<Option<Document>> {
        self.collection(collection)?.read().find_by_id(&id.into())
    }

    /// Every document in insertion order, `skip`/`limit` applied lazily
    pub fn scan(&self, collection: &str, skip: usize, limit: Option<usize>) -> Result<Cursor> {
        let mut options = FindOptions::new().skip(skip);
        options.limit = limit;
        Cursor::new(self.collection(collection)?, Query::MatchAll, options)
    }

    pub fn find(&self, collection: &str, filter: impl Into<Value>, options: FindOptions) -> Result<Vec<Document>> {
        let query = Self::parse_filter(filter)?;
        self.collection(collection)?.read().find(&query, &options)
    }

    pub fn find_one(&self, collection: &str, filter: impl Into<Value>) -> Result<Option<Document>> {
        let query = Self::parse_filter(filter)?;
        self.collection(collection)?.read().find_one(&query)
    }

    /// Lazy cursor over the matches
    pub fn find_iter(&self, collection: &str, filter: impl Into<Value>, options: FindOptions) -> Result<Cursor> {
        let query = Self::parse_filter(filter)?;
        Cursor::new(self.collection(collection)?, query, options)
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        Ok(self.collection(collection)?.read().len())
    }

    pub fn count_matching(&self, collection: &str, filter: impl Into<Value>) -> Result<usize> {
        let query = Self::parse_filter(filter)?;
        self.collection(collection)?.read().count_matching(&query)
    }

    pub fn explain(&self, collection: &str, filter: impl Into<Value>) -> Result<ExecutionPlan> {
        let query = Self::parse_filter(filter)?;
        Ok(self.collection(collection)?.read().explain(&query))
    }

    /// Replaces the whole document stored under `id`
    pub fn update(&self, collection: &str, id: impl Into<DocumentId>, doc: impl Into<Value>) -> Result<()> {
        let id = id.into();
        let doc = Self::parse_document(doc)?;
        self.mutate(|| self.collection(collection)?.write().replace(&id, doc))
    }

    /// Applies update operators (or a replacement) to one document.
    /// Returns whether the document changed.
    pub fn update_by_id(&self, collection: &str, id: impl Into<DocumentId>, update: impl Into<Value>) -> Result<bool> {
        let id = id.into();
        let update = UpdateExpression::parse(&update.into())?;
        self.mutate(|| self.collection(collection)?.write().update_by_id(&id, &update))
    }

    /// Returns the number of documents that changed
    pub fn update_many(&self, collection: &str, filter: impl Into<Value>, update: impl Into<Value>) -> Result<usize> {
        let query = Self::parse_filter(filter)?;
        let update = UpdateExpression::parse(&update.into())?;
        self.mutate(|| self.collection(collection)?.write().update_many(&query, &update))
    }

    pub fn delete(&self, collection: &str, id: impl Into<DocumentId>) -> Result<()> {
        let id = id.into();
        self.mutate(|| self.collection(collection)?.write().delete(&id))
    }

    pub fn delete_many(&self, collection: &str, filter: impl Into<Value>) -> Result<usize> {
        let query = Self::parse_filter(filter)?;
        self.mutate(|| self.collection(collection)?.write().delete_many(&query))
    }

    // ---- indexes ----

    /// Builds an index over the existing documents and returns its name.
    /// An index with the same fields and options is reused.
    pub fn create_index(&self, collection: &str, fields: Vec<IndexField>, options: IndexOptions) -> Result<String> {
        let definition = IndexDefinition::new(fields, &options)?;
        self.mutate(|| {
            let name = self.collection_for_write(collection)?.write().create_index(definition)?;
            info!(collection, index = %name, "index ready");
            Ok(name)
        })
    }

    pub fn drop_index(&self, collection: &str, index: &str) -> Result<()> {
        self.mutate(|| self.collection(collection)?.write().drop_index(index))
    }

    pub fn drop_all_indexes(&self, collection: &str) -> Result<usize> {
        self.mutate(|| Ok(self.collection(collection)?.write().drop_all_indexes()))
    }

    pub fn list_indexes(&self, collection: &str) -> Result<Vec<IndexInfo>> {
        Ok(self.collection(collection)?.read().list_indexes())
    }

    // ---- vectors ----

    pub fn create_vector_collection(&self, name: &str, config: VectorConfig) -> Result<()> {
        Self::validate_name(name)?;
        self.mutate(|| {
            let mut vectors = self.vectors.write();
            if vectors.contains_key(name) {
                return Err(Error::new(
                    ErrorKind::CollectionExists,
                    format!("vector collection '{}' already exists", name),
                ));
            }
            let collection = VectorCollection::new(name, config, Arc::clone(&self.heap))?;
            vectors.insert(name.to_string(), Arc::new(RwLock::new(collection)));
            Ok(())
        })
    }

    pub fn drop_vector_collection(&self, name: &str) -> Result<()> {
        self.mutate(|| {
            let removed = self.vectors.write().remove(name).ok_or_else(|| {
                Error::new(ErrorKind::CollectionNotFound, format!("vector collection '{}' does not exist", name))
            })?;
            removed.write().release_all();
            info!(collection = name, "vector collection dropped");
            Ok(())
        })
    }

    /// `(name, vector count)` sorted by name
    pub fn list_vector_collections(&self) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> = self
            .vectors
            .read()
            .iter()
            .map(|(name, c)| (name.clone(), c.read().len()))
            .collect();
        out.sort();
        out
    }

    pub fn insert_vector(&self, collection: &str, vector: Vec<f32>, metadata: Option<Document>) -> Result<VectorId> {
        self.mutate(|| self.vector_collection(collection)?.write().insert(vector, metadata))
    }

    /// Stores text to be embedded by the registered provider before the
    /// next search
    pub fn insert_text(&self, collection: &str, text: &str, metadata: Option<Document>) -> Result<VectorId> {
        self.mutate(|| self.vector_collection(collection)?.write().insert_text(text, metadata))
    }

    pub fn get_vector(&self, collection: &str, id: VectorId) -> Result<Option<StoredVector>> {
        self.vector_collection(collection)?.read().get(id)
    }

    pub fn update_metadata(&self, collection: &str, id: VectorId, metadata: Option<Document>) -> Result<()> {
        self.mutate(|| self.vector_collection(collection)?.write().update_metadata(id, metadata))
    }

    pub fn delete_vector(&self, collection: &str, id: VectorId) -> Result<()> {
        self.mutate(|| self.vector_collection(collection)?.write().delete(id))
    }

    pub fn register_embedding_provider(&self, collection: &str, provider: impl EmbeddingProvider + 'static) -> Result<()> {
        self.vector_collection(collection)?.write().register_provider(Arc::new(provider));
        Ok(())
    }

    /// k nearest neighbours of `query`, best first
    pub fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.search_with(collection, |c| c.search(query, k, None))
    }

    /// Nearest neighbours whose metadata matches `filter`
    pub fn search_filtered(&self, collection: &str, query: &[f32], k: usize, filter: impl Into<Value>) -> Result<Vec<SearchHit>> {
        let filter = Self::parse_filter(filter)?;
        self.search_with(collection, |c| c.search(query, k, Some(&filter)))
    }

    /// Embeds `text` with the registered provider and searches with it
    pub fn search_text(&self, collection: &str, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.search_with(collection, |c| c.search(&c.embed_query(text)?, k, None))
    }

    /// Runs a search under a shared lock. Pending texts are embedded first,
    /// under the write lock, and only when there are any.
    fn search_with<F>(&self, collection: &str, run: F) -> Result<Vec<SearchHit>>
    where
        F: Fn(&VectorCollection) -> Result<Vec<SearchHit>>,
    {
        let collection = self.vector_collection(collection)?;
        let (hits, embedded) = {
            let _gate = self.gate.read();
            let reader = collection.read();
            if reader.has_pending() {
                drop(reader);
                // another search may embed first; embed_pending then finds nothing
                let mut writer = collection.write();
                let embedded = writer.embed_pending()?;
                let reader = RwLockWriteGuard::downgrade(writer);
                (run(&*reader)?, embedded)
            } else {
                (run(&*reader)?, 0)
            }
        };
        if embedded > 0 {
            self.after_write()?;
        }
        Ok(hits)
    }

    pub fn vector_stats(&self, collection: &str) -> Result<VectorStats> {
        Ok(self.vector_collection(collection)?.read().stats())
    }

    // ---- lifecycle ----

    /// Makes every change durable: vector graphs are checkpointed, a new
    /// catalog is appended, data pages are flushed, and finally the header
    /// is switched to the new catalog. A no-op in memory.
    pub fn sync(&self) -> Result<()> {
        let _gate = self.gate.write();
        self.sync_locked()
    }

    fn sync_locked(&self) -> Result<()> {
        if !self.pager.is_durable() {
            return Ok(());
        }

        let mut collections: Vec<_> = self.collections.read().values().map(|c| c.read().to_catalog()).collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        let mut vector_collections = Vec::new();
        for collection in self.vectors.read().values() {
            vector_collections.push(collection.write().checkpoint()?);
        }
        vector_collections.sort_by(|a, b| a.name.cmp(&b.name));

        let mut meta = self.meta.lock();
        let catalog = Catalog {
            generation: meta.generation + 1,
            heap_pages: self.heap.owned_pages(),
            collections,
            vector_collections,
        };
        let ptr = self.heap.append(&catalog.encode()?)?;

        let page_size = self.pager.page_size();
        let mut header = DatabaseHeader::new(page_size as u32);
        header.page_count = self.pager.page_count();
        header.catalog = Some(ptr);
        header.generation = catalog.generation;
        self.pager.sync(Some(header.encode(page_size)))?;

        self.heap.seal();
        if let Some(previous) = meta.catalog.replace(ptr) {
            self.heap.release(previous);
        }
        meta.generation = catalog.generation;
        debug!(generation = meta.generation, pages = header.page_count, "database synced");
        Ok(())
    }

    /// Rewrites every live record into fresh pages and frees the old ones
    pub fn compact(&self) -> Result<CompactionStats> {
        let started = Instant::now();
        let _gate = self.gate.write();
        let before = self.heap.stats();

        let old_pages = self.heap.begin_compaction();
        if let Err(e) = self.relocate_all() {
            warn!(error = %e, "compaction aborted");
            self.heap.abort_compaction(old_pages);
            return Err(e);
        }
        // the previous catalog sat in the old pages
        self.meta.lock().catalog = None;
        self.heap.finish_compaction(old_pages);
        self.sync_locked()?;

        let after = self.heap.stats();
        self.meta.lock().last_compaction = Some(Instant::now());
        let stats = CompactionStats {
            pages_before: before.pages,
            pages_after: after.pages,
            live_bytes: after.live_bytes,
            garbage_ratio_before: before.garbage_ratio,
            garbage_ratio_after: after.garbage_ratio,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            pages_before = stats.pages_before,
            pages_after = stats.pages_after,
            duration_ms = stats.duration_ms,
            "compaction finished"
        );
        Ok(stats)
    }

    fn relocate_all(&self) -> Result<()> {
        for collection in self.collections.read().values() {
            collection.write().relocate()?;
        }
        for collection in self.vectors.read().values() {
            collection.write().relocate()?;
        }
        Ok(())
    }

    pub fn stats(&self) -> DatabaseStats {
        let mut collections: Vec<_> = self.collections.read().values().map(|c| c.read().stats()).collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        let mut vector_collections: Vec<_> = self.vectors.read().values().map(|c| c.read().stats()).collect();
        vector_collections.sort_by(|a, b| a.name.cmp(&b.name));
        let meta = self.meta.lock();

        DatabaseStats {
            path: self.path.as_ref().map(|p| p.display().to_string()),
            generation: meta.generation,
            uptime_secs: self.started.elapsed().as_secs(),
            total_documents: collections.iter().map(|c| c.documents).sum(),
            collections,
            vector_collections,
            pager: self.pager.stats(),
            heap: self.heap.stats(),
            last_compaction_secs: meta.last_compaction.map(|at| at.elapsed().as_secs()),
        }
    }

    /// Syncs and releases the file lock
    pub fn close(mut self) -> Result<()> {
        self.sync()?;
        self.closed = true;
        info!(path = ?self.path, "database closed");
        Ok(())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.sync() {
            warn!(error = %e, "sync on drop failed, changes since the last sync are lost");
        }
    }
}
