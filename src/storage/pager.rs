use std::num::NonZeroUsize;
use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};
use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::backend::PageBackend;
use crate::storage::page::{stamp_checksum, verify_checksum, PageId};

struct CachedPage {
    data: Bytes,
    dirty: bool,
}

struct PagerState {
    backend: Box<dyn PageBackend>,
    cache: LruCache<PageId, CachedPage>,
    page_count: u64,
    free_list: Vec<PageId>,
    pending_free: Vec<PageId>,
    hits: u64,
    misses: u64,
}

/// Fixed-size page allocator with a bounded write-back LRU cache
pub struct Pager {
    page_size: usize,
    cache_capacity: usize,
    // Cache and backend sit under one lock. A miss reads the backend and an
    // eviction writes the old copy back while holding it, so a page is never
    // read from the backend while a newer copy is between cache and medium.
    state: Mutex<PagerState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PagerStats {
    pub page_size: usize,
    pub page_count: u64,
    pub free_pages: usize,
    pub cached_pages: usize,
    pub dirty_pages: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

impl PagerStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

impl Pager {
    pub fn new(
        backend: Box<dyn PageBackend>,
        page_size: usize,
        cache_pages: usize,
        page_count: u64,
        free_list: Vec<PageId>,
    ) -> Result<Self> {
        let capacity = NonZeroUsize::new(cache_pages).ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument, "cache must hold at least one page".to_string())
        })?;
        Ok(Pager {
            page_size,
            cache_capacity: cache_pages,
            state: Mutex::new(PagerState {
                backend,
                cache: LruCache::new(capacity),
                page_count: page_count.max(1),
                free_list,
                pending_free: Vec::new(),
                hits: 0,
                misses: 0,
            }),
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_durable(&self) -> bool {
        self.state.lock().backend.is_durable()
    }

    /// Reuses a released page if one is available, else grows the store.
    /// The caller must write the page before reading it.
    pub fn allocate(&self) -> PageId {
        let mut state = self.state.lock();
        if let Some(id) = state.free_list.pop() {
            return id;
        }
        let id = PageId(state.page_count);
        state.page_count += 1;
        id
    }

    pub fn read(&self, id: PageId) -> Result<Bytes> {
        let mut state = self.state.lock();
        if let Some(page) = state.cache.get(&id) {
            let data = page.data.clone();
            state.hits += 1;
            return Ok(data);
        }
        state.misses += 1;

        let mut buf = vec![0u8; self.page_size];
        state.backend.read_page(id, &mut buf)?;
        verify_checksum(id, &buf)?;
        let data = Bytes::from(buf);
        Self::insert(&mut state, id, CachedPage { data: data.clone(), dirty: false })?;
        Ok(data)
    }

    /// Stamps the checksum and stages the page in the cache
    pub fn write(&self, id: PageId, mut data: Vec<u8>) -> Result<()> {
        if data.len() != self.page_size {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("page buffer of {} bytes, expected {}", data.len(), self.page_size),
            ));
        }
        stamp_checksum(&mut data);
        let mut state = self.state.lock();
        Self::insert(&mut state, id, CachedPage { data: Bytes::from(data), dirty: true })
    }

    /// Releases a page. Durable stores only recycle it after the next sync,
    /// since the last synced catalog may still reference it.
    pub fn free(&self, id: PageId) {
        let mut state = self.state.lock();
        state.cache.pop(&id);
        if state.backend.is_durable() {
            state.pending_free.push(id);
        } else {
            state.backend.discard(id);
            state.free_list.push(id);
        }
    }

    /// Flushes dirty data pages and fsyncs, then writes the new header page
    /// (if any) and fsyncs again. Pending frees become reusable afterwards.
    pub fn sync(&self, header: Option<Vec<u8>>) -> Result<()> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let mut dirty: Vec<PageId> = state
            .cache
            .iter()
            .filter(|(_, page)| page.dirty)
            .map(|(id, _)| *id)
            .collect();
        dirty.sort();

        for id in &dirty {
            if let Some(page) = state.cache.peek_mut(id) {
                state.backend.write_page(*id, &page.data)?;
                page.dirty = false;
            }
        }
        state.backend.sync()?;

        if let Some(mut data) = header {
            stamp_checksum(&mut data);
            state.backend.write_page(PageId::HEADER, &data)?;
            state.backend.sync()?;
            state.cache.pop(&PageId::HEADER);
        }

        let released = state.pending_free.len();
        let pending = std::mem::take(&mut state.pending_free);
        state.free_list.extend(pending);
        debug!(pages = dirty.len(), released, "pager synced");
        Ok(())
    }

    /// Installs the free list derived at open
    pub fn restore_free_list(&self, pages: Vec<PageId>) {
        self.state.lock().free_list = pages;
    }

    pub fn page_count(&self) -> u64 {
        self.state.lock().page_count
    }

    /// Free pages that may be persisted: pending ones are still referenced
    /// by the durable catalog and are recorded as free only once it is replaced.
    pub fn free_pages(&self) -> Vec<PageId> {
        let state = self.state.lock();
        let mut pages = state.free_list.clone();
        pages.extend(state.pending_free.iter().copied());
        pages.sort();
        pages
    }

    pub fn stats(&self) -> PagerStats {
        let state = self.state.lock();
        PagerStats {
            page_size: self.page_size,
            page_count: state.page_count,
            free_pages: state.free_list.len() + state.pending_free.len(),
            cached_pages: state.cache.len(),
            dirty_pages: state.cache.iter().filter(|(_, p)| p.dirty).count(),
            cache_hits: state.hits,
            cache_misses: state.misses,
        }
    }

    pub fn cache_capacity(&self) -> usize {
        self.cache_capacity
    }

    fn insert(state: &mut PagerState, id: PageId, page: CachedPage) -> Result<()> {
        if let Some((evicted, old)) = state.cache.push(id, page) {
            if evicted != id && old.dirty {
                trace!(page = evicted.0, "writing back evicted dirty page");
                state.backend.write_page(evicted, &old.data)?;
            }
        }
        Ok(())
    }
}
