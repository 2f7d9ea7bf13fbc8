use std::collections::BTreeSet;
use std::sync::Arc;
use parking_lot::Mutex;
use crate::core::error::{Error, Result};
use crate::storage::page::{PageHeader, PageId, PageKind, RecordPtr, PAGE_HEADER_SIZE};
use crate::storage::pager::Pager;

// [ len u32 | crc32 u32 ] precedes every record payload
const RECORD_HEADER_SIZE: usize = 8;

struct TailPage {
    id: PageId,
    buf: Vec<u8>,
    used: usize,
}

struct HeapState {
    tail: Option<TailPage>,
    owned: BTreeSet<PageId>,
    live_bytes: u64,
}

/// Append-only record heap over the pager. Records are byte streams that
/// continue into the page named by `next` when they outgrow their page.
pub struct RecordHeap {
    pager: Arc<Pager>,
    state: Mutex<HeapState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeapStats {
    pub pages: usize,
    pub live_bytes: u64,
    pub capacity_bytes: u64,
    pub garbage_ratio: f64,
}

impl RecordHeap {
    pub fn new(pager: Arc<Pager>) -> Self {
        Self::restore(pager, Vec::new(), 0)
    }

    pub fn restore(pager: Arc<Pager>, owned: Vec<PageId>, live_bytes: u64) -> Self {
        RecordHeap {
            pager,
            state: Mutex::new(HeapState {
                tail: None,
                owned: owned.into_iter().collect(),
                live_bytes,
            }),
        }
    }

    pub fn pager(&self) -> &Arc<Pager> {
        &self.pager
    }

    fn capacity(&self) -> usize {
        self.pager.page_size() - PAGE_HEADER_SIZE
    }

    /// Per-record overhead on top of the payload
    pub fn stored_size(ptr: &RecordPtr) -> u64 {
        (RECORD_HEADER_SIZE + ptr.len as usize) as u64
    }

    pub fn append(&self, payload: &[u8]) -> Result<RecordPtr> {
        let len = u32::try_from(payload.len())
            .map_err(|_| Error::corrupt(format!("record of {} bytes is too large", payload.len())))?;
        let mut record = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
        record.extend_from_slice(&len.to_le_bytes());
        record.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
        record.extend_from_slice(payload);

        let capacity = self.capacity();
        let mut state = self.state.lock();

        let needs_page = match &state.tail {
            Some(tail) => tail.used == capacity,
            None => true,
        };
        if needs_page {
            let tail = self.fresh_page();
            state.owned.insert(tail.id);
            state.tail = Some(tail);
        }

        let mut remaining = &record[..];
        let mut start = None;
        loop {
            let Some(tail) = state.tail.as_mut() else {
                return Err(Error::corrupt("heap lost its tail page"));
            };
            if start.is_none() {
                start = Some(RecordPtr { page: tail.id, offset: tail.used as u32, len });
            }

            let n = (capacity - tail.used).min(remaining.len());
            let at = PAGE_HEADER_SIZE + tail.used;
            tail.buf[at..at + n].copy_from_slice(&remaining[..n]);
            tail.used += n;
            remaining = &remaining[n..];

            if remaining.is_empty() {
                self.flush(tail, None)?;
                break;
            }

            let next = self.fresh_page();
            self.flush(tail, Some(next.id))?;
            state.owned.insert(next.id);
            state.tail = Some(next);
        }

        state.live_bytes += record.len() as u64;
        start.ok_or_else(|| Error::corrupt("empty record append"))
    }

    pub fn read(&self, ptr: RecordPtr) -> Result<Vec<u8>> {
        self.read_chain(ptr).map(|(payload, _)| payload)
    }

    /// Pages a record occupies, in chain order
    pub fn record_pages(&self, ptr: RecordPtr) -> Result<Vec<PageId>> {
        self.read_chain(ptr).map(|(_, pages)| pages)
    }

    fn read_chain(&self, ptr: RecordPtr) -> Result<(Vec<u8>, Vec<PageId>)> {
        let capacity = self.capacity();
        let total = RECORD_HEADER_SIZE + ptr.len as usize;
        let mut out = Vec::with_capacity(total);
        let mut page_id = ptr.page;
        let mut offset = ptr.offset as usize;
        let mut pages = Vec::new();

        while out.len() < total {
            let page = self.pager.read(page_id)?;
            pages.push(page_id);
            let header = PageHeader::read(&page)?;
            if header.kind != PageKind::Heap {
                return Err(Error::corrupt(format!("{} is not a heap page", page_id)));
            }
            let used = header.used as usize;
            if used > capacity || offset > used {
                return Err(Error::corrupt(format!("{} has an invalid fill level", page_id)));
            }

            let take = (used - offset).min(total - out.len());
            let at = PAGE_HEADER_SIZE + offset;
            out.extend_from_slice(&page[at..at + take]);

            if out.len() < total {
                page_id = header
                    .next
                    .ok_or_else(|| Error::corrupt(format!("record chain ends early at {}", page_id)))?;
                offset = 0;
            }
        }

        let stored_len = u32::from_le_bytes([out[0], out[1], out[2], out[3]]);
        let stored_crc = u32::from_le_bytes([out[4], out[5], out[6], out[7]]);
        if stored_len != ptr.len {
            return Err(Error::corrupt(format!(
                "record at {}+{} has length {}, expected {}",
                ptr.page, ptr.offset, stored_len, ptr.len
            )));
        }
        let payload = out.split_off(RECORD_HEADER_SIZE);
        if crc32fast::hash(&payload) != stored_crc {
            return Err(Error::corrupt(format!("record checksum mismatch at {}+{}", ptr.page, ptr.offset)));
        }
        Ok((payload, pages))
    }

    /// Marks a record as garbage
    pub fn release(&self, ptr: RecordPtr) {
        let mut state = self.state.lock();
        state.live_bytes = state.live_bytes.saturating_sub(Self::stored_size(&ptr));
    }

    /// Ends the current tail page; the next append starts a fresh one
    pub fn seal(&self) {
        self.state.lock().tail = None;
    }

    /// Detaches every page owned so far. Live records must be re-appended
    /// before the returned pages are handed to `finish_compaction`.
    pub fn begin_compaction(&self) -> BTreeSet<PageId> {
        let mut state = self.state.lock();
        state.tail = None;
        state.live_bytes = 0;
        std::mem::take(&mut state.owned)
    }

    pub fn finish_compaction(&self, old_pages: BTreeSet<PageId>) {
        for id in old_pages {
            self.pager.free(id);
        }
    }

    /// Gives pages back after a failed compaction; records already moved
    /// stay where they are
    pub fn abort_compaction(&self, old_pages: BTreeSet<PageId>) {
        self.state.lock().owned.extend(old_pages);
    }

    /// Counts a record restored from disk as live
    pub fn adopt(&self, ptr: &RecordPtr) {
        self.state.lock().live_bytes += Self::stored_size(ptr);
    }

    pub fn owned_pages(&self) -> Vec<PageId> {
        self.state.lock().owned.iter().copied().collect()
    }

    pub fn stats(&self) -> HeapStats {
        let state = self.state.lock();
        let capacity_bytes = (state.owned.len() * self.capacity()) as u64;
        let garbage_ratio = if capacity_bytes == 0 {
            0.0
        } else {
            (1.0 - state.live_bytes as f64 / capacity_bytes as f64).clamp(0.0, 1.0)
        };
        HeapStats {
            pages: state.owned.len(),
            live_bytes: state.live_bytes,
            capacity_bytes,
            garbage_ratio,
        }
    }

    fn fresh_page(&self) -> TailPage {
        TailPage {
            id: self.pager.allocate(),
            buf: vec![0u8; self.pager.page_size()],
            used: 0,
        }
    }

    fn flush(&self, tail: &mut TailPage, next: Option<PageId>) -> Result<()> {
        let header = PageHeader { kind: PageKind::Heap, next, used: tail.used as u32 };
        header.write(&mut tail.buf);
        self.pager.write(tail.id, tail.buf.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryBackend;

    fn heap() -> RecordHeap {
        let pager = Pager::new(Box::new(MemoryBackend::new()), 512, 16, 1, Vec::new()).unwrap();
        RecordHeap::new(Arc::new(pager))
    }

    #[test]
    fn small_records_share_a_page() {
        let heap = heap();
        let a = heap.append(b"first").unwrap();
        let b = heap.append(b"second").unwrap();
        assert_eq!(a.page, b.page);
        assert_eq!(heap.read(a).unwrap(), b"first");
        assert_eq!(heap.read(b).unwrap(), b"second");
    }

    #[test]
    fn large_records_span_pages() {
        let heap = heap();
        let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let ptr = heap.append(&payload).unwrap();
        assert!(heap.stats().pages >= 6);
        assert_eq!(heap.read(ptr).unwrap(), payload);
    }

    #[test]
    fn sealing_starts_a_new_page() {
        let heap = heap();
        let a = heap.append(b"x").unwrap();
        heap.seal();
        let b = heap.append(b"y").unwrap();
        assert_ne!(a.page, b.page);
    }

    #[test]
    fn release_grows_garbage() {
        let heap = heap();
        let ptr = heap.append(&[1u8; 400]).unwrap();
        let before = heap.stats().garbage_ratio;
        heap.release(ptr);
        assert!(heap.stats().garbage_ratio > before);
        assert_eq!(heap.stats().live_bytes, 0);
    }

    #[test]
    fn compaction_hands_back_old_pages() {
        let heap = heap();
        let ptr = heap.append(&[9u8; 700]).unwrap();
        let payload = heap.read(ptr).unwrap();
        let old = heap.begin_compaction();
        let moved = heap.append(&payload).unwrap();
        heap.finish_compaction(old.clone());
        assert!(!old.contains(&moved.page));
        assert_eq!(heap.read(moved).unwrap(), payload);
    }

    #[test]
    fn record_pages_follow_the_chain() {
        let heap = heap();
        let ptr = heap.append(&[3u8; 1200]).unwrap();
        let pages = heap.record_pages(ptr).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], ptr.page);
        assert_eq!(pages.iter().collect::<BTreeSet<_>>().len(), 3);
    }
}
