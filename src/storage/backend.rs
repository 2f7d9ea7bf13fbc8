use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use crate::core::error::{Error, Result};
use crate::storage::page::PageId;

/// Raw page I/O beneath the cache
pub trait PageBackend: Send {
    fn read_page(&mut self, id: PageId, buf: &mut [u8]) -> Result<()>;
    fn write_page(&mut self, id: PageId, data: &[u8]) -> Result<()>;
    fn sync(&mut self) -> Result<()>;

    /// Pages physically present in the medium
    fn len_pages(&self) -> u64;

    /// Hint that a page's contents are no longer referenced
    fn discard(&mut self, _id: PageId) {}

    fn is_durable(&self) -> bool;
}

pub struct FileBackend {
    file: File,
    page_size: usize,
    len_pages: u64,
}

impl FileBackend {
    pub fn create(path: &Path, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(FileBackend { file, page_size, len_pages: 0 })
    }

    pub fn open(path: &Path, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(FileBackend {
            file,
            page_size,
            len_pages: len / page_size as u64,
        })
    }

    /// Reads the fixed prefix of page 0 before the page size is known
    pub fn read_prefix(path: &Path, len: usize) -> Result<Vec<u8>> {
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)
            .map_err(|e| Error::corrupt(format!("database header unreadable: {}", e)))?;
        Ok(buf)
    }
}

impl PageBackend for FileBackend {
    fn read_page(&mut self, id: PageId, buf: &mut [u8]) -> Result<()> {
        if id.0 >= self.len_pages {
            return Err(Error::corrupt(format!("{} is beyond the end of the file", id)));
        }
        self.file.seek(SeekFrom::Start(id.0 * self.page_size as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&mut self, id: PageId, data: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(id.0 * self.page_size as u64))?;
        self.file.write_all(data)?;
        self.len_pages = self.len_pages.max(id.0 + 1);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    fn len_pages(&self) -> u64 {
        self.len_pages
    }

    fn is_durable(&self) -> bool {
        true
    }
}

/// Pages kept on the heap; nothing survives the handle
#[derive(Default)]
pub struct MemoryBackend {
    pages: HashMap<PageId, Box<[u8]>>,
    high_water: u64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageBackend for MemoryBackend {
    fn read_page(&mut self, id: PageId, buf: &mut [u8]) -> Result<()> {
        let page = self
            .pages
            .get(&id)
            .ok_or_else(|| Error::corrupt(format!("{} was never written", id)))?;
        buf.copy_from_slice(page);
        Ok(())
    }

    fn write_page(&mut self, id: PageId, data: &[u8]) -> Result<()> {
        self.pages.insert(id, data.to_vec().into_boxed_slice());
        self.high_water = self.high_water.max(id.0 + 1);
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn len_pages(&self) -> u64 {
        self.high_water
    }

    fn discard(&mut self, id: PageId) {
        self.pages.remove(&id);
    }

    fn is_durable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_backend_reads_back_pages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages.db");
        let mut backend = FileBackend::create(&path, 512).unwrap();
        backend.write_page(PageId(2), &[7u8; 512]).unwrap();
        backend.sync().unwrap();
        assert_eq!(backend.len_pages(), 3);

        let mut reopened = FileBackend::open(&path, 512).unwrap();
        let mut buf = vec![0u8; 512];
        reopened.read_page(PageId(2), &mut buf).unwrap();
        assert!(buf.iter().all(|b| *b == 7));
        assert!(reopened.read_page(PageId(3), &mut buf).is_err());
    }

    #[test]
    fn memory_backend_discards() {
        let mut backend = MemoryBackend::new();
        backend.write_page(PageId(1), &[1u8; 512]).unwrap();
        backend.discard(PageId(1));
        let mut buf = vec![0u8; 512];
        assert!(backend.read_page(PageId(1), &mut buf).is_err());
    }
}
