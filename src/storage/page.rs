use std::fmt;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};

/// Page number inside the backing medium; page 0 is the database header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub u64);

impl PageId {
    pub const HEADER: PageId = PageId(0);

    pub fn new(id: u64) -> Self {
        PageId(id)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "page#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageKind {
    Header = 1,
    Heap = 2,
}

impl PageKind {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            1 => Ok(PageKind::Header),
            2 => Ok(PageKind::Heap),
            other => Err(Error::corrupt(format!("unknown page kind {}", other))),
        }
    }
}

// [ crc32 u32 | kind u8 | reserved 3 | next u64 | used u32 ] [ payload ... ]
pub const PAGE_HEADER_SIZE: usize = 20;
const NO_NEXT: u64 = u64::MAX;

/// Checksum covers everything after the crc field
pub fn stamp_checksum(page: &mut [u8]) {
    let crc = crc32fast::hash(&page[4..]);
    page[0..4].copy_from_slice(&crc.to_le_bytes());
}

pub fn verify_checksum(id: PageId, page: &[u8]) -> Result<()> {
    let stored = u32::from_le_bytes([page[0], page[1], page[2], page[3]]);
    let actual = crc32fast::hash(&page[4..]);
    if stored != actual {
        return Err(Error::corrupt(format!(
            "checksum mismatch on {} (stored {:#010x}, computed {:#010x})",
            id, stored, actual
        )));
    }
    Ok(())
}

/// Decoded page header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub kind: PageKind,
    pub next: Option<PageId>,
    pub used: u32,
}

impl PageHeader {
    pub fn new(kind: PageKind) -> Self {
        PageHeader { kind, next: None, used: 0 }
    }

    pub fn read(page: &[u8]) -> Result<Self> {
        let kind = PageKind::from_byte(page[4])?;
        let next = u64::from_le_bytes(page[8..16].try_into().map_err(|_| Error::corrupt("short page"))?);
        let used = u32::from_le_bytes(page[16..20].try_into().map_err(|_| Error::corrupt("short page"))?);
        Ok(PageHeader {
            kind,
            next: if next == NO_NEXT { None } else { Some(PageId(next)) },
            used,
        })
    }

    pub fn write(&self, page: &mut [u8]) {
        page[4] = self.kind as u8;
        page[5..8].fill(0);
        let next = self.next.map(|p| p.0).unwrap_or(NO_NEXT);
        page[8..16].copy_from_slice(&next.to_le_bytes());
        page[16..20].copy_from_slice(&self.used.to_le_bytes());
    }
}

pub const MAGIC: &[u8; 8] = b"EMBRDB01";
pub const FORMAT_VERSION: u32 = 1;

/// Contents of page 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseHeader {
    pub version: u32,
    pub page_size: u32,
    pub page_count: u64,
    pub catalog: Option<RecordPtr>,
    pub generation: u64,
}

impl DatabaseHeader {
    pub fn new(page_size: u32) -> Self {
        DatabaseHeader {
            version: FORMAT_VERSION,
            page_size,
            page_count: 1,
            catalog: None,
            generation: 0,
        }
    }

    // payload: magic[8] version u32 page_size u32 page_count u64
    //          catalog_page u64 catalog_offset u32 catalog_len u32 generation u64
    pub fn encode(&self, page_size: usize) -> Vec<u8> {
        let mut page = vec![0u8; page_size];
        PageHeader::new(PageKind::Header).write(&mut page);
        let mut at = PAGE_HEADER_SIZE;
        let mut put = |bytes: &[u8]| {
            page[at..at + bytes.len()].copy_from_slice(bytes);
            at += bytes.len();
        };
        put(MAGIC);
        put(&self.version.to_le_bytes());
        put(&self.page_size.to_le_bytes());
        put(&self.page_count.to_le_bytes());
        let catalog = self.catalog.unwrap_or(RecordPtr { page: PageId(NO_NEXT), offset: 0, len: 0 });
        put(&catalog.page.0.to_le_bytes());
        put(&catalog.offset.to_le_bytes());
        put(&catalog.len.to_le_bytes());
        put(&self.generation.to_le_bytes());
        page
    }

    pub fn decode(page: &[u8]) -> Result<Self> {
        if page.len() < PAGE_HEADER_SIZE + 48 {
            return Err(Error::corrupt("header page too short"));
        }
        let header = PageHeader::read(page)?;
        if header.kind != PageKind::Header {
            return Err(Error::corrupt("page 0 is not a header page"));
        }
        let body = &page[PAGE_HEADER_SIZE..];
        if &body[0..8] != MAGIC {
            return Err(Error::corrupt("bad magic, not a database file"));
        }
        let u32_at = |at: usize| u32::from_le_bytes([body[at], body[at + 1], body[at + 2], body[at + 3]]);
        let u64_at = |at: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&body[at..at + 8]);
            u64::from_le_bytes(buf)
        };

        let version = u32_at(8);
        if version != FORMAT_VERSION {
            return Err(Error::corrupt(format!("unsupported format version {}", version)));
        }
        let catalog_page = u64_at(24);
        Ok(DatabaseHeader {
            version,
            page_size: u32_at(12),
            page_count: u64_at(16),
            catalog: if catalog_page == NO_NEXT {
                None
            } else {
                Some(RecordPtr { page: PageId(catalog_page), offset: u32_at(32), len: u32_at(36) })
            },
            generation: u64_at(40),
        })
    }
}

/// Location of a record in the heap: first page, offset in that page's
/// payload area, and payload length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordPtr {
    pub page: PageId,
    pub offset: u32,
    pub len: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let mut header = DatabaseHeader::new(4096);
        header.page_count = 17;
        header.generation = 3;
        header.catalog = Some(RecordPtr { page: PageId(9), offset: 120, len: 4000 });

        let mut page = header.encode(4096);
        stamp_checksum(&mut page);
        verify_checksum(PageId::HEADER, &page).unwrap();
        assert_eq!(DatabaseHeader::decode(&page).unwrap(), header);
    }

    #[test]
    fn checksum_detects_flipped_bits() {
        let mut page = vec![0u8; 512];
        PageHeader::new(PageKind::Heap).write(&mut page);
        stamp_checksum(&mut page);
        page[300] ^= 0x40;
        assert!(verify_checksum(PageId(4), &page).is_err());
    }

    #[test]
    fn rejects_foreign_files() {
        let mut page = vec![0u8; 512];
        PageHeader::new(PageKind::Header).write(&mut page);
        page[PAGE_HEADER_SIZE..PAGE_HEADER_SIZE + 8].copy_from_slice(b"NOTADB!!");
        assert!(DatabaseHeader::decode(&page).is_err());
    }
}
