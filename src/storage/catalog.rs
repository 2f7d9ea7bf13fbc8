use serde::{Deserialize, Serialize};
use crate::compression::delta::DeltaCodebook;
use crate::core::error::{Error, Result};
use crate::core::types::DocumentId;
use crate::index::secondary::IndexDefinition;
use crate::storage::page::{PageId, RecordPtr};
use crate::vector::config::VectorConfig;

const CATALOG_VERSION: u8 = 1;

/// Root of everything persisted, written as one heap record per sync and
/// referenced from the header page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub generation: u64,
    pub heap_pages: Vec<PageId>,  // owned before the catalog record itself was appended
    pub collections: Vec<CollectionCatalog>,
    pub vector_collections: Vec<VectorCollectionCatalog>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionCatalog {
    pub name: String,
    pub next_seq: u64,
    pub documents: Vec<DocumentEntry>,  // insertion order
    pub indexes: Vec<IndexDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: DocumentId,
    pub seq: u64,
    pub record: RecordPtr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorCollectionCatalog {
    pub name: String,
    pub config: VectorConfig,
    pub next_id: u64,
    pub codebook: Option<DeltaCodebook>,
    pub entries: Vec<VectorEntryRecord>,
    pub graph: Option<RecordPtr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorEntryRecord {
    pub id: u64,
    pub payload: Option<RecordPtr>,   // vector body, absent while a text awaits embedding
    pub text: Option<RecordPtr>,
    pub metadata: Option<RecordPtr>,
}

impl Catalog {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = vec![CATALOG_VERSION];
        out.extend_from_slice(&bincode::serialize(self)?);
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        match bytes.split_first() {
            Some((&CATALOG_VERSION, body)) => Ok(bincode::deserialize(body)?),
            Some((version, _)) => Err(Error::corrupt(format!("unsupported catalog version {}", version))),
            None => Err(Error::corrupt("empty catalog record")),
        }
    }
}
