use rayon::prelude::*;
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{Document, DocumentId};
use crate::index::key::IndexKey;
use crate::index::secondary::{IndexDefinition, SecondaryIndex};

/// Keys computed for one document, one list per index, in index order
pub type PreparedKeys = Vec<Vec<IndexKey>>;

/// Old and new keys per index for a replacement
pub type PreparedUpdate = Vec<(Vec<IndexKey>, Vec<IndexKey>)>;

#[derive(Debug, Clone, PartialEq)]
pub struct IndexInfo {
    pub definition: IndexDefinition,
    pub keys: usize,
    pub entries: usize,
}

/// All secondary indexes of one collection, kept in creation order.
/// Mutations are split into a fallible `prepare_*` step that validates
/// uniqueness and an infallible `apply_*` step.
#[derive(Default)]
pub struct IndexManager {
    indexes: Vec<SecondaryIndex>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indexes(&self) -> &[SecondaryIndex] {
        &self.indexes
    }

    pub fn get(&self, name: &str) -> Option<&SecondaryIndex> {
        self.indexes.iter().find(|i| i.name() == name)
    }

    pub fn definitions(&self) -> Vec<IndexDefinition> {
        self.indexes.iter().map(|i| i.definition.clone()).collect()
    }

    pub fn list(&self) -> Vec<IndexInfo> {
        self.indexes
            .iter()
            .map(|i| IndexInfo {
                definition: i.definition.clone(),
                keys: i.key_count(),
                entries: i.entry_count(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Builds a new index over `docs`. Returns the name of the index that
    /// now serves these keys, which is the existing one when an identical
    /// definition is already present.
    pub fn create(&mut self, definition: IndexDefinition, docs: &[(DocumentId, Document)]) -> Result<String> {
        if let Some(existing) = self.get(&definition.name) {
            if existing.definition.same_keys(&definition) {
                return Ok(existing.name().to_string());
            }
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("index '{}' already exists with different keys", definition.name),
            ));
        }
        if let Some(existing) = self.indexes.iter().find(|i| i.definition.same_keys(&definition)) {
            return Ok(existing.name().to_string());
        }

        let mut index = SecondaryIndex::new(definition)?;
        let keyed: Vec<(&DocumentId, Vec<IndexKey>)> = docs
            .par_iter()
            .map(|(id, doc)| (id, index.keys_for(&doc.fields)))
            .collect();
        for (id, keys) in keyed {
            index.check(id, &keys)?;
            index.add(id, keys);
        }

        debug!(index = index.name(), keys = index.key_count(), "built index");
        let name = index.name().to_string();
        self.indexes.push(index);
        Ok(name)
    }

    /// Re-registers an index from the catalog; entries are rebuilt by the caller
    pub fn restore(&mut self, definition: IndexDefinition) -> Result<()> {
        self.indexes.push(SecondaryIndex::new(definition)?);
        Ok(())
    }

    pub fn drop_index(&mut self, name: &str) -> Result<IndexDefinition> {
        let position = self
            .indexes
            .iter()
            .position(|i| i.name() == name)
            .ok_or_else(|| Error::new(ErrorKind::InvalidArgument, format!("index '{}' not found", name)))?;
        Ok(self.indexes.remove(position).definition)
    }

    pub fn drop_all(&mut self) -> usize {
        let dropped = self.indexes.len();
        self.indexes.clear();
        dropped
    }

    pub fn prepare_insert(&self, id: &DocumentId, doc: &Document) -> Result<PreparedKeys> {
        let mut prepared = Vec::with_capacity(self.indexes.len());
        for index in &self.indexes {
            let keys = index.keys_for(&doc.fields);
            index.check(id, &keys)?;
            prepared.push(keys);
        }
        Ok(prepared)
    }

    pub fn apply_insert(&mut self, id: &DocumentId, prepared: PreparedKeys) {
        for (index, keys) in self.indexes.iter_mut().zip(prepared) {
            index.add(id, keys);
        }
    }

    pub fn prepare_update(&self, id: &DocumentId, old: &Document, new: &Document) -> Result<PreparedUpdate> {
        let mut prepared = Vec::with_capacity(self.indexes.len());
        for index in &self.indexes {
            let old_keys = index.keys_for(&old.fields);
            let new_keys = index.keys_for(&new.fields);
            index.check(id, &new_keys)?;
            prepared.push((old_keys, new_keys));
        }
        Ok(prepared)
    }

    pub fn apply_update(&mut self, id: &DocumentId, prepared: PreparedUpdate) {
        for (index, (old_keys, new_keys)) in self.indexes.iter_mut().zip(prepared) {
            let stale: Vec<IndexKey> = old_keys.into_iter().filter(|k| !new_keys.contains(k)).collect();
            index.remove(id, &stale);
            index.add(id, new_keys);
        }
    }

    /// Undoes an `apply_update` made with the same prepared keys
    pub fn revert_update(&mut self, id: &DocumentId, prepared: PreparedUpdate) {
        for (index, (old_keys, new_keys)) in self.indexes.iter_mut().zip(prepared) {
            let added: Vec<IndexKey> = new_keys.into_iter().filter(|k| !old_keys.contains(k)).collect();
            index.remove(id, &added);
            index.add(id, old_keys);
        }
    }

    pub fn on_delete(&mut self, id: &DocumentId, doc: &Document) {
        for index in &mut self.indexes {
            let keys = index.keys_for(&doc.fields);
            index.remove(id, &keys);
        }
    }

    /// Rebuilds every index's entries from `docs`
    pub fn rebuild(&mut self, docs: &[(DocumentId, Document)]) -> Result<()> {
        for index in &mut self.indexes {
            index.clear();
            let keyed: Vec<(&DocumentId, Vec<IndexKey>)> = docs
                .par_iter()
                .map(|(id, doc)| (id, index.keys_for(&doc.fields)))
                .collect();
            for (id, keys) in keyed {
                index.check(id, &keys).map_err(|e| {
                    Error::corrupt(format!("stored documents violate index '{}': {}", index.name(), e.context))
                })?;
                index.add(id, keys);
            }
        }
        Ok(())
    }
}
