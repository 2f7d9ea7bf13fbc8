use std::collections::{BTreeMap, BTreeSet};
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::path::FieldPath;
use crate::core::types::DocumentId;
use crate::core::value::Value;
use crate::index::key::{IndexKey, KeyPart, KeyValue};
use crate::query::types::SortOrder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub path: String,
    pub order: SortOrder,
}

impl IndexField {
    pub fn asc(path: &str) -> Self {
        IndexField { path: path.to_string(), order: SortOrder::Asc }
    }

    pub fn desc(path: &str) -> Self {
        IndexField { path: path.to_string(), order: SortOrder::Desc }
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    pub unique: bool,
    pub name: Option<String>,
}

impl IndexOptions {
    pub fn unique() -> Self {
        IndexOptions { unique: true, name: None }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
}

/// Persisted description of an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<IndexField>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(fields: Vec<IndexField>, options: &IndexOptions) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::new(ErrorKind::InvalidArgument, "index needs at least one field".to_string()));
        }
        for (i, field) in fields.iter().enumerate() {
            FieldPath::parse(&field.path)
                .map_err(|e| Error::new(ErrorKind::InvalidArgument, e.context))?;
            if fields[..i].iter().any(|f| f.path == field.path) {
                return Err(Error::new(
                    ErrorKind::InvalidArgument,
                    format!("field '{}' appears twice in the index", field.path),
                ));
            }
        }
        let name = match &options.name {
            Some(name) if name.is_empty() => {
                return Err(Error::new(ErrorKind::InvalidArgument, "index name is empty".to_string()));
            }
            Some(name) => name.clone(),
            None => Self::default_name(&fields),
        };
        Ok(IndexDefinition { name, fields, unique: options.unique })
    }

    /// `age_1`, `name_1_age_-1`
    pub fn default_name(fields: &[IndexField]) -> String {
        fields
            .iter()
            .map(|f| format!("{}_{}", f.path, f.order.direction()))
            .collect::<Vec<_>>()
            .join("_")
    }

    pub fn same_keys(&self, other: &IndexDefinition) -> bool {
        self.fields == other.fields && self.unique == other.unique
    }
}

/// Ordered secondary index: key -> ids of the documents projecting to it
pub struct SecondaryIndex {
    pub definition: IndexDefinition,
    paths: Vec<FieldPath>,
    directions: Vec<bool>,
    entries: BTreeMap<IndexKey, BTreeSet<DocumentId>>,
    entry_count: usize,
    // per field: some document has held more than one key value there
    multikey: Vec<bool>,
}

impl SecondaryIndex {
    pub fn new(definition: IndexDefinition) -> Result<Self> {
        let paths = definition
            .fields
            .iter()
            .map(|f| FieldPath::parse(&f.path))
            .collect::<Result<Vec<_>>>()?;
        let directions = definition.fields.iter().map(|f| f.order == SortOrder::Desc).collect();
        let multikey = vec![false; definition.fields.len()];
        Ok(SecondaryIndex {
            definition,
            paths,
            directions,
            entries: BTreeMap::new(),
            entry_count: 0,
            multikey,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn is_unique(&self) -> bool {
        self.definition.unique
    }

    pub fn paths(&self) -> &[FieldPath] {
        &self.paths
    }

    pub fn directions(&self) -> &[bool] {
        &self.directions
    }

    /// Whether one document may hold several keys at field `position`.
    /// Stays set until the index is cleared.
    pub fn is_multikey(&self, position: usize) -> bool {
        self.multikey.get(position).copied().unwrap_or(false)
    }

    /// Distinct keys a document projects to. Arrays contribute one key per
    /// element (an empty array indexes as itself); compound indexes take the
    /// cartesian product; a missing field yields the absent key.
    pub fn keys_for(&self, fields: &BTreeMap<String, Value>) -> Vec<IndexKey> {
        let mut keys: Vec<Vec<KeyPart>> = vec![Vec::new()];
        for (path, descending) in self.paths.iter().zip(&self.directions) {
            let values = project(path, fields);
            let mut next = Vec::with_capacity(keys.len() * values.len());
            for prefix in &keys {
                for value in &values {
                    let mut key = prefix.clone();
                    key.push(KeyPart::new(value.clone(), *descending));
                    next.push(key);
                }
            }
            keys = next;
        }
        let mut keys: Vec<IndexKey> = keys.into_iter().map(IndexKey).collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Fails with `DuplicateKey` if a unique key already belongs to another document
    pub fn check(&self, id: &DocumentId, keys: &[IndexKey]) -> Result<()> {
        if !self.definition.unique {
            return Ok(());
        }
        for key in keys {
            if let Some(owners) = self.entries.get(key) {
                if owners.iter().any(|owner| owner != id) {
                    return Err(Error::new(
                        ErrorKind::DuplicateKey,
                        format!("duplicate key {} in unique index '{}'", describe(key), self.definition.name),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn add(&mut self, id: &DocumentId, keys: Vec<IndexKey>) {
        if let Some((first, rest)) = keys.split_first() {
            for (position, flag) in self.multikey.iter_mut().enumerate() {
                if !*flag {
                    *flag = rest.iter().any(|k| k.parts()[position] != first.parts()[position]);
                }
            }
        }
        for key in keys {
            if self.entries.entry(key).or_default().insert(id.clone()) {
                self.entry_count += 1;
            }
        }
    }

    pub fn remove(&mut self, id: &DocumentId, keys: &[IndexKey]) {
        for key in keys {
            if let Some(owners) = self.entries.get_mut(key) {
                if owners.remove(id) {
                    self.entry_count -= 1;
                }
                if owners.is_empty() {
                    self.entries.remove(key);
                }
            }
        }
    }

    /// Ids under keys within `[low, high]` (key order) accepted by `accept`
    pub fn scan<F>(&self, low: &IndexKey, high: &IndexKey, accept: F) -> BTreeSet<DocumentId>
    where
        F: Fn(&IndexKey) -> bool,
    {
        let mut ids = BTreeSet::new();
        if low > high {
            return ids;
        }
        for (key, owners) in self.entries.range(low.clone()..=high.clone()) {
            if accept(key) {
                ids.extend(owners.iter().cloned());
            }
        }
        ids
    }

    pub fn ids_for(&self, key: &IndexKey) -> Option<&BTreeSet<DocumentId>> {
        self.entries.get(key)
    }

    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.entry_count = 0;
        self.multikey.fill(false);
    }
}

fn project(path: &FieldPath, fields: &BTreeMap<String, Value>) -> Vec<KeyValue> {
    let resolved = path.resolve(fields);
    if resolved.is_empty() {
        return vec![KeyValue::Absent];
    }
    let mut out = Vec::new();
    for value in resolved {
        match value {
            Value::Array(items) if !items.is_empty() => {
                out.extend(items.iter().map(|item| KeyValue::Value(item.clone())));
            }
            other => out.push(KeyValue::Value(other.clone())),
        }
    }
    out
}

fn describe(key: &IndexKey) -> String {
    let parts: Vec<String> = key
        .parts()
        .iter()
        .map(|p| match &p.value {
            KeyValue::Value(v) => v.to_json().to_string(),
            KeyValue::Absent => "<absent>".to_string(),
            KeyValue::MinKey => "<min>".to_string(),
            KeyValue::MaxKey => "<max>".to_string(),
        })
        .collect();
    format!("({})", parts.join(", "))
}
