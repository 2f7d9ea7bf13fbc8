use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use crate::codec::document::{decode_document, encode_document};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::stats::CollectionStats;
use crate::core::types::{Document, DocumentId, ID_FIELD};
use crate::core::value::Value;
use crate::index::{IndexDefinition, IndexInfo, IndexManager, PreparedUpdate};
use crate::query::ast::Query;
use crate::query::planner::{ExecutionPlan, QueryPlanner};
use crate::query::types::{FindOptions, SortOrder};
use crate::storage::catalog::{CollectionCatalog, DocumentEntry};
use crate::storage::heap::RecordHeap;
use crate::storage::page::RecordPtr;
use crate::update::{UpdateEngine, UpdateExpression};

#[derive(Debug, Clone, Copy)]
struct Slot {
    seq: u64,
    record: RecordPtr,
}

/// Named set of documents. Documents live in the record heap; the
/// collection keeps `_id -> record` plus insertion order in memory and
/// keeps every secondary index in step with each mutation.
pub struct Collection {
    name: String,
    heap: Arc<RecordHeap>,
    by_id: HashMap<DocumentId, Slot>,
    order: BTreeMap<u64, DocumentId>,
    next_seq: u64,
    indexes: IndexManager,
}

impl Collection {
    pub fn new(name: &str, heap: Arc<RecordHeap>) -> Self {
        Collection {
            name: name.to_string(),
            heap,
            by_id: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            indexes: IndexManager::new(),
        }
    }

    /// Reloads a collection from its catalog entry and rebuilds its indexes
    pub fn restore(catalog: CollectionCatalog, heap: Arc<RecordHeap>) -> Result<Self> {
        let mut collection = Collection::new(&catalog.name, heap);
        collection.next_seq = catalog.next_seq;
        for entry in catalog.documents {
            collection.heap.adopt(&entry.record);
            collection.order.insert(entry.seq, entry.id.clone());
            let slot = Slot { seq: entry.seq, record: entry.record };
            if collection.by_id.insert(entry.id.clone(), slot).is_some() {
                return Err(Error::corrupt(format!("collection '{}' lists {} twice", catalog.name, entry.id)));
            }
        }

        if !catalog.indexes.is_empty() {
            for definition in catalog.indexes {
                collection.indexes.restore(definition)?;
            }
            let docs = collection.documents()?;
            collection.indexes.rebuild(&docs)?;
        }
        debug!(collection = %collection.name, documents = collection.len(), "restored collection");
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn indexes(&self) -> &IndexManager {
        &self.indexes
    }

    fn load(&self, slot: &Slot) -> Result<Document> {
        decode_document(&self.heap.read(slot.record)?)
    }

    fn missing(&self, id: &DocumentId) -> Error {
        Error::new(
            ErrorKind::DocumentNotFound,
            format!("document {} not found in '{}'", id, self.name),
        )
    }

    pub fn find_by_id(&self, id: &DocumentId) -> Result<Option<Document>> {
        self.by_id.get(id).map(|slot| self.load(slot)).transpose()
    }

    /// Every document in insertion order
    pub fn documents(&self) -> Result<Vec<(DocumentId, Document)>> {
        self.order
            .values()
            .map(|id| {
                let slot = self.by_id.get(id).ok_or_else(|| self.missing(id))?;
                Ok((id.clone(), self.load(slot)?))
            })
            .collect()
    }

    /// Takes the `_id` from the document, or generates and stores one
    fn assign_id(doc: &mut Document) -> Result<DocumentId> {
        match doc.get_field(ID_FIELD) {
            Some(value) => DocumentId::from_value(value),
            None => {
                let id = DocumentId::generate();
                doc.set_id(&id);
                Ok(id)
            }
        }
    }

    fn duplicate(&self, id: &DocumentId) -> Error {
        Error::new(
            ErrorKind::DuplicateKey,
            format!("document {} already exists in '{}'", id, self.name),
        )
    }

    fn push(&mut self, id: DocumentId, record: RecordPtr) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, id.clone());
        self.by_id.insert(id, Slot { seq, record });
    }

    pub fn insert(&mut self, mut doc: Document) -> Result<DocumentId> {
        let id = Self::assign_id(&mut doc)?;
        if self.by_id.contains_key(&id) {
            return Err(self.duplicate(&id));
        }
        let prepared = self.indexes.prepare_insert(&id, &doc)?;
        let record = self.heap.append(&encode_document(&doc))?;
        self.indexes.apply_insert(&id, prepared);
        self.push(id.clone(), record);
        Ok(id)
    }

    /// All-or-nothing batch insert. Ids and unique keys are checked for the
    /// whole batch, the batch included, before any document becomes visible.
    pub fn insert_many(&mut self, docs: Vec<Document>) -> Result<Vec<DocumentId>> {
        let mut batch = Vec::with_capacity(docs.len());
        let mut seen = HashSet::with_capacity(docs.len());
        for mut doc in docs {
            let id = Self::assign_id(&mut doc)?;
            if self.by_id.contains_key(&id) || !seen.insert(id.clone()) {
                return Err(self.duplicate(&id));
            }
            batch.push((id, doc));
        }

        for (applied, (id, doc)) in batch.iter().enumerate() {
            match self.indexes.prepare_insert(id, doc) {
                Ok(prepared) => self.indexes.apply_insert(id, prepared),
                Err(e) => {
                    for (id, doc) in &batch[..applied] {
                        self.indexes.on_delete(id, doc);
                    }
                    return Err(e);
                }
            }
        }

        let mut records = Vec::with_capacity(batch.len());
        for (_, doc) in &batch {
            match self.heap.append(&encode_document(doc)) {
                Ok(record) => records.push(record),
                Err(e) => {
                    for record in records {
                        self.heap.release(record);
                    }
                    for (id, doc) in &batch {
                        self.indexes.on_delete(id, doc);
                    }
                    return Err(e);
                }
            }
        }

        let ids: Vec<DocumentId> = batch.iter().map(|(id, _)| id.clone()).collect();
        for (id, record) in ids.iter().zip(records) {
            self.push(id.clone(), record);
        }
        Ok(ids)
    }

    /// Writes `new` in place of `old`: index diff first, then the record
    fn rewrite(&mut self, id: &DocumentId, old: &Document, new: &Document) -> Result<()> {
        let prepared = self.indexes.prepare_update(id, old, new)?;
        let record = self.heap.append(&encode_document(new))?;
        self.indexes.apply_update(id, prepared);
        if let Some(slot) = self.by_id.get_mut(id) {
            let stale = std::mem::replace(&mut slot.record, record);
            self.heap.release(stale);
        }
        Ok(())
    }

    /// Replaces the whole document; the stored `_id` is kept
    pub fn replace(&mut self, id: &DocumentId, replacement: Document) -> Result<()> {
        let slot = *self.by_id.get(id).ok_or_else(|| self.missing(id))?;
        let old = self.load(&slot)?;
        let new = UpdateEngine::replace(&old, &replacement)?;
        self.rewrite(id, &old, &new)
    }

    /// Applies an update to one document. Returns whether it changed.
    pub fn update_by_id(&mut self, id: &DocumentId, update: &UpdateExpression) -> Result<bool> {
        let slot = *self.by_id.get(id).ok_or_else(|| self.missing(id))?;
        let old = self.load(&slot)?;
        let new = update.apply(&old)?;
        if new == old {
            return Ok(false);
        }
        self.rewrite(id, &old, &new)?;
        Ok(true)
    }

    /// Applies an update to every match, all or nothing. New contents are
    /// computed for all matches, then index entries move for the whole batch
    /// (conflicts inside the batch included) before any record is written.
    pub fn update_many(&mut self, query: &Query, update: &UpdateExpression) -> Result<usize> {
        let mut changes = Vec::new();
        for (id, old) in self.matching(query)? {
            let new = update.apply(&old)?;
            if new != old {
                changes.push((id, old, new));
            }
        }

        let mut applied: Vec<(&DocumentId, PreparedUpdate)> = Vec::with_capacity(changes.len());
        for (id, old, new) in &changes {
            match self.indexes.prepare_update(id, old, new) {
                Ok(prepared) => {
                    self.indexes.apply_update(id, prepared.clone());
                    applied.push((id, prepared));
                }
                Err(e) => {
                    self.revert_index_updates(applied);
                    return Err(e);
                }
            }
        }

        let mut records = Vec::with_capacity(changes.len());
        for (_, _, new) in &changes {
            match self.heap.append(&encode_document(new)) {
                Ok(record) => records.push(record),
                Err(e) => {
                    for record in records {
                        self.heap.release(record);
                    }
                    self.revert_index_updates(applied);
                    return Err(e);
                }
            }
        }

        for ((id, _, _), record) in changes.iter().zip(records) {
            if let Some(slot) = self.by_id.get_mut(id) {
                let stale = std::mem::replace(&mut slot.record, record);
                self.heap.release(stale);
            }
        }
        Ok(changes.len())
    }

    fn revert_index_updates(&mut self, applied: Vec<(&DocumentId, PreparedUpdate)>) {
        for (id, prepared) in applied.into_iter().rev() {
            self.indexes.revert_update(id, prepared);
        }
    }

    pub fn delete(&mut self, id: &DocumentId) -> Result<()> {
        let slot = *self.by_id.get(id).ok_or_else(|| self.missing(id))?;
        let doc = self.load(&slot)?;
        self.remove(id, &slot, &doc);
        Ok(())
    }

    fn remove(&mut self, id: &DocumentId, slot: &Slot, doc: &Document) {
        self.indexes.on_delete(id, doc);
        self.by_id.remove(id);
        self.order.remove(&slot.seq);
        self.heap.release(slot.record);
    }

    pub fn delete_many(&mut self, query: &Query) -> Result<usize> {
        let matches = self.matching(query)?;
        for (id, doc) in &matches {
            if let Some(slot) = self.by_id.get(id).copied() {
                self.remove(id, &slot, doc);
            }
        }
        Ok(matches.len())
    }

    pub fn explain(&self, query: &Query) -> ExecutionPlan {
        QueryPlanner::plan(query, &self.indexes)
    }

    /// Ids that may match `query`, in insertion order
    pub fn candidate_ids(&self, query: &Query) -> Vec<DocumentId> {
        let plan = self.explain(query);
        debug!(collection = %self.name, plan = %plan, "query plan");
        let chosen: Vec<&DocumentId> = match &plan {
            ExecutionPlan::CollectionScan => return self.order.values().cloned().collect(),
            ExecutionPlan::IdLookup { ids } => ids.iter().collect(),
            ExecutionPlan::IndexScan { .. } => match QueryPlanner::index_candidates(&plan, &self.indexes) {
                Some(ids) => {
                    let mut slots: Vec<(u64, DocumentId)> = ids
                        .into_iter()
                        .filter_map(|id| self.by_id.get(&id).map(|slot| (slot.seq, id)))
                        .collect();
                    slots.sort_unstable_by_key(|(seq, _)| *seq);
                    return slots.into_iter().map(|(_, id)| id).collect();
                }
                None => return self.order.values().cloned().collect(),
            },
        };
        let mut slots: Vec<(u64, DocumentId)> = chosen
            .into_iter()
            .filter_map(|id| self.by_id.get(id).map(|slot| (slot.seq, id.clone())))
            .collect();
        slots.sort_unstable_by_key(|(seq, _)| *seq);
        slots.into_iter().map(|(_, id)| id).collect()
    }

    /// Loads `id` and returns it if it still exists and matches
    pub fn load_matching(&self, id: &DocumentId, query: &Query) -> Result<Option<Document>> {
        let Some(slot) = self.by_id.get(id) else {
            return Ok(None);
        };
        let doc = self.load(slot)?;
        Ok(query.matches(&doc).then_some(doc))
    }

    fn matching(&self, query: &Query) -> Result<Vec<(DocumentId, Document)>> {
        let mut out = Vec::new();
        for id in self.candidate_ids(query) {
            if let Some(doc) = self.load_matching(&id, query)? {
                out.push((id, doc));
            }
        }
        Ok(out)
    }

    pub fn matching_ids(&self, query: &Query) -> Result<Vec<DocumentId>> {
        Ok(self.matching(query)?.into_iter().map(|(id, _)| id).collect())
    }

    pub fn count_matching(&self, query: &Query) -> Result<usize> {
        if matches!(query, Query::MatchAll) {
            return Ok(self.len());
        }
        let mut count = 0;
        for id in self.candidate_ids(query) {
            if self.load_matching(&id, query)?.is_some() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Matches with sort, skip and limit applied. Without a sort, reading
    /// stops as soon as the limit is reached.
    pub fn find(&self, query: &Query, options: &FindOptions) -> Result<Vec<Document>> {
        let limit = options.limit.unwrap_or(usize::MAX);
        if options.sort.is_empty() {
            let mut out = Vec::new();
            let mut skipped = 0;
            for id in self.candidate_ids(query) {
                if out.len() >= limit {
                    break;
                }
                if let Some(doc) = self.load_matching(&id, query)? {
                    if skipped < options.skip {
                        skipped += 1;
                    } else {
                        out.push(doc);
                    }
                }
            }
            return Ok(out);
        }

        let mut docs: Vec<Document> = self.matching(query)?.into_iter().map(|(_, doc)| doc).collect();
        docs.sort_by(|a, b| compare_for_sort(a, b, options));
        Ok(docs.into_iter().skip(options.skip).take(limit).collect())
    }

    pub fn find_one(&self, query: &Query) -> Result<Option<Document>> {
        let options = FindOptions::new().limit(1);
        Ok(self.find(query, &options)?.into_iter().next())
    }

    pub fn create_index(&mut self, definition: IndexDefinition) -> Result<String> {
        let docs = self.documents()?;
        self.indexes.create(definition, &docs)
    }

    pub fn drop_index(&mut self, name: &str) -> Result<()> {
        self.indexes.drop_index(name).map(|_| ())
    }

    pub fn drop_all_indexes(&mut self) -> usize {
        self.indexes.drop_all()
    }

    pub fn list_indexes(&self) -> Vec<IndexInfo> {
        self.indexes.list()
    }

    /// Re-appends every document during compaction
    pub fn relocate(&mut self) -> Result<()> {
        for slot in self.by_id.values_mut() {
            let bytes = self.heap.read(slot.record)?;
            slot.record = self.heap.append(&bytes)?;
        }
        Ok(())
    }

    pub fn to_catalog(&self) -> CollectionCatalog {
        let documents = self
            .order
            .iter()
            .filter_map(|(seq, id)| {
                self.by_id.get(id).map(|slot| DocumentEntry { id: id.clone(), seq: *seq, record: slot.record })
            })
            .collect();
        CollectionCatalog {
            name: self.name.clone(),
            next_seq: self.next_seq,
            documents,
            indexes: self.indexes.definitions(),
        }
    }

    pub fn stats(&self) -> CollectionStats {
        CollectionStats {
            name: self.name.clone(),
            documents: self.len(),
            data_bytes: self.by_id.values().map(|slot| RecordHeap::stored_size(&slot.record)).sum(),
            indexes: self.indexes.list(),
        }
    }

    /// Releases every record; used when the collection is dropped
    pub fn release_all(&mut self) {
        for slot in self.by_id.values() {
            self.heap.release(slot.record);
        }
        self.by_id.clear();
        self.order.clear();
        self.indexes.drop_all();
    }
}

/// Orders by the first value each sort path resolves to; a missing value
/// sorts before any present one
fn compare_for_sort(a: &Document, b: &Document, options: &FindOptions) -> Ordering {
    for (path, order) in &options.sort {
        let left: Option<&Value> = path.resolve(&a.fields).into_iter().next();
        let right: Option<&Value> = path.resolve(&b.fields).into_iter().next();
        let ordering = match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(l), Some(r)) => l.canonical_cmp(r),
        };
        let ordering = match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexField, IndexOptions};
    use crate::query::parser::QueryParser;
    use crate::storage::backend::MemoryBackend;
    use crate::storage::pager::Pager;
    use serde_json::json;

    fn collection() -> Collection {
        let pager = Pager::new(Box::new(MemoryBackend::new()), 4096, 64, 1, Vec::new()).unwrap();
        Collection::new("people", Arc::new(RecordHeap::new(Arc::new(pager))))
    }

    fn doc(value: serde_json::Value) -> Document {
        Document::try_from(value).unwrap()
    }

    fn query(value: serde_json::Value) -> Query {
        QueryParser::parse_json(value).unwrap()
    }

    fn unique_email(c: &mut Collection) {
        let definition = IndexDefinition::new(vec![IndexField::asc("email")], &IndexOptions::unique()).unwrap();
        c.create_index(definition).unwrap();
    }

    #[test]
    fn insert_assigns_ids_and_rejects_duplicates() {
        let mut c = collection();
        let generated = c.insert(doc(json!({"name": "a"}))).unwrap();
        let stored = c.find_by_id(&generated).unwrap().unwrap();
        assert_eq!(stored.id(), Some(generated));

        c.insert(doc(json!({"_id": 7, "name": "b"}))).unwrap();
        let err = c.insert(doc(json!({"_id": 7, "name": "c"}))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateKey);
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn insert_many_is_all_or_nothing() {
        let mut c = collection();
        unique_email(&mut c);
        c.insert(doc(json!({"_id": 1, "email": "a@x"}))).unwrap();

        let batch = vec![
            doc(json!({"_id": 2, "email": "b@x"})),
            doc(json!({"_id": 3, "email": "c@x"})),
            doc(json!({"_id": 4, "email": "b@x"})),
        ];
        assert_eq!(c.insert_many(batch).unwrap_err().kind, ErrorKind::DuplicateKey);
        assert_eq!(c.len(), 1);
        assert_eq!(c.list_indexes()[0].entries, 1);

        let ids = c
            .insert_many(vec![doc(json!({"_id": 2, "email": "b@x"})), doc(json!({"_id": 3, "email": "c@x"}))])
            .unwrap();
        assert_eq!(ids, vec![DocumentId::Int(2), DocumentId::Int(3)]);
        assert_eq!(c.list_indexes()[0].entries, 3);
    }

    #[test]
    fn replace_keeps_indexes_in_step() {
        let mut c = collection();
        unique_email(&mut c);
        c.insert(doc(json!({"_id": 1, "email": "a@x"}))).unwrap();
        c.insert(doc(json!({"_id": 2, "email": "b@x"}))).unwrap();

        c.replace(&DocumentId::Int(1), doc(json!({"email": "z@x"}))).unwrap();
        assert_eq!(c.find(&query(json!({"email": "a@x"})), &FindOptions::new()).unwrap().len(), 0);
        assert_eq!(c.find_one(&query(json!({"email": "z@x"}))).unwrap().unwrap().id(), Some(DocumentId::Int(1)));

        let err = c.replace(&DocumentId::Int(2), doc(json!({"email": "z@x"}))).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DuplicateKey);
        assert_eq!(c.find_by_id(&DocumentId::Int(2)).unwrap().unwrap().get_field("email"), Some(&Value::from("b@x")));
        assert_eq!(c.replace(&DocumentId::Int(9), Document::new()).unwrap_err().kind, ErrorKind::DocumentNotFound);
    }

    #[test]
    fn updates_report_modification() {
        let mut c = collection();
        c.insert(doc(json!({"_id": 1, "n": 1}))).unwrap();
        c.insert(doc(json!({"_id": 2, "n": 5}))).unwrap();

        let set = UpdateExpression::parse_json(json!({"$set": {"n": 1}})).unwrap();
        assert!(!c.update_by_id(&DocumentId::Int(1), &set).unwrap());
        let inc = UpdateExpression::parse_json(json!({"$inc": {"n": 10}})).unwrap();
        assert_eq!(c.update_many(&query(json!({"n": {"$lt": 3}})), &inc).unwrap(), 1);
        assert_eq!(c.find_by_id(&DocumentId::Int(1)).unwrap().unwrap().get_field("n"), Some(&Value::Int(11)));

        let bad = UpdateExpression::parse_json(json!({"$push": {"n": 1}})).unwrap();
        assert!(c.update_many(&Query::MatchAll, &bad).is_err());
        assert_eq!(c.find_by_id(&DocumentId::Int(2)).unwrap().unwrap().get_field("n"), Some(&Value::Int(5)));
    }

    #[test]
    fn delete_cascades_to_indexes() {
        let mut c = collection();
        unique_email(&mut c);
        c.insert(doc(json!({"_id": 1, "email": "a@x"}))).unwrap();
        c.delete(&DocumentId::Int(1)).unwrap();
        assert_eq!(c.delete(&DocumentId::Int(1)).unwrap_err().kind, ErrorKind::DocumentNotFound);
        assert_eq!(c.list_indexes()[0].entries, 0);
        c.insert(doc(json!({"_id": 2, "email": "a@x"}))).unwrap();

        c.insert(doc(json!({"_id": 3, "email": "b@x", "tmp": true}))).unwrap();
        assert_eq!(c.delete_many(&query(json!({"tmp": true}))).unwrap(), 1);
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn find_sorts_skips_and_limits() {
        let mut c = collection();
        for (id, age) in [(1, json!(30)), (2, json!(25)), (3, json!(null)), (4, json!(25))] {
            c.insert(doc(json!({"_id": id, "age": age}))).unwrap();
        }
        c.insert(doc(json!({"_id": 5}))).unwrap();

        let options = FindOptions::new().sort_by("age", SortOrder::Asc).unwrap();
        let ids: Vec<DocumentId> = c
            .find(&Query::MatchAll, &options)
            .unwrap()
            .into_iter()
            .filter_map(|d| d.id())
            .collect();
        // missing before null, ties in insertion order
        assert_eq!(ids, vec![5, 3, 2, 4, 1].into_iter().map(DocumentId::Int).collect::<Vec<_>>());

        let options = FindOptions::new().sort_by("age", SortOrder::Desc).unwrap().skip(1).limit(2);
        let ids: Vec<DocumentId> = c.find(&Query::MatchAll, &options).unwrap().into_iter().filter_map(|d| d.id()).collect();
        assert_eq!(ids, vec![DocumentId::Int(2), DocumentId::Int(4)]);

        let unsorted = FindOptions::new().skip(1).limit(2);
        let ids: Vec<DocumentId> = c.find(&Query::MatchAll, &unsorted).unwrap().into_iter().filter_map(|d| d.id()).collect();
        assert_eq!(ids, vec![DocumentId::Int(2), DocumentId::Int(3)]);
    }

    #[test]
    fn index_plans_return_the_same_matches_as_scans() {
        let mut c = collection();
        for i in 0..50 {
            c.insert(doc(json!({"_id": i, "score": i % 10, "tags": [format!("t{}", i % 3)]}))).unwrap();
        }
        let filter = query(json!({"score": {"$gte": 3, "$lt": 5}, "tags": "t1"}));
        let scanned = c.find(&filter, &FindOptions::new()).unwrap();

        let definition = IndexDefinition::new(vec![IndexField::asc("score")], &IndexOptions::default()).unwrap();
        c.create_index(definition).unwrap();
        assert!(matches!(c.explain(&filter), ExecutionPlan::IndexScan { .. }));
        assert_eq!(c.find(&filter, &FindOptions::new()).unwrap(), scanned);
        assert_eq!(c.count_matching(&filter).unwrap(), scanned.len());
    }

    #[test]
    fn catalog_round_trip_rebuilds_indexes() {
        let mut c = collection();
        unique_email(&mut c);
        c.insert(doc(json!({"_id": 1, "email": "a@x"}))).unwrap();
        c.insert(doc(json!({"_id": 2, "email": "b@x"}))).unwrap();
        c.delete(&DocumentId::Int(1)).unwrap();

        let heap = Arc::clone(&c.heap);
        let restored = Collection::restore(c.to_catalog(), heap).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.list_indexes()[0].entries, 1);
        assert!(restored.find_by_id(&DocumentId::Int(2)).unwrap().is_some());
    }
}
