use std::sync::Arc;
use parking_lot::RwLock;
use crate::collection::collection::Collection;
use crate::core::error::Result;
use crate::core::types::{Document, DocumentId};
use crate::query::ast::Query;
use crate::query::types::FindOptions;

enum Source {
    /// Candidate ids in insertion order, loaded and filtered one at a time
    Lazy(Vec<DocumentId>),
    /// Sorted results, materialized up front
    Sorted(Vec<Document>),
}

/// Lazy, restartable sequence of matching documents. Each step takes the
/// collection read lock briefly, so writers are never blocked for the life
/// of the cursor; documents deleted after the cursor was opened are skipped.
pub struct Cursor {
    collection: Arc<RwLock<Collection>>,
    query: Query,
    options: FindOptions,
    source: Source,
    position: usize,
    skipped: usize,
    yielded: usize,
}

impl Cursor {
    pub fn new(collection: Arc<RwLock<Collection>>, query: Query, options: FindOptions) -> Result<Self> {
        let source = Self::snapshot(&collection, &query, &options)?;
        Ok(Cursor {
            collection,
            query,
            options,
            source,
            position: 0,
            skipped: 0,
            yielded: 0,
        })
    }

    fn snapshot(collection: &Arc<RwLock<Collection>>, query: &Query, options: &FindOptions) -> Result<Source> {
        let collection = collection.read();
        if options.sort.is_empty() {
            Ok(Source::Lazy(collection.candidate_ids(query)))
        } else {
            Ok(Source::Sorted(collection.find(query, options)?))
        }
    }

    /// Starts over against the collection's current contents
    pub fn rewind(&mut self) -> Result<()> {
        self.source = Self::snapshot(&self.collection, &self.query, &self.options)?;
        self.position = 0;
        self.skipped = 0;
        self.yielded = 0;
        Ok(())
    }

    fn next_lazy(&mut self) -> Result<Option<Document>> {
        let Source::Lazy(ids) = &self.source else {
            return Ok(None);
        };
        if self.options.limit.is_some_and(|limit| self.yielded >= limit) {
            return Ok(None);
        }
        let collection = self.collection.read();
        while let Some(id) = ids.get(self.position) {
            self.position += 1;
            let Some(doc) = collection.load_matching(id, &self.query)? else {
                continue;
            };
            if self.skipped < self.options.skip {
                self.skipped += 1;
                continue;
            }
            self.yielded += 1;
            return Ok(Some(doc));
        }
        Ok(None)
    }
}

impl Iterator for Cursor {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Source::Sorted(docs) = &self.source {
            let doc = docs.get(self.position).cloned();
            self.position += 1;
            return doc.map(Ok);
        }
        self.next_lazy().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parser::QueryParser;
    use crate::query::types::SortOrder;
    use crate::storage::backend::MemoryBackend;
    use crate::storage::heap::RecordHeap;
    use crate::storage::pager::Pager;
    use serde_json::json;

    fn shared(n: i64) -> Arc<RwLock<Collection>> {
        let pager = Pager::new(Box::new(MemoryBackend::new()), 4096, 64, 1, Vec::new()).unwrap();
        let mut c = Collection::new("c", Arc::new(RecordHeap::new(Arc::new(pager))));
        for i in 0..n {
            c.insert(Document::try_from(json!({"_id": i, "even": i % 2 == 0})).unwrap()).unwrap();
        }
        Arc::new(RwLock::new(c))
    }

    fn ids(cursor: &mut Cursor) -> Vec<DocumentId> {
        cursor.map(|d| d.unwrap().id().unwrap()).collect()
    }

    #[test]
    fn yields_lazily_and_skips_removed_documents() {
        let collection = shared(6);
        let query = QueryParser::parse_json(json!({"even": true})).unwrap();
        let mut cursor = Cursor::new(Arc::clone(&collection), query, FindOptions::new()).unwrap();

        assert_eq!(cursor.next().unwrap().unwrap().id(), Some(DocumentId::Int(0)));
        collection.write().delete(&DocumentId::Int(2)).unwrap();
        assert_eq!(ids(&mut cursor), vec![DocumentId::Int(4)]);
    }

    #[test]
    fn rewind_restarts_with_skip_and_limit() {
        let collection = shared(10);
        let options = FindOptions::new().skip(2).limit(3);
        let mut cursor = Cursor::new(collection, Query::MatchAll, options).unwrap();
        let first = ids(&mut cursor);
        assert_eq!(first, vec![2, 3, 4].into_iter().map(DocumentId::Int).collect::<Vec<_>>());
        assert!(cursor.next().is_none());

        cursor.rewind().unwrap();
        assert_eq!(ids(&mut cursor), first);
    }

    #[test]
    fn sorted_cursor_materializes() {
        let collection = shared(4);
        let options = FindOptions::new().sort_by("_id", SortOrder::Desc).unwrap().limit(2);
        let mut cursor = Cursor::new(collection, Query::MatchAll, options).unwrap();
        assert_eq!(ids(&mut cursor), vec![DocumentId::Int(3), DocumentId::Int(2)]);
    }
}
