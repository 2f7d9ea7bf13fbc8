use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::path::FieldPath;

/// Sort order for query results and index fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,   // Ascending: 0 → 9, A → Z
    Desc,  // Descending: 9 → 0, Z → A
}

impl SortOrder {
    /// `1` / `-1`, as used in index names
    pub fn direction(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

/// Sort, skip and limit applied after filtering
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub sort: Vec<(FieldPath, SortOrder)>,
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_by(mut self, path: &str, order: SortOrder) -> Result<Self> {
        self.sort.push((FieldPath::parse(path)?, order));
        Ok(self)
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
