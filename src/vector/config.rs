use std::fmt;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, ErrorKind, Result};

pub const DEFAULT_M: usize = 16;
pub const DEFAULT_EF_CONSTRUCTION: usize = 200;
pub const DEFAULT_EF_SEARCH: usize = 50;
pub const MAX_DIMENSIONS: usize = 65_536;

/// Distance function of a vector collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceMetric {
    Cosine,      // 1 - cos(a, b)
    Euclidean,   // L2
    DotProduct,  // larger = closer
    Manhattan,   // L1
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dot_product",
            DistanceMetric::Manhattan => "manhattan",
        };
        write!(f, "{}", name)
    }
}

/// How vectors are stored in pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompressionMode {
    None,
    Delta,          // residual against the nearest reference vector
    Quantized,      // 8 bits per component, per-vector min/scale
    LazyEmbedding,  // raw text, embedded by a provider at search time
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            CompressionMode::None => "none",
            CompressionMode::Delta => "delta",
            CompressionMode::Quantized => "quantized",
            CompressionMode::LazyEmbedding => "lazy_embedding",
        };
        write!(f, "{}", name)
    }
}

/// Immutable configuration of a vector collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorConfig {
    pub dimensions: usize,
    pub metric: DistanceMetric,
    pub m: usize,                // links per node above layer 0, 2*m at layer 0
    pub ef_construction: usize,  // beam width while inserting
    pub ef_search: usize,        // beam width while searching
    pub compression: CompressionMode,
}

impl VectorConfig {
    pub fn new(dimensions: usize, metric: DistanceMetric) -> Self {
        VectorConfig {
            dimensions,
            metric,
            m: DEFAULT_M,
            ef_construction: DEFAULT_EF_CONSTRUCTION,
            ef_search: DEFAULT_EF_SEARCH,
            compression: CompressionMode::None,
        }
    }

    pub fn with_compression(mut self, compression: CompressionMode) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_m(mut self, m: usize) -> Self {
        self.m = m;
        self
    }

    pub fn with_ef(mut self, ef_construction: usize, ef_search: usize) -> Self {
        self.ef_construction = ef_construction;
        self.ef_search = ef_search;
        self
    }

    pub fn m_max0(&self) -> usize {
        self.m * 2
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensions == 0 || self.dimensions > MAX_DIMENSIONS {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!("dimensions must be within 1..={}, got {}", MAX_DIMENSIONS, self.dimensions),
            ));
        }
        if self.m < 2 {
            return Err(Error::new(ErrorKind::InvalidArgument, format!("M must be at least 2, got {}", self.m)));
        }
        if self.ef_construction == 0 || self.ef_search == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument, "ef values must be positive".to_string()));
        }
        Ok(())
    }
}
