pub mod collection;
pub mod config;
pub mod distance;
pub mod embedding;
pub mod hnsw;

pub use collection::{SearchHit, StoredVector, VectorCollection, VectorStats};
pub use config::{CompressionMode, DistanceMetric, VectorConfig};
pub use embedding::EmbeddingProvider;
