use crate::core::error::Result;

/// Maps text to a vector for lazily embedded collections. Providers are
/// registered per collection at runtime and never persisted.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

impl<F> EmbeddingProvider for F
where
    F: Fn(&str) -> Result<Vec<f32>> + Send + Sync,
{
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self(text)
    }
}
