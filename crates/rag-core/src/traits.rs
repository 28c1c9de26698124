use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Chunk, ScoredChunk};

/// Turns text into dense vectors. Implementations are CPU or network bound
/// and are called from blocking contexts.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| crate::error::Error::EmbeddingUnavailable("embedder returned no vector".into()))
    }
}

/// Dense-vector similarity store keyed by `ChunkKey`.
///
/// `upsert` overwrites entries with an existing key instead of duplicating
/// them. `query` returns chunks by descending similarity.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, chunks: &[Arc<Chunk>], embeddings: &[Vec<f32>]) -> Result<usize>;
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;
    async fn count(&self) -> Result<usize>;
}
