//! In-process `VectorStore` with brute-force cosine search.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use rag_core::error::Result;
use rag_core::traits::VectorStore;
use rag_core::types::{Chunk, ChunkKey, ScoredChunk, SourceKind};

#[derive(Default)]
struct Entries {
    slots: HashMap<ChunkKey, usize>,
    rows: Vec<(Arc<Chunk>, Vec<f32>)>,
}

pub struct MemoryVectorStore {
    dim: usize,
    inner: RwLock<Entries>,
}

impl MemoryVectorStore {
    pub fn new(dim: usize) -> Self {
        Self { dim, inner: RwLock::new(Entries::default()) }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, chunks: &[Arc<Chunk>], embeddings: &[Vec<f32>]) -> Result<usize> {
        crate::check_batch(chunks, embeddings, self.dim)?;
        let mut inner = self.inner.write();
        let Entries { slots, rows } = &mut *inner;
        for (chunk, emb) in chunks.iter().zip(embeddings) {
            match slots.get(&chunk.key) {
                Some(&slot) => rows[slot] = (chunk.clone(), emb.clone()),
                None => {
                    slots.insert(chunk.key.clone(), rows.len());
                    rows.push((chunk.clone(), emb.clone()));
                }
            }
        }
        Ok(chunks.len())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        crate::check_dim(embedding, self.dim)?;
        let inner = self.inner.read();
        let mut hits: Vec<ScoredChunk> = inner
            .rows
            .iter()
            .map(|(chunk, v)| ScoredChunk::new(chunk.clone(), cosine(embedding, v), SourceKind::Vector))
            .collect();
        // Stable sort keeps insertion order among equal scores.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.inner.read().rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::types::Document;

    fn chunk(source: &str, idx: usize, text: &str) -> Arc<Chunk> {
        Arc::new(Chunk::new(&Document::new(source, text), idx, text.to_string()))
    }

    #[tokio::test]
    async fn upsert_overwrites_existing_key() {
        let store = MemoryVectorStore::new(2);
        store.upsert(&[chunk("a", 0, "old")], &[vec![1.0, 0.0]]).await.unwrap();
        store.upsert(&[chunk("a", 0, "new")], &[vec![0.0, 1.0]]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let hits = store.query(&[0.0, 1.0], 5).await.unwrap();
        assert_eq!(hits[0].text(), "new");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let store = MemoryVectorStore::new(2);
        let chunks = [chunk("a", 0, "first"), chunk("b", 0, "second")];
        store.upsert(&chunks, &[vec![1.0, 0.0], vec![1.0, 0.0]]).await.unwrap();
        let hits = store.query(&[1.0, 0.0], 2).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.text()).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let store = MemoryVectorStore::new(3);
        let err = store.upsert(&[chunk("a", 0, "x")], &[vec![1.0]]).await.unwrap_err();
        assert!(matches!(err, rag_core::Error::StoreUnavailable(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
