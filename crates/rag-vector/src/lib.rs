//! rag-vector
//!
//! Dense-vector stores for the retrieval engine: a LanceDB table and an
//! in-memory index.

use std::sync::Arc;

use rag_core::config::{expand_path, VectorBackend, VectorStoreSettings};
use rag_core::error::{Error, Result};
use rag_core::traits::VectorStore;
use rag_core::types::Chunk;

pub mod lance;
pub mod memory;
pub mod schema;
pub mod table;

pub use lance::LanceVectorStore;
pub use memory::MemoryVectorStore;

/// Build the configured store for vectors of `dim` dimensions.
pub async fn vector_store_from_settings(settings: &VectorStoreSettings, dim: usize) -> Result<Arc<dyn VectorStore>> {
    match settings.backend {
        VectorBackend::Memory => Ok(Arc::new(MemoryVectorStore::new(dim))),
        VectorBackend::Lancedb => {
            let uri = expand_path(&settings.uri);
            if let Some(parent) = uri.parent() {
                std::fs::create_dir_all(parent).map_err(table::store_err)?;
            }
            let store = LanceVectorStore::open(&uri.to_string_lossy(), &settings.table, dim).await?;
            Ok(Arc::new(store))
        }
    }
}

pub(crate) fn check_dim(embedding: &[f32], dim: usize) -> Result<()> {
    if embedding.len() != dim {
        return Err(Error::StoreUnavailable(format!("expected {dim}-dimensional vector, got {}", embedding.len())));
    }
    Ok(())
}

pub(crate) fn check_batch(chunks: &[Arc<Chunk>], embeddings: &[Vec<f32>], dim: usize) -> Result<()> {
    if chunks.len() != embeddings.len() {
        return Err(Error::StoreUnavailable(format!(
            "{} chunks but {} embeddings",
            chunks.len(),
            embeddings.len()
        )));
    }
    embeddings.iter().try_for_each(|e| check_dim(e, dim))
}
