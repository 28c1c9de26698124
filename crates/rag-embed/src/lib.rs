//! rag-embed
//!
//! Embedding collaborators for the retrieval engine: a local BGE-M3 model run
//! with candle and a deterministic hashing embedder.

use std::sync::Arc;

use tracing::info;

use rag_core::config::{EmbeddingProvider, EmbeddingSettings};
use rag_core::error::Result;
use rag_core::traits::Embedder;

pub mod device;
pub mod hashed;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use hashed::HashEmbedder;
pub use model::BgeM3Embedder;
pub use pool::masked_mean_l2;

/// Build the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` forces the
/// hashing embedder regardless of the configured provider.
pub fn embedder_from_settings(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if use_fake || settings.provider == EmbeddingProvider::Hash {
        info!(dim = settings.dim, "using hashing embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dim)));
    }
    Ok(Arc::new(BgeM3Embedder::new(settings.model_dir.as_deref())?))
}
