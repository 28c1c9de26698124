//! Ingestion: chunk, embed, upsert, rebuild the lexical snapshot, publish.
//!
//! Each step is a failure boundary. Embedding and upsert failures abort with
//! nothing written to the lexical corpus. A failed lexical rebuild is logged
//! and the previous snapshot keeps serving, since the vector write has
//! already committed.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use rag_core::chunker::{Chunker, ChunkingConfig};
use rag_core::error::{Error, Result};
use rag_core::traits::{Embedder, VectorStore};
use rag_core::types::{Chunk, Document};
use rag_text::LexicalIndex;

use crate::fusion::FusionParams;
use crate::view::{RetrievalView, ViewCell};

/// Outcome of one successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub chunks_added: usize,
    /// The lexical rebuild failed; the chunks are reachable through the
    /// vector store only until a later rebuild succeeds.
    pub degraded: bool,
}

#[derive(Clone)]
pub struct Ingestor {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) store: Arc<dyn VectorStore>,
    pub(crate) lexical: Arc<LexicalIndex>,
    pub(crate) views: Arc<ViewCell>,
    pub(crate) fusion: FusionParams,
    pub(crate) batch_size: usize,
}

impl Ingestor {
    #[instrument(skip_all, fields(source_id = %document.source_id))]
    pub async fn ingest(&self, document: &Document, config: &ChunkingConfig) -> Result<IngestReport> {
        let chunker = Chunker::new(*config)?;
        let chunks: Arc<[Arc<Chunk>]> = chunker.split(document).into_iter().map(Arc::new).collect();
        if chunks.is_empty() {
            return Ok(IngestReport { chunks_added: 0, degraded: false });
        }

        let embeddings = self.embed_chunks(&chunks).await?;
        self.store.upsert(&chunks, &embeddings).await?;

        let lexical = Arc::clone(&self.lexical);
        let appended = Arc::clone(&chunks);
        let rebuilt = tokio::task::spawn_blocking(move || lexical.add(&appended))
            .await
            .unwrap_or_else(|e| Err(Error::LexicalRebuildFailed(e.to_string())));
        let degraded = match rebuilt {
            Ok(_) => false,
            Err(e) if e.is_degradable() => {
                warn!(error = %e, "lexical rebuild failed, serving previous snapshot");
                true
            }
            Err(e) => return Err(e),
        };

        // Publish the latest good snapshot, which may come from a concurrent
        // ingestion that rebuilt after this one.
        let view = RetrievalView::new(self.lexical.snapshot(), Arc::clone(&self.store), self.fusion);
        let published = self.views.publish(view);
        info!(chunks = chunks.len(), degraded, published, "ingested document");
        Ok(IngestReport { chunks_added: chunks.len(), degraded })
    }

    async fn embed_chunks(&self, chunks: &Arc<[Arc<Chunk>]>) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = Arc::clone(&self.embedder);
        let batch_size = self.batch_size.max(1);
        let embeddings = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for batch in texts.chunks(batch_size) {
                out.extend(embedder.embed_batch(batch)?);
            }
            Ok(out)
        })
        .await
        .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))??;

        if embeddings.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }
        let dim = self.embedder.dim();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dim) {
            return Err(Error::EmbeddingUnavailable(format!("expected {dim}-dimensional embeddings, got {}", bad.len())));
        }
        Ok(embeddings)
    }
}
