use std::sync::Arc;

use rag_core::chunker::ChunkingConfig;
use rag_core::config::EngineSettings;
use rag_core::error::Result;
use rag_core::traits::{Embedder, VectorStore};
use rag_core::types::{Document, ScoredChunk};
use rag_text::LexicalIndex;
use tracing::info;

use crate::fusion::FusionParams;
use crate::pipeline::{IngestReport, Ingestor};
use crate::retriever::Retriever;
use crate::view::{RetrievalView, ViewCell};

/// The hybrid retrieval engine: one lexical corpus, one vector store and the
/// view that ties them together.
///
/// Cloning is cheap and clones share all state, so a clone can be moved into
/// each task that ingests or queries.
#[derive(Clone)]
pub struct HybridEngine {
    ingestor: Ingestor,
    retriever: Retriever,
    settings: Arc<EngineSettings>,
}

impl HybridEngine {
    pub fn new(settings: EngineSettings, embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Result<Self> {
        settings.validate()?;
        let fusion = FusionParams::from(&settings.fusion);
        let lexical = Arc::new(LexicalIndex::new(settings.lexical.clone())?);
        let views = Arc::new(ViewCell::new(RetrievalView::new(None, Arc::clone(&store), fusion)));
        let ingestor = Ingestor {
            embedder: Arc::clone(&embedder),
            store,
            lexical,
            views: Arc::clone(&views),
            fusion,
            batch_size: settings.embedding.batch_size,
        };
        let retriever = Retriever { embedder, views, candidate_multiplier: settings.retrieval.candidate_multiplier };
        Ok(Self { ingestor, retriever, settings: Arc::new(settings) })
    }

    /// Build the embedder and vector store named by `settings`.
    pub async fn from_settings(settings: EngineSettings) -> Result<Self> {
        settings.validate()?;
        let embedder = rag_embed::embedder_from_settings(&settings.embedding)?;
        let store = rag_vector::vector_store_from_settings(&settings.vector_store, embedder.dim()).await?;
        info!(dim = embedder.dim(), backend = ?settings.vector_store.backend, "hybrid engine ready");
        Self::new(settings, embedder, store)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub async fn ingest(&self, document: &Document, config: &ChunkingConfig) -> Result<IngestReport> {
        self.ingestor.ingest(document, config).await
    }

    /// Ingest with the configured chunking parameters.
    pub async fn ingest_document(&self, document: &Document) -> Result<IngestReport> {
        self.ingestor.ingest(document, &self.settings.chunking).await
    }

    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        self.retriever.retrieve(query, k).await
    }

    /// Chunks appended to the lexical corpus so far.
    pub fn corpus_len(&self) -> usize {
        self.ingestor.lexical.len()
    }

    pub async fn vector_count(&self) -> Result<usize> {
        self.ingestor.store.count().await
    }

    /// Lexical generation of the currently published view.
    pub fn view_generation(&self) -> u64 {
        self.ingestor.views.load().generation()
    }

    pub fn current_view(&self) -> Arc<RetrievalView> {
        self.ingestor.views.load()
    }
}
