use std::sync::Arc;

use tracing::{debug, instrument};

use rag_core::error::{Error, Result};
use rag_core::traits::Embedder;
use rag_core::types::ScoredChunk;

use crate::fusion::fuse;
use crate::view::{Retrievers, ViewCell};

/// Query entry point. Each call ranks against the view published when it
/// started; ingestions that publish mid-query do not affect it.
#[derive(Clone)]
pub struct Retriever {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) views: Arc<ViewCell>,
    pub(crate) candidate_multiplier: usize,
}

impl Retriever {
    #[instrument(skip(self))]
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 {
            return Err(Error::InvalidConfiguration("k must be greater than 0".into()));
        }
        let view = self.views.load();

        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let embedding = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))??;

        let candidates = k.saturating_mul(self.candidate_multiplier.max(1));
        let (vector_hits, lexical_hits) = match view.retrievers() {
            Retrievers::Hybrid { lexical, vector } => {
                (vector.query(&embedding, candidates).await?, lexical.query(query, candidates))
            }
            Retrievers::VectorOnly { vector } => (vector.query(&embedding, candidates).await?, Vec::new()),
        };

        let mut results = fuse(&lexical_hits, &vector_hits, &view.fusion());
        results.truncate(k);
        debug!(
            generation = view.generation(),
            lexical = lexical_hits.len(),
            vector = vector_hits.len(),
            returned = results.len(),
            "retrieved"
        );
        Ok(results)
    }
}

/// Join retrieved chunk texts into the context block handed to the answer
/// generator.
pub fn format_context(results: &[ScoredChunk]) -> String {
    results.iter().map(ScoredChunk::text).collect::<Vec<_>>().join("\n\n")
}
