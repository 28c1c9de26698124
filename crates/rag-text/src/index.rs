use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use tracing::{debug, info};

use rag_core::config::LexicalSettings;
use rag_core::error::{Error, Result};
use rag_core::types::{Chunk, ScoredChunk};

use crate::snapshot::Bm25Snapshot;
use crate::tokenizer::LexicalTokenizer;

struct Corpus {
    chunks: Vec<Arc<Chunk>>,
    generation: u64,
}

/// Process-wide lexical corpus plus its latest BM25 snapshot.
///
/// Lifecycle: the corpus starts empty, grows only through [`LexicalIndex::add`]
/// and is dropped with the process. Appending and rebuilding happen under one
/// lock so concurrent ingestions never lose each other's chunks; queries read
/// the latest snapshot without taking it.
///
/// Re-adding chunks of an already ingested document appends them again.
/// Unlike the vector store there is no key-based deduplication here.
pub struct LexicalIndex {
    params: LexicalSettings,
    tokenizer: LexicalTokenizer,
    corpus: Mutex<Corpus>,
    latest: ArcSwapOption<Bm25Snapshot>,
}

impl LexicalIndex {
    pub fn new(params: LexicalSettings) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            tokenizer: LexicalTokenizer::default(),
            corpus: Mutex::new(Corpus { chunks: Vec::new(), generation: 0 }),
            latest: ArcSwapOption::empty(),
        })
    }

    /// Append `chunks` and rebuild a snapshot over the entire corpus.
    ///
    /// On `LexicalRebuildFailed` the appended chunks stay in the corpus and
    /// the previous snapshot remains the latest one; a later successful
    /// rebuild picks them up.
    pub fn add(&self, chunks: &[Arc<Chunk>]) -> Result<Arc<Bm25Snapshot>> {
        let mut corpus = self.corpus.lock();
        corpus.chunks.extend(chunks.iter().cloned());
        corpus.generation += 1;
        if corpus.chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        if let Some(max) = self.params.max_corpus_chunks {
            if corpus.chunks.len() > max {
                return Err(Error::LexicalRebuildFailed(format!(
                    "corpus holds {} chunks, capacity is {}",
                    corpus.chunks.len(),
                    max
                )));
            }
        }
        if u32::try_from(corpus.chunks.len()).is_err() {
            return Err(Error::LexicalRebuildFailed("corpus exceeds addressable size".into()));
        }

        let snapshot = Arc::new(Bm25Snapshot::build(corpus.generation, &corpus.chunks, &self.params, &self.tokenizer));
        self.latest.store(Some(Arc::clone(&snapshot)));
        info!(added = chunks.len(), corpus = corpus.chunks.len(), generation = corpus.generation, "rebuilt lexical snapshot");
        Ok(snapshot)
    }

    /// Rank against the latest snapshot.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let snapshot = self.snapshot().ok_or(Error::EmptyCorpus)?;
        let hits = snapshot.query(text, k);
        debug!(hits = hits.len(), generation = snapshot.generation(), "lexical query");
        Ok(hits)
    }

    /// Latest successfully built snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<Bm25Snapshot>> {
        self.latest.load_full()
    }

    /// Number of chunks in the corpus, including ones not yet covered by a
    /// snapshot after a failed rebuild.
    pub fn len(&self) -> usize {
        self.corpus.lock().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
