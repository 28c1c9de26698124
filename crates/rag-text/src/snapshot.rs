//! Immutable BM25 ranking structure over the whole lexical corpus.
//!
//! A snapshot is built in one pass from every chunk in the corpus and never
//! mutated afterwards; queries against it need no locking. Scoring is BM25
//! Okapi with the Lucene-style always-positive idf:
//!
//! `idf(t) = ln(1 + (N - df + 0.5) / (df + 0.5))`
//! `score(q, d) = sum over query tokens of idf(t) * tf * (k1 + 1) / (tf + k1 * (1 - b + b * dl / avgdl))`
//!
//! Equal scores are ordered by corpus position, earliest first.

use std::collections::HashMap;
use std::sync::Arc;

use rag_core::config::LexicalSettings;
use rag_core::types::{Chunk, ScoredChunk, SourceKind};

use crate::tokenizer::LexicalTokenizer;

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    tf: u32,
}

pub struct Bm25Snapshot {
    generation: u64,
    k1: f32,
    b: f32,
    chunks: Vec<Arc<Chunk>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
    postings: HashMap<String, Vec<Posting>>,
    tokenizer: LexicalTokenizer,
}

impl std::fmt::Debug for Bm25Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bm25Snapshot")
            .field("generation", &self.generation)
            .field("chunks", &self.chunks.len())
            .field("terms", &self.postings.len())
            .finish_non_exhaustive()
    }
}

impl Bm25Snapshot {
    /// Build from the full corpus in insertion order.
    pub fn build(
        generation: u64,
        chunks: &[Arc<Chunk>],
        params: &LexicalSettings,
        tokenizer: &LexicalTokenizer,
    ) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lengths = Vec::with_capacity(chunks.len());
        let mut total_length = 0u64;

        for (doc, chunk) in chunks.iter().enumerate() {
            let tokens = tokenizer.tokenize(&chunk.text);
            doc_lengths.push(tokens.len() as u32);
            total_length += tokens.len() as u64;

            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *term_freqs.entry(token).or_insert(0) += 1;
            }
            // docs are visited in order, so every postings list stays sorted by doc
            for (term, tf) in term_freqs {
                postings.entry(term).or_default().push(Posting { doc: doc as u32, tf });
            }
        }

        let avg_doc_length = if chunks.is_empty() { 0.0 } else { total_length as f32 / chunks.len() as f32 };
        Self {
            generation,
            k1: params.k1,
            b: params.b,
            chunks: chunks.to_vec(),
            doc_lengths,
            avg_doc_length,
            postings,
            tokenizer: tokenizer.clone(),
        }
    }

    /// Corpus generation this snapshot was built from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of chunks containing `term` (already normalized).
    pub fn document_frequency(&self, term: &str) -> usize {
        self.postings.get(term).map_or(0, Vec::len)
    }

    /// Top `k` chunks sharing at least one term with `text`.
    pub fn query(&self, text: &str, k: usize) -> Vec<ScoredChunk> {
        let query_tokens = self.tokenizer.tokenize(text);
        if query_tokens.is_empty() || self.chunks.is_empty() || k == 0 {
            return Vec::new();
        }

        let n = self.chunks.len() as f32;
        let mut scores: HashMap<u32, f32> = HashMap::new();
        for token in &query_tokens {
            let Some(postings) = self.postings.get(token) else { continue };
            let df = postings.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for posting in postings {
                let dl = self.doc_lengths[posting.doc as usize] as f32;
                let tf = posting.tf as f32;
                let norm = if self.avg_doc_length > 0.0 { dl / self.avg_doc_length } else { 0.0 };
                let saturation = (tf * (self.k1 + 1.0)) / (tf + self.k1 * (1.0 - self.b + self.b * norm));
                *scores.entry(posting.doc).or_insert(0.0) += idf * saturation;
            }
        }

        let mut ranked: Vec<(u32, f32)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
            .into_iter()
            .map(|(doc, score)| ScoredChunk::new(Arc::clone(&self.chunks[doc as usize]), score, SourceKind::Lexical))
            .collect()
    }
}
