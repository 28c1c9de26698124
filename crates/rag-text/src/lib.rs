//! rag-text
//!
//! In-memory lexical retrieval: a tantivy-analyzed tokenizer, immutable BM25
//! snapshots and the append-only corpus they are rebuilt from.

pub mod index;
pub mod snapshot;
pub mod tokenizer;

pub use index::LexicalIndex;
pub use snapshot::Bm25Snapshot;
pub use tokenizer::LexicalTokenizer;
