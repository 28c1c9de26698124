//! rag-core
//!
//! Shared domain types, error taxonomy, collaborator traits, the chunker and
//! configuration for the hybrid retrieval engine.

pub mod chunker;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use chunker::{Chunker, ChunkingConfig};
pub use error::{Error, Result};
pub use traits::{Embedder, VectorStore};
pub use types::{Chunk, ChunkKey, Document, Meta, ScoredChunk, SourceKind};
