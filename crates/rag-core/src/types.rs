//! Domain types shared by the lexical and vector engines.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type Meta = HashMap<String, String>;

/// Metadata key holding the owning document's source id on every chunk.
pub const META_SOURCE_ID: &str = "source_id";
/// Metadata key holding the 0-based chunk position on every chunk.
pub const META_CHUNK_INDEX: &str = "chunk_index";
/// Metadata key holding the full path of a document loaded from disk.
pub const META_SOURCE: &str = "source";

/// A raw ingested unit of text. Immutable once handed to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source_id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Meta,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), text: text.into(), metadata: Meta::new() }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Stable chunk identity: blake3 of `source_id` and `chunk_index`.
///
/// Two chunks with the same source id and position share a key, which is
/// what makes vector upserts idempotent across re-uploads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey(String);

impl ChunkKey {
    pub fn new(source_id: &str, chunk_index: usize) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(source_id.as_bytes());
        hasher.update(&[0u8]);
        hasher.update(&(chunk_index as u64).to_le_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contiguous span of a document's text; the unit stored in both indices.
///
/// - `source_id`/`chunk_index`: owning document and position within it
/// - `text`: at most `chunk_size` characters
/// - `char_len`: length of `text` in characters
/// - `metadata`: document metadata plus `source_id` and `chunk_index`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub key: ChunkKey,
    pub source_id: String,
    pub chunk_index: usize,
    pub text: String,
    pub char_len: usize,
    pub metadata: Meta,
}

impl Chunk {
    pub fn new(document: &Document, chunk_index: usize, text: String) -> Self {
        let mut metadata = document.metadata.clone();
        metadata.insert(META_SOURCE_ID.to_string(), document.source_id.clone());
        metadata.insert(META_CHUNK_INDEX.to_string(), chunk_index.to_string());
        Self {
            key: ChunkKey::new(&document.source_id, chunk_index),
            source_id: document.source_id.clone(),
            chunk_index,
            char_len: text.chars().count(),
            text,
            metadata,
        }
    }
}

/// Indicates which retriever produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Lexical,
    Vector,
    Fused,
}

/// A chunk with a retriever-specific score. Higher is always better.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<Chunk>,
    pub score: f32,
    pub source: SourceKind,
}

impl ScoredChunk {
    pub fn new(chunk: Arc<Chunk>, score: f32, source: SourceKind) -> Self {
        Self { chunk, score, source }
    }

    pub fn text(&self) -> &str {
        &self.chunk.text
    }

    pub fn metadata(&self) -> &Meta {
        &self.chunk.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_key_is_stable_and_position_sensitive() {
        assert_eq!(ChunkKey::new("a.txt", 0), ChunkKey::new("a.txt", 0));
        assert_ne!(ChunkKey::new("a.txt", 0), ChunkKey::new("a.txt", 1));
        assert_ne!(ChunkKey::new("a.txt", 1), ChunkKey::new("b.txt", 1));
        assert_eq!(ChunkKey::new("a.txt", 3).as_str().len(), 64);
    }

    #[test]
    fn chunk_inherits_document_metadata() {
        let doc = Document::new("a.txt", "hello").with_metadata("lang", "en");
        let chunk = Chunk::new(&doc, 2, "hello".to_string());
        assert_eq!(chunk.char_len, 5);
        assert_eq!(chunk.metadata.get("lang").map(String::as_str), Some("en"));
        assert_eq!(chunk.metadata.get(META_SOURCE_ID).map(String::as_str), Some("a.txt"));
        assert_eq!(chunk.metadata.get(META_CHUNK_INDEX).map(String::as_str), Some("2"));
    }
}
