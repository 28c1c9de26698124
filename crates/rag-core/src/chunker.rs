//! Character-budgeted recursive text splitter.
//!
//! Each chunk is a contiguous slice of the document text holding at most
//! `chunk_size` characters. Consecutive chunks share exactly `chunk_overlap`
//! characters, so dropping the first `chunk_overlap` characters of every
//! chunk but the first reconstructs the input.
//!
//! Chunk ends are placed at the strongest boundary found in the window:
//! paragraph break, line break, sentence end, word gap, and finally a raw
//! character cut. Structural boundaries may end a chunk anywhere past the
//! overlap; word gaps only in the back half of the window.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200 }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfiguration("chunk_size must be greater than 0".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfiguration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Boundary {
    Paragraph,
    Line,
    Sentence,
    Word,
}

impl Boundary {
    /// Paragraph, line and sentence ends are accepted however short the
    /// chunk they close.
    fn is_structural(self) -> bool {
        !matches!(self, Boundary::Word)
    }

    const ORDER: [Boundary; 4] = [Boundary::Paragraph, Boundary::Line, Boundary::Sentence, Boundary::Word];

    /// Whether a chunk may end right before `chars[end]`.
    fn ends_at(self, chars: &[char], end: usize) -> bool {
        let last = chars[end - 1];
        match self {
            Boundary::Paragraph => last == '\n' && end >= 2 && chars[end - 2] == '\n',
            Boundary::Line => last == '\n',
            Boundary::Sentence => {
                last.is_whitespace() && end >= 2 && matches!(chars[end - 2], '.' | '!' | '?')
            }
            Boundary::Word => last.is_whitespace(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Split a document into ordered chunks. Empty text yields no chunks.
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        self.spans(&document.text)
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| Chunk::new(document, i, document.text[start..end].to_string()))
            .collect()
    }

    /// Byte ranges of each chunk within `text`.
    pub fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        let chars: Vec<char> = text.chars().collect();
        let offsets: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = chars.len();
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut spans = Vec::new();
        if n == 0 {
            return spans;
        }
        let mut start = 0usize;
        loop {
            if n - start <= size {
                spans.push((offsets[start], offsets[n]));
                break;
            }
            let limit = start + size;
            // end > start + overlap keeps the next start moving forward
            let floor = start + overlap;
            let soft_floor = start + overlap.max(size / 2);
            let end = find_boundary(&chars, floor, soft_floor, limit).unwrap_or(limit);
            spans.push((offsets[start], offsets[end]));
            start = end - overlap;
        }
        spans
    }
}

/// Largest `end` matching the strongest boundary kind. Structural kinds are
/// searched in `(floor, limit]`, word gaps in `(soft_floor, limit]`.
fn find_boundary(chars: &[char], floor: usize, soft_floor: usize, limit: usize) -> Option<usize> {
    Boundary::ORDER.iter().find_map(|kind| {
        let lower = if kind.is_structural() { floor } else { soft_floor };
        ((lower + 1)..=limit).rev().find(|&end| kind.ends_at(chars, end))
    })
}
