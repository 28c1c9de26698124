//! Merging of the lexical and vector rankings into one list.

use std::collections::HashMap;

use rag_core::config::{FusionSettings, FusionStrategy};
use rag_core::types::{ChunkKey, ScoredChunk, SourceKind};

/// Relative weight of each retriever. Not required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionWeights {
    pub lexical: f32,
    pub vector: f32,
}

impl FusionWeights {
    /// Weights used when only the vector retriever is available.
    pub const VECTOR_ONLY: Self = Self { lexical: 0.0, vector: 1.0 };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionParams {
    pub weights: FusionWeights,
    pub strategy: FusionStrategy,
    pub rrf_k: usize,
}

impl From<&FusionSettings> for FusionParams {
    fn from(s: &FusionSettings) -> Self {
        Self {
            weights: FusionWeights { lexical: s.lexical_weight, vector: s.vector_weight },
            strategy: s.strategy,
            rrf_k: s.rrf_k,
        }
    }
}

impl Default for FusionParams {
    fn default() -> Self {
        Self::from(&FusionSettings::default())
    }
}

struct Candidate {
    hit: ScoredChunk,
    combined: f32,
    vector_rank: Option<usize>,
    lexical_rank: Option<usize>,
}

/// Collapse repeated chunk keys within one list, keeping the first position
/// and the best score.
fn dedup(list: &[ScoredChunk]) -> Vec<ScoredChunk> {
    let mut seen: HashMap<&ChunkKey, usize> = HashMap::new();
    let mut out: Vec<ScoredChunk> = Vec::with_capacity(list.len());
    for hit in list {
        match seen.get(&hit.chunk.key) {
            Some(&i) => {
                if hit.score > out[i].score {
                    out[i].score = hit.score;
                }
            }
            None => {
                seen.insert(&hit.chunk.key, out.len());
                out.push(hit.clone());
            }
        }
    }
    out
}

/// Per-position contribution of a list, before weighting.
fn contributions(list: &[ScoredChunk], params: &FusionParams) -> Vec<f32> {
    match params.strategy {
        FusionStrategy::Weighted => {
            // Scores are divided by the list maximum; negatives count as 0.
            let max = list.iter().map(|h| h.score.max(0.0)).fold(0.0f32, f32::max);
            list.iter()
                .map(|h| if max > 0.0 { h.score.max(0.0) / max } else { 0.0 })
                .collect()
        }
        FusionStrategy::ReciprocalRank => {
            let k = params.rrf_k as f32;
            (0..list.len()).map(|rank| 1.0 / (k + (rank + 1) as f32)).collect()
        }
    }
}

/// Fuse two rankings into one list deduplicated by chunk key.
///
/// Ties are broken by position in the vector list; chunks only the lexical
/// retriever found follow in lexical order. When one list is empty the other
/// passes through with its own scores. Truncation is left to the caller.
pub fn fuse(lexical: &[ScoredChunk], vector: &[ScoredChunk], params: &FusionParams) -> Vec<ScoredChunk> {
    let lexical = dedup(lexical);
    let vector = dedup(vector);
    match (lexical.is_empty(), vector.is_empty()) {
        (true, true) => return Vec::new(),
        (true, false) => return vector,
        (false, true) => return lexical,
        (false, false) => {}
    }

    let mut by_key: HashMap<ChunkKey, Candidate> = HashMap::with_capacity(lexical.len() + vector.len());
    let vector_norm = contributions(&vector, params);
    for (rank, (hit, norm)) in vector.into_iter().zip(vector_norm).enumerate() {
        by_key.insert(
            hit.chunk.key.clone(),
            Candidate { hit, combined: params.weights.vector * norm, vector_rank: Some(rank), lexical_rank: None },
        );
    }
    let lexical_norm = contributions(&lexical, params);
    for (rank, (hit, norm)) in lexical.into_iter().zip(lexical_norm).enumerate() {
        let add = params.weights.lexical * norm;
        by_key
            .entry(hit.chunk.key.clone())
            .and_modify(|c| {
                c.combined += add;
                c.lexical_rank = Some(rank);
            })
            .or_insert(Candidate { hit, combined: add, vector_rank: None, lexical_rank: Some(rank) });
    }

    let mut merged: Vec<Candidate> = by_key.into_values().collect();
    merged.sort_by(|a, b| {
        b.combined
            .total_cmp(&a.combined)
            .then_with(|| a.vector_rank.unwrap_or(usize::MAX).cmp(&b.vector_rank.unwrap_or(usize::MAX)))
            .then_with(|| a.lexical_rank.unwrap_or(usize::MAX).cmp(&b.lexical_rank.unwrap_or(usize::MAX)))
    });
    merged
        .into_iter()
        .map(|c| ScoredChunk::new(c.hit.chunk, c.combined, SourceKind::Fused))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_core::types::{Chunk, Document};
    use std::sync::Arc;

    fn hit(id: &str, score: f32, source: SourceKind) -> ScoredChunk {
        let doc = Document::new(id, id);
        ScoredChunk::new(Arc::new(Chunk::new(&doc, 0, id.to_string())), score, source)
    }

    fn ids(list: &[ScoredChunk]) -> Vec<&str> {
        list.iter().map(|h| h.chunk.source_id.as_str()).collect()
    }

    fn weighted(lexical: f32, vector: f32) -> FusionParams {
        FusionParams { weights: FusionWeights { lexical, vector }, strategy: FusionStrategy::Weighted, rrf_k: 60 }
    }

    #[test]
    fn both_empty_is_empty() {
        assert!(fuse(&[], &[], &FusionParams::default()).is_empty());
    }

    #[test]
    fn single_list_passes_through_unweighted() {
        let vector = vec![hit("a", 0.9, SourceKind::Vector), hit("b", 0.3, SourceKind::Vector)];
        let fused = fuse(&[], &vector, &weighted(0.4, 0.6));
        assert_eq!(ids(&fused), ["a", "b"]);
        assert!((fused[0].score - 0.9).abs() < 1e-6);
        assert_eq!(fused[0].source, SourceKind::Vector);

        let lexical = vec![hit("c", 7.0, SourceKind::Lexical)];
        let fused = fuse(&lexical, &[], &weighted(0.4, 0.6));
        assert!((fused[0].score - 7.0).abs() < 1e-6);
    }

    #[test]
    fn scores_are_max_normalized_and_weighted() {
        let lexical = vec![hit("a", 10.0, SourceKind::Lexical), hit("b", 5.0, SourceKind::Lexical)];
        let vector = vec![hit("b", 0.8, SourceKind::Vector), hit("c", 0.4, SourceKind::Vector)];
        let fused = fuse(&lexical, &vector, &weighted(0.4, 0.6));
        assert_eq!(ids(&fused), ["b", "a", "c"]);
        // b: 0.4 * 0.5 + 0.6 * 1.0 = 0.8; a: 0.4; c: 0.6 * 0.5 = 0.3
        assert!((fused[0].score - 0.8).abs() < 1e-6);
        assert!((fused[1].score - 0.4).abs() < 1e-6);
        assert!((fused[2].score - 0.3).abs() < 1e-6);
        assert!(fused.iter().all(|h| h.source == SourceKind::Fused));
    }

    #[test]
    fn duplicates_are_merged_by_key() {
        let lexical = vec![hit("a", 2.0, SourceKind::Lexical), hit("a", 3.0, SourceKind::Lexical)];
        let vector = vec![hit("a", 0.5, SourceKind::Vector)];
        let fused = fuse(&lexical, &vector, &weighted(1.0, 1.0));
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 2.0).abs() < 1e-6);
    }

    #[test]
    fn ties_follow_vector_order_then_lexical_order() {
        let lexical = vec![hit("x", 1.0, SourceKind::Lexical), hit("y", 1.0, SourceKind::Lexical)];
        let vector = vec![hit("b", 1.0, SourceKind::Vector), hit("a", 1.0, SourceKind::Vector)];
        let fused = fuse(&lexical, &vector, &weighted(1.0, 1.0));
        assert_eq!(ids(&fused), ["b", "a", "x", "y"]);
    }

    #[test]
    fn raising_lexical_weight_favours_lexical_hits() {
        let lexical = vec![hit("lex", 4.0, SourceKind::Lexical)];
        let vector = vec![hit("vec", 0.9, SourceKind::Vector), hit("lex", 0.2, SourceKind::Vector)];
        let margin = |w: f32| {
            let fused = fuse(&lexical, &vector, &weighted(w, 0.6));
            let score = |id: &str| fused.iter().find(|h| h.chunk.source_id == id).map_or(0.0, |h| h.score);
            score("lex") - score("vec")
        };
        let mut previous = f32::NEG_INFINITY;
        for w in [0.0, 0.2, 0.4, 0.8, 1.6] {
            let m = margin(w);
            assert!(m >= previous, "margin shrank at lexical_weight={w}");
            previous = m;
        }
    }

    #[test]
    fn non_positive_scores_normalize_to_zero() {
        let lexical = vec![hit("a", 0.0, SourceKind::Lexical)];
        let vector = vec![hit("b", -0.5, SourceKind::Vector)];
        let fused = fuse(&lexical, &vector, &weighted(1.0, 1.0));
        assert_eq!(ids(&fused), ["b", "a"]);
        assert!(fused.iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn reciprocal_rank_uses_positions_only() {
        let params = FusionParams {
            weights: FusionWeights { lexical: 1.0, vector: 1.0 },
            strategy: FusionStrategy::ReciprocalRank,
            rrf_k: 60,
        };
        let lexical = vec![hit("a", 100.0, SourceKind::Lexical), hit("b", 0.01, SourceKind::Lexical)];
        let vector = vec![hit("b", 0.99, SourceKind::Vector), hit("c", 0.98, SourceKind::Vector)];
        let fused = fuse(&lexical, &vector, &params);
        assert_eq!(fused[0].chunk.source_id, "b");
        let expected = 1.0 / 61.0 + 1.0 / 62.0;
        assert!((fused[0].score - expected).abs() < 1e-6);
        // a: 1/61 from the lexical list, c: 1/62 from the vector list.
        assert_eq!(ids(&fused), ["b", "a", "c"]);
    }
}
