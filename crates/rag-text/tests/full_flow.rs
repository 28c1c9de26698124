use std::sync::Arc;
use std::thread;

use rag_core::chunker::{Chunker, ChunkingConfig};
use rag_core::config::LexicalSettings;
use rag_core::error::Error;
use rag_core::types::{Chunk, Document};
use rag_text::LexicalIndex;

fn chunks_of(source_id: &str, text: &str) -> Vec<Arc<Chunk>> {
    let chunker = Chunker::new(ChunkingConfig::new(100, 20)).unwrap();
    chunker.split(&Document::new(source_id, text)).into_iter().map(Arc::new).collect()
}

#[test]
fn query_before_any_add_is_empty_corpus() {
    let index = LexicalIndex::new(LexicalSettings::default()).unwrap();
    assert!(matches!(index.query("anything", 5), Err(Error::EmptyCorpus)));
    assert!(index.snapshot().is_none());
    assert!(index.is_empty());
}

#[test]
fn add_rebuilds_over_entire_corpus() {
    let index = LexicalIndex::new(LexicalSettings::default()).unwrap();
    let first = index.add(&chunks_of("fire.txt", "Build a fire with dry tinder and kindling.")).unwrap();
    assert_eq!(first.len(), 1);
    let second = index.add(&chunks_of("water.txt", "Boil water before drinking it.")).unwrap();
    assert_eq!(second.len(), 2);
    assert!(second.generation() > first.generation());

    let hits = index.query("tinder", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].chunk.source_id, "fire.txt");
    let hits = index.query("water", 5).unwrap();
    assert_eq!(hits[0].chunk.source_id, "water.txt");
    // the earlier snapshot is untouched by the later rebuild
    assert!(first.query("water", 5).is_empty());
}

#[test]
fn re_adding_a_document_duplicates_lexical_entries() {
    let index = LexicalIndex::new(LexicalSettings::default()).unwrap();
    let chunks = chunks_of("a.txt", "Paris is the capital of France.");
    index.add(&chunks).unwrap();
    index.add(&chunks).unwrap();
    assert_eq!(index.len(), 2 * chunks.len());
    assert_eq!(index.query("paris", 10).unwrap().len(), 2);
}

#[test]
fn capacity_overflow_keeps_previous_snapshot() {
    let settings = LexicalSettings { max_corpus_chunks: Some(1), ..LexicalSettings::default() };
    let index = LexicalIndex::new(settings).unwrap();
    let good = index.add(&chunks_of("one.txt", "first document")).unwrap();
    let err = index.add(&chunks_of("two.txt", "second document")).unwrap_err();
    assert!(matches!(err, Error::LexicalRebuildFailed(_)));
    assert_eq!(index.len(), 2);
    let latest = index.snapshot().unwrap();
    assert_eq!(latest.generation(), good.generation());
    assert!(index.query("second", 5).unwrap().is_empty());
}

#[test]
fn concurrent_adds_lose_no_chunks() {
    let index = Arc::new(LexicalIndex::new(LexicalSettings::default()).unwrap());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let chunks = chunks_of(&format!("doc{i}.txt"), &format!("unique{i} shared words"));
                index.add(&chunks).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(index.len(), 8);
    let latest = index.snapshot().unwrap();
    assert_eq!(latest.len(), 8);
    for i in 0..8 {
        assert_eq!(index.query(&format!("unique{i}"), 5).unwrap().len(), 1);
    }
}
