use rag_core::config::EmbeddingSettings;
use rag_core::traits::Embedder;
use rag_embed::{embedder_from_settings, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let embedder = HashEmbedder::new(384);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384);
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_words_are_more_similar() {
    let embedder = HashEmbedder::new(256);
    let query = embedder.embed("capital of France").unwrap();
    let near = embedder.embed("Paris is the capital of France.").unwrap();
    let far = embedder.embed("Boil water before drinking").unwrap();
    assert!(cosine(&query, &near) > cosine(&query, &far));
}

#[test]
fn default_settings_build_the_hash_embedder() {
    let embedder = embedder_from_settings(&EmbeddingSettings::default()).expect("embedder");
    assert_eq!(embedder.dim(), 384);
}
