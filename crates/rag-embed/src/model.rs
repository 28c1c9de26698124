use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use rag_core::config::expand_path;
use rag_core::error::{Error, Result};
use rag_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub const BGE_M3_DIM: usize = 1024;
const MAX_LEN: usize = 256;

fn unavailable(e: impl std::fmt::Display) -> Error {
    Error::EmbeddingUnavailable(e.to_string())
}

/// BGE-M3 dense embeddings computed locally with candle.
///
/// Expects `tokenizer.json`, `config.json` and `pytorch_model.bin` in the
/// model directory.
pub struct BgeM3Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl BgeM3Embedder {
    pub fn new(model_dir: Option<&str>) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_dir)?;
        info!(dir = %model_dir.display(), "loading BGE-M3 model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| unavailable(format!("failed to load tokenizer from {}: {e}", tokenizer_path.display())))?;
        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)
            .map_err(|e| unavailable(format!("invalid model config {}: {e}", config_path.display())))?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path).map_err(unavailable)?;
        let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb).map_err(unavailable)?;
        info!("BGE-M3 model loaded");
        Ok(Self { model, tokenizer, device })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = input_ids.zeros_like().map_err(unavailable)?;
        let hidden = self
            .model
            .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)
            .map_err(unavailable)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask).map_err(unavailable)?;
        let emb: Vec<f32> = pooled
            .to_device(&Device::Cpu)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(unavailable)?;
        if emb.len() != BGE_M3_DIM {
            return Err(unavailable(format!("model produced {} dims, expected {BGE_M3_DIM}", emb.len())));
        }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            warn!(ms = elapsed.as_millis() as u64, "slow embedding");
        }
        Ok(emb)
    }
}

impl Embedder for BgeM3Embedder {
    fn dim(&self) -> usize {
        BGE_M3_DIM
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        debug!(batch = texts.len(), "embedding batch");
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let candidates = configured
        .map(expand_path)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::env::var("MODEL_DIR").ok().map(PathBuf::from))
        .chain([Path::new("../models/bge-m3").to_path_buf(), Path::new("models/bge-m3").to_path_buf()]);
    for dir in candidates {
        if dir.exists() {
            return Ok(dir);
        }
    }
    Err(unavailable("could not locate BGE-M3 model directory"))
}
