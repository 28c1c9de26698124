//! Configuration loader, typed engine settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_FUSION__LEXICAL_WEIGHT=0.5`).
//! Every setting has a default, so an empty environment yields a working
//! in-process engine.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::chunker::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    /// Build from an inline TOML document; used by tests and embedders of
    /// the engine that manage their own config files.
    pub fn from_toml_str(toml: &str) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the engine settings, falling back to defaults for
    /// anything not configured.
    pub fn settings(&self) -> Result<EngineSettings> {
        let settings: EngineSettings = Figment::from(Serialized::defaults(EngineSettings::default()))
            .merge(self.figment.clone())
            .extract()
            .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub chunking: ChunkingConfig,
    pub lexical: LexicalSettings,
    pub fusion: FusionSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
}

impl EngineSettings {
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.lexical.validate()?;
        self.fusion.validate()?;
        if self.retrieval.default_k == 0 {
            return Err(Error::InvalidConfiguration("retrieval.default_k must be greater than 0".into()));
        }
        if self.retrieval.candidate_multiplier == 0 {
            return Err(Error::InvalidConfiguration("retrieval.candidate_multiplier must be at least 1".into()));
        }
        if self.embedding.dim == 0 || self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfiguration("embedding.dim and embedding.batch_size must be greater than 0".into()));
        }
        Ok(())
    }
}

/// BM25 saturation and length-normalization constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalSettings {
    pub k1: f32,
    pub b: f32,
    /// Upper bound on the lexical corpus; a rebuild past it fails and the
    /// engine keeps serving the last good snapshot.
    pub max_corpus_chunks: Option<usize>,
}

impl Default for LexicalSettings {
    fn default() -> Self {
        Self { k1: 1.2, b: 0.75, max_corpus_chunks: None }
    }
}

impl LexicalSettings {
    pub fn validate(&self) -> Result<()> {
        if !self.k1.is_finite() || self.k1 < 0.0 {
            return Err(Error::InvalidConfiguration(format!("lexical.k1 must be a non-negative number, got {}", self.k1)));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(Error::InvalidConfiguration(format!("lexical.b must be within [0, 1], got {}", self.b)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStrategy {
    /// Max-normalized weighted score sum.
    #[default]
    Weighted,
    /// Weighted reciprocal-rank sum, `weight / (rrf_k + rank)`.
    ReciprocalRank,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    pub lexical_weight: f32,
    pub vector_weight: f32,
    pub strategy: FusionStrategy,
    pub rrf_k: usize,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self { lexical_weight: 0.4, vector_weight: 0.6, strategy: FusionStrategy::Weighted, rrf_k: 60 }
    }
}

impl FusionSettings {
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [("lexical_weight", self.lexical_weight), ("vector_weight", self.vector_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::InvalidConfiguration(format!("fusion.{name} must be a non-negative number, got {w}")));
            }
        }
        if self.strategy == FusionStrategy::ReciprocalRank && self.rrf_k == 0 {
            return Err(Error::InvalidConfiguration("fusion.rrf_k must be greater than 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub default_k: usize,
    /// Each retriever is asked for `k * candidate_multiplier` candidates
    /// before fusion and truncation.
    pub candidate_multiplier: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { default_k: 4, candidate_multiplier: 2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProvider {
    #[default]
    Hash,
    BgeM3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub dim: usize,
    pub model_dir: Option<String>,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Hash, dim: 384, model_dir: None, batch_size: 32 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorBackend {
    #[default]
    Memory,
    Lancedb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    pub backend: VectorBackend,
    pub uri: String,
    pub table: String,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self { backend: VectorBackend::Memory, uri: "./data/lancedb".to_string(), table: "chunks".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
