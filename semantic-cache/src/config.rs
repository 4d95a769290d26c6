//! Configuration for the semantic cache.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use snapchef_embeddings::{DEFAULT_DIMENSION, Embedder, HashingProvider, HttpEmbeddingProvider};

/// Configuration for the semantic cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding `metadata.json`, `faiss_index` and `food_names.bin`.
    pub store_dir: PathBuf,

    /// Exclusive distance bound for recipe lookups.
    pub recipe_threshold: f32,

    /// Exclusive distance bound for nutrition lookups. Tighter than recipes:
    /// a near-miss nutrition match is worse than a near-miss recipe.
    pub nutrition_threshold: f32,

    /// Neighbors fetched per lookup; only the best one is considered.
    pub search_k: usize,

    /// Embedding backend configuration.
    pub embedding: EmbeddingConfig,
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new(store_dir: impl Into<PathBuf>) -> Self {
        Self {
            store_dir: store_dir.into(),
            recipe_threshold: 0.6,
            nutrition_threshold: 0.5,
            search_k: 1,
            embedding: EmbeddingConfig::default(),
        }
    }

    /// Set the recipe lookup threshold.
    pub fn with_recipe_threshold(mut self, threshold: f32) -> Self {
        self.recipe_threshold = threshold;
        self
    }

    /// Set the nutrition lookup threshold.
    pub fn with_nutrition_threshold(mut self, threshold: f32) -> Self {
        self.nutrition_threshold = threshold;
        self
    }

    /// Set the embedding configuration.
    pub fn with_embedding(mut self, config: EmbeddingConfig) -> Self {
        self.embedding = config;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(dirs::data_dir().unwrap_or_default().join("snapchef/cache"))
    }
}

/// Configuration for the embedding backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Which provider to use.
    pub provider: EmbeddingProviderType,

    /// Model name sent to HTTP providers.
    pub model: String,

    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: String,

    /// Environment variable holding the API key, if the endpoint needs one.
    pub api_key_env: Option<String>,

    /// Embedding width. Changing it invalidates the persisted index.
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::Hashing,
            model: "all-MiniLM-L6-v2".to_string(),
            base_url: "http://127.0.0.1:8080/v1".to_string(),
            api_key_env: None,
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl EmbeddingConfig {
    /// Build the embedding function this configuration describes.
    pub fn build_embedder(&self) -> Embedder {
        match self.provider {
            EmbeddingProviderType::Http => {
                let mut provider =
                    HttpEmbeddingProvider::new(&self.base_url, &self.model, self.dimension);

                if let Some(var) = &self.api_key_env {
                    match std::env::var(var) {
                        Ok(key) => provider = provider.with_api_key(key),
                        Err(_) => warn!("Embedding API key variable {var} is not set"),
                    }
                }

                info!("Using HTTP embeddings from {} ({})", self.base_url, self.model);
                Embedder::new(Arc::new(provider))
            }
            EmbeddingProviderType::Hashing => {
                info!("Using offline hashing embeddings ({} dims)", self.dimension);
                Embedder::new(Arc::new(HashingProvider::new(self.dimension)))
            }
            EmbeddingProviderType::None => {
                warn!("Embeddings disabled, semantic cache will not store or match");
                Embedder::disabled(self.dimension)
            }
        }
    }
}

/// Type of embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderType {
    /// OpenAI-compatible HTTP endpoint.
    Http,
    /// Offline trigram hashing.
    Hashing,
    /// No embeddings; the cache runs disabled.
    None,
}
