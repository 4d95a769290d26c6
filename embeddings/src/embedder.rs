//! The embedding function used by the cache.
//!
//! [`Embedder`] pins a provider to a fixed dimension and absorbs backend
//! failures: [`Embedder::embed`] always returns a vector of the configured
//! width, falling back to zeros so retrieval degrades to "no match".

use std::sync::Arc;

use tracing::warn;

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingRequest};

/// Fixed-dimension embedding function over an optional provider.
#[derive(Clone)]
pub struct Embedder {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    dimension: usize,
}

impl Embedder {
    /// Wrap `provider`, using its default dimension.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        let dimension = provider.default_dimension();
        Self {
            provider: Some(provider),
            dimension,
        }
    }

    /// An embedder with no backend. Every lookup misses and nothing is stored.
    pub fn disabled(dimension: usize) -> Self {
        Self {
            provider: None,
            dimension,
        }
    }

    /// Width of every vector this embedder returns.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether a usable backend is attached.
    pub fn is_available(&self) -> bool {
        self.provider
            .as_ref()
            .is_some_and(|provider| provider.is_available())
    }

    /// Name of the backing provider, if any.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider.as_ref().map(|provider| provider.name())
    }

    /// Embed `text`, surfacing backend errors.
    pub async fn try_embed(&self, text: &str) -> Result<Embedding> {
        let provider = self
            .provider
            .as_ref()
            .filter(|provider| provider.is_available())
            .ok_or(EmbeddingError::Unavailable)?;

        let response = provider.embed(EmbeddingRequest::new(text)).await?;

        if response.embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: response.embedding.len(),
            });
        }

        Ok(response.embedding)
    }

    /// Embed `text`, returning a zero vector when the backend fails.
    pub async fn embed(&self, text: &str) -> Embedding {
        match self.try_embed(text).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding unavailable for '{text}': {e}");
                vec![0.0; self.dimension]
            }
        }
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("provider", &self.provider_name())
            .field("dimension", &self.dimension)
            .finish()
    }
}
