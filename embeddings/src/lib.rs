//! # Embeddings
//!
//! Food-name embeddings and the vector index that the SnapChef semantic
//! cache is built on.
//!
//! ## Features
//!
//! - **Embedding Function**: [`Embedder`] maps a food name to a fixed-width
//!   vector and degrades to a zero vector when its backend is unavailable
//! - **Providers**: OpenAI-compatible HTTP endpoints, or an offline
//!   trigram-hashing provider
//! - **Vector Index**: [`FlatIndex`], an append-only exact squared-L2 index
//!   persisted to a single binary file
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedder ──► Embedding ──► FlatIndex     │
//! │       │                                              │          │
//! │       ▼                                              ▼          │
//! │  Http / Hashing                               Neighbor (slot)   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod embedder;
pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use embedder::Embedder;
pub use error::{EmbeddingError, Result};
pub use index::FlatIndex;
pub use provider::{
    EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, HashingProvider,
    HttpEmbeddingProvider,
};
pub use similarity::{Neighbor, squared_l2};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;
