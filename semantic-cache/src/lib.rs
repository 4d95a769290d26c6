//! # Semantic Cache
//!
//! Persistent cache of generated recipes and nutrition facts, keyed by an
//! embedding of the food name. A query is served from the cache when the
//! nearest stored food is closer than a per-kind distance threshold, so
//! "garlic bread" and "Garlic Bread " share one entry.
//!
//! - **Unified documents**: one record per food holding either or both of
//!   the recipe and nutrition halves
//! - **Lock-step storage**: the vector index, slot table and documents are
//!   one value persisted to a single directory
//! - **Degraded mode**: without an embedding backend every lookup misses
//!   and nothing is stored
//! - **Migration**: converts the legacy `nutrition_<food>` layout
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Semantic Cache                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  find_similar / upsert ──► Embedder ──► CacheStore              │
//! │                                          │                      │
//! │                     ┌────────────────────┼──────────────┐       │
//! │                     ▼                    ▼              ▼       │
//! │               FlatIndex          slot table        documents    │
//! │             (faiss_index)    (food_names.bin)  (metadata.json)  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Deployment
//!
//! A store directory supports one writing process. Writers inside a process
//! are serialized, but no file lock is taken: running several instances over
//! the same directory needs an external lock.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use snapchef_semantic_cache::{CacheConfig, SemanticCache};
//!
//! let config = CacheConfig::new("/var/lib/snapchef/cache");
//! let embedder = config.embedding.build_embedder();
//! let cache = Arc::new(SemanticCache::open(config, embedder).await);
//!
//! cache.migrate_if_needed().await?;
//! if let Some(doc) = cache.find_recipe("garlic bread").await {
//!     println!("{:?}", doc.recipe);
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod migration;
pub mod semantic;
pub mod store;

pub use config::{CacheConfig, EmbeddingConfig, EmbeddingProviderType};
pub use document::{Nutrition, Recipe, UnifiedDocument, normalize_key};
pub use error::{CacheError, Result, StorageError};
pub use migration::MigrationReport;
pub use semantic::{CacheStats, SemanticCache, UpsertOutcome};
pub use store::CacheStore;

// Re-export from dependencies for convenience
pub use snapchef_embeddings::{Embedder, EmbeddingProvider};
