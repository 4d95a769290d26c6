//! The semantic cache façade.

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use snapchef_embeddings::Embedder;
use snapchef_embeddings::similarity::is_zero;

use crate::config::CacheConfig;
use crate::document::{
    LEGACY_NUTRITION_PREFIX, Nutrition, Recipe, UnifiedDocument, is_legacy_key, normalize_key,
};
use crate::error::{CacheError, Result};
use crate::migration::{self, MigrationReport};
use crate::store::CacheStore;

/// Persistent cache of recipes and nutrition facts, matched by food-name
/// embedding distance.
///
/// Construct one per store directory and share it as `Arc<SemanticCache>`.
/// Writers are serialized internally; every mutation is applied to a copy of
/// the store, persisted, and only then made visible.
pub struct SemanticCache {
    /// Configuration.
    config: CacheConfig,

    /// Embedding function for keys and queries.
    embedder: Embedder,

    /// Live store.
    state: RwLock<CacheStore>,
}

/// Result of an [`SemanticCache::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// A new document was embedded at `slot`.
    Inserted { slot: usize },

    /// An existing document at `slot` was updated.
    Merged { slot: usize },

    /// Nothing was written: embeddings are unavailable or persisting failed.
    Skipped,
}

/// Statistics about the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of live documents.
    pub total_documents: usize,

    /// Number of vectors in the index, tombstones included.
    pub vector_count: usize,

    /// Embedding width.
    pub embedding_dimension: usize,

    /// Whether the embedding backend is usable.
    pub model_available: bool,

    /// Slots retired by migration.
    pub tombstoned_slots: usize,
}

impl SemanticCache {
    /// Open the cache stored under `config.store_dir`.
    ///
    /// Never fails: an unreadable store opens empty.
    pub async fn open(config: CacheConfig, embedder: Embedder) -> Self {
        if let Err(e) = fs::create_dir_all(&config.store_dir).await {
            warn!(
                "Cannot create cache directory {}: {e}",
                config.store_dir.display()
            );
        }

        let store = CacheStore::load(&config.store_dir, embedder.dimension()).await;
        info!(
            "Semantic cache ready at {} ({} documents, embeddings {})",
            config.store_dir.display(),
            store.len(),
            if embedder.is_available() {
                "available"
            } else {
                "unavailable"
            }
        );

        Self {
            config,
            embedder,
            state: RwLock::new(store),
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The embedding function in use.
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Closest stored document to `query`, if it is nearer than `threshold`.
    pub async fn find_similar(
        &self,
        query: &str,
        k: usize,
        threshold: f32,
    ) -> Option<UnifiedDocument> {
        if !self.embedder.is_available() {
            debug!("Embeddings unavailable, skipping lookup for '{query}'");
            return None;
        }
        if self.state.read().await.is_empty() {
            return None;
        }

        let embedding = self.embedder.embed(query.trim()).await;
        if is_zero(&embedding) {
            return None;
        }

        let state = self.state.read().await;
        let neighbors = match state.search(&embedding, k.max(1)) {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!("Cache search failed for '{query}': {e}");
                return None;
            }
        };

        let best = neighbors.first()?;
        let document = state.resolve(best.slot)?;
        if best.distance < threshold {
            debug!(
                "Cache hit for '{query}': '{}' at distance {:.4}",
                document.food_name, best.distance
            );
            Some(document.clone())
        } else {
            debug!(
                "Cache miss for '{query}': nearest '{}' at distance {:.4} (threshold {threshold})",
                document.food_name, best.distance
            );
            None
        }
    }

    /// Near match for a recipe lookup.
    pub async fn find_recipe(&self, query: &str) -> Option<UnifiedDocument> {
        self.find_similar(query, self.config.search_k, self.config.recipe_threshold)
            .await
    }

    /// Near match for a nutrition lookup.
    pub async fn find_nutrition(&self, query: &str) -> Option<UnifiedDocument> {
        self.find_similar(query, self.config.search_k, self.config.nutrition_threshold)
            .await
    }

    /// Store either half for `food_name`, merging into an existing document.
    ///
    /// Only misuse is an error: a blank name, a name using the legacy
    /// `nutrition_` prefix, or neither half supplied.
    /// Backend and storage failures leave the cache unchanged and report
    /// [`UpsertOutcome::Skipped`].
    pub async fn upsert(
        &self,
        food_name: &str,
        recipe: Option<Recipe>,
        nutrition: Option<Nutrition>,
    ) -> Result<UpsertOutcome> {
        let food_name = food_name.trim();
        let key = normalize_key(food_name);
        if key.is_empty() {
            return Err(CacheError::InvalidDocument("blank food name".to_string()));
        }
        if is_legacy_key(&key) {
            return Err(CacheError::InvalidDocument(format!(
                "'{food_name}' uses the reserved '{LEGACY_NUTRITION_PREFIX}' prefix"
            )));
        }
        if recipe.is_none() && nutrition.is_none() {
            return Err(CacheError::InvalidDocument(format!(
                "'{food_name}' has neither recipe nor nutrition"
            )));
        }
        if !self.embedder.is_available() {
            debug!("Embeddings unavailable, not caching '{food_name}'");
            return Ok(UpsertOutcome::Skipped);
        }

        // Embed outside the write lock; merges reuse the stored embedding.
        let embedding = if self.state.read().await.contains(&key) {
            None
        } else {
            match self.embedder.try_embed(food_name).await {
                // A zero vector is never searched, so it could not be found again.
                Ok(embedding) if is_zero(&embedding) => {
                    warn!("Not caching '{food_name}': embedding is all zeros");
                    return Ok(UpsertOutcome::Skipped);
                }
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    warn!("Not caching '{food_name}': {e}");
                    return Ok(UpsertOutcome::Skipped);
                }
            }
        };

        let mut state = self.state.write().await;
        let mut next = state.clone();

        let applied = if let Some(existing) = next.get(&key) {
            let mut document = existing.clone();
            document.merge(recipe, nutrition);
            let slot = document.index_id;
            next.put(&key, document)
                .map(|()| UpsertOutcome::Merged { slot })
        } else if let Some(embedding) = embedding {
            UnifiedDocument::new(food_name, recipe, nutrition, 0)
                .and_then(|document| next.append(key.clone(), document, embedding))
                .map(|slot| UpsertOutcome::Inserted { slot })
        } else {
            debug!("'{key}' vanished before it could be merged");
            return Ok(UpsertOutcome::Skipped);
        };

        let outcome = match applied {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Not caching '{food_name}': {e}");
                return Ok(UpsertOutcome::Skipped);
            }
        };

        if let Err(e) = next.persist().await {
            warn!("Failed to persist cache, keeping previous state: {e}");
            return Ok(UpsertOutcome::Skipped);
        }

        *state = next;
        debug!("Upserted '{key}': {outcome:?}");
        Ok(outcome)
    }

    /// Delete the persisted store and empty the cache.
    ///
    /// Returns `false`, with memory untouched, if `metadata.json` cannot be
    /// removed. Once it is gone the cache is empty on disk too.
    pub async fn clear(&self) -> bool {
        let mut state = self.state.write().await;
        match CacheStore::remove_files(state.root()).await {
            Ok(()) => {
                state.clear();
                info!("Semantic cache cleared");
                true
            }
            Err(e) => {
                warn!("Failed to clear cache: {e}");
                false
            }
        }
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            total_documents: state.len(),
            vector_count: state.vector_count(),
            embedding_dimension: self.embedder.dimension(),
            model_available: self.embedder.is_available(),
            tombstoned_slots: state.tombstones(),
        }
    }

    /// All documents in slot order.
    pub async fn documents(&self) -> Vec<UnifiedDocument> {
        self.state
            .read()
            .await
            .all()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Exact lookup by food name, ignoring case and surrounding whitespace.
    pub async fn get(&self, food_name: &str) -> Option<UnifiedDocument> {
        self.state
            .read()
            .await
            .get(&normalize_key(food_name))
            .cloned()
    }

    /// Snapshot of the slot table.
    pub async fn food_names(&self) -> Vec<Option<String>> {
        self.state.read().await.food_names().to_vec()
    }

    /// Check if the store still holds legacy documents.
    pub async fn needs_migration(&self) -> bool {
        let state = self.state.read().await;
        migration::needs_migration(&state)
    }

    /// Convert legacy documents to the unified layout.
    ///
    /// On failure the live store, in memory and on disk, is left as it was.
    pub async fn migrate(&self) -> Result<MigrationReport> {
        let mut state = self.state.write().await;
        if !migration::needs_migration(&state) {
            return Ok(MigrationReport::default());
        }

        let (next, report) = migration::migrate(&state)?;
        next.persist()
            .await
            .map_err(|e| CacheError::Migration(format!("persisting migrated store: {e}")))?;

        *state = next;
        Ok(report)
    }

    /// Run [`SemanticCache::migrate`] when legacy documents are present.
    pub async fn migrate_if_needed(&self) -> Result<Option<MigrationReport>> {
        if !self.needs_migration().await {
            debug!("Cache is already in the unified layout");
            return Ok(None);
        }

        info!("Legacy cache layout detected, migrating");
        self.migrate().await.map(Some)
    }
}

impl std::fmt::Debug for SemanticCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticCache")
            .field("config", &self.config)
            .field("embedder", &self.embedder)
            .finish_non_exhaustive()
    }
}
