//! Integration tests for the semantic cache.
//!
//! Embeddings come from a fixed table so distances are exact.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use snapchef_embeddings::{
    Embedder, EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse,
};
use snapchef_semantic_cache::store::{FOOD_NAMES_FILE, INDEX_FILE, METADATA_FILE};
use snapchef_semantic_cache::{
    CacheConfig, CacheError, CacheStore, MigrationReport, Nutrition, Recipe, SemanticCache,
    UnifiedDocument, UpsertOutcome,
};

/// Provider returning hand-picked 2-d vectors.
struct FixedProvider {
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedProvider {
    fn new(entries: &[(&str, [f32; 2])]) -> Self {
        Self {
            vectors: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.to_vec()))
                .collect(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    fn default_model(&self) -> &str {
        "fixed"
    }

    fn default_dimension(&self) -> usize {
        2
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> snapchef_embeddings::Result<EmbeddingResponse> {
        let embedding = self
            .vectors
            .get(&request.text)
            .cloned()
            .ok_or_else(|| EmbeddingError::InvalidResponse(format!("no vector for {}", request.text)))?;
        Ok(EmbeddingResponse {
            dimension: embedding.len(),
            embedding,
            model: "fixed".to_string(),
            tokens_used: None,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

fn embedder() -> Embedder {
    Embedder::new(Arc::new(FixedProvider::new(&[
        ("Rice", [1.0, 0.0]),
        ("rice", [1.0, 0.0]),
        ("rice-ish", [1.0, 0.5]),
        ("Kale Soup", [0.0, 1.0]),
        ("kale soup", [0.0, 1.0]),
        ("Ramen", [-1.0, 0.0]),
        ("near legacy", [0.0, 0.9]),
        ("Nothing", [0.0, 0.0]),
    ])))
}

async fn open(dir: &Path) -> SemanticCache {
    SemanticCache::open(CacheConfig::new(dir), embedder()).await
}

fn nutrition(calories: f64) -> Nutrition {
    Nutrition {
        calories,
        protein: 2.7,
        carbs: 28.0,
        fat: 0.3,
    }
}

fn soup_recipe() -> Recipe {
    Recipe {
        name: "Kale Soup Recipe".to_string(),
        ingredients: vec!["2 cups kale".to_string(), "1 onion".to_string()],
        instructions: vec!["Simmer the kale with the onion.".to_string()],
        quantity: "300g".to_string(),
    }
}

/// Every live slot names a document that points back at it.
fn assert_aligned(documents: &[UnifiedDocument], food_names: &[Option<String>]) {
    for doc in documents {
        assert_eq!(
            food_names[doc.index_id].as_deref(),
            Some(doc.key().as_str()),
            "slot {} does not name '{}'",
            doc.index_id,
            doc.food_name
        );
    }
    assert_eq!(
        food_names.iter().flatten().count(),
        documents.len(),
        "live slots and documents differ"
    );
}

#[tokio::test]
async fn test_threshold_is_exclusive() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;
    cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();

    // Squared distance from [1, 0.5] to [1, 0] is exactly 0.25.
    assert!(cache.find_similar("rice-ish", 1, 0.25).await.is_none());
    let hit = cache.find_similar("rice-ish", 1, 0.2501).await.unwrap();
    assert_eq!(hit.food_name, "Rice");

    // Exact matches are at distance zero, so even a zero threshold misses.
    assert!(cache.find_similar("rice", 1, 0.0).await.is_none());
    assert!(cache.find_similar("rice", 1, f32::EPSILON).await.is_some());
}

#[tokio::test]
async fn test_upsert_merges_halves() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;

    let first = cache
        .upsert("Kale Soup", None, Some(nutrition(45.0)))
        .await
        .unwrap();
    let second = cache
        .upsert(" kale soup ", Some(soup_recipe()), None)
        .await
        .unwrap();
    let third = cache
        .upsert("KALE SOUP", Some(soup_recipe()), None)
        .await
        .unwrap();

    assert_eq!(first, UpsertOutcome::Inserted { slot: 0 });
    assert_eq!(second, UpsertOutcome::Merged { slot: 0 });
    assert_eq!(third, UpsertOutcome::Merged { slot: 0 });

    let doc = cache.get("kale soup").await.unwrap();
    assert_eq!(doc.food_name, "Kale Soup");
    assert_eq!(doc.recipe, Some(soup_recipe()));
    assert_eq!(doc.nutrition, Some(nutrition(45.0)));

    let stats = cache.stats().await;
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.vector_count, 1);
}

#[tokio::test]
async fn test_lookup_sees_state_before_upsert() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;

    assert!(cache.find_recipe("Rice").await.is_none());
    cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();
    assert!(cache.find_recipe("Rice").await.is_some());
}

#[tokio::test]
async fn test_reload_keeps_documents_and_slots() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;
    cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();
    cache.upsert("Kale Soup", Some(soup_recipe()), None).await.unwrap();
    cache.upsert("Ramen", None, Some(nutrition(436.0))).await.unwrap();
    cache.upsert("Rice", Some(soup_recipe()), None).await.unwrap();

    let documents = cache.documents().await;
    let food_names = cache.food_names().await;
    assert_aligned(&documents, &food_names);
    drop(cache);

    let reopened = open(temp_dir.path()).await;
    assert_eq!(reopened.documents().await, documents);
    assert_eq!(reopened.food_names().await, food_names);
    assert_eq!(
        reopened.find_nutrition("Ramen").await.unwrap().nutrition,
        Some(nutrition(436.0))
    );
}

#[tokio::test]
async fn test_clear_removes_everything() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;
    cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();

    assert!(cache.clear().await);

    for name in [METADATA_FILE, INDEX_FILE, FOOD_NAMES_FILE] {
        assert!(!temp_dir.path().join(name).exists(), "{name} still exists");
    }
    assert_eq!(cache.stats().await.vector_count, 0);
    assert!(cache.find_nutrition("Rice").await.is_none());

    let outcome = cache.upsert("Ramen", None, Some(nutrition(436.0))).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Inserted { slot: 0 });
}

#[tokio::test]
async fn test_degraded_mode() {
    let temp_dir = TempDir::new().unwrap();
    let cache = SemanticCache::open(CacheConfig::new(temp_dir.path()), Embedder::disabled(2)).await;

    let outcome = cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();
    assert_eq!(outcome, UpsertOutcome::Skipped);
    assert!(cache.find_nutrition("Rice").await.is_none());

    let stats = cache.stats().await;
    assert!(!stats.model_available);
    assert_eq!(stats.total_documents, 0);
    assert!(!temp_dir.path().join(METADATA_FILE).exists());

    // Misuse is still reported.
    assert!(matches!(
        cache.upsert("Rice", None, None).await,
        Err(CacheError::InvalidDocument(_))
    ));
}

#[tokio::test]
async fn test_unembeddable_name_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;

    let outcome = cache
        .upsert("Unknown Dish", None, Some(nutrition(1.0)))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Skipped);
    assert_eq!(cache.stats().await.vector_count, 0);
}

#[tokio::test]
async fn test_zero_embedding_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;

    let outcome = cache
        .upsert("Nothing", None, Some(nutrition(1.0)))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Skipped);
    assert!(cache.get("Nothing").await.is_none());
    assert_eq!(cache.stats().await.vector_count, 0);
}

#[tokio::test]
async fn test_clear_with_stuck_index_file() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;
    cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();

    // A non-empty directory in place of the index cannot be deleted.
    let index_path = temp_dir.path().join(INDEX_FILE);
    std::fs::remove_file(&index_path).unwrap();
    std::fs::create_dir(&index_path).unwrap();
    std::fs::write(index_path.join("stuck"), b"x").unwrap();

    assert!(cache.clear().await);
    assert!(!temp_dir.path().join(METADATA_FILE).exists());
    assert_eq!(cache.stats().await.total_documents, 0);
    assert!(cache.get("Rice").await.is_none());
    drop(cache);

    let reopened = open(temp_dir.path()).await;
    assert_eq!(reopened.stats().await.total_documents, 0);
}

#[tokio::test]
async fn test_corrupt_files_open_empty() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;
    cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();
    drop(cache);

    std::fs::write(temp_dir.path().join(INDEX_FILE), b"not an index").unwrap();
    let reopened = open(temp_dir.path()).await;
    assert_eq!(reopened.stats().await.total_documents, 0);
    drop(reopened);

    std::fs::write(temp_dir.path().join(METADATA_FILE), b"{").unwrap();
    let reopened = open(temp_dir.path()).await;
    assert_eq!(reopened.stats().await.total_documents, 0);
    assert!(reopened.find_nutrition("Rice").await.is_none());
}

#[tokio::test]
async fn test_persist_failure_rolls_back() {
    let temp_dir = TempDir::new().unwrap();
    let cache = open(temp_dir.path()).await;
    cache.upsert("Rice", None, Some(nutrition(130.0))).await.unwrap();

    // A directory where the index temp file goes makes every persist fail.
    let blocker = temp_dir.path().join(INDEX_FILE).with_extension("tmp");
    std::fs::create_dir(&blocker).unwrap();

    let merged = cache.upsert("Rice", Some(soup_recipe()), None).await.unwrap();
    let inserted = cache.upsert("Ramen", None, Some(nutrition(436.0))).await.unwrap();
    assert_eq!(merged, UpsertOutcome::Skipped);
    assert_eq!(inserted, UpsertOutcome::Skipped);

    assert_eq!(cache.get("Rice").await.unwrap().recipe, None);
    assert!(cache.get("Ramen").await.is_none());
    assert_eq!(cache.stats().await.vector_count, 1);

    std::fs::remove_dir(&blocker).unwrap();
    let retried = cache.upsert("Ramen", None, Some(nutrition(436.0))).await.unwrap();
    assert_eq!(retried, UpsertOutcome::Inserted { slot: 1 });
}

/// Store in the legacy layout: one unified document and two legacy ones.
async fn seed_legacy(dir: &Path) {
    let mut store = CacheStore::empty(dir, 2);
    let rice = UnifiedDocument::new("Rice", Some(soup_recipe()), None, 0).unwrap();
    store.append("rice", rice, vec![1.0, 0.0]).unwrap();
    let legacy_rice = UnifiedDocument::new("rice", None, Some(nutrition(130.0)), 0).unwrap();
    store.append("nutrition_rice", legacy_rice, vec![0.0, 1.0]).unwrap();
    let legacy_ramen = UnifiedDocument::new("ramen", None, Some(nutrition(436.0)), 0).unwrap();
    store
        .append("nutrition_ramen", legacy_ramen, vec![-1.0, 0.0])
        .unwrap();
    store.persist().await.unwrap();
}

#[tokio::test]
async fn test_migration_merges_and_promotes() {
    let temp_dir = TempDir::new().unwrap();
    seed_legacy(temp_dir.path()).await;
    let cache = open(temp_dir.path()).await;

    assert!(cache.needs_migration().await);
    let report = cache.migrate_if_needed().await.unwrap();
    assert_eq!(
        report,
        Some(MigrationReport {
            merged: 1,
            promoted: 1,
            dropped: 0
        })
    );

    let rice = cache.get("rice").await.unwrap();
    assert_eq!(rice.recipe, Some(soup_recipe()));
    assert_eq!(rice.nutrition, Some(nutrition(130.0)));
    let ramen = cache.get("ramen").await.unwrap();
    assert_eq!(ramen.index_id, 2);
    assert_eq!(ramen.recipe, None);

    assert_eq!(
        cache.food_names().await,
        vec![Some("rice".to_string()), None, Some("ramen".to_string())]
    );
    assert_aligned(&cache.documents().await, &cache.food_names().await);

    // Second run is a no-op, also after a reload.
    assert_eq!(cache.migrate().await.unwrap(), MigrationReport::default());
    drop(cache);
    let reopened = open(temp_dir.path()).await;
    assert!(!reopened.needs_migration().await);
    assert_eq!(reopened.migrate_if_needed().await.unwrap(), None);
    assert_eq!(reopened.stats().await.tombstoned_slots, 1);
}

#[tokio::test]
async fn test_tombstones_never_match() {
    let temp_dir = TempDir::new().unwrap();
    seed_legacy(temp_dir.path()).await;
    let cache = open(temp_dir.path()).await;
    cache.migrate().await.unwrap();

    // Nearest vector is the tombstoned legacy slot at [0, 1].
    assert!(cache.find_similar("near legacy", 1, 0.5).await.is_none());
    let hit = cache.find_similar("near legacy", 1, 2.0).await.unwrap();
    assert_ne!(hit.index_id, 1);
}

#[tokio::test]
async fn test_failed_migration_keeps_legacy_store() {
    let temp_dir = TempDir::new().unwrap();
    seed_legacy(temp_dir.path()).await;
    let cache = open(temp_dir.path()).await;

    let blocker = temp_dir.path().join(INDEX_FILE).with_extension("tmp");
    std::fs::create_dir(&blocker).unwrap();

    assert!(matches!(
        cache.migrate().await,
        Err(CacheError::Migration(_))
    ));
    assert!(cache.needs_migration().await);
    assert!(cache.get("nutrition_ramen").await.is_some());
    drop(cache);

    std::fs::remove_dir(&blocker).unwrap();
    let reopened = open(temp_dir.path()).await;
    assert!(reopened.needs_migration().await);
    assert_eq!(reopened.stats().await.total_documents, 3);
}

#[tokio::test]
async fn test_interrupted_migration_reloads_legacy_store() {
    let temp_dir = TempDir::new().unwrap();
    seed_legacy(temp_dir.path()).await;
    let cache = open(temp_dir.path()).await;

    // Index and slot table get rewritten, the metadata rename does not.
    let blocker = temp_dir.path().join(METADATA_FILE).with_extension("tmp");
    std::fs::create_dir(&blocker).unwrap();

    assert!(matches!(
        cache.migrate().await,
        Err(CacheError::Migration(_))
    ));
    drop(cache);
    std::fs::remove_dir(&blocker).unwrap();

    let reopened = open(temp_dir.path()).await;
    assert!(reopened.needs_migration().await);
    assert_eq!(reopened.stats().await.total_documents, 3);
    assert_eq!(
        reopened.get("nutrition_rice").await.unwrap().nutrition,
        Some(nutrition(130.0))
    );
    assert_eq!(
        reopened.get("nutrition_ramen").await.unwrap().nutrition,
        Some(nutrition(436.0))
    );
    assert_eq!(
        reopened.food_names().await,
        vec![
            Some("rice".to_string()),
            Some("nutrition_rice".to_string()),
            Some("nutrition_ramen".to_string()),
        ]
    );

    let report = reopened.migrate().await.unwrap();
    assert_eq!((report.merged, report.promoted), (1, 1));
    assert_eq!(
        reopened.get("ramen").await.unwrap().nutrition,
        Some(nutrition(436.0))
    );
}
