//! End-to-end tests for the stdio status surface.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;

use snapchef_app_server::{CacheHandler, Response, serve};
use snapchef_embeddings::HashingProvider;
use snapchef_semantic_cache::{CacheConfig, Embedder, Nutrition, SemanticCache};

async fn seeded_cache(dir: &TempDir) -> Arc<SemanticCache> {
    let embedder = Embedder::new(Arc::new(HashingProvider::new(32)));
    let cache = SemanticCache::open(CacheConfig::new(dir.path()), embedder).await;
    let rice = Nutrition {
        calories: 130.0,
        protein: 2.7,
        carbs: 28.0,
        fat: 0.3,
    };
    cache.upsert("Rice", None, Some(rice)).await.unwrap();
    Arc::new(cache)
}

async fn run(handler: &CacheHandler, input: &str) -> Vec<Response> {
    let mut output = Vec::new();
    serve(handler, input.as_bytes(), &mut output).await.unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_status_session() {
    let temp_dir = TempDir::new().unwrap();
    let handler = CacheHandler::new(seeded_cache(&temp_dir).await);

    let input = [
        r#"{"id": 1, "method": "cache/stats"}"#,
        r#"{"id": 2, "method": "cache/lookup", "params": {"food_name": "rice", "kind": "nutrition"}}"#,
        r#"{"id": 3, "method": "cache/lookup", "params": {"food_name": "chocolate cake", "kind": "recipe"}}"#,
        "",
        r#"{"id": 4, "method": "cache/documents"}"#,
        "this is not json",
        r#"{"id": 5, "method": "cache/clear"}"#,
        r#"{"id": 6, "method": "cache/stats"}"#,
    ]
    .join("\n");

    let responses = run(&handler, &input).await;
    assert_eq!(responses.len(), 7, "blank lines get no response");

    let stats = responses[0].result.as_ref().unwrap();
    assert_eq!(stats["total_documents"], json!(1));
    assert_eq!(stats["embedding_dimension"], json!(32));
    assert_eq!(stats["model_available"], json!(true));

    let hit = &responses[1].result.as_ref().unwrap()["document"];
    assert_eq!(hit["food_name"], json!("Rice"));
    assert_eq!(hit["nutrition"]["calories"], json!(130.0));

    assert_eq!(responses[2].result.as_ref().unwrap()["document"], Value::Null);

    let documents = responses[3].result.as_ref().unwrap()["documents"]
        .as_array()
        .unwrap()
        .len();
    assert_eq!(documents, 1);

    assert!(responses[4].error.is_some());
    assert_eq!(responses[4].id, Value::Null);

    assert_eq!(responses[5].result, Some(json!({ "cleared": true })));
    assert_eq!(
        responses[6].result.as_ref().unwrap()["total_documents"],
        json!(0)
    );
}

#[tokio::test]
async fn test_empty_input() {
    let temp_dir = TempDir::new().unwrap();
    let handler = CacheHandler::new(seeded_cache(&temp_dir).await);

    assert!(run(&handler, "").await.is_empty());
}
