use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use snapchef_app_server::{AppConfig, CacheHandler, serve};
use snapchef_semantic_cache::SemanticCache;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = AppConfig::load()?;
    let embedder = config.cache.embedding.build_embedder();
    let cache = Arc::new(SemanticCache::open(config.cache, embedder).await);

    match cache.migrate_if_needed().await {
        Ok(Some(report)) => info!(
            "Migrated legacy cache: {} merged, {} promoted, {} dropped",
            report.merged, report.promoted, report.dropped
        ),
        Ok(None) => {}
        Err(e) => warn!("Legacy cache left in place: {e}"),
    }

    let handler = CacheHandler::new(cache);
    serve(&handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}
