//! Cache handler for the app-server.
//!
//! Answers status-panel requests against the shared semantic cache: stats,
//! clearing, single lookups and a full document listing.

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use snapchef_semantic_cache::SemanticCache;

use crate::protocol::{
    INVALID_PARAMS, INVALID_REQUEST, LookupKind, LookupParams, METHOD_NOT_FOUND, PARSE_ERROR,
    Request, Response,
};

/// Handler for cache status operations.
pub struct CacheHandler {
    cache: Arc<SemanticCache>,
}

impl CacheHandler {
    pub fn new(cache: Arc<SemanticCache>) -> Self {
        Self { cache }
    }

    /// Handle one raw input line. Malformed input yields an error response.
    pub async fn handle_line(&self, line: &str) -> Response {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!("Unparseable request line: {e}");
                return Response::failure(Value::Null, PARSE_ERROR, format!("parse error: {e}"));
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Response::failure(id, INVALID_REQUEST, format!("invalid request: {e}")),
        }
    }

    /// Dispatch a parsed request.
    pub async fn handle(&self, request: Request) -> Response {
        debug!("Handling {}", request.method);
        let Request { id, method, params } = request;

        match method.as_str() {
            "cache/stats" => Response::success(id, json!(self.cache.stats().await)),
            "cache/clear" => self.clear(id).await,
            "cache/lookup" => self.lookup(id, params).await,
            "cache/documents" => {
                let documents = self.cache.documents().await;
                Response::success(id, json!({ "documents": documents }))
            }
            other => Response::failure(id, METHOD_NOT_FOUND, format!("unknown method: {other}")),
        }
    }

    async fn clear(&self, id: Value) -> Response {
        let cleared = self.cache.clear().await;
        if cleared {
            info!("Cache cleared from status panel");
        }
        Response::success(id, json!({ "cleared": cleared }))
    }

    async fn lookup(&self, id: Value, params: Value) -> Response {
        let params: LookupParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => return Response::failure(id, INVALID_PARAMS, format!("invalid params: {e}")),
        };

        let document = match params.kind {
            LookupKind::Recipe => self.cache.find_recipe(&params.food_name).await,
            LookupKind::Nutrition => self.cache.find_nutrition(&params.food_name).await,
        };
        Response::success(id, json!({ "document": document }))
    }
}
