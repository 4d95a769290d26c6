//! Wire types for the line-delimited JSON status surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request line could not be parsed as JSON.
pub const PARSE_ERROR: i64 = -32700;

/// Request is JSON but not a request.
pub const INVALID_REQUEST: i64 = -32600;

/// No such method.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Parameters do not fit the method.
pub const INVALID_PARAMS: i64 = -32602;

/// One request per input line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    /// Echoed back on the response.
    #[serde(default)]
    pub id: Value,

    pub method: String,

    #[serde(default)]
    pub params: Value,
}

/// One response per request, written as a single line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: i64,
    pub message: String,
}

/// Params of `cache/lookup`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LookupParams {
    pub food_name: String,
    pub kind: LookupKind,
}

/// Which threshold a lookup uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupKind {
    Recipe,
    Nutrition,
}
