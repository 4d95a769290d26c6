//! Errors raised by embedding providers and the vector index.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// No provider is attached, or the attached one cannot serve requests.
    #[error("no embedding backend available")]
    Unavailable,

    /// The endpoint answered with a non-success status.
    #[error("embedding request failed with {status}: {body}")]
    Request { status: u16, body: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The endpoint answered, but not with usable vectors.
    #[error("malformed embedding response: {0}")]
    InvalidResponse(String),

    #[error("expected a {expected}-dimensional vector, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An index file that decodes but cannot be used.
    #[error("unusable index file: {0}")]
    IndexFormat(String),

    #[error(transparent)]
    Encoding(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
