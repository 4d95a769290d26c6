//! Error types for the semantic cache.

use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors that can occur in the semantic cache.
///
/// Only [`CacheError::InvalidDocument`] ever reaches callers of
/// [`crate::SemanticCache::upsert`]; operational failures are absorbed there.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Caller supplied a document the store cannot hold.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Embedding or index error.
    #[error("embedding error: {0}")]
    Embedding(#[from] snapchef_embeddings::EmbeddingError),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Legacy layout could not be converted.
    #[error("migration failed: {0}")]
    Migration(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create storage directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read a store file.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write a store file.
    #[error("failed to write file: {0}")]
    WriteFile(String),

    /// Failed to delete a store file.
    #[error("failed to delete file: {0}")]
    DeleteFile(String),

    /// A store file exists but cannot be decoded.
    #[error("corrupt store file: {0}")]
    Corrupt(String),
}
