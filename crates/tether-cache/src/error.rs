//! Error types for cache operations.
//!
//! A missing or unreadable entry is not an error: reads report `None` and
//! corrupt data is logged and dropped.

/// Error type for cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem failure in a store.
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failure reported by a custom store backend.
    #[error("Cache store error: {0}")]
    Store(String),
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
