//! Error types for the persisted probe store.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing the probe document.
///
/// There is no fallback path: any of these is fatal for the request that
/// touched the store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("probe store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object store error: {0}")]
    Object(String),

    #[error("snapshot codec error: {0}")]
    Codec(String),
}
