//! Error types for catalog operations

use thiserror::Error;

/// Catalog operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tag '{tag}' of {repo} has an invalid timestamp: {value}")]
    InvalidTime {
        repo: String,
        tag: String,
        value: i64,
    },
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, StoreError>;
