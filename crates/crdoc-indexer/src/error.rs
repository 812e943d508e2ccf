//! Error types for indexing

use thiserror::Error;

/// Indexing errors
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to execute git (is it installed?): {0}")]
    GitUnavailable(#[source] std::io::Error),

    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("Unexpected output from git {command}: {output}")]
    GitOutput { command: String, output: String },

    #[error("All {failed} tag(s) of {repo} failed to index")]
    AllTagsFailed { repo: String, failed: usize },

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] crdoc_store::StoreError),

    #[error(transparent)]
    Core(#[from] crdoc_core::CoreError),
}

/// Result type for indexing operations
pub type Result<T> = std::result::Result<T, IndexError>;
