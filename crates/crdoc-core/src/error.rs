//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Config not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Invalid config: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to parse config: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid GVK '{value}': expected group/version/kind")]
    InvalidGvk { value: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
