//! CLI error types with exit code handling
//!
//! Every library error is folded into [`CliError`], which carries a stable
//! diagnostic code and maps to an exit code.

use crdoc_core::CoreError;
use crdoc_indexer::IndexError;
use crdoc_store::StoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Configuration missing or invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(crdoc::cli::config))]
    Config {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Catalog could not be opened or queried
    #[error("Database error: {message}")]
    #[diagnostic(code(crdoc::cli::database))]
    Database { message: String },

    /// Requested repository, tag or CRD does not exist
    #[error("{message}")]
    #[diagnostic(code(crdoc::cli::not_found))]
    NotFound {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Malformed argument
    #[error("Invalid input: {message}")]
    #[diagnostic(code(crdoc::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(crdoc::cli::io))]
    Io { message: String },

    /// Internal error (unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(crdoc::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config { .. } => exit_codes::CONFIG_ERROR,
            CliError::Database { .. } => exit_codes::DATABASE_ERROR,
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::Input { .. } => exit_codes::USAGE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    pub fn input(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    fn config(message: impl Into<String>, help: Option<&str>) -> Self {
        Self::Config {
            message: message.into(),
            help: help.map(String::from),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::ConfigNotFound { .. } => CliError::config(
                err.to_string(),
                Some("Pass the repository listing with --config <path>"),
            ),
            CoreError::InvalidConfig { .. }
            | CoreError::YamlParse(_)
            | CoreError::Pattern(_) => CliError::config(err.to_string(), None),
            CoreError::InvalidGvk { .. } => CliError::input(
                err.to_string(),
                "Use <group>/<version>/<kind>, e.g. airflow.stackable.tech/v1alpha1/AirflowCluster",
            ),
            CoreError::Io(_) => CliError::Io {
                message: err.to_string(),
            },
            CoreError::Json(_) => CliError::internal(err.to_string()),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::Database {
            message: err.to_string(),
        }
    }
}

impl From<IndexError> for CliError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::Core(e) => e.into(),
            IndexError::Store(e) => e.into(),
            IndexError::Pattern(e) => CliError::config(e.to_string(), None),
            other => CliError::internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
