//! crdoc Core - Core types for the CRD documentation catalog
//!
//! This crate provides the building blocks shared by the indexer and the store:
//! - `Gvk`, `RepoTag`, `CrdRecord`: Catalog data model
//! - `Config`: Repositories to index and pipeline settings
//! - `split`: Multi-document YAML splitting with per-document failure isolation
//! - `crd`: CustomResourceDefinition detection and normalization

pub mod config;
pub mod crd;
pub mod error;
pub mod model;
pub mod split;

pub use config::{Config, IndexUnit, NIGHTLY_TAG, RepoMap, StripConfig};
pub use crd::{CrdNormalizer, CrdOutcome, NormalizeOptions, NormalizedCrd};
pub use error::{CoreError, Result};
pub use model::{CrdRecord, CrdSummary, Gvk, RepoTag, StoredCrd};
pub use split::{SplitError, YamlDocuments, split_yaml};
