//! crdoc Indexer - Builds the CRD catalog from git repositories
//!
//! For every configured (org, repo, tag) unit:
//!
//! ```text
//!   checkout ──► grep manifests ──► split documents ──► normalize CRDs ──► persist
//!   (Cloned)       (Greped)                 (Parsed)                     (Persisted)
//! ```
//!
//! A failing unit is reported and skipped; it never stops the run.

pub mod error;
pub mod indexer;
pub mod snapshot;

pub use error::{IndexError, Result};
pub use indexer::{CrdCollector, IndexSummary, Indexer, UnitReport, UnitState, tag_time};
pub use snapshot::{GitRef, Snapshot};
