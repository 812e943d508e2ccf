//! crdoc Catalog Store
//!
//! Append-only SQLite catalog written by the indexer and read by the page
//! renderer:
//!
//! - `tags(id, name, repo, time)`, unique on `(repo, name)`
//! - `crds(group, version, kind, tag_id, filename, data)`, unique on
//!   `(tag_id, group, version, kind)`
//!
//! Writes never update or delete. Repeated inserts of the same rows are
//! ignored, so re-indexing a tag is always safe.

pub mod catalog;
pub mod error;
pub mod schema;

pub use catalog::{Catalog, CatalogStats};
pub use error::{Result, StoreError};
