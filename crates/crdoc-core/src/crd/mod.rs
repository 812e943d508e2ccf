//! CRD (CustomResourceDefinition) detection and normalization
//!
//! Every document found in a manifest goes through [`CrdNormalizer`]:
//!
//! ```text
//!   document ──► kind == CustomResourceDefinition? ──no──► NotCrd
//!                        │ yes
//!                        ▼
//!                 strip labels / annotations / spec.conversion
//!                        │
//!                        ▼
//!                 resolve storage version + schema ──none──► Unusable
//!                        │
//!                        ▼
//!                 Crd(NormalizedCrd { gvk, filename, document })
//! ```
//!
//! # Storage version selection
//!
//! - Legacy CRDs declare a single `spec.version` with a top-level
//!   `spec.validation.openAPIV3Schema`; that pair is used as is.
//! - Multi-version CRDs are scanned in declaration order and the first version
//!   flagged `storage: true` wins. Its own `schema.openAPIV3Schema` is
//!   preferred, the top-level schema is the fallback.
//! - When several versions are declared and none is flagged storage, nothing
//!   resolves and the CRD is dropped.

mod normalize;

pub use normalize::{CRD_KIND, CrdNormalizer, CrdOutcome, NormalizeOptions, NormalizedCrd};
