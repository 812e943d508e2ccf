//! Catalog data model
//!
//! Types shared between the indexer (writer) and the store (reader/writer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Group/Version/Kind triple identifying one schema variant of a CRD
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gvk {
    /// API group (e.g., "airflow.stackable.tech")
    pub group: String,
    /// Storage version (e.g., "v1alpha1")
    pub version: String,
    /// Kind (e.g., "AirflowCluster")
    pub kind: String,
}

impl Gvk {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// The "group/version/kind" key used for deduplication within a run
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Gvk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.group, self.version, self.kind)
    }
}

impl FromStr for Gvk {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        match parts.as_slice() {
            [group, version, kind] if !version.is_empty() && !kind.is_empty() => {
                Ok(Gvk::new(*group, *version, *kind))
            }
            _ => Err(CoreError::InvalidGvk {
                value: s.to_string(),
            }),
        }
    }
}

/// A tag (or the synthetic nightly branch) of an indexed repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoTag {
    pub id: i64,
    /// Tag name (e.g., "23.11.0" or "nightly")
    pub name: String,
    /// Catalog key of the repository (e.g., "github.com/stackabletech/airflow-operator")
    pub repo: String,
    /// Commit time used for ordering; back-dated for nightly
    pub time: DateTime<Utc>,
}

/// A CRD row ready to be inserted for a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrdRecord {
    pub gvk: Gvk,
    pub tag_id: i64,
    /// Basename of the manifest the CRD was found in
    pub filename: String,
    /// Normalized CRD document (JSON)
    pub data: Vec<u8>,
}

/// A CRD listing entry (no document payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrdSummary {
    pub repo: String,
    pub tag: String,
    pub gvk: Gvk,
    pub filename: String,
}

/// A stored CRD document resolved by repo, tag and GVK
#[derive(Debug, Clone)]
pub struct StoredCrd {
    pub tag: String,
    pub gvk: Gvk,
    pub filename: String,
    pub data: Vec<u8>,
}

impl StoredCrd {
    /// Decode the stored document
    pub fn document(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gvk_display() {
        let gvk = Gvk::new("example.com", "v1", "Foo");
        assert_eq!(gvk.to_string(), "example.com/v1/Foo");
        assert_eq!(gvk.key(), "example.com/v1/Foo");
    }

    #[test]
    fn test_gvk_parse() {
        let gvk: Gvk = "cert-manager.io/v1/Certificate".parse().unwrap();
        assert_eq!(gvk.group, "cert-manager.io");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.kind, "Certificate");
    }

    #[test]
    fn test_gvk_parse_invalid() {
        assert!("v1/Foo".parse::<Gvk>().is_err());
        assert!("a/b/c/d".parse::<Gvk>().is_err());
        assert!("example.com//Foo".parse::<Gvk>().is_err());
    }

    #[test]
    fn test_stored_crd_document() {
        let stored = StoredCrd {
            tag: "v1".to_string(),
            gvk: Gvk::new("example.com", "v1", "Foo"),
            filename: "crds.yaml".to_string(),
            data: br#"{"kind":"CustomResourceDefinition"}"#.to_vec(),
        };
        let doc = stored.document().unwrap();
        assert_eq!(doc["kind"], "CustomResourceDefinition");
    }
}
