//! Indexing configuration
//!
//! Loaded once at startup from a YAML file and passed explicitly to the
//! indexer. Repositories can be listed per organization:
//!
//! ```yaml
//! repos:
//!   stackabletech:
//!     airflow-operator: ["23.11.0", "nightly"]
//! ```
//!
//! or flat, with a default organization:
//!
//! ```yaml
//! defaultOrg: stackabletech
//! repos:
//!   airflow-operator: ["23.11.0", "nightly"]
//! ```
//!
//! An empty tag list indexes every tag of the repository.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::crd::NormalizeOptions;
use crate::error::{CoreError, Result};

/// Reserved tag that tracks the nightly branch and sorts after all real tags
pub const NIGHTLY_TAG: &str = "nightly";

/// Indexer configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Host used as prefix of the catalog key
    #[serde(default = "default_host")]
    pub host: String,

    /// Clone URL template with `{host}`, `{org}` and `{repo}` placeholders
    #[serde(default = "default_clone_url")]
    pub clone_url: String,

    /// Organization for flat repository maps
    #[serde(default)]
    pub default_org: Option<String>,

    /// Branch cloned for the `nightly` tag
    #[serde(default = "default_nightly_branch")]
    pub nightly_branch: String,

    /// Regex a manifest path must match to be searched
    #[serde(default = "default_path_pattern")]
    pub path_pattern: String,

    /// Regex a manifest's content must match to be parsed
    #[serde(default = "default_content_pattern")]
    pub content_pattern: String,

    /// Fields stripped from every CRD before persisting
    #[serde(default)]
    pub strip: StripConfig,

    /// Platform release lines for the page renderer
    ///
    /// Parsed so a shared config file validates; the indexer never reads it.
    #[serde(default)]
    pub platform_versions: Vec<String>,

    /// Repositories to index
    #[serde(default)]
    pub repos: RepoMap,
}

fn default_host() -> String {
    "github.com".to_string()
}

fn default_clone_url() -> String {
    "https://{host}/{org}/{repo}".to_string()
}

fn default_nightly_branch() -> String {
    "main".to_string()
}

fn default_path_pattern() -> String {
    r"^deploy/helm/.*\.yaml$".to_string()
}

fn default_content_pattern() -> String {
    "kind: CustomResourceDefinition".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            clone_url: default_clone_url(),
            default_org: None,
            nightly_branch: default_nightly_branch(),
            path_pattern: default_path_pattern(),
            content_pattern: default_content_pattern(),
            strip: StripConfig::default(),
            platform_versions: Vec::new(),
            repos: RepoMap::default(),
        }
    }
}

/// Repository listing, either nested by organization or flat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoMap {
    /// repo -> tags, organization taken from `defaultOrg`
    Flat(IndexMap<String, Vec<String>>),
    /// org -> repo -> tags
    Nested(IndexMap<String, IndexMap<String, Vec<String>>>),
}

impl Default for RepoMap {
    fn default() -> Self {
        RepoMap::Flat(IndexMap::new())
    }
}

/// Which operationally irrelevant fields are removed from CRDs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripConfig {
    #[serde(default = "default_true")]
    pub labels: bool,
    #[serde(default = "default_true")]
    pub annotations: bool,
    #[serde(default = "default_true")]
    pub conversion: bool,
}

fn default_true() -> bool {
    true
}

impl Default for StripConfig {
    fn default() -> Self {
        Self {
            labels: true,
            annotations: true,
            conversion: true,
        }
    }
}

impl StripConfig {
    pub fn to_options(self) -> NormalizeOptions {
        NormalizeOptions {
            strip_labels: self.labels,
            strip_annotations: self.annotations,
            strip_conversion: self.conversion,
        }
    }
}

/// One (org, repo, tag) unit of indexing work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUnit {
    pub org: String,
    pub repo: String,
    /// `None` indexes every tag of the repository
    pub tag: Option<String>,
}

impl IndexUnit {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            tag,
        }
    }

    pub fn is_nightly(&self) -> bool {
        self.tag.as_deref() == Some(NIGHTLY_TAG)
    }
}

impl fmt::Display for IndexUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}/{}@{}", self.org, self.repo, tag),
            None => write!(f, "{}/{}@*", self.org, self.repo),
        }
    }
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check patterns and repository listing
    pub fn validate(&self) -> Result<()> {
        self.path_regex()?;
        self.content_regex()?;

        if let RepoMap::Flat(repos) = &self.repos {
            if !repos.is_empty() && self.default_org.is_none() {
                return Err(CoreError::InvalidConfig {
                    message: "flat 'repos' map requires 'defaultOrg'".to_string(),
                });
            }
        }

        if !self.clone_url.contains("{repo}") {
            return Err(CoreError::InvalidConfig {
                message: format!("'cloneUrl' must contain {{repo}}: {}", self.clone_url),
            });
        }

        Ok(())
    }

    pub fn path_regex(&self) -> Result<Regex> {
        Ok(Regex::new(&self.path_pattern)?)
    }

    pub fn content_regex(&self) -> Result<Regex> {
        Ok(Regex::new(&self.content_pattern)?)
    }

    /// Expand the repository listing into units, in file order
    pub fn units(&self) -> Vec<IndexUnit> {
        let mut units = Vec::new();
        match &self.repos {
            RepoMap::Flat(repos) => {
                let org = self.default_org.clone().unwrap_or_default();
                for (repo, tags) in repos {
                    push_units(&mut units, &org, repo, tags);
                }
            }
            RepoMap::Nested(orgs) => {
                for (org, repos) in orgs {
                    for (repo, tags) in repos {
                        push_units(&mut units, org, repo, tags);
                    }
                }
            }
        }
        units
    }

    /// Catalog key of a repository: `<host>/<org>/<repo>`, lower-cased
    pub fn catalog_key(&self, org: &str, repo: &str) -> String {
        format!("{}/{}/{}", self.host, org, repo).to_lowercase()
    }

    /// Clone URL of a repository
    pub fn clone_url_for(&self, org: &str, repo: &str) -> String {
        self.clone_url
            .replace("{host}", &self.host)
            .replace("{org}", &org.to_lowercase())
            .replace("{repo}", &repo.to_lowercase())
    }
}

fn push_units(units: &mut Vec<IndexUnit>, org: &str, repo: &str, tags: &[String]) {
    if tags.is_empty() {
        units.push(IndexUnit::new(org, repo, None));
    } else {
        units.extend(
            tags.iter()
                .map(|tag| IndexUnit::new(org, repo, Some(tag.clone()))),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NESTED: &str = r#"
repos:
  stackabletech:
    airflow-operator: ["23.11.0", "nightly"]
    zookeeper-operator: []
  other:
    thing: ["v1"]
"#;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml("repos: {}").unwrap();
        assert_eq!(config.host, "github.com");
        assert_eq!(config.nightly_branch, "main");
        assert_eq!(config.path_pattern, r"^deploy/helm/.*\.yaml$");
        assert_eq!(config.content_pattern, "kind: CustomResourceDefinition");
        assert!(config.strip.labels && config.strip.annotations && config.strip.conversion);
        assert!(config.units().is_empty());
    }

    #[test]
    fn test_nested_units_keep_file_order() {
        let config = Config::from_yaml(NESTED).unwrap();
        let units = config.units();

        assert_eq!(units.len(), 4);
        assert_eq!(
            units[0],
            IndexUnit::new("stackabletech", "airflow-operator", Some("23.11.0".to_string()))
        );
        assert!(units[1].is_nightly());
        assert_eq!(units[2], IndexUnit::new("stackabletech", "zookeeper-operator", None));
        assert_eq!(units[3].org, "other");
    }

    #[test]
    fn test_flat_units_use_default_org() {
        let yaml = r#"
defaultOrg: stackabletech
platformVersions: ["23.11", "24.3"]
repos:
  hdfs-operator: ["23.11.0"]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        let units = config.units();

        assert_eq!(units.len(), 1);
        assert_eq!(units[0].org, "stackabletech");
        assert_eq!(units[0].repo, "hdfs-operator");
        assert_eq!(config.platform_versions, vec!["23.11", "24.3"]);
    }

    #[test]
    fn test_flat_without_org_is_rejected() {
        let result = Config::from_yaml("repos:\n  hdfs-operator: [\"1.0\"]\n");
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = Config::from_yaml("pathPattern: '(unclosed'\nrepos: {}\n");
        assert!(matches!(result, Err(CoreError::Pattern(_))));
    }

    #[test]
    fn test_catalog_key_and_clone_url() {
        let config = Config::default();
        assert_eq!(
            config.catalog_key("StackableTech", "Airflow-Operator"),
            "github.com/stackabletech/airflow-operator"
        );
        assert_eq!(
            config.clone_url_for("StackableTech", "Airflow-Operator"),
            "https://github.com/stackabletech/airflow-operator"
        );
    }

    #[test]
    fn test_strip_config_partial() {
        let config = Config::from_yaml("strip:\n  labels: false\nrepos: {}\n").unwrap();
        let options = config.strip.to_options();
        assert!(!options.strip_labels);
        assert!(options.strip_annotations);
        assert!(options.strip_conversion);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(&dir.path().join("missing.yaml"));
        assert!(matches!(result, Err(CoreError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_unit_display() {
        let unit = IndexUnit::new("org", "repo", Some("v1".to_string()));
        assert_eq!(unit.to_string(), "org/repo@v1");
        assert_eq!(IndexUnit::new("org", "repo", None).to_string(), "org/repo@*");
    }
}
