//! CRD normalizer
//!
//! Parses one YAML document, recognizes CustomResourceDefinitions and turns
//! them into a storage-ready form keyed by Group/Version/Kind.

use serde_json::{Value, json};
use std::path::Path;

use crate::error::Result;
use crate::model::{CrdRecord, Gvk};

/// Kind of the resources this normalizer accepts
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// Fields removed from a CRD before it is stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Drop `metadata.labels`
    pub strip_labels: bool,
    /// Drop `metadata.annotations`
    pub strip_annotations: bool,
    /// Drop `spec.conversion` (webhook client config, CA bundles)
    pub strip_conversion: bool,
}

impl NormalizeOptions {
    /// Strip everything that is irrelevant for documentation
    pub fn all() -> Self {
        Self {
            strip_labels: true,
            strip_annotations: true,
            strip_conversion: true,
        }
    }

    pub fn with_strip_labels(mut self, strip: bool) -> Self {
        self.strip_labels = strip;
        self
    }

    pub fn with_strip_annotations(mut self, strip: bool) -> Self {
        self.strip_annotations = strip;
        self
    }

    pub fn with_strip_conversion(mut self, strip: bool) -> Self {
        self.strip_conversion = strip;
        self
    }
}

/// A CRD reduced to its storage version
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCrd {
    pub gvk: Gvk,
    /// Basename of the source manifest
    pub filename: String,
    /// Stripped CRD with `spec.version` and `spec.validation` pointing at the storage schema
    pub document: Value,
}

impl NormalizedCrd {
    /// Dedup key ("group/version/kind")
    pub fn key(&self) -> String {
        self.gvk.key()
    }

    /// The resolved OpenAPI v3 schema
    pub fn schema(&self) -> Option<&Value> {
        self.document
            .get("spec")
            .and_then(|s| s.get("validation"))
            .and_then(|v| v.get("openAPIV3Schema"))
    }

    /// Serialized document as stored in the catalog
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.document)?)
    }

    /// Turn into a row for the given tag
    pub fn into_record(self, tag_id: i64) -> Result<CrdRecord> {
        let data = self.to_bytes()?;
        Ok(CrdRecord {
            gvk: self.gvk,
            tag_id,
            filename: self.filename,
            data,
        })
    }
}

/// Result of normalizing one document
#[derive(Debug, Clone, PartialEq)]
pub enum CrdOutcome {
    /// A usable CRD
    Crd(NormalizedCrd),
    /// Not a CustomResourceDefinition, or not parsable at all
    NotCrd,
    /// A CRD whose identity or schema could not be resolved
    Unusable { reason: String },
}

impl CrdOutcome {
    fn unusable(reason: impl Into<String>) -> Self {
        CrdOutcome::Unusable {
            reason: reason.into(),
        }
    }

    pub fn into_crd(self) -> Option<NormalizedCrd> {
        match self {
            CrdOutcome::Crd(crd) => Some(crd),
            _ => None,
        }
    }
}

/// Normalizer for CRD documents
#[derive(Debug, Clone, Copy, Default)]
pub struct CrdNormalizer {
    options: NormalizeOptions,
}

impl CrdNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    /// Normalize one YAML document found in `source`
    pub fn normalize(&self, doc: &[u8], source: &Path) -> CrdOutcome {
        let Ok(mut value) = serde_yaml::from_slice::<Value>(doc) else {
            return CrdOutcome::NotCrd;
        };

        if value.get("kind").and_then(Value::as_str) != Some(CRD_KIND) {
            return CrdOutcome::NotCrd;
        }

        self.strip(&mut value);

        let Some(spec) = value.get("spec").filter(|s| s.is_object()) else {
            return CrdOutcome::unusable("missing 'spec'");
        };

        let Some(group) = spec.get("group").and_then(Value::as_str).map(String::from) else {
            return CrdOutcome::unusable("missing 'spec.group'");
        };

        let Some(kind) = spec
            .get("names")
            .and_then(|n| n.get("kind"))
            .and_then(Value::as_str)
            .map(String::from)
        else {
            return CrdOutcome::unusable("missing 'spec.names.kind'");
        };

        let (version, schema) = match resolve_storage(spec) {
            Ok(resolved) => resolved,
            Err(reason) => return CrdOutcome::unusable(reason),
        };

        if let Some(spec) = value.get_mut("spec").and_then(Value::as_object_mut) {
            spec.insert("version".to_string(), Value::String(version.clone()));
            spec.insert(
                "validation".to_string(),
                json!({ "openAPIV3Schema": schema }),
            );
        }

        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        CrdOutcome::Crd(NormalizedCrd {
            gvk: Gvk::new(group, version, kind),
            filename,
            document: value,
        })
    }

    fn strip(&self, value: &mut Value) {
        if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
            if self.options.strip_labels {
                metadata.remove("labels");
            }
            if self.options.strip_annotations {
                metadata.remove("annotations");
            }
        }

        if self.options.strip_conversion {
            if let Some(spec) = value.get_mut("spec").and_then(Value::as_object_mut) {
                spec.remove("conversion");
            }
        }
    }
}

/// Pick the storage version name and its schema
fn resolve_storage(spec: &Value) -> std::result::Result<(String, Value), String> {
    let top_level = openapi_schema(spec.get("validation"));
    let versions: &[Value] = spec
        .get("versions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    match versions {
        [] => {
            let name = spec
                .get("version")
                .and_then(Value::as_str)
                .ok_or("no version declared")?;
            let schema = top_level.ok_or_else(|| format!("no schema for version {}", name))?;
            Ok((name.to_string(), schema.clone()))
        }
        [only] => {
            let name = only
                .get("name")
                .and_then(Value::as_str)
                .or_else(|| spec.get("version").and_then(Value::as_str))
                .ok_or("version without a name")?;
            let schema = openapi_schema(only.get("schema"))
                .or(top_level)
                .ok_or_else(|| format!("no schema for version {}", name))?;
            Ok((name.to_string(), schema.clone()))
        }
        many => {
            let storage = many
                .iter()
                .find(|v| v.get("storage").and_then(Value::as_bool) == Some(true))
                .ok_or("no version flagged storage")?;
            let name = storage
                .get("name")
                .and_then(Value::as_str)
                .ok_or("storage version without a name")?;
            let schema = openapi_schema(storage.get("schema"))
                .or(top_level)
                .ok_or_else(|| format!("no schema for storage version {}", name))?;
            Ok((name.to_string(), schema.clone()))
        }
    }
}

/// `<holder>.openAPIV3Schema`, ignoring nulls
fn openapi_schema(holder: Option<&Value>) -> Option<&Value> {
    holder
        .and_then(|h| h.get("openAPIV3Schema"))
        .filter(|s| !s.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const MULTI_VERSION_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: certificates.cert-manager.io
  labels:
    app.kubernetes.io/managed-by: Helm
  annotations:
    helm.sh/resource-policy: keep
spec:
  group: cert-manager.io
  scope: Namespaced
  names:
    kind: Certificate
    plural: certificates
  conversion:
    strategy: Webhook
    webhook:
      clientConfig:
        caBundle: Zm9v
  versions:
    - name: v1alpha2
      served: true
      storage: false
      schema:
        openAPIV3Schema:
          type: object
          description: old
    - name: v1
      served: true
      storage: true
      schema:
        openAPIV3Schema:
          type: object
          description: current
          properties:
            spec:
              type: object
    - name: v1beta1
      served: true
      storage: false
      schema:
        openAPIV3Schema:
          type: object
          description: newer but not stored
"#;

    const LEGACY_CRD: &str = r#"
apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: foos.example.com
spec:
  group: example.com
  version: v1beta1
  names:
    kind: Foo
    plural: foos
  validation:
    openAPIV3Schema:
      type: object
      description: legacy
"#;

    fn source() -> PathBuf {
        PathBuf::from("deploy/helm/cert-manager/crds/crds.yaml")
    }

    fn normalize(yaml: &str) -> CrdOutcome {
        CrdNormalizer::new(NormalizeOptions::all()).normalize(yaml.as_bytes(), &source())
    }

    #[test]
    fn test_selects_storage_version() {
        let crd = normalize(MULTI_VERSION_CRD).into_crd().unwrap();

        assert_eq!(crd.gvk, Gvk::new("cert-manager.io", "v1", "Certificate"));
        assert_eq!(crd.key(), "cert-manager.io/v1/Certificate");
        assert_eq!(crd.schema().unwrap()["description"], "current");
        assert_eq!(crd.document["spec"]["version"], "v1");
    }

    #[test]
    fn test_filename_is_basename() {
        let crd = normalize(MULTI_VERSION_CRD).into_crd().unwrap();
        assert_eq!(crd.filename, "crds.yaml");
    }

    #[test]
    fn test_strips_requested_fields() {
        let crd = normalize(MULTI_VERSION_CRD).into_crd().unwrap();

        assert!(crd.document["metadata"].get("labels").is_none());
        assert!(crd.document["metadata"].get("annotations").is_none());
        assert!(crd.document["spec"].get("conversion").is_none());
        assert_eq!(crd.document["metadata"]["name"], "certificates.cert-manager.io");
    }

    #[test]
    fn test_keeps_fields_when_not_stripping() {
        let options = NormalizeOptions::default().with_strip_annotations(true);
        let crd = CrdNormalizer::new(options)
            .normalize(MULTI_VERSION_CRD.as_bytes(), &source())
            .into_crd()
            .unwrap();

        assert!(crd.document["metadata"].get("labels").is_some());
        assert!(crd.document["metadata"].get("annotations").is_none());
        assert!(crd.document["spec"].get("conversion").is_some());
    }

    #[test]
    fn test_legacy_single_version() {
        let crd = normalize(LEGACY_CRD).into_crd().unwrap();

        assert_eq!(crd.gvk, Gvk::new("example.com", "v1beta1", "Foo"));
        assert_eq!(crd.schema().unwrap()["description"], "legacy");
    }

    #[test]
    fn test_falls_back_to_top_level_schema() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1beta1
kind: CustomResourceDefinition
metadata:
  name: bars.example.com
spec:
  group: example.com
  names:
    kind: Bar
  validation:
    openAPIV3Schema:
      type: object
      description: shared
  versions:
    - name: v1alpha1
      served: true
      storage: false
    - name: v1
      served: true
      storage: true
"#;
        let crd = normalize(yaml).into_crd().unwrap();
        assert_eq!(crd.gvk.version, "v1");
        assert_eq!(crd.schema().unwrap()["description"], "shared");
    }

    #[test]
    fn test_no_storage_version_is_dropped() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: bazs.example.com
spec:
  group: example.com
  names:
    kind: Baz
  versions:
    - name: v1alpha1
      served: true
      storage: false
      schema:
        openAPIV3Schema:
          type: object
    - name: v1
      served: true
      schema:
        openAPIV3Schema:
          type: object
"#;
        match normalize(yaml) {
            CrdOutcome::Unusable { reason } => assert!(reason.contains("storage")),
            other => panic!("expected Unusable, got {:?}", other),
        }
    }

    #[test]
    fn test_storage_version_without_any_schema_is_dropped() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: quxes.example.com
spec:
  group: example.com
  names:
    kind: Qux
  versions:
    - name: v1
      served: true
      storage: true
"#;
        assert!(matches!(normalize(yaml), CrdOutcome::Unusable { .. }));
    }

    #[test]
    fn test_missing_group_is_dropped() {
        let yaml = r#"
apiVersion: apiextensions.k8s.io/v1
kind: CustomResourceDefinition
metadata:
  name: broken
spec:
  names:
    kind: Broken
"#;
        match normalize(yaml) {
            CrdOutcome::Unusable { reason } => assert!(reason.contains("spec.group")),
            other => panic!("expected Unusable, got {:?}", other),
        }
    }

    #[test]
    fn test_config_map_is_not_a_crd() {
        let yaml = r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: test
data:
  kind: CustomResourceDefinition
"#;
        assert_eq!(normalize(yaml), CrdOutcome::NotCrd);
    }

    #[test]
    fn test_garbage_is_not_a_crd() {
        assert_eq!(normalize("kind: [unclosed"), CrdOutcome::NotCrd);
        assert_eq!(normalize("just a string"), CrdOutcome::NotCrd);
        assert_eq!(normalize(""), CrdOutcome::NotCrd);
    }

    #[test]
    fn test_record_bytes_are_json() {
        let crd = normalize(LEGACY_CRD).into_crd().unwrap();
        let record = crd.clone().into_record(7).unwrap();

        assert_eq!(record.tag_id, 7);
        assert_eq!(record.gvk, crd.gvk);
        let decoded: Value = serde_json::from_slice(&record.data).unwrap();
        assert_eq!(decoded, crd.document);
    }
}
