//! Show command - print one stored CRD

use crdoc_core::Gvk;
use crdoc_store::Catalog;
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(db: &Path, repo: &str, gvk: &str, tag: Option<&str>, yaml: bool) -> Result<()> {
    let gvk: Gvk = gvk.parse()?;
    let catalog = Catalog::open_at(db)?;

    let crd = catalog.crd(repo, tag, &gvk)?.ok_or_else(|| {
        CliError::not_found(
            format!(
                "{} not found in {} at {}",
                gvk,
                repo,
                tag.unwrap_or("the latest tag")
            ),
            format!("List available CRDs with: crdoc crds {}", repo),
        )
    })?;

    let document = crd.document()?;
    let out = if yaml {
        serde_yaml::to_string(&document).map_err(|e| CliError::internal(e.to_string()))?
    } else {
        serde_json::to_string_pretty(&document).map_err(|e| CliError::internal(e.to_string()))?
    };
    println!("{}", out.trim_end());

    Ok(())
}
