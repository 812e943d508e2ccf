//! Crds command

use console::style;
use crdoc_store::Catalog;
use std::path::Path;

use crate::error::{CliError, Result};

/// List CRDs of a repository at a tag, the latest one by default
pub fn run(db: &Path, repo: &str, tag: Option<&str>, json: bool) -> Result<()> {
    let catalog = Catalog::open_at(db)?;

    let Some(resolved) = catalog.resolve_tag(repo, tag)? else {
        return Err(match tag {
            Some(tag) => CliError::not_found(
                format!("Tag '{}' of {} is not indexed", tag, repo),
                format!("List indexed tags with: crdoc tags {}", repo),
            ),
            None => CliError::not_found(
                format!("Repository {} is not indexed", repo),
                "Keys look like github.com/<org>/<repo>",
            ),
        });
    };

    let crds = catalog.crds(repo, Some(resolved.name.as_str()))?;

    if json {
        let out =
            serde_json::to_string_pretty(&crds).map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    println!("{} @ {}", style(repo).bold(), style(&resolved.name).cyan());
    if crds.is_empty() {
        println!("No CRDs found");
        return Ok(());
    }

    println!(
        "{:<32} {:<40} {:<12} {}",
        style("KIND").bold(),
        style("GROUP").bold(),
        style("VERSION").bold(),
        style("FILE").bold()
    );
    for crd in crds {
        println!(
            "{:<32} {:<40} {:<12} {}",
            crd.gvk.kind,
            crd.gvk.group,
            crd.gvk.version,
            style(crd.filename).dim()
        );
    }

    Ok(())
}
