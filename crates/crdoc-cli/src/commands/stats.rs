//! Stats command

use console::style;
use crdoc_store::Catalog;
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(db: &Path, json: bool) -> Result<()> {
    let catalog = Catalog::open_at(db)?;
    let stats = catalog.stats()?;

    if json {
        let out = serde_json::to_string_pretty(&serde_json::json!({
            "repositories": stats.repo_count,
            "tags": stats.tag_count,
            "crds": stats.crd_count,
        }))
        .map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", style("Catalog").bold());
    println!("  Repositories: {}", stats.repo_count);
    println!("  Tags:         {}", stats.tag_count);
    println!("  CRDs:         {}", stats.crd_count);

    Ok(())
}
