//! Tags command

use console::style;
use crdoc_store::Catalog;
use std::path::Path;

use crate::error::{CliError, Result};

/// List tags of a repository, most recent first
pub fn run(db: &Path, repo: &str, json: bool) -> Result<()> {
    let catalog = Catalog::open_at(db)?;
    let tags = catalog.tags(repo)?;

    if json {
        let out =
            serde_json::to_string_pretty(&tags).map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    if tags.is_empty() {
        println!("No tags found for {}", repo);
        return Ok(());
    }

    println!("{:<24} {}", style("TAG").bold(), style("TIME").bold());
    for tag in tags {
        println!(
            "{:<24} {}",
            tag.name,
            style(tag.time.format("%Y-%m-%d %H:%M:%S")).dim()
        );
    }

    Ok(())
}
