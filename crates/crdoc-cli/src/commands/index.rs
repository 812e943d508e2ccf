//! Index command - clone configured repositories and catalog their CRDs

use crdoc_core::Config;
use crdoc_indexer::Indexer;
use crdoc_store::Catalog;
use std::path::Path;

use crate::display;
use crate::error::{CliError, Result};

/// Run the index command
///
/// Fails only when the run cannot start. Units that fail are listed in the
/// summary and do not change the exit code.
pub fn run(db: &Path, config_path: &Path, repo: Option<&str>, tag: Option<&str>) -> Result<()> {
    let config = Config::load_from(config_path)?;

    let mut units = config.units();
    if let Some(repo) = repo {
        units.retain(|u| u.repo.eq_ignore_ascii_case(repo));
        if units.is_empty() {
            return Err(CliError::not_found(
                format!("Repository '{}' is not configured", repo),
                format!("Add it to 'repos' in {}", config_path.display()),
            ));
        }
    }
    if let Some(tag) = tag {
        units.retain(|u| u.tag.as_deref().is_none_or(|t| t == tag));
    }

    if units.is_empty() {
        println!("Nothing to index");
        return Ok(());
    }

    let mut catalog = Catalog::open_at(db)?;
    let summary = Indexer::new(&config, &mut catalog)?
        .with_tag_filter(tag.map(String::from))
        .run(&units);

    display::print_summary(&summary);
    Ok(())
}
