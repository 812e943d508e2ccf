//! crdoc CLI - Index CustomResourceDefinitions from git repositories

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use error::CliError;

#[derive(Parser)]
#[command(name = "crdoc")]
#[command(author = "crdoc Contributors")]
#[command(version)]
#[command(about = "Index CustomResourceDefinitions from git repositories", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Index configured repositories into the catalog
    Index {
        /// Catalog database
        #[arg(long, env = "CRDOC_DB", default_value = "doc.db")]
        db: PathBuf,

        /// Repository listing
        #[arg(short, long, default_value = "repos.yaml")]
        config: PathBuf,

        /// Only index this repository
        #[arg(long)]
        repo: Option<String>,

        /// Only index this tag
        #[arg(long)]
        tag: Option<String>,
    },

    /// List indexed tags of a repository, most recent first
    Tags {
        /// Catalog database
        #[arg(long, env = "CRDOC_DB", default_value = "doc.db")]
        db: PathBuf,

        /// Repository key (e.g. github.com/stackabletech/airflow-operator)
        repo: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List CRDs of a repository at a tag
    Crds {
        /// Catalog database
        #[arg(long, env = "CRDOC_DB", default_value = "doc.db")]
        db: PathBuf,

        /// Repository key
        repo: String,

        /// Tag (defaults to the most recent one)
        #[arg(short, long)]
        tag: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print one stored CRD document
    Show {
        /// Catalog database
        #[arg(long, env = "CRDOC_DB", default_value = "doc.db")]
        db: PathBuf,

        /// Repository key
        repo: String,

        /// CRD as group/version/kind
        gvk: String,

        /// Tag (defaults to the most recent one)
        #[arg(short, long)]
        tag: Option<String>,

        /// Print YAML instead of JSON
        #[arg(long)]
        yaml: bool,
    },

    /// Show catalog statistics
    Stats {
        /// Catalog database
        #[arg(long, env = "CRDOC_DB", default_value = "doc.db")]
        db: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(debug: bool) {
    let level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> error::Result<()> {
    match cli.command {
        Commands::Index {
            db,
            config,
            repo,
            tag,
        } => commands::index::run(&db, &config, repo.as_deref(), tag.as_deref()),

        Commands::Tags { db, repo, json } => commands::tags::run(&db, &repo, json),

        Commands::Crds {
            db,
            repo,
            tag,
            json,
        } => commands::crds::run(&db, &repo, tag.as_deref(), json),

        Commands::Show {
            db,
            repo,
            gvk,
            tag,
            yaml,
        } => commands::show::run(&db, &repo, &gvk, tag.as_deref(), yaml),

        Commands::Stats { db, json } => commands::stats::run(&db, json),
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new::<CliError>(err));
        std::process::exit(code);
    }
}
