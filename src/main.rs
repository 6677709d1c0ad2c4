mod config;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use codeseek_index::{IndexOutcome, IndexRunConfig, run_index};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "codeseek")]
#[command(version, about = "Index Python functions and classes into a semantic vector store")]
struct Cli {
    /// Root of the source tree to index
    #[arg(long)]
    path: PathBuf,

    /// Directory of the persisted index [default: ./code_db]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// TOML configuration file [default: $CODESEEK_CONFIG or config/default.toml]
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_subscriber();

    let config_path = resolve_config_path(cli.config.clone());
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    config.validate()?;

    let run = build_run_config(&cli, config);
    tracing::debug!(?run, "resolved run configuration");

    match run_index(&run).await.context("indexing failed")? {
        IndexOutcome::Empty {
            files_scanned,
            files_skipped,
            ..
        } => {
            tracing::info!(files_scanned, files_skipped, "nothing to index");
            println!("No Python functions or classes found to index.");
        }
        IndexOutcome::Indexed(report) => {
            tracing::info!(
                files_scanned = report.files_scanned,
                files_skipped = report.files_skipped,
                units = report.units_indexed,
                model = %report.model,
                duration_ms = report.duration_ms,
                "indexing complete"
            );
            println!(
                "Successfully indexed {} functions/classes into '{}'.",
                report.units_indexed,
                report.store_path.display()
            );
        }
    }

    Ok(())
}

fn build_run_config(cli: &Cli, config: Config) -> IndexRunConfig {
    IndexRunConfig {
        root: cli.path.clone(),
        store_path: cli.db_path.clone().unwrap_or(config.store.path),
        walk: config.index,
        embedding: config.embedding,
    }
}

fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return path;
    }
    if let Ok(path) = std::env::var("CODESEEK_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn init_subscriber() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
