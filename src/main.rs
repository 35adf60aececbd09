// src/main.rs

use std::path::PathBuf;

use color_eyre::eyre::{Result, WrapErr, bail};
use tokio::io::AsyncReadExt;
use tracing::info;

use domain_checker::logging::{default_results_path, initialize_logging};
use domain_checker::{
    CheckerConfig, DomainChecker, JsonLinesStore, MemoryStore, ProgressCallback, SnapshotStore,
};

mod cli;

use cli::{CommandLine, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CommandLine::parse_args();
    initialize_logging()?;

    let config = args.apply(CheckerConfig::from_env()?)?;
    if config.reputation_api_key.is_none() {
        eprintln!("No reputation API key configured; reputation will be reported as not checked.");
    }
    let checker = DomainChecker::new(config)?;

    let store: Box<dyn SnapshotStore> = if args.no_store {
        Box::new(MemoryStore::new())
    } else {
        let path = args.store.clone().unwrap_or_else(default_results_path);
        info!(path = %path.display(), "Appending results to file.");
        Box::new(JsonLinesStore::new(path))
    };

    match args.command {
        Commands::Check { domain, json } => {
            let snapshot = checker.check_and_store(&domain, store.as_ref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", cli::render_snapshot(&snapshot));
            }
        }
        Commands::Bulk { input } => {
            let text = read_input(input).await?;
            let domains = cli::parse_bulk_input(&text);
            if domains.is_empty() {
                bail!("no domains to check");
            }

            let progress: ProgressCallback = Box::new(|done: usize, total: usize, raw: &str| {
                eprintln!("[{done}/{total}] {raw}");
            });
            let summary = checker
                .check_bulk_with_progress(domains, store.as_ref(), Some(progress))
                .await;

            println!(
                "Bulk check completed! Processed {} domains, {} successful checks.",
                summary.attempted, summary.succeeded
            );
            println!(
                "Reachable: {}, flagged unsafe: {}",
                summary.reachable, summary.unsafe_count
            );
            for (raw, reason) in &summary.failures {
                println!("  failed {raw:?}: {reason}");
            }
        }
    }

    Ok(())
}

async fn read_input(input: Option<PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => tokio::fs::read_to_string(&path)
            .await
            .wrap_err_with(|| format!("reading {}", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .wrap_err("reading domains from stdin")?;
            Ok(text)
        }
    }
}
