// src/logging.rs

use color_eyre::eyre::{Result, WrapErr};
use directories::ProjectDirs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{self, EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{DATA_FOLDER, LOG_ENV, LOG_FILE};

/// File name of the default JSON-lines result store inside the data directory.
pub const RESULTS_FILE: &str = "results.jsonl";

fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "domain-checker", env!("CARGO_PKG_NAME"))
}

/// Where the log file and the default result store live.
///
/// `DOMAIN_CHECKER_DATA` wins over the platform data directory.
pub fn get_data_dir() -> PathBuf {
    resolve_data_dir(DATA_FOLDER.as_deref(), project_directory())
}

fn resolve_data_dir(overridden: Option<&Path>, project: Option<ProjectDirs>) -> PathBuf {
    if let Some(dir) = overridden {
        dir.to_path_buf()
    } else if let Some(proj_dirs) = project {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn default_results_path() -> PathBuf {
    get_data_dir().join(RESULTS_FILE)
}

// RUST_LOG first, then the crate's own level variable, then info for this crate only.
fn file_log_directive<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let set = |key: &str| lookup(key).filter(|directive| !directive.trim().is_empty());
    set("RUST_LOG")
        .or_else(|| set(LOG_ENV.as_str()))
        .unwrap_or_else(|| format!("{}=info", env!("CARGO_CRATE_NAME")))
}

/// Appends every event the filter allows to `<data-dir>/domain-checker.log`
/// and echoes this crate's errors to stderr. Returns the log file path.
///
/// The log file is appended to, never truncated.
pub fn initialize_logging() -> Result<PathBuf> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)
        .wrap_err_with(|| format!("creating data directory {}", directory.display()))?;
    let log_path = directory.join(LOG_FILE.as_str());
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .wrap_err_with(|| format!("opening log file {}", log_path.display()))?;

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(file_log_directive(|key| std::env::var(key).ok())));

    let stderr_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(EnvFilter::new(format!("{}=error", env!("CARGO_CRATE_NAME"))));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(stderr_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    info!(
        data_dir = %directory.display(),
        log_file = %log_path.display(),
        results = %directory.join(RESULTS_FILE).display(),
        "Logging initialized."
    );
    Ok(log_path)
}
