// src/cli.rs

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use domain_checker::{CheckerConfig, ConfigError, DomainCheckSnapshot};

#[derive(Parser, Debug)]
#[command(name = "domain-checker", version)]
#[command(about = "Checks whether domains are alive, serving HTTP and not flagged as malicious.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Reputation API key (overrides DOMAIN_CHECKER_VIRUSTOTAL_API_KEY)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Reputation API base URL; the domain is appended to it
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// HTTP client timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// HTTP connection timeout in milliseconds
    #[arg(long, global = true)]
    pub connect_timeout_ms: Option<u64>,

    /// Headless browser page-load timeout in milliseconds
    #[arg(long, global = true)]
    pub render_timeout_ms: Option<u64>,

    /// Number of domains checked at once in bulk mode
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    /// JSON-lines file results are appended to
    #[arg(long, global = true, conflicts_with = "no_store")]
    pub store: Option<PathBuf>,

    /// Keep results in memory only
    #[arg(long, global = true)]
    pub no_store: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a single domain
    #[command(alias = "c")]
    Check {
        domain: String,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check one domain per line from a file, or stdin when omitted or "-"
    #[command(alias = "b")]
    Bulk { input: Option<PathBuf> },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Layers the command-line flags over a loaded configuration.
    pub fn apply(&self, mut config: CheckerConfig) -> Result<CheckerConfig, ConfigError> {
        if let Some(key) = &self.api_key {
            config = config.with_api_key(Some(key.clone()));
        }
        if let Some(url) = &self.api_url {
            config = config.with_api_url(url)?;
        }
        if let Some(ms) = self.timeout_ms {
            config = config.with_http_timeout(positive_millis("--timeout-ms", ms)?);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config = config.with_connection_timeout(positive_millis("--connect-timeout-ms", ms)?);
        }
        if let Some(ms) = self.render_timeout_ms {
            config = config.with_render_timeout(positive_millis("--render-timeout-ms", ms)?);
        }
        if let Some(n) = self.concurrency {
            config = config.with_concurrency(n)?;
        }
        Ok(config)
    }
}

fn positive_millis(key: &str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::ZeroValue { key: key.to_string() });
    }
    Ok(Duration::from_millis(ms))
}

/// Splits pasted or file input into one entry per line.
///
/// Quotes and tabs are removed, surrounding whitespace is trimmed and lines
/// left empty are skipped.
pub fn parse_bulk_input(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().replace(['"', '\t'], ""))
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn render_snapshot(snapshot: &DomainCheckSnapshot) -> String {
    let mut out = String::new();
    let render = snapshot.render();

    let _ = writeln!(out, "Domain:       {}", snapshot.domain());
    let _ = writeln!(out, "Checked at:   {}", snapshot.created_at().to_rfc3339());
    let _ = writeln!(out, "Reachable:    {}", yes_no(snapshot.reachable()));
    let _ = writeln!(out, "HTTP status:  {}", snapshot.http_status());
    let _ = writeln!(out, "Timed fetch:  {}", snapshot.timing_summary());
    let _ = writeln!(out, "Reputation:   {}", snapshot.reputation());
    if let Some(details) = snapshot.reputation_details() {
        let _ = writeln!(out, "  Flagged by: {}", details);
    }
    let _ = writeln!(out, "Browser:      {}", if render.reachable { "loaded" } else { "failed" });
    if let Some(title) = &render.title {
        let _ = writeln!(out, "  Title:      {}", title);
    }
    let _ = writeln!(out, "  Content:    {} chars", render.content_length);
    let _ = writeln!(out, "  Load time:  {} ms", render.load_time_ms);
    if let Some(error) = &render.error {
        let _ = writeln!(out, "  Error:      {}", error);
    }
    out
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
