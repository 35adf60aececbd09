// src/config.rs

use lazy_static::lazy_static;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::core::error::ConfigError;

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", PROJECT_NAME.clone());
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
    pub static ref DATA_FOLDER: Option<PathBuf> = std::env::var(format!("{}_DATA", PROJECT_NAME.clone()))
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from);
}

pub const DEFAULT_REPUTATION_API_URL: &str = "https://www.virustotal.com/api/v3/domains/";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_REACHABILITY_TIMEOUT: Duration = Duration::from_millis(3000);
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Floor for the timed fetch, whatever the client timeout is set to.
const MIN_TIMED_FETCH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Every tunable the checker reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    /// Reputation API credential. `None` disables the reputation lookup.
    pub reputation_api_key: Option<String>,
    /// Base URL the domain is appended to.
    pub reputation_api_url: String,
    pub http_timeout: Duration,
    pub connection_timeout: Duration,
    /// Read bound for the HTTP status probe.
    pub read_timeout: Duration,
    pub reachability_timeout: Duration,
    pub render_timeout: Duration,
    /// Maximum number of checks in flight during a bulk run.
    pub concurrency: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            reputation_api_key: None,
            reputation_api_url: DEFAULT_REPUTATION_API_URL.to_string(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            reachability_timeout: DEFAULT_REACHABILITY_TIMEOUT,
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl CheckerConfig {
    /// Loads the configuration from `DOMAIN_CHECKER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup, falling back to
    /// the defaults for every key the lookup does not know.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let key = env_key(suffix);
            lookup(&key).map(|value| (key, value))
        };

        let mut config = Self::default();

        if let Some((_, value)) = var("VIRUSTOTAL_API_KEY") {
            config = config.with_api_key(Some(value));
        }
        if let Some((key, value)) = var("VIRUSTOTAL_API_URL") {
            config.reputation_api_url = parse_url(&key, &value)?;
        }
        if let Some((key, value)) = var("HTTP_TIMEOUT_MS") {
            config.http_timeout = parse_millis(&key, &value)?;
        }
        if let Some((key, value)) = var("HTTP_CONNECTION_TIMEOUT_MS") {
            config.connection_timeout = parse_millis(&key, &value)?;
        }
        if let Some((key, value)) = var("HTTP_READ_TIMEOUT_MS") {
            config.read_timeout = parse_millis(&key, &value)?;
        }
        if let Some((key, value)) = var("REACHABILITY_TIMEOUT_MS") {
            config.reachability_timeout = parse_millis(&key, &value)?;
        }
        if let Some((key, value)) = var("RENDER_TIMEOUT_MS") {
            config.render_timeout = parse_millis(&key, &value)?;
        }
        if let Some((key, value)) = var("CONCURRENCY") {
            config.concurrency = parse_positive(&key, &value)?;
        }

        Ok(config)
    }

    /// Sets the API key; blank keys count as no key.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.reputation_api_key = key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        self
    }

    pub fn with_api_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.reputation_api_url = parse_url("reputation API URL", url)?;
        Ok(self)
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    /// Sets the bulk-mode limit; zero is rejected like the `CONCURRENCY` variable.
    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, ConfigError> {
        if concurrency == 0 {
            return Err(ConfigError::ZeroValue {
                key: "concurrency".to_string(),
            });
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    /// Bound applied to each timed-fetch attempt.
    pub fn timed_fetch_timeout(&self) -> Duration {
        self.http_timeout.max(MIN_TIMED_FETCH_TIMEOUT)
    }
}

fn env_key(suffix: &str) -> String {
    format!("{}_{}", PROJECT_NAME.as_str(), suffix)
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })?;
    if millis == 0 {
        return Err(ConfigError::ZeroValue { key: key.to_string() });
    }
    Ok(Duration::from_millis(millis))
}

fn parse_positive(key: &str, value: &str) -> Result<usize, ConfigError> {
    let n: usize = value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })?;
    if n == 0 {
        return Err(ConfigError::ZeroValue { key: key.to_string() });
    }
    Ok(n)
}

// The domain is appended verbatim, so the URL is kept as written once it parses.
fn parse_url(key: &str, value: &str) -> Result<String, ConfigError> {
    let value = value.trim();
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(value.to_string())
}
