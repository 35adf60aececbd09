// src/core/scanner/mod.rs

// One module per probe; this file wires them into the check orchestrator.
pub mod http_scanner;
pub mod reachability_scanner;
pub mod render_scanner;
pub mod reputation_scanner;

#[cfg(test)]
mod test_support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::stream::{self, StreamExt};
use reqwest::redirect::Policy;
use tracing::{debug, info, instrument, warn};

use self::http_scanner::HttpScanner;
use self::reachability_scanner::ReachabilityScanner;
use self::render_scanner::{BrowserLauncher, ChromiumLauncher, RenderScanner};
use self::reputation_scanner::ReputationScanner;
use crate::config::CheckerConfig;
use crate::core::error::{CheckError, ConfigError};
use crate::core::models::{BulkSummary, DomainCheckSnapshot, ProbeOutcomes};
use crate::core::normalize::normalize_domain;
use crate::store::SnapshotStore;

const MAX_REDIRECTS: usize = 10;

/// Called after each bulk entry finishes with `(completed, total, raw input)`.
pub type ProgressCallback = Box<dyn Fn(usize, usize, &str) + Send + Sync>;

/// Runs every probe against a domain and assembles the snapshot.
///
/// Outbound clients are built once here and shared by every check, so a
/// single `DomainChecker` can serve many concurrent requests. Browsers are
/// the exception: each render launches and tears down its own instance.
#[derive(Clone)]
pub struct DomainChecker {
    config: CheckerConfig,
    reachability: ReachabilityScanner,
    http: HttpScanner,
    reputation: ReputationScanner,
    render: RenderScanner,
}

impl DomainChecker {
    pub fn new(config: CheckerConfig) -> Result<Self, ConfigError> {
        if config.concurrency == 0 {
            return Err(ConfigError::ZeroValue {
                key: "concurrency".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connection_timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            // Probes talk to the target directly, never through a proxy.
            .no_proxy()
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;

        let reachability = ReachabilityScanner::new(config.reachability_timeout);
        let http = HttpScanner::new(
            client.clone(),
            config.read_timeout,
            config.timed_fetch_timeout(),
        );
        let reputation = ReputationScanner::new(
            client,
            config.reputation_api_key.clone(),
            config.reputation_api_url.clone(),
            config.http_timeout,
        );
        let render = RenderScanner::new(
            Arc::new(ChromiumLauncher::new(config.render_timeout)),
            config.render_timeout,
        );

        Ok(Self {
            config,
            reachability,
            http,
            reputation,
            render,
        })
    }

    /// Replaces the browser used by the render probe.
    pub fn with_browser(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.render = RenderScanner::new(launcher, self.config.render_timeout);
        self
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Checks one domain.
    ///
    /// The only error is an input that normalizes to nothing; in that case no
    /// probe runs. Every probe failure is recorded inside the snapshot.
    #[instrument(skip(self))]
    pub async fn check(&self, raw: &str) -> Result<DomainCheckSnapshot, CheckError> {
        let domain = normalize_domain(raw).ok_or_else(|| {
            warn!("Rejecting empty domain.");
            CheckError::EmptyDomain(raw.to_string())
        })?;

        info!(domain = %domain, "Starting domain check.");

        // The probes share nothing, so they all run at once and each one
        // resolves within its own timeout.
        let (reachable, http_status, timing_summary, reputation, reputation_details, render) = tokio::join!(
            self.reachability.run_reachability_scan(&domain),
            self.http.run_status_scan(&domain),
            self.http.run_timed_fetch(&domain),
            self.reputation.run_reputation_scan(&domain),
            self.reputation.run_reputation_details(&domain),
            self.render.run_render_scan(&domain),
        );

        let snapshot = DomainCheckSnapshot::assemble(
            domain,
            ProbeOutcomes {
                reachable,
                http_status,
                timing_summary,
                reputation,
                reputation_details,
                render,
            },
        );

        info!(
            domain = snapshot.domain(),
            reachable = snapshot.reachable(),
            http_status = snapshot.http_status(),
            reputation = %snapshot.reputation(),
            "Domain check finished."
        );
        Ok(snapshot)
    }

    /// Checks one domain and hands the snapshot to `store`. A store failure
    /// fails the check.
    pub async fn check_and_store(
        &self,
        raw: &str,
        store: &dyn SnapshotStore,
    ) -> Result<DomainCheckSnapshot, CheckError> {
        let snapshot = self.check(raw).await?;
        store.save(&snapshot).await?;
        Ok(snapshot)
    }

    pub async fn check_bulk(&self, raws: Vec<String>, store: &dyn SnapshotStore) -> BulkSummary {
        self.check_bulk_with_progress(raws, store, None).await
    }

    /// Checks every entry independently, at most `concurrency` at a time. A
    /// failed entry is tallied and the rest carry on.
    #[instrument(skip_all, fields(total = raws.len()))]
    pub async fn check_bulk_with_progress(
        &self,
        raws: Vec<String>,
        store: &dyn SnapshotStore,
        progress: Option<ProgressCallback>,
    ) -> BulkSummary {
        let total = raws.len();
        let completed = AtomicUsize::new(0);
        let concurrency = self.config.concurrency;

        debug!(total, concurrency, "Starting bulk check.");

        let outcomes: Vec<(String, Result<DomainCheckSnapshot, CheckError>)> = stream::iter(raws)
            .map(|raw| {
                let completed = &completed;
                let progress = progress.as_ref();
                async move {
                    let result = self.check_and_store(&raw, store).await;
                    let count = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(progress) = progress {
                        progress(count, total, &raw);
                    }
                    (raw, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut summary = BulkSummary::default();
        for (raw, result) in outcomes {
            match result {
                Ok(snapshot) => summary.record_success(&snapshot),
                Err(e) => {
                    warn!(input = %raw, error = %e, "Bulk entry failed.");
                    summary.record_failure(raw, e.to_string());
                }
            }
        }

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            "Bulk check finished."
        );
        summary
    }
}
