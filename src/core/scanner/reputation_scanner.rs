// src/core/scanner/reputation_scanner.rs

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::core::models::{AnalysisStats, EngineVerdict, ReputationLabel, ScanResult};

const API_KEY_HEADER: &str = "x-apikey";

/// Engine categories that count as a flag in the detail text.
const FLAGGED_CATEGORIES: &[&str] = &["malicious", "suspicious"];

// The label reads only the stats, the detail text only the per-engine results.
const STATS_POINTER: &str = "/data/attributes/last_analysis_stats";
const RESULTS_POINTER: &str = "/data/attributes/last_analysis_results";

/// Third-party threat-intelligence lookup.
///
/// Without an API key nothing is sent and every call resolves to the
/// "not checked" outcome.
#[derive(Debug, Clone)]
pub struct ReputationScanner {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl ReputationScanner {
    pub fn new(client: Client, api_key: Option<String>, base_url: String, timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            base_url,
            timeout,
        }
    }

    /// Classifies the domain. Always resolves to one of the four labels.
    pub async fn run_reputation_scan(&self, domain: &str) -> ReputationLabel {
        info!(domain, "Starting reputation scan.");

        let label = match self.fetch_report(domain).await {
            Ok(Some(report)) => match read_stats(&report) {
                Ok(stats) => stats.label(),
                Err(e) => {
                    warn!(domain, error = %e, "Reputation report has unusable stats.");
                    ReputationLabel::Error
                }
            },
            Ok(None) => ReputationLabel::NotChecked,
            Err(_) => ReputationLabel::Error,
        };

        info!(domain, label = %label, "Reputation scan finished.");
        label
    }

    /// Lists the engines that flagged the domain, or `None` when no engine
    /// did or the lookup could not be made.
    pub async fn run_reputation_details(&self, domain: &str) -> Option<String> {
        debug!(domain, "Gathering reputation details.");

        match self.fetch_report(domain).await {
            Ok(Some(report)) => format_flagged_engines(&read_verdicts(&report)),
            Ok(None) | Err(_) => None,
        }
    }

    async fn fetch_report(&self, domain: &str) -> ScanResult<Value> {
        let Some(api_key) = self.api_key.as_deref() else {
            debug!(domain, "No API key configured, skipping reputation lookup.");
            return Ok(None);
        };

        let url = format!("{}{}", self.base_url, domain);
        debug!(url = %url, "Querying reputation service.");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, api_key)
            .header(ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "Reputation request failed.");
                format!("Reputation request failed: {}", e)
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url = %url, status = %status, "Reputation service returned no data.");
            return Err(format!("Reputation service answered {}", status));
        }

        let body = response.text().await.map_err(|e| {
            error!(url = %url, error = %e, "Failed to read reputation response body.");
            format!("Failed to read reputation response: {}", e)
        })?;

        let report: Value = serde_json::from_str(&body).map_err(|e| {
            error!(url = %url, error = %e, "Failed to parse reputation response.");
            format!("Reputation response parse error: {}", e)
        })?;

        Ok(Some(report))
    }
}

/// Engine counts from the report. A missing or null stats block reads as all
/// zeros; a present but malformed one is an error.
fn read_stats(report: &Value) -> Result<AnalysisStats, String> {
    match report.pointer(STATS_POINTER) {
        None | Some(Value::Null) => Ok(AnalysisStats::default()),
        Some(stats) => AnalysisStats::deserialize(stats)
            .map_err(|e| format!("Malformed analysis stats: {}", e)),
    }
}

/// Per-engine verdicts, read leniently: a non-object results block yields no
/// engines and non-string fields read as absent.
fn read_verdicts(report: &Value) -> BTreeMap<String, EngineVerdict> {
    let Some(results) = report.pointer(RESULTS_POINTER).and_then(Value::as_object) else {
        return BTreeMap::new();
    };

    results
        .iter()
        .map(|(engine, verdict)| {
            let text = |field: &str| verdict.get(field).and_then(Value::as_str).map(str::to_string);
            (
                engine.clone(),
                EngineVerdict {
                    category: text("category"),
                    result: text("result"),
                },
            )
        })
        .collect()
}

/// `engine:category(result)` for each flagging engine, joined by `"; "`.
fn format_flagged_engines(results: &BTreeMap<String, EngineVerdict>) -> Option<String> {
    let entries: Vec<String> = results
        .iter()
        .filter_map(|(engine, verdict)| {
            let category = verdict.category.as_deref().unwrap_or("");
            let flagged = FLAGGED_CATEGORIES
                .iter()
                .any(|flag| category.eq_ignore_ascii_case(flag));
            if !flagged {
                return None;
            }
            Some(match verdict.result.as_deref().filter(|r| !r.is_empty()) {
                Some(result) => format!("{}:{}({})", engine, category, result),
                None => format!("{}:{}", engine, category),
            })
        })
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(entries.join("; "))
    }
}
