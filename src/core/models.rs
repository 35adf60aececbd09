// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

// --- Reusable Result Types ---

// The tagged outcome every probe hands back to the orchestrator.
// `Ok(Some(v))` is a value, `Ok(None)` means the probe was not attempted,
// `Err(reason)` carries a short diagnostic for a failed attempt.
pub type ScanResult<T> = Result<Option<T>, String>;

/// Status code recorded when neither `http://` nor `https://` produced a response.
pub const NO_HTTP_STATUS: i32 = -1;

/// Timing summary recorded when the timed fetch got no response on either protocol.
pub const NO_RESPONSE: &str = "No Response";

// --- Reputation ---

/// Closed set of verdicts the reputation probe can produce.
///
/// The `Display` form is the label stored with each snapshot; filtering and
/// statistics in downstream collaborators match on these exact strings.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
pub enum ReputationLabel {
    #[strum(serialize = "Safe")]
    #[serde(rename = "Safe")]
    Safe,
    #[strum(serialize = "Unsafe")]
    #[serde(rename = "Unsafe")]
    Unsafe,
    #[strum(serialize = "Not Checked (API Key Required)")]
    #[serde(rename = "Not Checked (API Key Required)")]
    NotChecked,
    #[strum(serialize = "Error/No Data")]
    #[serde(rename = "Error/No Data")]
    Error,
}

// Per-verdict engine counts from `data.attributes.last_analysis_stats`.
// Counts the upstream leaves out are read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub undetected: u32,
}

impl AnalysisStats {
    /// Collapses the engine counts into a verdict.
    pub fn label(&self) -> ReputationLabel {
        if self.malicious > 0 || self.suspicious > 0 {
            ReputationLabel::Unsafe
        } else {
            ReputationLabel::Safe
        }
    }
}

// A single engine's entry in `data.attributes.last_analysis_results`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineVerdict {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
}

// --- Render Probe ---

/// What the headless browser saw when it loaded the domain over HTTPS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderReport {
    pub reachable: bool,
    pub title: Option<String>,
    /// Rendered document length in characters.
    pub content_length: usize,
    pub load_time_ms: u64,
    pub error: Option<String>,
}

impl RenderReport {
    pub fn loaded(title: Option<String>, content_length: usize, load_time_ms: u64) -> Self {
        Self {
            reachable: true,
            title,
            content_length,
            load_time_ms,
            error: None,
        }
    }

    pub fn failed(error: String, load_time_ms: u64) -> Self {
        Self {
            reachable: false,
            title: None,
            content_length: 0,
            load_time_ms,
            error: Some(error),
        }
    }
}

// --- Snapshot ---

/// The immutable record produced by one domain check.
///
/// A snapshot is only built by the orchestrator once every probe has
/// resolved; `created_at` is stamped at that point. There are no setters:
/// collaborators receive it by shared reference or by value and can read it,
/// store it or drop it, nothing else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCheckSnapshot {
    domain: String,
    reachable: bool,
    http_status: i32,
    reputation: ReputationLabel,
    reputation_details: Option<String>,
    timing_summary: String,
    render: RenderReport,
    created_at: DateTime<Utc>,
}

// Probe outputs gathered for one domain, waiting to be stamped.
#[derive(Debug, Clone)]
pub(crate) struct ProbeOutcomes {
    pub reachable: bool,
    pub http_status: i32,
    pub timing_summary: String,
    pub reputation: ReputationLabel,
    pub reputation_details: Option<String>,
    pub render: RenderReport,
}

impl DomainCheckSnapshot {
    pub(crate) fn assemble(domain: String, outcomes: ProbeOutcomes) -> Self {
        Self {
            domain,
            reachable: outcomes.reachable,
            http_status: outcomes.http_status,
            reputation: outcomes.reputation,
            reputation_details: outcomes.reputation_details,
            timing_summary: outcomes.timing_summary,
            render: outcomes.render,
            created_at: Utc::now(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn reachable(&self) -> bool {
        self.reachable
    }

    /// Final HTTP status, or [`NO_HTTP_STATUS`] when neither protocol answered.
    pub fn http_status(&self) -> i32 {
        self.http_status
    }

    pub fn reputation(&self) -> ReputationLabel {
        self.reputation
    }

    /// `engine:category(result)` entries joined by `"; "`, when any engine flagged the domain.
    pub fn reputation_details(&self) -> Option<&str> {
        self.reputation_details.as_deref()
    }

    /// `<PROTOCOL> <status> (<ms> ms)` or [`NO_RESPONSE`].
    pub fn timing_summary(&self) -> &str {
        &self.timing_summary
    }

    pub fn render(&self) -> &RenderReport {
        &self.render
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

// --- Bulk Mode ---

/// Tally of a bulk run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub attempted: usize,
    pub succeeded: usize,
    /// Succeeded checks whose host answered the reachability probe.
    pub reachable: usize,
    /// Succeeded checks labelled `Unsafe`.
    pub unsafe_count: usize,
    /// `(raw input, reason)` for every check that did not produce a stored snapshot.
    pub failures: Vec<(String, String)>,
}

impl BulkSummary {
    pub(crate) fn record_success(&mut self, snapshot: &DomainCheckSnapshot) {
        self.attempted += 1;
        self.succeeded += 1;
        if snapshot.reachable() {
            self.reachable += 1;
        }
        if snapshot.reputation() == ReputationLabel::Unsafe {
            self.unsafe_count += 1;
        }
    }

    pub(crate) fn record_failure(&mut self, input: String, reason: String) {
        self.attempted += 1;
        self.failures.push((input, reason));
    }
}
