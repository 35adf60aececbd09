//! Domain liveness and reputation checks.
//!
//! A [`DomainChecker`] normalizes a raw domain, runs the reachability, HTTP
//! status, timed fetch, reputation and render probes concurrently, and
//! returns one immutable [`DomainCheckSnapshot`]. Probe failures are recorded
//! in the snapshot; only an empty input is rejected.

pub mod config;
pub mod core;
pub mod logging;
pub mod store;

pub use crate::config::CheckerConfig;
pub use crate::core::error::{CheckError, ConfigError, StoreError};
pub use crate::core::models::{
    BulkSummary, DomainCheckSnapshot, NO_HTTP_STATUS, NO_RESPONSE, RenderReport, ReputationLabel,
    ScanResult,
};
pub use crate::core::normalize::normalize_domain;
pub use crate::core::scanner::render_scanner::{
    BrowserLauncher, BrowserSession, LoadedPage, RenderError,
};
pub use crate::core::scanner::{DomainChecker, ProgressCallback};
pub use crate::store::{JsonLinesStore, MemoryStore, SnapshotStore};
