// src/core/error.rs

use thiserror::Error;

/// Why a check request did not yield a stored snapshot.
///
/// Probe failures never show up here; they are recorded inside the snapshot.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("domain is empty after normalization: {0:?}")]
    EmptyDomain(String),

    #[error("failed to store snapshot: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a whole number, got {value:?}")]
    InvalidNumber { key: String, value: String },

    #[error("{key} must be greater than zero")]
    ZeroValue { key: String },

    #[error("{key} is not a valid URL: {reason}")]
    InvalidUrl { key: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}
