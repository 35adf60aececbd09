// src/core/mod.rs

/// Data structures shared by the probes, the orchestrator and the
/// collaborators: the tagged probe result, labels, reports and the snapshot.
pub mod models;

/// Typed errors for rejected input, persistence and configuration.
pub mod error;

/// Turns raw user input into a canonical hostname.
pub mod normalize;

/// The probes and the orchestrator that runs them.
pub mod scanner;
