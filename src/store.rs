// src/store.rs

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::core::error::StoreError;
use crate::core::models::DomainCheckSnapshot;

/// Where finished snapshots go. The checker only ever calls `save`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, snapshot: &DomainCheckSnapshot) -> Result<(), StoreError>;
}

/// Keeps snapshots in memory, in the order they were saved.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<Vec<DomainCheckSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<DomainCheckSnapshot> {
        match self.snapshots.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, snapshot: &DomainCheckSnapshot) -> Result<(), StoreError> {
        let mut guard = match self.snapshots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.push(snapshot.clone());
        Ok(())
    }
}

/// Appends one JSON document per line to a file.
#[derive(Debug)]
pub struct JsonLinesStore {
    path: PathBuf,
    // Serializes appends so concurrent checks never interleave lines.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonLinesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SnapshotStore for JsonLinesStore {
    async fn save(&self, snapshot: &DomainCheckSnapshot) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(snapshot)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %self.path.display(), domain = snapshot.domain(), "Snapshot stored.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{ProbeOutcomes, RenderReport, ReputationLabel};

    fn snapshot(domain: &str) -> DomainCheckSnapshot {
        DomainCheckSnapshot::assemble(
            domain.to_string(),
            ProbeOutcomes {
                reachable: false,
                http_status: -1,
                timing_summary: "No Response".to_string(),
                reputation: ReputationLabel::NotChecked,
                reputation_details: None,
                render: RenderReport::failed("NavigationError: refused".to_string(), 3),
            },
        )
    }

    #[tokio::test]
    async fn test_memory_store_keeps_save_order() {
        let store = MemoryStore::new();
        store.save(&snapshot("a.example")).await.unwrap();
        store.save(&snapshot("b.example")).await.unwrap();

        let domains: Vec<String> = store
            .snapshots()
            .iter()
            .map(|s| s.domain().to_string())
            .collect();
        assert_eq!(domains, vec!["a.example", "b.example"]);
    }

    #[tokio::test]
    async fn test_json_lines_store_round_trips_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonLinesStore::new(dir.path().join("results.jsonl"));
        let original = snapshot("a.example");

        store.save(&original).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.ends_with('\n'));
        let stored: DomainCheckSnapshot = serde_json::from_str(text.trim_end()).unwrap();
        assert_eq!(stored, original);
    }
}
