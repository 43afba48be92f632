//! Durable JSON document storage
//!
//! Each durable document is one JSON file under the data directory, loaded
//! in full and rewritten in full on every save. Saves go through a temp file
//! plus atomic rename so a crash mid-write never leaves a partial document;
//! concurrent readers always observe a complete prior or new version.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const KNOWLEDGE_FILE: &str = "knowledge.json";
pub const PERFORMANCE_FILE: &str = "performance.json";
pub const VALIDATION_FILE: &str = "validation.json";
pub const REWARDS_FILE: &str = "rewards.json";

/// Filesystem-backed store for the four durable documents
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load a document, or its default when the file does not exist yet.
    /// A present-but-corrupt file is an error, not a silent reset.
    pub async fn load<T>(&self, file: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt document: {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
        }
    }

    /// Rewrite a document in full, atomically (temp file + rename).
    pub async fn save<T>(&self, file: &str, document: &T) -> Result<()>
    where
        T: Serialize,
    {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));

        let bytes = serde_json::to_vec_pretty(document)?;
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;

        debug!(file, bytes = bytes.len(), "document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{PerformanceDocument, RewardDocument, TradeOutcome, TradeRecord};
    use chrono::Utc;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let doc: RewardDocument = store.load(REWARDS_FILE).await.unwrap();
        assert_eq!(doc.total_score, 0);
        assert!(doc.history.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let mut doc = PerformanceDocument::default();
        doc.record_trade(TradeRecord {
            id: Uuid::new_v4(),
            profit: 12.5,
            concepts_used: vec!["pcc".to_string()],
            timestamp: Utc::now(),
        });
        store.save(PERFORMANCE_FILE, &doc).await.unwrap();

        let loaded: PerformanceDocument = store.load(PERFORMANCE_FILE).await.unwrap();
        assert_eq!(loaded.total_trades(), 1);
        assert!((loaded.win_rate - 100.0).abs() < 1e-9);
        // No leftover temp file after the rename.
        assert!(!dir.path().join(format!("{}.tmp", PERFORMANCE_FILE)).exists());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());

        let mut doc = RewardDocument::default();
        doc.apply(TradeOutcome::Win, 10.0);
        store.save(REWARDS_FILE, &doc).await.unwrap();
        doc.apply(TradeOutcome::Loss, -4.0);
        store.save(REWARDS_FILE, &doc).await.unwrap();

        let loaded: RewardDocument = store.load(REWARDS_FILE).await.unwrap();
        assert_eq!(loaded.total_score, -400);
        assert_eq!(loaded.history.len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join(REWARDS_FILE), b"{not json")
            .await
            .unwrap();
        let store = DocumentStore::new(dir.path());
        let result: Result<RewardDocument> = store.load(REWARDS_FILE).await;
        assert!(result.is_err());
    }
}
