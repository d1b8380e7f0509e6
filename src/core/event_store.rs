//! Append-only run log with file-based persistence.
//!
//! Events are stored as newline-delimited JSON (JSONL) for simplicity
//! and easy debugging/inspection. Each run also keeps a copy of every
//! asset value it materialized under `artifacts/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::domain::{AssetKey, AssetValue, Event, EventType};

/// File-based event store using JSONL format
pub struct EventStore {
    /// Directory containing the run
    run_dir: PathBuf,

    /// Path to the events.jsonl file
    events_path: PathBuf,

    /// Path to artifacts directory
    artifacts_dir: PathBuf,
}

impl EventStore {
    /// Create or open the event store of a run under `runs_dir`
    pub async fn open(runs_dir: &Path, run_id: Uuid) -> Result<Self> {
        let run_dir = runs_dir.join(run_id.to_string());
        let artifacts_dir = run_dir.join("artifacts");

        fs::create_dir_all(&artifacts_dir)
            .await
            .with_context(|| format!("Failed to create artifacts directory: {}", artifacts_dir.display()))?;

        let events_path = run_dir.join("events.jsonl");

        Ok(Self {
            run_dir,
            events_path,
            artifacts_dir,
        })
    }

    /// Get the path to the events file
    pub fn events_path(&self) -> &Path {
        &self.events_path
    }

    /// Get the run directory
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Get the artifacts directory
    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    fn artifact_path(&self, asset: AssetKey) -> PathBuf {
        self.artifacts_dir.join(format!("{}.json", asset))
    }

    /// Store the value an asset produced in this run
    pub async fn store_artifact(&self, value: &AssetValue) -> Result<PathBuf> {
        let artifact_path = self.artifact_path(value.key());
        let json = serde_json::to_vec(value).context("Failed to serialize artifact")?;

        fs::write(&artifact_path, json)
            .await
            .with_context(|| format!("Failed to write artifact: {}", artifact_path.display()))?;

        Ok(artifact_path)
    }

    /// Load the value an asset produced in this run
    pub async fn load_artifact(&self, asset: AssetKey) -> Result<Option<AssetValue>> {
        let artifact_path = self.artifact_path(asset);

        if !artifact_path.exists() {
            return Ok(None);
        }

        let content = fs::read(&artifact_path)
            .await
            .with_context(|| format!("Failed to read artifact: {}", artifact_path.display()))?;

        let value = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse artifact: {}", artifact_path.display()))?;

        Ok(Some(value))
    }

    /// List all artifacts in this run
    pub async fn list_artifacts(&self) -> Result<Vec<String>> {
        let mut artifacts = Vec::new();

        if !self.artifacts_dir.exists() {
            return Ok(artifacts);
        }

        let mut entries = fs::read_dir(&self.artifacts_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(stem) = name.strip_suffix(".json") {
                    artifacts.push(stem.to_string());
                }
            }
        }

        artifacts.sort();
        Ok(artifacts)
    }

    /// Append an event to the log
    pub async fn append(&self, event: &Event) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open events file: {}",
                    self.events_path.display()
                )
            })?;

        let json = serde_json::to_string(event).context("Failed to serialize event")?;
        file.write_all(format!("{}\n", json).as_bytes())
            .await
            .context("Failed to write event")?;
        file.flush().await.context("Failed to flush event")?;

        Ok(())
    }

    /// Replay all events in order
    pub async fn replay(&self) -> Result<Vec<Event>> {
        if !self.events_path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.events_path)
            .await
            .with_context(|| format!("Failed to open events file: {}", self.events_path.display()))?;

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let event: Event = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse event: {}", line))?;
            events.push(event);
        }

        Ok(events)
    }

    /// Check if a step is already completed (idempotency check)
    pub async fn is_step_completed(&self, idempotency_key: &str) -> Result<bool> {
        let events = self.replay().await?;

        let completed = events.iter().any(|e| {
            e.idempotency_key == idempotency_key
                && matches!(e.event_type, EventType::StepCompleted)
        });

        Ok(completed)
    }

    /// List all run IDs under `runs_dir`
    pub async fn list_runs(runs_dir: &Path) -> Result<Vec<Uuid>> {
        if !runs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        let mut entries = fs::read_dir(runs_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Ok(uuid) = Uuid::parse_str(name) {
                        runs.push(uuid);
                    }
                }
            }
        }

        Ok(runs)
    }
}

/// Generate an idempotency key for an asset materialization
pub fn generate_idempotency_key(run_id: Uuid, step_name: &str, input: &str) -> String {
    let input_hash = hash_input(input);
    format!("{}:{}:{}", run_id, step_name, input_hash)
}

/// Hash input content (first 16 chars of SHA256)
pub fn hash_input(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{IdentifierList, StepStatus};
    use tempfile::TempDir;

    async fn create_test_store() -> (EventStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = EventStore::open(temp_dir.path(), Uuid::new_v4())
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_event_append_and_replay() {
        let (store, _temp) = create_test_store().await;
        let run_id = Uuid::new_v4();

        let event1 = Event::new(
            run_id,
            None,
            EventType::RunStarted,
            format!("{}:start", run_id),
            "Run started".to_string(),
            StepStatus::Running,
        );

        let event2 = Event::new(
            run_id,
            Some("topstory_ids".to_string()),
            EventType::StepStarted,
            format!("{}:topstory_ids:abc", run_id),
            "Step started".to_string(),
            StepStatus::Running,
        );

        store.append(&event1).await.unwrap();
        store.append(&event2).await.unwrap();

        let events = store.replay().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::RunStarted);
        assert_eq!(events[1].event_type, EventType::StepStarted);
    }

    #[tokio::test]
    async fn test_idempotency_check() {
        let (store, _temp) = create_test_store().await;
        let run_id = Uuid::new_v4();
        let idem_key = format!("{}:topstories:abc123", run_id);

        assert!(!store.is_step_completed(&idem_key).await.unwrap());

        let started = Event::new(
            run_id,
            Some("topstories".to_string()),
            EventType::StepStarted,
            idem_key.clone(),
            "Step started".to_string(),
            StepStatus::Running,
        );
        store.append(&started).await.unwrap();
        assert!(!store.is_step_completed(&idem_key).await.unwrap());

        let completed = Event::new(
            run_id,
            Some("topstories".to_string()),
            EventType::StepCompleted,
            idem_key.clone(),
            "Step completed".to_string(),
            StepStatus::Completed,
        );
        store.append(&completed).await.unwrap();
        assert!(store.is_step_completed(&idem_key).await.unwrap());
    }

    #[tokio::test]
    async fn test_artifact_store_and_load() {
        let (store, _temp) = create_test_store().await;
        let value = AssetValue::TopstoryIds(IdentifierList::from_source(vec![5, 6]));

        assert!(store.load_artifact(AssetKey::TopstoryIds).await.unwrap().is_none());

        store.store_artifact(&value).await.unwrap();
        let loaded = store.load_artifact(AssetKey::TopstoryIds).await.unwrap();
        assert_eq!(loaded, Some(value));
        assert_eq!(store.list_artifacts().await.unwrap(), vec!["topstory_ids"]);
    }

    #[tokio::test]
    async fn test_list_runs() {
        let temp_dir = TempDir::new().unwrap();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        EventStore::open(temp_dir.path(), a).await.unwrap();
        EventStore::open(temp_dir.path(), b).await.unwrap();
        std::fs::create_dir_all(temp_dir.path().join("not-a-run")).unwrap();

        let mut runs = EventStore::list_runs(temp_dir.path()).await.unwrap();
        runs.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(runs, expected);
    }

    #[test]
    fn test_input_hash_consistency() {
        let hash1 = hash_input("test input");
        let hash2 = hash_input("test input");
        let hash3 = hash_input("different input");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 16);
    }
}
