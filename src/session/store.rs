//! Durable artifact store
//!
//! Key-value persistence for session artifacts, keyed by storage key.
//! Absence of an artifact is a normal outcome (`Ok(None)`), never an
//! error; writes are atomic overwrites.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::SessionArtifact;

/// Artifact store failures. Surfaced to the caller as
/// [`SessionError::Storage`](super::SessionError::Storage), never swallowed.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt artifact: {0}")]
    Corrupt(String),
}

/// Abstraction over durable session-artifact storage.
///
/// Last-writer-wins per key is acceptable; distinct identities never
/// contend on the same key.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Load the artifact for a storage key. `Ok(None)` means no prior
    /// session exists — an expected outcome, not a failure.
    async fn load(&self, key: &str) -> Result<Option<SessionArtifact>, StoreError>;

    /// Atomically overwrite the artifact for a storage key
    async fn save(&self, key: &str, artifact: &SessionArtifact) -> Result<(), StoreError>;
}

/// Filesystem-backed store: one JSON file per storage key
pub struct FsArtifactStore {
    base_dir: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `base_dir` (created on first write)
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", key))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn load(&self, key: &str) -> Result<Option<SessionArtifact>, StoreError> {
        let path = self.path_for(key);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No session artifact at {:?}", path);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let artifact = serde_json::from_str(&content)
            .map_err(|e| StoreError::Corrupt(format!("{:?}: {}", path, e)))?;

        debug!("Loaded session artifact from {:?}", path);
        Ok(Some(artifact))
    }

    async fn save(&self, key: &str, artifact: &SessionArtifact) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let path = self.path_for(key);
        let content = serde_json::to_string_pretty(artifact)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        // Write to a temp file then rename so the overwrite is atomic
        let tmp = self.base_dir.join(format!("{}.json.tmp", key));
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(
            "Saved session artifact ({} cookies) to {:?}",
            artifact.cookies.len(),
            path
        );
        Ok(())
    }
}

/// In-memory store, for tests and embedding
#[derive(Default)]
pub struct MemoryArtifactStore {
    artifacts: Arc<RwLock<HashMap<String, SessionArtifact>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn load(&self, key: &str) -> Result<Option<SessionArtifact>, StoreError> {
        Ok(self.artifacts.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, artifact: &SessionArtifact) -> Result<(), StoreError> {
        self.artifacts
            .write()
            .await
            .insert(key.to_string(), artifact.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CookieRecord;

    fn artifact(names: &[&str]) -> SessionArtifact {
        SessionArtifact {
            cookies: names
                .iter()
                .map(|n| CookieRecord {
                    name: n.to_string(),
                    value: "v".to_string(),
                    domain: ".example.com".to_string(),
                    path: "/".to_string(),
                    expiry: Some(1_999_999_999),
                    secure: true,
                    http_only: false,
                    same_site: None,
                })
                .collect(),
            captured_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_fs_store_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        assert!(store.load("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fs_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let a = artifact(&["sid", "csrf"]);
        store.save("key1", &a).await.unwrap();

        let loaded = store.load("key1").await.unwrap().unwrap();
        assert_eq!(loaded, a);
    }

    #[tokio::test]
    async fn test_fs_store_overwrites_not_merges() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        store.save("key1", &artifact(&["old1", "old2"])).await.unwrap();
        store.save("key1", &artifact(&["fresh"])).await.unwrap();

        let loaded = store.load("key1").await.unwrap().unwrap();
        assert_eq!(loaded.cookies.len(), 1);
        assert_eq!(loaded.cookies[0].name, "fresh");
    }

    #[tokio::test]
    async fn test_fs_store_corrupt_artifact_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        tokio::fs::write(dir.path().join("bad.json"), "not json")
            .await
            .unwrap();

        match store.load("bad").await {
            Err(StoreError::Corrupt(_)) => {}
            other => panic!("expected corrupt error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryArtifactStore::new();
        assert!(store.load("k").await.unwrap().is_none());

        store.save("k", &artifact(&["sid"])).await.unwrap();
        assert_eq!(store.load("k").await.unwrap().unwrap().cookies.len(), 1);
    }
}
