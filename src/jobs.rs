//! Job store seam for downstream collaborators
//!
//! The scraper and application submitter consume the authenticated
//! session and talk to a job store through this narrow interface:
//! dedup by job identifier, and flipping the applied flag. The portal's
//! full data model stays on the other side of it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// The minimal job record the store interface needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Portal-assigned job identifier; the dedup key
    pub job_id: String,
    pub title: String,
    pub link: String,
    /// Whether an application has been submitted
    #[serde(default)]
    pub applied: bool,
    /// When the record was first stored (seconds since the UNIX epoch)
    pub scraped_at: i64,
}

impl JobRecord {
    pub fn new(job_id: &str, title: &str, link: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            title: title.to_string(),
            link: link.to_string(),
            applied: false,
            scraped_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Job store failures
#[derive(Error, Debug)]
pub enum JobStoreError {
    #[error("Unknown job: {0}")]
    UnknownJob(String),

    /// The backing store is unreachable. Only durable (database-backed)
    /// implementations produce this; the in-memory store never fails.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Narrow persistence interface for scraped jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Whether a job with this identifier was already stored
    async fn is_known(&self, job_id: &str) -> Result<bool, JobStoreError>;

    /// Insert a record unless its job identifier is already known.
    /// Returns whether the record was inserted.
    async fn insert(&self, record: JobRecord) -> Result<bool, JobStoreError>;

    /// Mark a stored job as applied
    async fn mark_applied(&self, job_id: &str) -> Result<(), JobStoreError>;
}

/// In-memory job store, for tests and small runs
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn is_known(&self, job_id: &str) -> Result<bool, JobStoreError> {
        Ok(self.jobs.read().await.contains_key(job_id))
    }

    async fn insert(&self, record: JobRecord) -> Result<bool, JobStoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.job_id) {
            debug!("Job already exists: {} ({})", record.title, record.job_id);
            return Ok(false);
        }
        info!("Inserted job: {} ({})", record.title, record.job_id);
        jobs.insert(record.job_id.clone(), record);
        Ok(true)
    }

    async fn mark_applied(&self, job_id: &str) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(job_id) {
            Some(record) => {
                record.applied = true;
                Ok(())
            }
            None => Err(JobStoreError::UnknownJob(job_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_dedups_by_job_id() {
        let store = MemoryJobStore::new();
        assert!(store.is_empty().await);

        let first = store
            .insert(JobRecord::new("J-1", "Process Engineer", "https://x/1"))
            .await
            .unwrap();
        let second = store
            .insert(JobRecord::new("J-1", "Process Engineer", "https://x/1"))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_mark_applied() {
        let store = MemoryJobStore::new();
        store
            .insert(JobRecord::new("J-2", "Frontend Dev", "https://x/2"))
            .await
            .unwrap();

        assert!(!store.jobs.read().await.get("J-2").unwrap().applied);
        store.mark_applied("J-2").await.unwrap();
        assert!(store.jobs.read().await.get("J-2").unwrap().applied);
    }

    #[tokio::test]
    async fn test_mark_applied_unknown_job() {
        let store = MemoryJobStore::new();
        assert!(matches!(
            store.mark_applied("missing").await,
            Err(JobStoreError::UnknownJob(_))
        ));
    }
}
