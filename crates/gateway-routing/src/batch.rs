//! Batch queue for long-running tasks.
//!
//! The queue only records jobs; execution belongs to an external worker that
//! polls the store and moves jobs through [`JobStatus`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use gateway_config::JobStoreSettings;
use gateway_core::{GatewayError, GatewayResult, LayerMarker, TaskRequest, TaskResponse};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Prefix of the ticket returned to callers
pub const TICKET_PREFIX: &str = "batch-job:";

/// Provider id reported on batch responses
pub const BATCH_PROVIDER_ID: &str = "batch-queue";

/// Lifecycle of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker
    Pending,
    /// Picked up by a worker
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    /// Stable name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Persisted job record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    /// Job identifier
    pub id: Uuid,
    /// The full original request
    pub request: TaskRequest,
    /// Current status
    pub status: JobStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

impl BatchJob {
    /// New pending job
    #[must_use]
    pub fn new(request: TaskRequest) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            request,
            status: JobStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ticket string handed to the caller
    #[must_use]
    pub fn ticket(&self) -> String {
        format!("{TICKET_PREFIX}{}", self.id)
    }
}

/// Job persistence
#[async_trait]
pub trait JobStore: Send + Sync + Debug {
    /// Insert or replace a job
    async fn save(&self, job: &BatchJob) -> GatewayResult<()>;

    /// Load a job
    async fn get(&self, id: Uuid) -> GatewayResult<Option<BatchJob>>;

    /// All jobs, oldest first
    async fn list(&self) -> GatewayResult<Vec<BatchJob>>;
}

/// Process-local job store
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<Uuid, BatchJob>,
}

impl InMemoryJobStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn save(&self, job: &BatchJob) -> GatewayResult<()> {
        self.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> GatewayResult<Option<BatchJob>> {
        Ok(self.jobs.get(&id).map(|job| job.clone()))
    }

    async fn list(&self) -> GatewayResult<Vec<BatchJob>> {
        let mut jobs: Vec<BatchJob> = self.jobs.iter().map(|job| job.value().clone()).collect();
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}

/// Job store keeping one JSON document per job
#[derive(Debug)]
pub struct JsonFileJobStore {
    directory: PathBuf,
}

impl JsonFileJobStore {
    /// Open a store, creating the directory if needed
    pub async fn open(directory: impl Into<PathBuf>) -> GatewayResult<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| storage_error("create job directory", &directory, &e))?;
        info!(directory = %directory.display(), "Opened file job store");
        Ok(Self { directory })
    }

    /// Directory holding the job documents
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn job_path(&self, id: Uuid) -> PathBuf {
        self.directory.join(format!("{id}.json"))
    }
}

fn storage_error(action: &str, path: &Path, error: &dyn std::fmt::Display) -> GatewayError {
    GatewayError::storage(format!("Failed to {action} {}: {error}", path.display()))
}

#[async_trait]
impl JobStore for JsonFileJobStore {
    async fn save(&self, job: &BatchJob) -> GatewayResult<()> {
        let path = self.job_path(job.id);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(job)
            .map_err(|e| storage_error("serialize job", &path, &e))?;

        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| storage_error("write", &tmp, &e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| storage_error("move job into place at", &path, &e))?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> GatewayResult<Option<BatchJob>> {
        let path = self.job_path(id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| storage_error("parse", &path, &e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("read", &path, &e)),
        }
    }

    async fn list(&self) -> GatewayResult<Vec<BatchJob>> {
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|e| storage_error("list", &self.directory, &e))?;

        let mut jobs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("list", &self.directory, &e))?
        {
            let path = entry.path();
            let id = path
                .extension()
                .filter(|ext| *ext == "json")
                .and_then(|_| path.file_stem())
                .and_then(|stem| stem.to_str())
                .and_then(|stem| Uuid::parse_str(stem).ok());
            if let Some(id) = id {
                if let Some(job) = self.get(id).await? {
                    jobs.push(job);
                }
            }
        }
        jobs.sort_by_key(|job| job.created_at);
        Ok(jobs)
    }
}

/// Accepts batch-eligible tasks and hands out tickets
#[derive(Debug, Clone)]
pub struct BatchQueue {
    store: Arc<dyn JobStore>,
}

impl BatchQueue {
    /// Queue over a store
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Queue over a fresh in-memory store
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryJobStore::new()))
    }

    /// Queue over the configured store
    pub async fn from_settings(settings: &JobStoreSettings) -> GatewayResult<Self> {
        match settings {
            JobStoreSettings::Memory => Ok(Self::in_memory()),
            JobStoreSettings::File { directory } => {
                Ok(Self::new(Arc::new(JsonFileJobStore::open(directory).await?)))
            }
        }
    }

    /// Record a job for the request and return its ticket response.
    ///
    /// # Errors
    /// Returns `MissingIdentity` when the request has no caller identity, or
    /// a storage error if the job cannot be persisted
    pub async fn submit(&self, request: &TaskRequest) -> GatewayResult<TaskResponse> {
        let Some(caller) = request.caller() else {
            return Err(GatewayError::MissingIdentity {
                task: request.task_type,
            });
        };

        let job = BatchJob::new(request.clone());
        self.store.save(&job).await?;
        info!(job_id = %job.id, task_type = %request.task_type, user = %caller, "Batch job queued");

        Ok(TaskResponse::builder(BATCH_PROVIDER_ID)
            .result(job.ticket())
            .layer(LayerMarker::Batch)
            .meta("job_id", job.id.to_string())
            .meta("status", job.status.as_str())
            .build())
    }

    /// Look up a job
    pub async fn get(&self, id: Uuid) -> GatewayResult<Option<BatchJob>> {
        self.store.get(id).await
    }

    /// Look up the job behind a ticket
    pub async fn get_by_ticket(&self, ticket: &str) -> GatewayResult<Option<BatchJob>> {
        match Self::parse_ticket(ticket) {
            Some(id) => self.get(id).await,
            None => Ok(None),
        }
    }

    /// All jobs, oldest first
    pub async fn list(&self) -> GatewayResult<Vec<BatchJob>> {
        self.store.list().await
    }

    /// Extract the job id from a ticket
    #[must_use]
    pub fn parse_ticket(ticket: &str) -> Option<Uuid> {
        ticket
            .trim()
            .strip_prefix(TICKET_PREFIX)
            .and_then(|id| Uuid::parse_str(id).ok())
    }

    /// Move a job to a new status; `None` if the job does not exist
    pub async fn update_status(&self, id: Uuid, status: JobStatus) -> GatewayResult<Option<BatchJob>> {
        let Some(mut job) = self.store.get(id).await? else {
            return Ok(None);
        };
        job.status = status;
        job.updated_at = Utc::now();
        self.store.save(&job).await?;
        debug!(job_id = %id, status = status.as_str(), "Batch job status updated");
        Ok(Some(job))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{ErrorKind, TaskType};

    fn video_request(user: Option<&str>) -> TaskRequest {
        let mut builder = TaskRequest::builder(TaskType::VideoGeneration).prompt("a sunrise timelapse");
        if let Some(user) = user {
            builder = builder.user_id(user);
        }
        builder.build().expect("valid request")
    }

    #[tokio::test]
    async fn test_submit_returns_ticket() {
        let queue = BatchQueue::in_memory();
        let request = video_request(Some("user-1"));
        let response = queue.submit(&request).await.expect("queued");

        assert!(response.result.starts_with(TICKET_PREFIX));
        assert_eq!(response.layer, LayerMarker::Batch);
        assert_eq!(response.provider_id, BATCH_PROVIDER_ID);
        assert_eq!(response.meta("status"), Some(&serde_json::json!("pending")));

        let job = queue
            .get_by_ticket(&response.result)
            .await
            .expect("store")
            .expect("job exists");
        assert_eq!(job.request, request);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.created_at, job.updated_at);
        assert_eq!(
            response.meta("job_id"),
            Some(&serde_json::json!(job.id.to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_identity_rejected() {
        let queue = BatchQueue::in_memory();
        for request in [video_request(None), video_request(Some("   "))] {
            let err = queue.submit(&request).await.expect_err("no identity");
            assert_eq!(err.kind(), ErrorKind::MissingIdentity);
        }
        assert!(queue.list().await.expect("store").is_empty());
    }

    #[test]
    fn test_parse_ticket() {
        let id = Uuid::new_v4();
        assert_eq!(BatchQueue::parse_ticket(&format!("batch-job:{id}")), Some(id));
        assert_eq!(BatchQueue::parse_ticket(&id.to_string()), None);
        assert_eq!(BatchQueue::parse_ticket("batch-job:not-a-uuid"), None);
    }

    #[tokio::test]
    async fn test_update_status_bumps_timestamp() {
        let queue = BatchQueue::in_memory();
        let response = queue.submit(&video_request(Some("u"))).await.expect("queued");
        let id = BatchQueue::parse_ticket(&response.result).expect("ticket");

        let job = queue
            .update_status(id, JobStatus::Processing)
            .await
            .expect("store")
            .expect("job exists");
        assert_eq!(job.status, JobStatus::Processing);
        assert!(job.updated_at >= job.created_at);

        assert!(queue
            .update_status(Uuid::new_v4(), JobStatus::Failed)
            .await
            .expect("store")
            .is_none());
    }

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let queue = BatchQueue::from_settings(&JobStoreSettings::File {
            directory: dir.path().join("jobs"),
        })
        .await
        .expect("store");

        let first = queue.submit(&video_request(Some("a"))).await.expect("queued");
        let second = queue.submit(&video_request(Some("b"))).await.expect("queued");
        let first_id = BatchQueue::parse_ticket(&first.result).expect("ticket");

        queue
            .update_status(first_id, JobStatus::Completed)
            .await
            .expect("store");

        // A second store over the same directory sees the same jobs
        let reopened = JsonFileJobStore::open(dir.path().join("jobs")).await.expect("store");
        let jobs = reopened.list().await.expect("list");
        assert_eq!(jobs.len(), 2);
        let reloaded = reopened.get(first_id).await.expect("read").expect("exists");
        assert_eq!(reloaded.status, JobStatus::Completed);
        assert!(BatchQueue::parse_ticket(&second.result).is_some());
        assert!(reopened.get(Uuid::new_v4()).await.expect("read").is_none());
    }
}
