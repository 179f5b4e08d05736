//! JSON-file job store
//!
//! Each job record lives at `<storage_root>/<job id>/job.json`, next to the
//! artifacts derived from it. Writes go through a temporary file and a rename.
//! Across processes, updates to one job are serialized by its run lease.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;
use walkdir::WalkDir;

use crate::domain::model::{Job, JobId, JobUpdate};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::JobStorePort;
use crate::utils::path::StorageLayout;

pub struct JsonJobStore {
    layout: StorageLayout,
    // Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonJobStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self {
            layout,
            write_lock: Mutex::new(()),
        }
    }

    async fn read(&self, path: &Path) -> PipelineResult<Option<Job>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, job: &Job) -> PipelineResult<()> {
        let path = self.layout.job_record(&job.id);
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(job)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl JobStorePort for JsonJobStore {
    async fn get(&self, id: &JobId) -> PipelineResult<Option<Job>> {
        self.read(&self.layout.job_record(id)).await
    }

    async fn create(&self, job: Job) -> PipelineResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.layout.job_record(&job.id);
        if tokio::fs::try_exists(&path).await? {
            return Err(PipelineError::validation(format!("Job {} already exists", job.id)));
        }
        tokio::fs::create_dir_all(self.layout.job_root(&job.id)).await?;
        self.write(&job).await
    }

    async fn update(&self, id: &JobId, update: &JobUpdate) -> PipelineResult<Job> {
        let _guard = self.write_lock.lock().await;
        let mut job = self
            .read(&self.layout.job_record(id))
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("job {}", id)))?;
        job.apply(update)?;
        self.write(&job).await?;
        Ok(job)
    }

    async fn delete(&self, id: &JobId) -> PipelineResult<bool> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.layout.job_record(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> PipelineResult<Vec<Job>> {
        let mut jobs = Vec::new();
        if !self.layout.root().is_dir() {
            return Ok(jobs);
        }
        let records: Vec<_> = WalkDir::new(self.layout.root())
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name() == "job.json")
            .map(|entry| entry.into_path())
            .collect();

        for path in records {
            match self.read(&path).await {
                Ok(Some(job)) => jobs.push(job),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable job record {}: {}", path.display(), e),
            }
        }
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }
}
