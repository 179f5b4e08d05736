//! In-memory job store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::model::{Job, JobId, JobUpdate};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::JobStorePort;

/// Job records held for the life of the process
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStorePort for MemoryJobStore {
    async fn get(&self, id: &JobId) -> PipelineResult<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn create(&self, job: Job) -> PipelineResult<()> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(PipelineError::validation(format!("Job {} already exists", job.id)));
        }
        jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn update(&self, id: &JobId, update: &JobUpdate) -> PipelineResult<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs
            .get_mut(id)
            .ok_or_else(|| PipelineError::not_found(format!("job {}", id)))?;
        job.apply(update)?;
        Ok(job.clone())
    }

    async fn delete(&self, id: &JobId) -> PipelineResult<bool> {
        Ok(self.jobs.write().await.remove(id).is_some())
    }

    async fn list(&self) -> PipelineResult<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }
}
