// Job interactor - Creates, inspects and deletes jobs

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::app::pipeline_interactor::JobLeases;
use crate::domain::model::{Job, JobId};
use crate::error::{PipelineError, PipelineResult};
use crate::ports::JobStorePort;
use crate::utils::path::StorageLayout;

/// Interactor for the job lifecycle outside of pipeline runs
pub struct JobInteractor {
    store: Arc<dyn JobStorePort>,
    layout: StorageLayout,
    leases: JobLeases,
}

impl JobInteractor {
    pub fn new(store: Arc<dyn JobStorePort>, layout: StorageLayout, leases: JobLeases) -> Self {
        Self {
            store,
            layout,
            leases,
        }
    }

    /// Register a new job for `video`
    pub async fn create(&self, video: &Path) -> PipelineResult<Job> {
        let metadata = match tokio::fs::metadata(video).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                return Err(PipelineError::validation(format!(
                    "Input is not a file: {}",
                    video.display()
                )));
            }
            Err(_) => {
                return Err(PipelineError::validation(format!(
                    "Input file does not exist: {}",
                    video.display()
                )));
            }
        };
        let video_path = tokio::fs::canonicalize(video).await?;

        let job = Job::new(JobId::generate(), video_path, metadata.len());
        tokio::fs::create_dir_all(self.layout.job_root(&job.id)).await?;
        self.store.create(job.clone()).await?;

        info!(
            "Created job {} for {} ({} bytes)",
            job.id,
            job.video_path.display(),
            job.video_size
        );
        Ok(job)
    }

    pub async fn get(&self, id: &JobId) -> PipelineResult<Job> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("job {}", id)))
    }

    pub async fn list(&self) -> PipelineResult<Vec<Job>> {
        self.store.list().await
    }

    /// Remove the job record and every artifact under its storage root
    pub async fn delete(&self, id: &JobId) -> PipelineResult<()> {
        let _lease = self.leases.acquire(id)?;

        let existed = self.store.delete(id).await?;
        let root = self.layout.job_root(id);
        let had_artifacts = tokio::fs::try_exists(&root).await?;
        if had_artifacts {
            tokio::fs::remove_dir_all(&root).await?;
        }

        if !existed && !had_artifacts {
            return Err(PipelineError::not_found(format!("job {}", id)));
        }
        info!("Deleted job {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::MemoryJobStore;

    fn interactor(root: &Path) -> JobInteractor {
        JobInteractor::new(
            Arc::new(MemoryJobStore::new()),
            StorageLayout::new(root),
            JobLeases::new(),
        )
    }

    #[tokio::test]
    async fn test_create_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("talk.mp4");
        std::fs::write(&video, b"0123456789").unwrap();
        let jobs = interactor(&dir.path().join("data"));

        let job = jobs.create(&video).await.unwrap();
        assert_eq!(job.video_size, 10);
        assert_eq!(jobs.get(&job.id).await.unwrap().id, job.id);

        let root = dir.path().join("data").join(job.id.as_str());
        assert!(root.is_dir());
        std::fs::write(root.join("captions.vtt"), "WEBVTT").unwrap();

        jobs.delete(&job.id).await.unwrap();
        assert!(!root.exists());
        assert!(matches!(
            jobs.get(&job.id).await,
            Err(PipelineError::NotFound { .. })
        ));
        assert!(matches!(
            jobs.delete(&job.id).await,
            Err(PipelineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_video_is_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = interactor(dir.path());
        assert!(matches!(
            jobs.create(&dir.path().join("absent.mp4")).await,
            Err(PipelineError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_while_running_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("v.mp4");
        std::fs::write(&video, b"x").unwrap();
        let leases = JobLeases::new();
        let jobs = JobInteractor::new(
            Arc::new(MemoryJobStore::new()),
            StorageLayout::new(dir.path().join("data")),
            leases.clone(),
        );
        let job = jobs.create(&video).await.unwrap();

        let _running = leases.acquire(&job.id).unwrap();
        assert!(matches!(
            jobs.delete(&job.id).await,
            Err(PipelineError::Busy { .. })
        ));
    }
}
