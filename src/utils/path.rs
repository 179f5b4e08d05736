//! Per-job storage layout

use std::path::{Path, PathBuf};

use crate::domain::model::JobId;

/// Resolves where each derived artifact of a job lives
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root directory holding every artifact of one job
    pub fn job_root(&self, id: &JobId) -> PathBuf {
        self.root.join(id.as_str())
    }

    pub fn job_record(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("job.json")
    }

    /// Lock file held while a run or deletion owns the job
    pub fn lease_path(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("run.lock")
    }

    pub fn audio_path(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("audio.wav")
    }

    /// Base name the speech engine writes captions under
    pub fn captions_base(&self) -> &'static str {
        "captions"
    }

    pub fn captions_path(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("captions.vtt")
    }

    pub fn frames_dir(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("frames")
    }

    pub fn sections_path(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("sections.json")
    }

    pub fn images_dir(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("images")
    }

    pub fn article_path(&self, id: &JobId) -> PathBuf {
        self.job_root(id).join("article.md")
    }
}
