// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::model::*;
use crate::error::PipelineResult;
use crate::planner::SamplingPlan;
use crate::process::OutputSink;

/// Port for media probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Duration of the video in seconds
    async fn probe_duration(&self, video: &Path) -> PipelineResult<f64>;
}

/// Port for the media transcoder
#[async_trait]
pub trait TranscodePort: Send + Sync {
    /// Decode `video` at the plan's rate into sequentially numbered images.
    ///
    /// `pattern` is a printf-style path such as `dir/raw_%05d.jpg`; numbering
    /// starts at 1.
    async fn extract_frames(
        &self,
        video: &Path,
        plan: &SamplingPlan,
        pattern: &Path,
        sink: &OutputSink,
    ) -> PipelineResult<()>;

    /// Write a PCM WAV audio track
    async fn extract_audio(
        &self,
        video: &Path,
        output: &Path,
        sample_rate: u32,
        channels: u16,
        sink: &OutputSink,
    ) -> PipelineResult<()>;
}

/// Extension of the WebVTT caption documents the speech engine writes
pub const CAPTION_EXTENSION: &str = "vtt";

/// Input for one speech-to-text invocation
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: PathBuf,
    pub language: String,
    pub output_dir: PathBuf,
    /// File name of the caption document without extension
    pub base_name: String,
}

impl TranscriptionRequest {
    /// Where the engine is expected to write the document
    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.base_name, CAPTION_EXTENSION))
    }
}

/// Port for the speech-to-text engine
#[async_trait]
pub trait SpeechToTextPort: Send + Sync {
    /// Write a timestamped caption document and return its path
    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
        sink: &OutputSink,
    ) -> PipelineResult<PathBuf>;
}

/// Input for section generation
#[derive(Debug, Clone)]
pub struct SectionRequest<'a> {
    pub job_id: &'a JobId,
    pub transcript: &'a str,
    pub cues: &'a [Cue],
    pub kind: ArticleKind,
    pub section_count: usize,
    /// Number of extracted frames, for services that answer with image indices
    pub frame_count: usize,
}

/// Port for the generative content service
#[async_trait]
pub trait ContentGeneratorPort: Send + Sync {
    async fn classify(&self, job_id: &JobId, transcript: &str) -> PipelineResult<ArticleKind>;

    async fn generate_sections(&self, request: &SectionRequest<'_>) -> PipelineResult<Vec<Section>>;
}

/// Port for the generative image service
#[async_trait]
pub trait ImageTransformPort: Send + Sync {
    /// Transformed image bytes, or `None` when the service produced no image
    async fn transform(&self, source: &[u8], directive: &str) -> PipelineResult<Option<Vec<u8>>>;
}

/// Port for job persistence
#[async_trait]
pub trait JobStorePort: Send + Sync {
    async fn get(&self, id: &JobId) -> PipelineResult<Option<Job>>;

    async fn create(&self, job: Job) -> PipelineResult<()>;

    /// Apply `update` and return the stored job; `NotFound` for unknown ids
    async fn update(&self, id: &JobId, update: &JobUpdate) -> PipelineResult<Job>;

    /// Remove the record; returns whether it existed
    async fn delete(&self, id: &JobId) -> PipelineResult<bool>;

    async fn list(&self) -> PipelineResult<Vec<Job>>;
}
