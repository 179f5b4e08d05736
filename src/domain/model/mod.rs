// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::rules::StatusTransitions;
use crate::error::{PipelineError, PipelineResult};

/// Identifier of one pipeline job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh random job id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(PipelineError::validation(format!("Invalid job id: {:?}", s)));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Transcribing,
    Extracting,
    Generating,
    Completed,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Extracting => "extracting",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    /// A step is in progress
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            JobStatus::Transcribing | JobStatus::Extracting | JobStatus::Generating
        )
    }

    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        StatusTransitions::is_allowed(*self, next)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One externally-invoked stage of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Transcribe,
    Extract,
    Generate,
}

impl Step {
    /// Steps in pipeline order
    pub const ORDER: [Step; 3] = [Step::Transcribe, Step::Extract, Step::Generate];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Transcribe => "transcribe",
            Step::Extract => "extract",
            Step::Generate => "generate",
        }
    }

    /// Status the job holds while this step runs
    pub fn running_status(&self) -> JobStatus {
        match self {
            Step::Transcribe => JobStatus::Transcribing,
            Step::Extract => JobStatus::Extracting,
            Step::Generate => JobStatus::Generating,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller asked the pipeline to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRequest {
    Single(Step),
    All,
}

impl StepRequest {
    pub fn steps(&self) -> Vec<Step> {
        match self {
            StepRequest::Single(step) => vec![*step],
            StepRequest::All => Step::ORDER.to_vec(),
        }
    }
}

impl FromStr for StepRequest {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transcribe" => Ok(StepRequest::Single(Step::Transcribe)),
            "extract" => Ok(StepRequest::Single(Step::Extract)),
            "generate" => Ok(StepRequest::Single(Step::Generate)),
            "all" => Ok(StepRequest::All),
            other => Err(PipelineError::validation(format!(
                "Unknown step: {}. Valid steps: transcribe, extract, generate, all",
                other
            ))),
        }
    }
}

impl fmt::Display for StepRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRequest::Single(step) => write!(f, "{}", step),
            StepRequest::All => f.write_str("all"),
        }
    }
}

/// Per-step completion flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFlags {
    pub transcribe_done: bool,
    pub extract_done: bool,
    pub generate_done: bool,
}

impl StepFlags {
    pub fn is_done(&self, step: Step) -> bool {
        match step {
            Step::Transcribe => self.transcribe_done,
            Step::Extract => self.extract_done,
            Step::Generate => self.generate_done,
        }
    }

    pub fn set(&mut self, step: Step, done: bool) {
        match step {
            Step::Transcribe => self.transcribe_done = done,
            Step::Extract => self.extract_done = done,
            Step::Generate => self.generate_done = done,
        }
    }
}

/// One pipeline run target: a source video and everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub flags: StepFlags,
    pub error_message: Option<String>,
    pub video_path: PathBuf,
    pub video_size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(id: JobId, video_path: PathBuf, video_size: u64) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Pending,
            flags: StepFlags::default(),
            error_message: None,
            video_path,
            video_size,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a field update, rejecting status changes the state machine forbids.
    /// Nothing is modified when the update is rejected.
    pub fn apply(&mut self, update: &JobUpdate) -> PipelineResult<()> {
        if let Some(next) = update.status {
            if !self.status.can_transition_to(next) {
                return Err(PipelineError::IllegalTransition {
                    from: self.status.to_string(),
                    to: next.to_string(),
                });
            }
            self.status = next;
        }
        for (step, done) in &update.flags {
            self.flags.set(*step, *done);
        }
        if let Some(error) = &update.error_message {
            self.error_message = error.clone();
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial update of a job record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub status: Option<JobStatus>,
    pub flags: Vec<(Step, bool)>,
    /// `Some(None)` clears the stored message
    pub error_message: Option<Option<String>>,
}

impl JobUpdate {
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn step_done(step: Step) -> Self {
        Self {
            flags: vec![(step, true)],
            ..Default::default()
        }
    }

    pub fn with_flag(mut self, step: Step, done: bool) -> Self {
        self.flags.push((step, done));
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error_message = Some(None);
        self
    }
}

/// Nominal capture offset of a frame, truncated to whole seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Timecode {
    pub fn from_offset(offset_secs: f64) -> Self {
        let total = if offset_secs.is_finite() && offset_secs > 0.0 {
            offset_secs.trunc() as u64
        } else {
            0
        };
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}_{:02}_{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// One extracted still image
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Position in the extraction sequence, starting at 0
    pub sequence: usize,
    /// Nominal capture offset in seconds
    pub offset: f64,
    pub path: PathBuf,
}

impl Frame {
    pub fn new(sequence: usize, offset: f64, path: PathBuf) -> Self {
        Self {
            sequence,
            offset,
            path,
        }
    }

    pub fn timecode(&self) -> Timecode {
        Timecode::from_offset(self.offset)
    }
}

/// One time-bounded unit of caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Classification of a transcript, chosen by the content generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleKind {
    Tutorial,
    Narrative,
    Explainer,
}

impl ArticleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleKind::Tutorial => "tutorial",
            ArticleKind::Narrative => "narrative",
            ArticleKind::Explainer => "explainer",
        }
    }
}

impl fmt::Display for ArticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a section points at the frame it wants
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SectionAnchor {
    Timestamp(f64),
    ImageIndex(usize),
    Unanchored,
}

/// One article section produced by content generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_index: Option<usize>,
    /// Free-text prompt for the image transformation
    #[serde(default)]
    pub image_directive: String,
}

impl Section {
    pub fn anchor(&self) -> SectionAnchor {
        match (self.timestamp, self.image_index) {
            (Some(ts), _) if ts.is_finite() => SectionAnchor::Timestamp(ts),
            (_, Some(index)) => SectionAnchor::ImageIndex(index),
            _ => SectionAnchor::Unanchored,
        }
    }
}

/// Quality metrics of a single greyscale image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityScore {
    /// Root-mean-square Laplacian response, in [0, ∞)
    pub sharpness: f64,
    /// Mean intensity, in [0, 1]
    pub brightness: f64,
    pub score: f64,
}

/// A frame with its quality metrics, alive for one selection call
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredFrame {
    pub frame: Frame,
    pub quality: QualityScore,
}

/// Record of one extraction run, stored beside the frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameManifest {
    pub duration: f64,
    pub target_count: u32,
    pub interval: f64,
    pub frames: Vec<ManifestEntry>,
}

/// One frame of a manifest; `file` is relative to the frame directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub sequence: usize,
    pub offset: f64,
    pub file: String,
}

impl FrameManifest {
    /// Resolve entries against the directory the manifest was loaded from
    pub fn frames_in(&self, dir: &Path) -> Vec<Frame> {
        self.frames
            .iter()
            .map(|e| Frame::new(e.sequence, e.offset, dir.join(&e.file)))
            .collect()
    }
}

#[cfg(test)]
mod tests;
