// Pipeline interactor - Runs job steps and streams their progress

pub mod events;
pub mod lease;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};

use crate::adapters::toml_config::PipelineConfig;
use crate::captions::{parse_cues, transcript_text};
use crate::domain::model::*;
use crate::error::{PipelineError, PipelineResult};
use crate::frames::{self, FrameExtractor};
use crate::output::{Article, ArticleSection, ArticleWriter};
use crate::ports::*;
use crate::process::OutputSink;
use crate::quality::FrameScorer;
use crate::selection::{FrameSelector, Selection};
use crate::utils::path::StorageLayout;

pub use events::{milestone, EventKind, EventSender, PipelineEvent};
pub use lease::{JobLease, JobLeases};

/// Step parameters taken from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub frame_count: u32,
    pub window_secs: f64,
    pub section_count: usize,
    pub language: String,
    pub audio_sample_rate: u32,
    pub audio_channels: u16,
    pub scoring_threads: usize,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            frame_count: config.frame_count,
            window_secs: config.window_secs,
            section_count: config.section_count,
            language: config.language.clone(),
            audio_sample_rate: config.audio_sample_rate,
            audio_channels: config.audio_channels,
            scoring_threads: config.scoring_threads,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

/// External collaborators the pipeline drives
#[derive(Clone)]
pub struct PipelinePorts {
    pub store: Arc<dyn JobStorePort>,
    pub probe: Arc<dyn ProbePort>,
    pub transcoder: Arc<dyn TranscodePort>,
    pub speech: Arc<dyn SpeechToTextPort>,
    pub content: Arc<dyn ContentGeneratorPort>,
    pub images: Arc<dyn ImageTransformPort>,
    pub scorer: Arc<dyn FrameScorer>,
}

/// Interactor for the transcribe / extract / generate pipeline
pub struct PipelineInteractor {
    ports: PipelinePorts,
    extractor: FrameExtractor,
    selector: Arc<FrameSelector>,
    writer: ArticleWriter,
    layout: StorageLayout,
    settings: PipelineSettings,
    leases: JobLeases,
}

impl PipelineInteractor {
    pub fn new(
        ports: PipelinePorts,
        layout: StorageLayout,
        settings: PipelineSettings,
        leases: JobLeases,
    ) -> PipelineResult<Self> {
        let extractor = FrameExtractor::new(Arc::clone(&ports.transcoder));
        let selector = Arc::new(FrameSelector::new(
            Arc::clone(&ports.scorer),
            settings.scoring_threads,
        )?);
        Ok(Self {
            ports,
            extractor,
            selector,
            writer: ArticleWriter::new(),
            layout,
            settings,
            leases,
        })
    }

    pub fn leases(&self) -> &JobLeases {
        &self.leases
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Start a run in the background and return its event stream
    pub fn start(
        self: &Arc<Self>,
        job_id: JobId,
        request: StepRequest,
    ) -> mpsc::UnboundedReceiver<PipelineEvent> {
        let (events, rx) = EventSender::channel();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _ = this.run(&job_id, request, &events).await;
        });
        rx
    }

    /// Run `request` on the job, emitting events as it goes.
    ///
    /// The stream always ends with exactly one `done` or `error` event. The
    /// returned job is the stored record after the last successful update.
    pub async fn run(
        &self,
        job_id: &JobId,
        request: StepRequest,
        events: &EventSender,
    ) -> PipelineResult<Job> {
        let outcome = self.run_steps(job_id, request, events).await;
        match &outcome {
            Ok(job) => {
                info!("Job {} finished {} ({})", job_id, request, job.status);
                events.emit(PipelineEvent::done(format!("{} finished", request)));
            }
            Err(e) => {
                error!("Job {} failed {}: {}", job_id, request, e);
                events.emit(PipelineEvent::error(e.to_string()));
            }
        }
        outcome
    }

    async fn run_steps(
        &self,
        job_id: &JobId,
        request: StepRequest,
        events: &EventSender,
    ) -> PipelineResult<Job> {
        let _lease = self.leases.acquire(job_id)?;
        let mut job = self
            .ports
            .store
            .get(job_id)
            .await?
            .ok_or_else(|| PipelineError::not_found(format!("job {}", job_id)))?;

        // Nothing else holds the lease, so a running status is left over from a killed run
        if job.status.is_running() {
            warn!(
                "Job {} was left {} by an interrupted run",
                job_id, job.status
            );
            let update = JobUpdate::status(JobStatus::Error)
                .with_error(format!("Interrupted while {}", job.status));
            job = self.ports.store.update(job_id, &update).await?;
        }

        let steps = request.steps();
        let total = steps.len();

        for (index, step) in steps.iter().copied().enumerate() {
            let span = info_span!("step", job = %job_id, step = step.as_str());
            let result = self
                .run_one(&job, step, events)
                .instrument(span)
                .await;

            match result {
                Ok(updated) => job = updated,
                Err(e) => {
                    self.mark_failed(job_id, &e).await;
                    return Err(e);
                }
            }

            events.emit(PipelineEvent::progress(milestone(index + 1, total)));
        }

        let final_status = match request {
            StepRequest::All => JobStatus::Completed,
            StepRequest::Single(_) => JobStatus::Pending,
        };
        match self
            .ports
            .store
            .update(job_id, &JobUpdate::status(final_status))
            .await
        {
            Ok(updated) => {
                events.emit(PipelineEvent::status(final_status));
                Ok(updated)
            }
            Err(e) => {
                self.mark_failed(job_id, &e).await;
                Err(e)
            }
        }
    }

    /// Enter the step's status, run it, then record its flag.
    ///
    /// The flag is cleared on entry since a step replaces its previous output
    /// before it can fail.
    async fn run_one(&self, job: &Job, step: Step, events: &EventSender) -> PipelineResult<Job> {
        let running = step.running_status();
        let enter = JobUpdate::status(running)
            .clear_error()
            .with_flag(step, false);
        self.ports.store.update(&job.id, &enter).await?;
        events.emit(PipelineEvent::status(running));
        info!("Starting {}", step);

        // Process output reaches the event stream before anything that follows the step
        let (sink, mut lines) = mpsc::unbounded_channel::<String>();
        let forward_to = events.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(line) = lines.recv().await {
                forward_to.emit(PipelineEvent::output(line));
            }
        });

        let result = match step {
            Step::Transcribe => self.transcribe(job, &sink).await,
            Step::Extract => self.extract(job, &sink).await,
            Step::Generate => self.generate(job, &sink).await,
        };
        drop(sink);
        let _ = forwarder.await;
        result?;

        let updated = self
            .ports
            .store
            .update(&job.id, &JobUpdate::step_done(step))
            .await?;
        info!("Finished {}", step);
        Ok(updated)
    }

    async fn mark_failed(&self, job_id: &JobId, cause: &PipelineError) {
        let update = JobUpdate::status(JobStatus::Error).with_error(cause.to_string());
        if let Err(e) = self.ports.store.update(job_id, &update).await {
            error!("Could not record failure on job {}: {}", job_id, e);
        }
    }

    async fn transcribe(&self, job: &Job, sink: &OutputSink) -> PipelineResult<()> {
        require_video(job)?;
        tokio::fs::create_dir_all(self.layout.job_root(&job.id)).await?;

        let audio = self.layout.audio_path(&job.id);
        self.ports
            .transcoder
            .extract_audio(
                &job.video_path,
                &audio,
                self.settings.audio_sample_rate,
                self.settings.audio_channels,
                sink,
            )
            .await?;

        let request = TranscriptionRequest {
            audio,
            language: self.settings.language.clone(),
            output_dir: self.layout.job_root(&job.id),
            base_name: self.layout.captions_base().to_string(),
        };
        let written = self.ports.speech.transcribe(&request, sink).await?;

        let captions = self.layout.captions_path(&job.id);
        if written != captions {
            tokio::fs::copy(&written, &captions).await?;
        }

        let text = read_artifact(&captions, "captions").await?;
        let cues = parse_cues(&text);
        let _ = sink.send(format!("Transcribed {} caption cue(s)", cues.len()));
        Ok(())
    }

    async fn extract(&self, job: &Job, sink: &OutputSink) -> PipelineResult<()> {
        require_video(job)?;
        let duration = self.ports.probe.probe_duration(&job.video_path).await?;
        let extraction = self
            .extractor
            .extract(
                &job.video_path,
                duration,
                self.settings.frame_count,
                &self.layout.frames_dir(&job.id),
                sink,
            )
            .await?;
        let _ = sink.send(format!(
            "Extracted {} frame(s), one every {:.2}s",
            extraction.frames.len(),
            extraction.plan.interval
        ));
        Ok(())
    }

    async fn generate(&self, job: &Job, sink: &OutputSink) -> PipelineResult<()> {
        let captions = read_artifact(&self.layout.captions_path(&job.id), "captions").await?;
        let cues = parse_cues(&captions);
        if cues.is_empty() {
            return Err(PipelineError::parse("Caption document contains no usable cues"));
        }
        let transcript = transcript_text(&cues);
        let frames = frames::load_frames(&self.layout.frames_dir(&job.id))?;

        let kind = self.ports.content.classify(&job.id, &transcript).await?;
        let _ = sink.send(format!("Classified transcript as {}", kind));

        let request = SectionRequest {
            job_id: &job.id,
            transcript: &transcript,
            cues: &cues,
            kind,
            section_count: self.settings.section_count,
            frame_count: frames.len(),
        };
        let sections = self.ports.content.generate_sections(&request).await?;
        if sections.is_empty() {
            return Err(PipelineError::parse("Content service returned no sections"));
        }

        let selections = self.select_for_sections(&sections, frames).await?;

        let images_dir = self.layout.images_dir(&job.id);
        if tokio::fs::try_exists(&images_dir).await? {
            tokio::fs::remove_dir_all(&images_dir).await?;
        }
        tokio::fs::create_dir_all(&images_dir).await?;

        let mut article_sections = Vec::with_capacity(sections.len());
        for (index, (section, selection)) in sections.iter().zip(&selections).enumerate() {
            let file_name = format!("section_{:02}.jpg", index + 1);
            self.render_image(section, selection, &images_dir.join(&file_name))
                .await?;
            let _ = sink.send(format!(
                "Section {}: frame {} at {:.1}s",
                index + 1,
                selection.frame.sequence,
                selection.frame.offset
            ));
            article_sections.push(ArticleSection {
                heading: section.heading.clone(),
                body: section.body.clone(),
                image: Some(PathBuf::from("images").join(file_name)),
                frame_offset: Some(selection.frame.offset),
            });
        }

        let article = Article {
            title: article_title(job),
            kind,
            sections: article_sections,
        };
        self.writer
            .write(&self.layout.article_path(&job.id), &article)
            .await
    }

    /// One frame per section.
    ///
    /// Temporal selection when every section carries a timestamp, otherwise
    /// fixed-count selection with one group per section.
    async fn select_for_sections(
        &self,
        sections: &[Section],
        frames: Vec<Frame>,
    ) -> PipelineResult<Vec<Selection>> {
        let anchors: Vec<SectionAnchor> = sections.iter().map(Section::anchor).collect();
        let selector = Arc::clone(&self.selector);
        let window = self.settings.window_secs;

        let timestamps: Option<Vec<f64>> = anchors
            .iter()
            .map(|a| match a {
                SectionAnchor::Timestamp(ts) => Some(*ts),
                _ => None,
            })
            .collect();

        // Scoring decodes images on the rayon pool; keep it off the async workers
        let selections = match timestamps {
            Some(targets) => {
                tokio::task::spawn_blocking(move || {
                    targets
                        .iter()
                        .map(|&target| selector.select_near(&frames, target, window))
                        .collect::<PipelineResult<Vec<_>>>()
                })
                .await
                .map_err(std::io::Error::from)??
            }
            None => {
                let count = sections.len();
                let picks = tokio::task::spawn_blocking(move || {
                    selector.select_evenly(&frames, count)
                })
                .await
                .map_err(std::io::Error::from)??;

                anchors
                    .iter()
                    .enumerate()
                    .map(|(i, anchor)| {
                        let slot = match anchor {
                            SectionAnchor::ImageIndex(index) => *index,
                            _ => i,
                        };
                        picks[slot % picks.len()].clone()
                    })
                    .collect()
            }
        };
        Ok(selections)
    }

    /// Transform the selected frame, falling back to the untouched frame
    async fn render_image(
        &self,
        section: &Section,
        selection: &Selection,
        target: &Path,
    ) -> PipelineResult<()> {
        let source = tokio::fs::read(&selection.frame.path).await?;
        let bytes = match self
            .ports
            .images
            .transform(&source, &section.image_directive)
            .await
        {
            Ok(Some(bytes)) => bytes,
            Ok(None) => source,
            Err(e) => {
                warn!(
                    "Image transform failed for \"{}\", using source frame: {}",
                    section.heading, e
                );
                source
            }
        };
        tokio::fs::write(target, bytes).await?;
        Ok(())
    }
}

fn require_video(job: &Job) -> PipelineResult<()> {
    if job.video_path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::not_found(format!(
            "video {}",
            job.video_path.display()
        )))
    }
}

async fn read_artifact(path: &Path, what: &str) -> PipelineResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(PipelineError::not_found(
            format!("{} {}", what, path.display()),
        )),
        Err(e) => Err(e.into()),
    }
}

fn article_title(job: &Job) -> String {
    job.video_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| format!("Job {}", job.id))
}
