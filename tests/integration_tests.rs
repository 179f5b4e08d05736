//! Pipeline runs against in-process fakes of every external collaborator

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use clipscribe::adapters::{MemoryJobStore, PipelineConfig};
use clipscribe::app::pipeline_interactor::{
    EventKind, EventSender, JobLeases, PipelineEvent, PipelineInteractor, PipelinePorts,
    PipelineSettings,
};
use clipscribe::app::{AppContainer, DefaultAppContainer, JobInteractor};
use clipscribe::domain::model::*;
use clipscribe::error::{PipelineError, PipelineResult};
use clipscribe::planner::SamplingPlan;
use clipscribe::ports::*;
use clipscribe::process::OutputSink;
use clipscribe::quality::FrameScorer;
use clipscribe::utils::path::StorageLayout;

const CAPTIONS: &str = "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nHello world\n\n00:01:00.000 --> 00:01:04.000\nSecond cue\n";

/// Test utilities: fakes and a harness wiring them together
mod test_utils {
    use super::*;

    pub struct FakeProbe(pub f64);

    #[async_trait]
    impl ProbePort for FakeProbe {
        async fn probe_duration(&self, _video: &Path) -> PipelineResult<f64> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    pub struct FakeTranscoder {
        pub frames: usize,
        pub fail_frames: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TranscodePort for FakeTranscoder {
        async fn extract_frames(
            &self,
            _video: &Path,
            _plan: &SamplingPlan,
            pattern: &Path,
            sink: &OutputSink,
        ) -> PipelineResult<()> {
            if self.fail_frames.load(Ordering::SeqCst) {
                return Err(PipelineError::external("ffmpeg", "exited with status 1: corrupt input"));
            }
            let pattern = pattern.to_string_lossy().to_string();
            for i in 1..=self.frames {
                std::fs::write(pattern.replace("%05d", &format!("{:05}", i)), format!("frame {}", i))?;
                let _ = sink.send(format!("frame={}", i));
            }
            Ok(())
        }

        async fn extract_audio(
            &self,
            _video: &Path,
            output: &Path,
            _sample_rate: u32,
            _channels: u16,
            sink: &OutputSink,
        ) -> PipelineResult<()> {
            std::fs::write(output, b"RIFF")?;
            let _ = sink.send("audio written".to_string());
            Ok(())
        }
    }

    pub struct FakeSpeech {
        pub failure: Option<String>,
    }

    #[async_trait]
    impl SpeechToTextPort for FakeSpeech {
        async fn transcribe(
            &self,
            request: &TranscriptionRequest,
            sink: &OutputSink,
        ) -> PipelineResult<std::path::PathBuf> {
            if let Some(message) = &self.failure {
                return Err(PipelineError::external("whisper", message.clone()));
            }
            let path = request.output_path();
            std::fs::write(&path, CAPTIONS)?;
            let _ = sink.send("[00:00.000 --> 00:03.500] Hello world".to_string());
            Ok(path)
        }
    }

    pub struct FakeContent {
        pub sections: Vec<Section>,
    }

    #[async_trait]
    impl ContentGeneratorPort for FakeContent {
        async fn classify(&self, _job_id: &JobId, _transcript: &str) -> PipelineResult<ArticleKind> {
            Ok(ArticleKind::Tutorial)
        }

        async fn generate_sections(
            &self,
            _request: &SectionRequest<'_>,
        ) -> PipelineResult<Vec<Section>> {
            Ok(self.sections.clone())
        }
    }

    pub enum ImageBehavior {
        Transform,
        NoImage,
        Fail,
    }

    pub struct FakeImages(pub ImageBehavior);

    #[async_trait]
    impl ImageTransformPort for FakeImages {
        async fn transform(&self, source: &[u8], _directive: &str) -> PipelineResult<Option<Vec<u8>>> {
            match self.0 {
                ImageBehavior::Transform => {
                    let mut out = b"styled ".to_vec();
                    out.extend_from_slice(source);
                    Ok(Some(out))
                }
                ImageBehavior::NoImage => Ok(None),
                ImageBehavior::Fail => Err(PipelineError::external("image-service", "quota exceeded")),
            }
        }
    }

    /// Frames closer to sequence 3 score higher
    pub struct SequenceScorer;

    impl FrameScorer for SequenceScorer {
        fn score_frame(&self, frame: &Frame) -> PipelineResult<QualityScore> {
            let score = -((frame.sequence as f64) - 3.0).abs();
            Ok(QualityScore {
                sharpness: 0.0,
                brightness: 0.5,
                score,
            })
        }
    }

    pub fn section(heading: &str, timestamp: Option<f64>, image_index: Option<usize>) -> Section {
        Section {
            heading: heading.to_string(),
            body: format!("About {}", heading),
            timestamp,
            image_index,
            image_directive: "watercolor".to_string(),
        }
    }

    pub struct Options {
        pub frames: usize,
        pub fail_frames: bool,
        pub speech_failure: Option<String>,
        pub sections: Vec<Section>,
        pub images: ImageBehavior,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                frames: 8,
                fail_frames: false,
                speech_failure: None,
                sections: vec![
                    section("Intro", Some(10.0), None),
                    section("Details", Some(70.0), None),
                ],
                images: ImageBehavior::Transform,
            }
        }
    }

    pub struct Harness {
        pub dir: TempDir,
        pub layout: StorageLayout,
        pub store: Arc<MemoryJobStore>,
        pub leases: JobLeases,
        pub fail_frames: Arc<AtomicBool>,
        pub pipeline: Arc<PipelineInteractor>,
        pub jobs: JobInteractor,
    }

    impl Harness {
        pub fn new(options: Options) -> Self {
            let dir = TempDir::new().unwrap();
            let layout = StorageLayout::new(dir.path().join("data"));
            let store = Arc::new(MemoryJobStore::new());
            let leases = JobLeases::new();
            let fail_frames = Arc::new(AtomicBool::new(options.fail_frames));

            let ports = PipelinePorts {
                store: store.clone(),
                probe: Arc::new(FakeProbe(80.0)),
                transcoder: Arc::new(FakeTranscoder {
                    frames: options.frames,
                    fail_frames: Arc::clone(&fail_frames),
                }),
                speech: Arc::new(FakeSpeech {
                    failure: options.speech_failure,
                }),
                content: Arc::new(FakeContent {
                    sections: options.sections,
                }),
                images: Arc::new(FakeImages(options.images)),
                scorer: Arc::new(SequenceScorer),
            };
            let settings = PipelineSettings {
                frame_count: options.frames.max(1) as u32,
                window_secs: 15.0,
                scoring_threads: 2,
                ..PipelineSettings::default()
            };
            let pipeline = Arc::new(
                PipelineInteractor::new(ports, layout.clone(), settings, leases.clone()).unwrap(),
            );
            let jobs = JobInteractor::new(store.clone(), layout.clone(), leases.clone());

            Self {
                dir,
                layout,
                store,
                leases,
                fail_frames,
                pipeline,
                jobs,
            }
        }

        pub async fn create_job(&self) -> JobId {
            let video = self.dir.path().join("cooking_basics.mp4");
            std::fs::write(&video, b"not really a video").unwrap();
            self.jobs.create(&video).await.unwrap().id
        }

        /// Run to completion and collect every emitted event
        pub async fn run(
            &self,
            id: &JobId,
            request: StepRequest,
        ) -> (PipelineResult<Job>, Vec<PipelineEvent>) {
            let (events, mut rx) = EventSender::channel();
            let result = self.pipeline.run(id, request, &events).await;
            drop(events);
            let mut collected = Vec::new();
            while let Some(event) = rx.recv().await {
                collected.push(event);
            }
            (result, collected)
        }

        pub async fn job(&self, id: &JobId) -> Job {
            self.jobs.get(id).await.unwrap()
        }
    }

    pub fn of_kind(events: &[PipelineEvent], kind: EventKind) -> Vec<String> {
        events
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.data.clone())
            .collect()
    }

    pub fn assert_single_terminal(events: &[PipelineEvent]) {
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1, "events: {:?}", events);
        assert!(events.last().map(|e| e.is_terminal()).unwrap_or(false));
    }
}

use test_utils::*;

#[tokio::test]
async fn test_transcribe_success_returns_to_pending() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;

    let (result, events) = h.run(&id, StepRequest::Single(Step::Transcribe)).await;
    result.unwrap();

    assert_eq!(of_kind(&events, EventKind::Status), vec!["transcribing", "pending"]);
    assert_eq!(of_kind(&events, EventKind::Progress), vec!["100"]);
    let output = of_kind(&events, EventKind::Output);
    assert!(output.contains(&"audio written".to_string()));
    assert!(output.iter().any(|l| l.contains("Hello world")));
    assert_single_terminal(&events);
    assert_eq!(events.last().unwrap().kind, EventKind::Done);

    let job = h.job(&id).await;
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.flags.transcribe_done);
    assert!(!job.flags.extract_done);
    assert!(h.layout.captions_path(&id).is_file());
}

#[tokio::test]
async fn test_transcribe_failure_records_message() {
    let h = Harness::new(Options {
        speech_failure: Some("exited with status 2: model not found".to_string()),
        ..Options::default()
    });
    let id = h.create_job().await;

    let (result, events) = h.run(&id, StepRequest::Single(Step::Transcribe)).await;
    let err = result.unwrap_err();
    assert!(matches!(err, PipelineError::ExternalProcess { .. }));

    assert_eq!(of_kind(&events, EventKind::Status), vec!["transcribing"]);
    assert_single_terminal(&events);
    let last = events.last().unwrap();
    assert_eq!(last.kind, EventKind::Error);
    assert_eq!(last.data, err.to_string());

    let job = h.job(&id).await;
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error_message.as_deref(), Some(err.to_string().as_str()));
    assert!(!job.flags.transcribe_done);
}

#[tokio::test]
async fn test_all_stops_at_failed_step() {
    let h = Harness::new(Options {
        fail_frames: true,
        ..Options::default()
    });
    let id = h.create_job().await;

    let (result, events) = h.run(&id, StepRequest::All).await;
    assert!(result.is_err());

    let statuses = of_kind(&events, EventKind::Status);
    assert_eq!(statuses, vec!["transcribing", "extracting"]);
    assert!(!statuses.contains(&"completed".to_string()));
    assert_eq!(of_kind(&events, EventKind::Progress), vec!["33"]);
    assert_single_terminal(&events);

    let job = h.job(&id).await;
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.flags.transcribe_done);
    assert!(!job.flags.extract_done);
    assert!(!job.flags.generate_done);
    assert!(job.error_message.unwrap().contains("corrupt input"));
    assert!(!h.layout.article_path(&id).exists());
}

#[tokio::test]
async fn test_all_runs_every_step() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;

    let (result, events) = h.run(&id, StepRequest::All).await;
    let job = result.unwrap();

    assert_eq!(
        of_kind(&events, EventKind::Status),
        vec!["transcribing", "extracting", "generating", "completed"]
    );
    assert_eq!(of_kind(&events, EventKind::Progress), vec!["33", "66", "100"]);
    assert_single_terminal(&events);

    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.flags.transcribe_done && job.flags.extract_done && job.flags.generate_done);

    let article = std::fs::read_to_string(h.layout.article_path(&id)).unwrap();
    assert!(article.starts_with("# cooking basics"));
    assert!(article.contains("## Intro"));
    assert!(article.contains("![Details](images/section_02.jpg)"));

    // 80s over 8 frames: offsets 0,10,..,70. Target 10 ±15 covers sequences 0..=2,
    // of which sequence 2 is closest to the preferred sequence 3.
    let first = std::fs::read(h.layout.images_dir(&id).join("section_01.jpg")).unwrap();
    assert_eq!(first, b"styled frame 3".to_vec());
}

#[tokio::test]
async fn test_sections_without_timestamps_use_even_groups() {
    let h = Harness::new(Options {
        sections: vec![
            section("One", None, None),
            section("Two", None, Some(0)),
            section("Three", None, None),
        ],
        images: ImageBehavior::NoImage,
        ..Options::default()
    });
    let id = h.create_job().await;

    let (result, _) = h.run(&id, StepRequest::All).await;
    result.unwrap();

    let images = h.layout.images_dir(&id);
    // Groups hold sequences 0..=1, 2..=4 and 5..=7; raw files number from 1
    let one = std::fs::read(images.join("section_01.jpg")).unwrap();
    let two = std::fs::read(images.join("section_02.jpg")).unwrap();
    let three = std::fs::read(images.join("section_03.jpg")).unwrap();
    assert_eq!(one, b"frame 2".to_vec());
    // Explicit image index 0 points back at the first group
    assert_eq!(two, one);
    assert_eq!(three, b"frame 6".to_vec());
}

#[tokio::test]
async fn test_image_transform_failure_keeps_source_frame() {
    let h = Harness::new(Options {
        images: ImageBehavior::Fail,
        ..Options::default()
    });
    let id = h.create_job().await;

    let (result, events) = h.run(&id, StepRequest::All).await;
    result.unwrap();
    assert_eq!(events.last().unwrap().kind, EventKind::Done);

    let image = std::fs::read(h.layout.images_dir(&id).join("section_01.jpg")).unwrap();
    assert!(image.starts_with(b"frame "));
}

#[tokio::test]
async fn test_concurrent_run_is_rejected() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;

    let _held = h.leases.acquire(&id).unwrap();
    let (result, events) = h.run(&id, StepRequest::All).await;

    assert!(matches!(result, Err(PipelineError::Busy { .. })));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, EventKind::Error);
    assert_eq!(h.job(&id).await.status, JobStatus::Pending);
}

#[tokio::test]
async fn test_error_state_is_rerunnable() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;

    // Generate before any captions exist
    let (result, _) = h.run(&id, StepRequest::Single(Step::Generate)).await;
    assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    assert_eq!(h.job(&id).await.status, JobStatus::Error);

    let (result, _) = h.run(&id, StepRequest::Single(Step::Transcribe)).await;
    let job = result.unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.error_message.is_none());
}

#[tokio::test]
async fn test_generate_reruns_on_existing_artifacts() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;
    h.run(&id, StepRequest::All).await.0.unwrap();

    std::fs::remove_file(h.layout.article_path(&id)).unwrap();
    let (result, events) = h.run(&id, StepRequest::Single(Step::Generate)).await;
    let job = result.unwrap();

    assert_eq!(of_kind(&events, EventKind::Status), vec!["generating", "pending"]);
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.flags.generate_done);
    assert!(h.layout.article_path(&id).is_file());
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let h = Harness::new(Options::default());
    let (result, events) = h.run(&JobId::generate(), StepRequest::All).await;
    assert!(matches!(result, Err(PipelineError::NotFound { .. })));
    assert_single_terminal(&events);
}

#[tokio::test]
async fn test_background_run_streams_to_terminal_event() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;

    let mut rx: mpsc::UnboundedReceiver<PipelineEvent> =
        h.pipeline.start(id.clone(), StepRequest::Single(Step::Extract));
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_single_terminal(&events);
    assert_eq!(events.last().unwrap().kind, EventKind::Done);
    assert!(of_kind(&events, EventKind::Output).contains(&"frame=1".to_string()));
    assert!(!h.leases.is_held(&id));
    assert_eq!(h.store.get(&id).await.unwrap().unwrap().status, JobStatus::Pending);
}

#[tokio::test]
async fn test_interrupted_run_status_is_recovered() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;
    // A killed process leaves the record mid-step with no lease held
    h.store
        .update(&id, &JobUpdate::status(JobStatus::Extracting))
        .await
        .unwrap();

    let (result, events) = h.run(&id, StepRequest::Single(Step::Transcribe)).await;
    let job = result.unwrap();

    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.flags.transcribe_done);
    assert!(job.error_message.is_none());
    assert_eq!(events.last().unwrap().kind, EventKind::Done);
}

#[tokio::test]
async fn test_failed_rerun_clears_step_flag() {
    let h = Harness::new(Options::default());
    let id = h.create_job().await;

    let job = h.run(&id, StepRequest::Single(Step::Extract)).await.0.unwrap();
    assert!(job.flags.extract_done);

    h.fail_frames.store(true, Ordering::SeqCst);
    let (result, _) = h.run(&id, StepRequest::Single(Step::Extract)).await;
    assert!(matches!(result, Err(PipelineError::ExternalProcess { .. })));

    let job = h.job(&id).await;
    assert_eq!(job.status, JobStatus::Error);
    assert!(!job.flags.extract_done);
}

#[tokio::test]
async fn test_containers_sharing_a_root_share_run_leases() {
    let dir = TempDir::new().unwrap();
    let video = dir.path().join("lecture.mp4");
    std::fs::write(&video, b"not really a video").unwrap();
    let config = PipelineConfig {
        storage_root: dir.path().join("data"),
        ..PipelineConfig::default()
    };

    let first = DefaultAppContainer::new(&config).unwrap();
    let second = DefaultAppContainer::new(&config).unwrap();
    let id = first.job_interactor().create(&video).await.unwrap().id;

    let held = first.pipeline_interactor().leases().acquire(&id).unwrap();

    let (events, _rx) = EventSender::channel();
    let result = second
        .pipeline_interactor()
        .run(&id, StepRequest::Single(Step::Generate), &events)
        .await;
    assert!(matches!(result, Err(PipelineError::Busy { .. })));
    assert!(matches!(
        second.job_interactor().delete(&id).await,
        Err(PipelineError::Busy { .. })
    ));
    assert_eq!(
        second.job_interactor().get(&id).await.unwrap().status,
        JobStatus::Pending
    );

    drop(held);
    assert!(second.pipeline_interactor().leases().acquire(&id).is_ok());
}
