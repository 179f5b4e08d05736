use std::sync::Arc;

use crate::adapters::{
    FFmpegAdapter, FFprobeAdapter, JsonJobStore, PassthroughImageTransformer, PipelineConfig,
    SectionsFileGenerator, WhisperCliAdapter,
};
use crate::app::{
    job_interactor::JobInteractor,
    pipeline_interactor::{JobLeases, PipelineInteractor, PipelinePorts, PipelineSettings},
};
use crate::error::PipelineResult;
use crate::ports::{
    ContentGeneratorPort, ImageTransformPort, JobStorePort, ProbePort, SpeechToTextPort,
    TranscodePort,
};
use crate::process::ProcessRunner;
use crate::quality::{FrameScorer, ImageFileScorer};
use crate::utils::path::StorageLayout;

pub trait AppContainer: Send + Sync {
    fn job_interactor(&self) -> Arc<JobInteractor>;
    fn pipeline_interactor(&self) -> Arc<PipelineInteractor>;
}

/// Wires the command-line adapters to the interactors
pub struct DefaultAppContainer {
    job_interactor: Arc<JobInteractor>,
    pipeline_interactor: Arc<PipelineInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: &PipelineConfig) -> PipelineResult<Self> {
        let layout = StorageLayout::new(&config.storage_root);
        let runner = ProcessRunner::new().with_timeout(config.process_timeout());
        let leases = JobLeases::with_lock_files(layout.clone());

        let store = Arc::new(JsonJobStore::new(layout.clone()));
        let ports = PipelinePorts {
            store: Arc::clone(&store) as Arc<dyn JobStorePort>,
            probe: Arc::new(FFprobeAdapter::new(&config.ffprobe_bin, runner.clone()))
                as Arc<dyn ProbePort>,
            transcoder: Arc::new(FFmpegAdapter::new(&config.ffmpeg_bin, runner.clone()))
                as Arc<dyn TranscodePort>,
            speech: Arc::new(WhisperCliAdapter::new(
                &config.whisper_bin,
                &config.whisper_model,
                runner,
            )) as Arc<dyn SpeechToTextPort>,
            content: Arc::new(SectionsFileGenerator::new(layout.clone()))
                as Arc<dyn ContentGeneratorPort>,
            images: Arc::new(PassthroughImageTransformer::new()) as Arc<dyn ImageTransformPort>,
            scorer: Arc::new(ImageFileScorer::new()) as Arc<dyn FrameScorer>,
        };

        let job_interactor = Arc::new(JobInteractor::new(
            Arc::clone(&store) as Arc<dyn JobStorePort>,
            layout.clone(),
            leases.clone(),
        ));
        let pipeline_interactor = Arc::new(PipelineInteractor::new(
            ports,
            layout,
            PipelineSettings::from(config),
            leases,
        )?);

        Ok(Self {
            job_interactor,
            pipeline_interactor,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn job_interactor(&self) -> Arc<JobInteractor> {
        Arc::clone(&self.job_interactor)
    }

    fn pipeline_interactor(&self) -> Arc<PipelineInteractor> {
        Arc::clone(&self.pipeline_interactor)
    }
}
