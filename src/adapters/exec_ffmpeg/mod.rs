//! FFmpeg execution adapter
//!
//! Frame sampling and audio extraction through the `ffmpeg` command line.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::error::PipelineResult;
use crate::planner::SamplingPlan;
use crate::ports::TranscodePort;
use crate::process::{OutputSink, ProcessRunner};

/// FFmpeg-based transcode adapter
pub struct FFmpegAdapter {
    binary: String,
    runner: ProcessRunner,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(binary: impl Into<String>, runner: ProcessRunner) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    fn frame_args(video: &Path, plan: &SamplingPlan, pattern: &Path) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-vf".to_string(),
            plan.fps_filter(),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            pattern.to_string_lossy().to_string(),
        ]
    }

    fn audio_args(video: &Path, output: &Path, sample_rate: u32, channels: u16) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-vn".to_string(),
            "-ac".to_string(),
            channels.to_string(),
            "-ar".to_string(),
            sample_rate.to_string(),
            "-c:a".to_string(),
            "pcm_s16le".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl TranscodePort for FFmpegAdapter {
    async fn extract_frames(
        &self,
        video: &Path,
        plan: &SamplingPlan,
        pattern: &Path,
        sink: &OutputSink,
    ) -> PipelineResult<()> {
        info!("Sampling frames from {} at {:.4} fps", video.display(), plan.fps);
        let args = Self::frame_args(video, plan, pattern);
        self.runner.run(&self.binary, &args, sink).await
    }

    async fn extract_audio(
        &self,
        video: &Path,
        output: &Path,
        sample_rate: u32,
        channels: u16,
        sink: &OutputSink,
    ) -> PipelineResult<()> {
        info!(
            "Extracting {} Hz {}-channel audio to {}",
            sample_rate,
            channels,
            output.display()
        );
        let args = Self::audio_args(video, output, sample_rate, channels);
        self.runner.run(&self.binary, &args, sink).await
    }
}
