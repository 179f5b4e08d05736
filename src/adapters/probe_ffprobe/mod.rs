//! FFprobe adapter for media file probing

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::ports::ProbePort;
use crate::process::ProcessRunner;

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    binary: String,
    runner: ProcessRunner,
}

impl FFprobeAdapter {
    pub fn new(binary: impl Into<String>, runner: ProcessRunner) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    fn duration_args(video: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            video.to_string_lossy().to_string(),
        ]
    }
}

/// First line of probe output that reads as a number of seconds
fn parse_duration(lines: &[String]) -> Option<f64> {
    lines
        .iter()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .find(|d| d.is_finite())
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_duration(&self, video: &Path) -> PipelineResult<f64> {
        if !video.is_file() {
            return Err(PipelineError::not_found(format!("video {}", video.display())));
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        self.runner
            .run(&self.binary, &Self::duration_args(video), &tx)
            .await?;
        drop(tx);

        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }

        let duration = parse_duration(&lines).ok_or_else(|| {
            PipelineError::parse(format!(
                "{} reported no duration for {}",
                self.binary,
                video.display()
            ))
        })?;
        debug!("Probed {}: {:.3}s", video.display(), duration);
        Ok(duration)
    }
}
