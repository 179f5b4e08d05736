//! Frame extraction
//!
//! Runs the decoder once at the planned sampling rate, then renames the
//! numbered output so each file carries its sequence and nominal timecode,
//! e.g. `frame_00003_00_01_30.jpg`. A manifest beside the frames lets later
//! steps reload them without re-running the decoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::domain::model::{Frame, FrameManifest, ManifestEntry};
use crate::error::{PipelineError, PipelineResult};
use crate::planner::SamplingPlan;
use crate::ports::TranscodePort;
use crate::process::OutputSink;

/// Manifest file name inside the frame directory
pub const MANIFEST_FILE: &str = "manifest.json";

const RAW_PREFIX: &str = "raw_";
const FRAME_PREFIX: &str = "frame_";
const FRAME_EXT: &str = "jpg";

/// Frames produced by one extraction run
#[derive(Debug, Clone)]
pub struct Extraction {
    pub plan: SamplingPlan,
    pub frames: Vec<Frame>,
}

/// Samples still frames from a video through the transcoder
pub struct FrameExtractor {
    transcoder: Arc<dyn TranscodePort>,
}

impl FrameExtractor {
    pub fn new(transcoder: Arc<dyn TranscodePort>) -> Self {
        Self { transcoder }
    }

    /// Extract about `target_count` frames of `video` into `frames_dir`
    pub async fn extract(
        &self,
        video: &Path,
        duration: f64,
        target_count: u32,
        frames_dir: &Path,
        sink: &OutputSink,
    ) -> PipelineResult<Extraction> {
        let plan = SamplingPlan::new(duration, target_count)?;

        tokio::fs::create_dir_all(frames_dir).await?;
        let removed = clear_frames(frames_dir).await?;
        if removed > 0 {
            debug!("Removed {} stale file(s) from {}", removed, frames_dir.display());
        }

        info!(
            "Extracting ~{} frames at {:.4} fps (every {:.2}s)",
            plan.target_count, plan.fps, plan.interval
        );

        let pattern = frames_dir.join(format!("{}%05d.{}", RAW_PREFIX, FRAME_EXT));
        self.transcoder
            .extract_frames(video, &plan, &pattern, sink)
            .await?;

        let raw = list_raw_frames(frames_dir);
        if raw.is_empty() {
            return Err(PipelineError::external(
                "decoder",
                format!("no frames written to {}", frames_dir.display()),
            ));
        }
        if raw.len().abs_diff(plan.target_count as usize) > 1 {
            warn!(
                "Decoder emitted {} frames for a target of {}",
                raw.len(),
                plan.target_count
            );
        }

        let mut frames = Vec::with_capacity(raw.len());
        for (sequence, source) in raw.into_iter().enumerate() {
            let offset = plan.offset_of(sequence);
            let mut frame = Frame::new(sequence, offset, PathBuf::new());
            let name = frame_file_name(&frame);
            let target = frames_dir.join(&name);
            tokio::fs::rename(&source, &target).await?;
            frame.path = target;
            frames.push(frame);
        }

        let manifest = FrameManifest {
            duration: plan.duration,
            target_count: plan.target_count,
            interval: plan.interval,
            frames: frames
                .iter()
                .map(|f| ManifestEntry {
                    sequence: f.sequence,
                    offset: f.offset,
                    file: frame_file_name(f),
                })
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&manifest)?;
        tokio::fs::write(frames_dir.join(MANIFEST_FILE), json).await?;

        info!("Extracted {} frames into {}", frames.len(), frames_dir.display());
        Ok(Extraction { plan, frames })
    }
}

/// File name carrying sequence and nominal timecode
pub fn frame_file_name(frame: &Frame) -> String {
    format!(
        "{}{:05}_{}.{}",
        FRAME_PREFIX,
        frame.sequence,
        frame.timecode(),
        FRAME_EXT
    )
}

/// Load the manifest written by the last extraction in `frames_dir`
pub fn load_manifest(frames_dir: &Path) -> PipelineResult<FrameManifest> {
    let path = frames_dir.join(MANIFEST_FILE);
    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::not_found(format!(
                "frame manifest {}",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        PipelineError::parse(format!("Invalid frame manifest {}: {}", path.display(), e))
    })
}

/// Frames of the last extraction, checking every file is still present
pub fn load_frames(frames_dir: &Path) -> PipelineResult<Vec<Frame>> {
    let manifest = load_manifest(frames_dir)?;
    let frames = manifest.frames_in(frames_dir);
    if let Some(missing) = frames.iter().find(|f| !f.path.is_file()) {
        return Err(PipelineError::not_found(format!(
            "frame {}",
            missing.path.display()
        )));
    }
    Ok(frames)
}

/// Numbered decoder output, ordered by its number
fn list_raw_frames(dir: &Path) -> Vec<PathBuf> {
    let mut numbered: Vec<(u64, PathBuf)> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let number = name
                .strip_prefix(RAW_PREFIX)?
                .strip_suffix(FRAME_EXT)?
                .strip_suffix('.')?
                .parse::<u64>()
                .ok()?;
            Some((number, entry.into_path()))
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);
    numbered.into_iter().map(|(_, path)| path).collect()
}

/// Delete frames and manifest left by an earlier run
async fn clear_frames(dir: &Path) -> PipelineResult<usize> {
    let stale: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.file_name().to_str().is_some_and(|name| {
                name == MANIFEST_FILE || name.starts_with(RAW_PREFIX) || name.starts_with(FRAME_PREFIX)
            })
        })
        .map(|entry| entry.into_path())
        .collect();

    for path in &stale {
        tokio::fs::remove_file(path).await?;
    }
    Ok(stale.len())
}
