//! Whisper command-line speech-to-text adapter

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::ports::{SpeechToTextPort, TranscriptionRequest, CAPTION_EXTENSION};
use crate::process::{OutputSink, ProcessRunner};

/// Runs the `whisper` CLI and renames its output to the requested base name
pub struct WhisperCliAdapter {
    binary: String,
    model: String,
    runner: ProcessRunner,
}

impl WhisperCliAdapter {
    pub fn new(binary: impl Into<String>, model: impl Into<String>, runner: ProcessRunner) -> Self {
        Self {
            binary: binary.into(),
            model: model.into(),
            runner,
        }
    }

    fn args(&self, request: &TranscriptionRequest) -> Vec<String> {
        vec![
            request.audio.to_string_lossy().to_string(),
            "--language".to_string(),
            request.language.clone(),
            "--model".to_string(),
            self.model.clone(),
            "--output_format".to_string(),
            CAPTION_EXTENSION.to_string(),
            "--output_dir".to_string(),
            request.output_dir.to_string_lossy().to_string(),
        ]
    }
}

/// Whisper names its output after the audio file stem
fn engine_output_path(request: &TranscriptionRequest) -> PipelineResult<PathBuf> {
    let stem = request
        .audio
        .file_stem()
        .ok_or_else(|| PipelineError::validation(format!("Audio path has no file name: {}", request.audio.display())))?;
    Ok(request
        .output_dir
        .join(Path::new(stem).with_extension(CAPTION_EXTENSION)))
}

#[async_trait]
impl SpeechToTextPort for WhisperCliAdapter {
    async fn transcribe(
        &self,
        request: &TranscriptionRequest,
        sink: &OutputSink,
    ) -> PipelineResult<PathBuf> {
        if !request.audio.is_file() {
            return Err(PipelineError::not_found(format!(
                "audio {}",
                request.audio.display()
            )));
        }
        tokio::fs::create_dir_all(&request.output_dir).await?;

        info!(
            "Transcribing {} ({}, model {})",
            request.audio.display(),
            request.language,
            self.model
        );
        self.runner.run(&self.binary, &self.args(request), sink).await?;

        let written = engine_output_path(request)?;
        let target = request.output_path();
        if !written.is_file() {
            return Err(PipelineError::external(
                &self.binary,
                format!("expected caption file {} was not written", written.display()),
            ));
        }
        if written != target {
            debug!("Renaming {} to {}", written.display(), target.display());
            tokio::fs::rename(&written, &target).await?;
        }
        Ok(target)
    }
}
