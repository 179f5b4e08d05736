//! Error handling module for ClipScribe

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Bad duration, count or missing input, raised before any external call
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Spawn failure, timeout or non-zero exit from an external tool
    #[error("{program} failed: {message}")]
    ExternalProcess { program: String, message: String },

    /// Caption document or generative-service payload could not be used
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A component was called with inputs that break its contract
    #[error("Precondition violated: {message}")]
    Precondition { message: String },

    /// Missing job or missing derived artifact
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Another run currently holds the lease for this job
    #[error("Job {job_id} already has a run in progress")]
    Busy { job_id: String },

    /// Status change rejected by the job state machine
    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Image decode/encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn external(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalProcess {
            program: program.into(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
