//! ClipScribe library
//!
//! Turns a video into an illustrated article. The media pipeline parses
//! timestamped captions, samples frames at a planned cadence, scores them for
//! sharpness and exposure, and pairs each article section with a frame near
//! its timestamp. A job state machine sequences the steps and streams events.

pub mod adapters;
pub mod app;
pub mod captions;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod frames;
pub mod output;
pub mod planner;
pub mod ports;
pub mod process;
pub mod quality;
pub mod selection;
pub mod utils;

// Re-export commonly used types
pub use app::{PipelineEvent, PipelineInteractor};
pub use domain::model::{Cue, Frame, Job, JobId, JobStatus, Section, Step, StepRequest};
pub use error::{PipelineError, PipelineResult};
