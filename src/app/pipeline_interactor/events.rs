//! Typed events streamed to the caller of a pipeline run

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::domain::model::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Status,
    Output,
    Progress,
    Error,
    Done,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Status => "status",
            EventKind::Output => "output",
            EventKind::Progress => "progress",
            EventKind::Error => "error",
            EventKind::Done => "done",
        }
    }
}

/// One event of a run; every run ends with exactly one `done` or `error`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub data: String,
}

impl PipelineEvent {
    pub fn status(status: JobStatus) -> Self {
        Self::new(EventKind::Status, status.as_str())
    }

    pub fn output(line: impl Into<String>) -> Self {
        Self::new(EventKind::Output, line)
    }

    pub fn progress(percent: u8) -> Self {
        Self::new(EventKind::Progress, percent.to_string())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error, message)
    }

    pub fn done(message: impl Into<String>) -> Self {
        Self::new(EventKind::Done, message)
    }

    fn new(kind: EventKind, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.kind, EventKind::Done | EventKind::Error)
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.data)
    }
}

/// Sending half of an event stream. A dropped receiver does not stop the run.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl EventSender {
    pub fn new(tx: mpsc::UnboundedSender<PipelineEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PipelineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn emit(&self, event: PipelineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Milestone percentage after `completed` of `total` steps, truncated
pub fn milestone(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (100 * completed.min(total) / total) as u8
}
