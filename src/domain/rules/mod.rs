// Business rules - Job status state machine

use crate::domain::model::JobStatus;

/// Transition table for job status.
///
/// A full run walks `pending -> transcribing -> extracting -> generating ->
/// completed`. A single-step run goes `<start> -> <step state> -> pending`.
/// `error` is reachable from every non-terminal state, and neither `error`
/// nor `completed` lock the job: both may start any step again.
pub struct StatusTransitions;

impl StatusTransitions {
    pub fn is_allowed(from: JobStatus, to: JobStatus) -> bool {
        use JobStatus::*;

        match (from, to) {
            (Pending, Transcribing | Extracting | Generating | Error) => true,

            (Transcribing, Extracting | Pending | Error) => true,
            (Extracting, Generating | Pending | Error) => true,
            (Generating, Completed | Pending | Error) => true,

            (Completed | Error, Transcribing | Extracting | Generating) => true,

            _ => false,
        }
    }
}
