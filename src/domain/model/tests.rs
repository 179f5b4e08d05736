// Unit tests for domain models

use super::*;
use std::path::PathBuf;

fn fresh_job() -> Job {
    Job::new(
        "job1".parse().unwrap(),
        PathBuf::from("/videos/talk.mp4"),
        1024,
    )
}

#[test]
fn test_timecode_from_offset_truncates() {
    assert_eq!(Timecode::from_offset(0.0).to_string(), "00_00_00");
    assert_eq!(Timecode::from_offset(30.0).to_string(), "00_00_30");
    assert_eq!(Timecode::from_offset(60.0).to_string(), "00_01_00");
    assert_eq!(Timecode::from_offset(90.0).to_string(), "00_01_30");
    assert_eq!(Timecode::from_offset(3661.99).to_string(), "01_01_01");
}

#[test]
fn test_timecode_negative_or_nan_is_zero() {
    assert_eq!(Timecode::from_offset(-5.0).to_string(), "00_00_00");
    assert_eq!(Timecode::from_offset(f64::NAN).to_string(), "00_00_00");
}

#[test]
fn test_step_request_parse() {
    assert_eq!(
        "transcribe".parse::<StepRequest>().unwrap(),
        StepRequest::Single(Step::Transcribe)
    );
    assert_eq!("ALL".parse::<StepRequest>().unwrap(), StepRequest::All);
    assert!("export".parse::<StepRequest>().is_err());
    assert_eq!(StepRequest::All.steps(), Step::ORDER.to_vec());
}

#[test]
fn test_job_id_rejects_path_characters() {
    assert!("../etc".parse::<JobId>().is_err());
    assert!("".parse::<JobId>().is_err());
    assert!("abc-123_x".parse::<JobId>().is_ok());
}

#[test]
fn test_job_apply_legal_transition() {
    let mut job = fresh_job();
    job.apply(&JobUpdate::status(JobStatus::Transcribing)).unwrap();
    job.apply(&JobUpdate::status(JobStatus::Pending).with_flag(Step::Transcribe, true))
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.flags.transcribe_done);
}

#[test]
fn test_job_apply_rejects_illegal_transition_without_side_effects() {
    let mut job = fresh_job();
    let update = JobUpdate::status(JobStatus::Completed)
        .with_flag(Step::Generate, true)
        .with_error("boom");
    let err = job.apply(&update).unwrap_err();
    assert!(matches!(err, PipelineError::IllegalTransition { .. }));
    assert_eq!(job.status, JobStatus::Pending);
    assert!(!job.flags.generate_done);
    assert!(job.error_message.is_none());
}

#[test]
fn test_job_update_clear_error() {
    let mut job = fresh_job();
    job.apply(&JobUpdate::status(JobStatus::Error).with_error("ffmpeg died"))
        .unwrap();
    assert_eq!(job.error_message.as_deref(), Some("ffmpeg died"));
    job.apply(&JobUpdate::status(JobStatus::Extracting).clear_error())
        .unwrap();
    assert!(job.error_message.is_none());
}

#[test]
fn test_section_anchor() {
    let mut section = Section {
        heading: "Intro".into(),
        body: "Hello".into(),
        timestamp: Some(12.5),
        image_index: Some(2),
        image_directive: String::new(),
    };
    assert_eq!(section.anchor(), SectionAnchor::Timestamp(12.5));
    section.timestamp = None;
    assert_eq!(section.anchor(), SectionAnchor::ImageIndex(2));
    section.image_index = None;
    assert_eq!(section.anchor(), SectionAnchor::Unanchored);
}

#[test]
fn test_section_deserializes_without_optional_fields() {
    let section: Section =
        serde_json::from_str(r#"{"heading":"A","body":"B"}"#).unwrap();
    assert_eq!(section.anchor(), SectionAnchor::Unanchored);
    assert!(section.image_directive.is_empty());
}

#[test]
fn test_running_statuses() {
    assert!(JobStatus::Transcribing.is_running());
    assert!(JobStatus::Extracting.is_running());
    assert!(JobStatus::Generating.is_running());
    assert!(!JobStatus::Pending.is_running());
    assert!(!JobStatus::Completed.is_running());
    assert!(!JobStatus::Error.is_running());
}
