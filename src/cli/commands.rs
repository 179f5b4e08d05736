//! Command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::PipelineConfig;
use crate::app::pipeline_interactor::EventKind;
use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{CreateArgs, DeleteArgs, ListArgs, RunArgs, SelectArgs, StatusArgs};
use crate::domain::model::{Job, JobId, Step, StepRequest};
use crate::frames;
use crate::quality::ImageFileScorer;
use crate::selection::{FrameSelector, SelectionReason};
use crate::utils::format_file_size;
use crate::utils::time::TimeParser;

/// Execute the create command
pub async fn create(container: &DefaultAppContainer, args: CreateArgs) -> Result<()> {
    let job = container
        .job_interactor()
        .create(&args.video)
        .await
        .with_context(|| format!("Failed to create job for {}", args.video.display()))?;
    println!("{}", job.id);
    Ok(())
}

/// Execute the run command, printing events as they arrive
pub async fn run(container: &DefaultAppContainer, args: RunArgs) -> Result<()> {
    let job_id: JobId = args.job.parse()?;
    let request: StepRequest = args.step.parse()?;
    info!("Running {} on job {}", request, job_id);

    let mut events = container.pipeline_interactor().start(job_id, request);

    let mut failure = None;
    while let Some(event) = events.recv().await {
        if args.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", event);
        }
        if event.kind == EventKind::Error {
            failure = Some(event.data);
        }
    }

    match failure {
        Some(message) => Err(anyhow::anyhow!("Run failed: {}", message)),
        None => Ok(()),
    }
}

/// Execute the status command
pub async fn status(container: &DefaultAppContainer, args: StatusArgs) -> Result<()> {
    let job_id: JobId = args.job.parse()?;
    let job = container
        .job_interactor()
        .get(&job_id)
        .await
        .context("Failed to load job")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&job).context("Failed to serialize job to JSON")?
        );
    } else {
        display_job(&job);
    }
    Ok(())
}

/// Execute the list command
pub async fn list(container: &DefaultAppContainer, args: ListArgs) -> Result<()> {
    let jobs = container
        .job_interactor()
        .list()
        .await
        .context("Failed to list jobs")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&jobs).context("Failed to serialize jobs to JSON")?
        );
        return Ok(());
    }
    if jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }
    for job in &jobs {
        println!("{}", list_line(job));
    }
    Ok(())
}

/// Execute the delete command
pub async fn delete(container: &DefaultAppContainer, args: DeleteArgs) -> Result<()> {
    let job_id: JobId = args.job.parse()?;
    container
        .job_interactor()
        .delete(&job_id)
        .await
        .context("Failed to delete job")?;
    println!("Deleted {}", job_id);
    Ok(())
}

/// Execute the select command against an existing extraction
pub async fn select(config: &PipelineConfig, args: SelectArgs) -> Result<()> {
    let target = parse_target(&args.target)?;
    let window = args.window.unwrap_or(config.window_secs);
    let frames = frames::load_frames(&args.frames_dir)
        .with_context(|| format!("Failed to load frames from {}", args.frames_dir.display()))?;

    let selector = FrameSelector::new(Arc::new(ImageFileScorer::new()), config.scoring_threads)?;
    let selection = tokio::task::spawn_blocking(move || selector.select_near(&frames, target, window))
        .await
        .context("Selection task failed")??;

    println!("{}", selection.frame.path.display());
    match (selection.reason, selection.quality) {
        (SelectionReason::BestScore, Some(q)) => println!(
            "offset {:.2}s  score {:.4}  sharpness {:.2}  brightness {:.3}",
            selection.frame.offset, q.score, q.sharpness, q.brightness
        ),
        _ => println!(
            "offset {:.2}s  (nearest frame, no scored candidate within ±{}s)",
            selection.frame.offset, window
        ),
    }
    Ok(())
}

fn parse_target(token: &str) -> Result<f64> {
    if let Ok(seconds) = token.trim().parse::<f64>() {
        return Ok(seconds);
    }
    TimeParser::new()
        .parse_timestamp(token)
        .with_context(|| format!("Invalid target timestamp '{}'", token))
}

fn list_line(job: &Job) -> String {
    let done = Step::ORDER
        .iter()
        .filter(|step| job.flags.is_done(**step))
        .count();
    let video = job
        .video_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| job.video_path.display().to_string());
    format!(
        "{}  {:<12}  {}/{} steps  {}",
        job.id,
        job.status.as_str(),
        done,
        Step::ORDER.len(),
        video
    )
}

fn display_job(job: &Job) {
    println!("Job:      {}", job.id);
    println!("Status:   {}", job.status);
    println!(
        "Video:    {} ({})",
        job.video_path.display(),
        format_file_size(job.video_size)
    );
    let steps: Vec<String> = Step::ORDER
        .iter()
        .map(|step| {
            let mark = if job.flags.is_done(*step) { "x" } else { " " };
            format!("[{}] {}", mark, step)
        })
        .collect();
    println!("Steps:    {}", steps.join("  "));
    if let Some(message) = &job.error_message {
        println!("Error:    {}", message);
    }
    println!("Updated:  {}", job.updated_at.to_rfc3339());
}
