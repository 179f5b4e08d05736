//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Source video file
    #[arg(short, long)]
    pub video: PathBuf,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Job id
    pub job: String,

    /// Step to run: transcribe, extract, generate or all
    #[arg(default_value = "all")]
    pub step: String,

    /// Target number of frames to extract
    #[arg(long)]
    pub frames: Option<u32>,

    /// Tolerance window around section timestamps, in seconds
    #[arg(long)]
    pub window: Option<f64>,

    /// Number of article sections to request
    #[arg(long)]
    pub sections: Option<usize>,

    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Job id
    pub job: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Job id
    pub job: String,
}

/// Arguments for the select command
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Frame directory written by the extract step
    #[arg(long)]
    pub frames_dir: PathBuf,

    /// Target timestamp (seconds, MM:SS or HH:MM:SS)
    #[arg(long)]
    pub target: String,

    /// Tolerance window in seconds
    #[arg(long)]
    pub window: Option<f64>,
}
