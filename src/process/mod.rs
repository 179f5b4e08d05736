//! External process runner.
//!
//! A spawned process is exposed as an ordered, finite stream of output lines
//! terminated by exactly one exit signal. Callers drain the stream and decide
//! what to do with each line; [`ProcessRunner::run`] forwards lines to an
//! [`OutputSink`] and maps the exit signal to a result.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{PipelineError, PipelineResult};

/// Receives process output lines as they arrive
pub type OutputSink = mpsc::UnboundedSender<String>;

/// Number of trailing stderr lines kept for error messages
const STDERR_TAIL: usize = 5;

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipe {
    Stdout,
    Stderr,
}

/// How a process ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitSignal {
    /// Exit code, `None` when killed by a signal
    Exited(Option<i32>),
    TimedOut(u64),
    WaitFailed(String),
}

/// One item of a process stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Line { pipe: Pipe, text: String },
    Exit(ExitSignal),
}

/// Live output of a spawned process
pub struct ProcessStream {
    program: String,
    rx: mpsc::UnboundedReceiver<ProcessEvent>,
}

impl ProcessStream {
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Next event; `None` only after the exit signal has been delivered
    pub async fn next(&mut self) -> Option<ProcessEvent> {
        self.rx.recv().await
    }
}

/// Spawns external tools with optional timeout
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn `program` and stream its output
    pub fn spawn(&self, program: &str, args: &[String]) -> PipelineResult<ProcessStream> {
        let resolved = which::which(program)
            .map_err(|_| PipelineError::external(program, "executable not found on PATH"))?;

        debug!("Running: {} {}", program, args.join(" "));

        let mut child = Command::new(resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PipelineError::external(program, format!("failed to spawn: {}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = stdout.map(|pipe| tokio::spawn(forward_lines(pipe, Pipe::Stdout, tx.clone())));
        let stderr_task = stderr.map(|pipe| tokio::spawn(forward_lines(pipe, Pipe::Stderr, tx.clone())));

        let timeout = self.timeout;
        let name = program.to_string();
        tokio::spawn(async move {
            let signal = match timeout {
                Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                    Ok(status) => to_signal(status),
                    Err(_) => {
                        warn!("{} timed out after {}s, killing process", name, limit.as_secs());
                        let _ = child.kill().await;
                        ExitSignal::TimedOut(limit.as_secs())
                    }
                },
                None => to_signal(child.wait().await),
            };

            // All output is delivered before the exit signal
            for task in [stdout_task, stderr_task].into_iter().flatten() {
                let _ = task.await;
            }
            let _ = tx.send(ProcessEvent::Exit(signal));
        });

        Ok(ProcessStream {
            program: program.to_string(),
            rx,
        })
    }

    /// Run `program` to completion, forwarding every output line to `sink`.
    ///
    /// A closed sink does not stop the process.
    pub async fn run(&self, program: &str, args: &[String], sink: &OutputSink) -> PipelineResult<()> {
        let mut stream = self.spawn(program, args)?;
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);

        while let Some(event) = stream.next().await {
            match event {
                ProcessEvent::Line { pipe, text } => {
                    if pipe == Pipe::Stderr && !text.trim().is_empty() {
                        if tail.len() == STDERR_TAIL {
                            tail.pop_front();
                        }
                        tail.push_back(text.clone());
                    }
                    let _ = sink.send(text);
                }
                ProcessEvent::Exit(signal) => {
                    return exit_result(stream.program(), signal, &tail);
                }
            }
        }

        Err(PipelineError::external(program, "process stream ended without exit status"))
    }
}

async fn forward_lines<R>(pipe: R, source: Pipe, tx: mpsc::UnboundedSender<ProcessEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(pipe).lines();
    while let Ok(Some(text)) = lines.next_line().await {
        // Keep draining after the receiver is gone so the child never blocks on a full pipe
        let _ = tx.send(ProcessEvent::Line { pipe: source, text });
    }
}

fn to_signal(status: std::io::Result<std::process::ExitStatus>) -> ExitSignal {
    match status {
        Ok(status) => ExitSignal::Exited(status.code()),
        Err(e) => ExitSignal::WaitFailed(e.to_string()),
    }
}

fn exit_result(program: &str, signal: ExitSignal, tail: &VecDeque<String>) -> PipelineResult<()> {
    let detail = || {
        if tail.is_empty() {
            String::new()
        } else {
            format!(": {}", tail.iter().cloned().collect::<Vec<_>>().join(" | "))
        }
    };

    match signal {
        ExitSignal::Exited(Some(0)) => Ok(()),
        ExitSignal::Exited(Some(code)) => Err(PipelineError::external(
            program,
            format!("exited with status {}{}", code, detail()),
        )),
        ExitSignal::Exited(None) => Err(PipelineError::external(
            program,
            format!("terminated by signal{}", detail()),
        )),
        ExitSignal::TimedOut(secs) => Err(PipelineError::external(
            program,
            format!("timed out after {}s", secs),
        )),
        ExitSignal::WaitFailed(message) => Err(PipelineError::external(program, message)),
    }
}
