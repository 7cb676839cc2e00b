//! Runner backed by an external process.
//!
//! The task is passed as the last argument. Every non-empty stdout line is
//! one progress entry: JSON objects are kept verbatim, anything else becomes
//! an assistant chat message.

use std::process::Stdio;

use futures_util::stream;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, error, info, warn};

use agentrun_core::ChatMessage;

use super::{RunContext, RunnerError, TaskRunner, Tick, TickStream};

/// Spawns `program args... <task>` for each run.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: String,
    args: Vec<String>,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add arguments placed before the task.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

enum Phase {
    Spawn {
        program: String,
        args: Vec<String>,
        task: String,
        ctx: RunContext,
    },
    Reading(Process),
    Finished,
}

struct Process {
    // Dropping the child kills it.
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    ctx: RunContext,
    step: u64,
}

impl TaskRunner for CommandRunner {
    fn name(&self) -> &str {
        &self.program
    }

    fn run(&self, task: String, ctx: RunContext) -> TickStream {
        let phase = Phase::Spawn {
            program: self.program.clone(),
            args: self.args.clone(),
            task,
            ctx,
        };

        Box::pin(stream::unfold(phase, |phase| async move {
            match phase {
                Phase::Spawn {
                    program,
                    args,
                    task,
                    ctx,
                } => match spawn(&program, &args, &task, ctx) {
                    Ok(process) => next_tick(process).await,
                    Err(e) => Some((Err(e), Phase::Finished)),
                },
                Phase::Reading(process) => next_tick(process).await,
                Phase::Finished => None,
            }
        }))
    }
}

fn spawn(
    program: &str,
    args: &[String],
    task: &str,
    ctx: RunContext,
) -> Result<Process, RunnerError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .arg(task)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|source| {
        error!(program = %program, error = %source, "Failed to spawn runner process");
        RunnerError::Spawn {
            program: program.to_string(),
            source,
        }
    })?;

    info!(run_id = %ctx.run_id, program = %program, pid = ?child.id(), "Runner process spawned");

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| RunnerError::Failed("Failed to get runner stdout".to_string()))?;

    if let Some(stderr) = child.stderr.take() {
        let run_id = ctx.run_id.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            warn!(run_id = %run_id, stderr = %trimmed, "Runner stderr");
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(run_id = %run_id, error = %e, "Error reading runner stderr");
                        break;
                    }
                }
            }
        });
    }

    Ok(Process {
        child,
        lines: BufReader::new(stdout).lines(),
        ctx,
        step: 0,
    })
}

async fn next_tick(mut process: Process) -> Option<(Result<Tick, RunnerError>, Phase)> {
    loop {
        // Not reading stdout while paused eventually blocks the child on a full pipe.
        if !process.ctx.execution.wait_until_resumed().await {
            return None;
        }

        match process.lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let len = process.ctx.progress.append(parse_entry(trimmed));
                let tick = Tick { step: process.step };
                process.step += 1;
                debug!(run_id = %process.ctx.run_id, step = tick.step, log_len = len, "Runner output line");
                return Some((Ok(tick), Phase::Reading(process)));
            }
            Ok(None) => {
                return match process.child.wait().await {
                    Ok(status) if status.success() => {
                        info!(run_id = %process.ctx.run_id, "Runner process exited");
                        None
                    }
                    Ok(status) => Some((
                        Err(RunnerError::ExitStatus(status.code().unwrap_or(-1))),
                        Phase::Finished,
                    )),
                    Err(e) => Some((Err(RunnerError::Io(e)), Phase::Finished)),
                };
            }
            Err(e) => return Some((Err(RunnerError::Io(e)), Phase::Finished)),
        }
    }
}

fn parse_entry(line: &str) -> Value {
    match serde_json::from_str::<Value>(line) {
        Ok(value @ Value::Object(_)) => value,
        _ => ChatMessage::assistant(line).into_entry(),
    }
}
