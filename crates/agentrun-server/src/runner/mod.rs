//! Task runner interface.
//!
//! A runner performs the actual automated work. It writes progress entries
//! into the run's [`ProgressLog`], yields a [`Tick`] whenever it reaches a
//! step boundary, and consults the run's [`ExecutionState`] between steps.

use std::pin::Pin;

use futures_util::Stream;
use thiserror::Error;

use agentrun_core::RunId;

use crate::execution::ExecutionState;
use crate::progress::ProgressLog;

mod command;
mod simulated;

#[cfg(test)]
pub(crate) mod scripted;

pub use command::CommandRunner;
pub use simulated::SimulatedRunner;

/// Errors raised by a runner during execution.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Failed to spawn the external process.
    #[error("Failed to spawn runner process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O failure while talking to the runner process.
    #[error("Runner I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Runner process exited unsuccessfully.
    #[error("Runner process exited with code {0}")]
    ExitStatus(i32),

    /// Runner reported a failure.
    #[error("{0}")]
    Failed(String),
}

/// One discrete progress notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Step counter, starting at zero.
    pub step: u64,
}

/// Stream of ticks returned by [`TaskRunner::run`].
///
/// The runner does its work while the stream is polled; dropping the stream
/// must release whatever the runner holds (processes, connections).
pub type TickStream = Pin<Box<dyn Stream<Item = Result<Tick, RunnerError>> + Send>>;

/// Everything a runner gets to see about its run.
#[derive(Clone)]
pub struct RunContext {
    pub run_id: RunId,
    pub progress: ProgressLog,
    pub execution: ExecutionState,
}

/// The external collaborator performing a task.
pub trait TaskRunner: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Begin executing `task`.
    fn run(&self, task: String, ctx: RunContext) -> TickStream;
}
