//! Pause, resume and stop applied to a run's execution state.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use agentrun_core::RunId;

use crate::execution::ExecutionState;
use crate::registry::RunRegistry;

/// Result of a control operation. `run_id` is `None` when there was no active
/// run to act on and the operation was a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlOutcome {
    pub run_id: Option<RunId>,
    pub paused: Option<bool>,
}

impl ControlOutcome {
    fn noop() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> bool {
        self.run_id.is_some()
    }
}

/// Control operations addressed to an explicit run. Without a run id they
/// target the executing run, or the newest queued one when nothing executes.
#[derive(Clone)]
pub struct ControlSurface {
    registry: Arc<RunRegistry>,
    stop_timeout: Duration,
}

impl ControlSurface {
    pub fn new(registry: Arc<RunRegistry>, stop_timeout: Duration) -> Self {
        Self {
            registry,
            stop_timeout,
        }
    }

    async fn target(&self, run_id: Option<&RunId>) -> Option<(RunId, ExecutionState)> {
        let run_id = self.registry.resolve(run_id).await?;
        match self.registry.active_execution(&run_id).await {
            Some(execution) => Some((run_id, execution)),
            None => {
                debug!(run_id = %run_id, "No active run to control");
                None
            }
        }
    }

    /// Set the paused flag. Idempotent.
    pub async fn set_paused(&self, run_id: Option<&RunId>, paused: bool) -> ControlOutcome {
        let Some((run_id, execution)) = self.target(run_id).await else {
            return ControlOutcome::noop();
        };
        let changed = execution.set_paused(paused);
        info!(run_id = %run_id, paused, changed, "Set paused");
        ControlOutcome {
            run_id: Some(run_id),
            paused: Some(paused),
        }
    }

    /// Flip the paused flag. Two calls in a row restore the original value.
    pub async fn pause_or_resume(&self, run_id: Option<&RunId>) -> ControlOutcome {
        let Some((run_id, execution)) = self.target(run_id).await else {
            return ControlOutcome::noop();
        };
        let paused = execution.toggle_paused();
        info!(run_id = %run_id, paused, "Toggled paused");
        ControlOutcome {
            run_id: Some(run_id),
            paused: Some(paused),
        }
    }

    /// Cancel the run and wait for its pump to finish, so the runner has been
    /// dropped and its execution slot released when this returns.
    pub async fn stop(&self, run_id: Option<&RunId>) -> ControlOutcome {
        let Some((run_id, execution)) = self.target(run_id).await else {
            return ControlOutcome::noop();
        };

        execution.cancel();
        info!(run_id = %run_id, "Stop requested");

        if let Some(handle) = self.registry.take_handle(&run_id).await {
            match tokio::time::timeout(self.stop_timeout, handle).await {
                Ok(Ok(())) => debug!(run_id = %run_id, "Pump finished after stop"),
                Ok(Err(e)) => warn!(run_id = %run_id, error = %e, "Pump task failed"),
                Err(_) => warn!(
                    run_id = %run_id,
                    timeout_secs = self.stop_timeout.as_secs(),
                    "Pump did not finish within stop timeout"
                ),
            }
        }

        ControlOutcome {
            run_id: Some(run_id),
            paused: None,
        }
    }
}
