//! Simulated runner that emits a fixed number of steps.

use std::time::Duration;

use futures_util::stream;
use tracing::debug;

use agentrun_core::ChatMessage;

use super::{RunContext, RunnerError, TaskRunner, Tick, TickStream};

/// Appends the task as a user entry, then one assistant entry per step.
#[derive(Debug, Clone)]
pub struct SimulatedRunner {
    steps: u64,
    interval: Duration,
}

impl SimulatedRunner {
    pub fn new(steps: u64, interval: Duration) -> Self {
        Self { steps, interval }
    }
}

impl Default for SimulatedRunner {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

impl TaskRunner for SimulatedRunner {
    fn name(&self) -> &str {
        "simulated"
    }

    fn run(&self, task: String, ctx: RunContext) -> TickStream {
        let steps = self.steps;
        let interval = self.interval;

        // step 0 records the task; steps 1..=n are the agent's work
        Box::pin(stream::unfold(0u64, move |step| {
            let task = task.clone();
            let ctx = ctx.clone();
            async move {
                if step > steps || !ctx.execution.wait_until_resumed().await {
                    return None;
                }

                let entry = if step == 0 {
                    ChatMessage::user(task)
                } else {
                    tokio::time::sleep(interval).await;
                    ChatMessage::assistant(format!("Step {}/{}: working on '{}'", step, steps, task))
                };
                let len = ctx.progress.append(entry.into_entry());
                debug!(run_id = %ctx.run_id, step, log_len = len, "Simulated step");

                Some((Ok::<_, RunnerError>(Tick { step }), step + 1))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionState;
    use crate::progress::ProgressLog;
    use agentrun_core::RunId;
    use futures_util::StreamExt;

    fn context() -> RunContext {
        RunContext {
            run_id: RunId::generate(),
            progress: ProgressLog::new(),
            execution: ExecutionState::new(),
        }
    }

    #[tokio::test]
    async fn test_emits_task_then_steps() {
        let ctx = context();
        let runner = SimulatedRunner::new(3, Duration::from_millis(1));
        let ticks: Vec<_> = runner.run("go to example.com".into(), ctx.clone()).collect().await;

        assert_eq!(ticks.len(), 4);
        let entries = ctx.progress.snapshot();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["role"], "user");
        assert_eq!(entries[0]["content"], "go to example.com");
        assert_eq!(entries[3]["content"], "Step 3/3: working on 'go to example.com'");
    }

    #[tokio::test]
    async fn test_stops_when_cancelled() {
        let ctx = context();
        ctx.execution.cancel();
        let runner = SimulatedRunner::new(3, Duration::from_millis(1));
        let ticks: Vec<_> = runner.run("t".into(), ctx.clone()).collect().await;

        assert!(ticks.is_empty());
        assert!(ctx.progress.is_empty());
    }
}
