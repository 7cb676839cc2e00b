//! Task pump: drives one runner invocation and streams its progress.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::{FutureExt, StreamExt};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use agentrun_core::{DeliveryMessage, RunId, RunStatus};

use crate::execution::ExecutionState;
use crate::progress::ProgressLog;
use crate::queue::DeliveryQueue;
use crate::registry::{NewRun, RunRegistry};
use crate::runner::{RunContext, RunnerError, TaskRunner};

/// Why a pump stopped before its runner finished normally.
#[derive(Debug, Error)]
pub enum PumpError {
    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error("runner panicked: {0}")]
    Panicked(String),
}

/// Background unit of work for one run.
///
/// Whatever happens to the runner, the pump enqueues exactly one `Done`.
pub struct TaskPump {
    run_id: RunId,
    task: String,
    queue: DeliveryQueue,
    progress: ProgressLog,
    execution: ExecutionState,
    runner: Arc<dyn TaskRunner>,
    registry: Arc<RunRegistry>,
    slots: Arc<Semaphore>,
}

impl TaskPump {
    pub fn new(
        run: NewRun,
        task: impl Into<String>,
        runner: Arc<dyn TaskRunner>,
        registry: Arc<RunRegistry>,
        slots: Arc<Semaphore>,
    ) -> Self {
        Self {
            run_id: run.run_id,
            task: task.into(),
            queue: run.queue,
            progress: run.progress,
            execution: run.execution,
            runner,
            registry,
            slots,
        }
    }

    /// Launch the pump on the runtime. The caller must keep the handle.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drive the runner to completion, then terminate the queue.
    pub async fn run(self) {
        let result = AssertUnwindSafe(self.drive())
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(PumpError::Panicked(panic_message(payload))));

        let (status, error) = match result {
            Ok(chats) => {
                info!(run_id = %self.run_id, chats, "Run completed");
                (RunStatus::Completed, None)
            }
            Err(PumpError::Cancelled) => {
                info!(run_id = %self.run_id, "Run cancelled");
                (RunStatus::Cancelled, Some(PumpError::Cancelled.to_string()))
            }
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "Run failed");
                (RunStatus::Failed, Some(e.to_string()))
            }
        };

        if let Some(description) = &error {
            if let Err(e) = self.queue.push(DeliveryMessage::error(description.clone())) {
                warn!(run_id = %self.run_id, error = %e, "Could not enqueue error message");
            }
        }
        if !self.queue.finish() {
            warn!(run_id = %self.run_id, "Queue was already terminated");
        }

        self.registry.mark_finished(&self.run_id, status, error).await;
        self.registry.schedule_reclaim(self.run_id.clone());
    }

    /// Returns the number of chat messages emitted.
    async fn drive(&self) -> Result<u64, PumpError> {
        let token = self.execution.token();

        let _permit = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(PumpError::Cancelled),
            permit = self.slots.clone().acquire_owned() => {
                permit.map_err(|_| PumpError::Runner(RunnerError::Failed("execution slots closed".to_string())))?
            }
        };

        self.registry.mark_running(&self.run_id).await;
        info!(run_id = %self.run_id, runner = %self.runner.name(), "Runner started");

        let ctx = RunContext {
            run_id: self.run_id.clone(),
            progress: self.progress.clone(),
            execution: self.execution.clone(),
        };
        let mut growth = self.progress.subscribe();
        let mut ticks = self.runner.run(self.task.clone(), ctx);

        let mut last_observed_len = 0usize;
        let mut chats = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(PumpError::Cancelled),
                next = ticks.next() => next,
            };

            match next {
                None => return Ok(chats),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(tick)) => {
                    if !growth.has_changed().unwrap_or(false) {
                        continue;
                    }
                    growth.borrow_and_update();

                    // Only the newest entry is surfaced per tick.
                    if let Some((len, entry)) = self.progress.observe_since(last_observed_len) {
                        last_observed_len = len;
                        self.queue
                            .push(DeliveryMessage::chat(entry))
                            .map_err(|e| PumpError::Runner(RunnerError::Failed(e.to_string())))?;
                        chats += 1;
                        debug!(run_id = %self.run_id, step = tick.step, log_len = len, "Chat enqueued");
                    }
                }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Subscription;
    use crate::runner::scripted::{ScriptedRunner, Step};
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::Notify;

    async fn collect(mut sub: Subscription) -> Vec<DeliveryMessage> {
        let mut out = Vec::new();
        while let Some(msg) = sub.next().await {
            out.push(msg);
        }
        out
    }

    async fn launch(
        script: Vec<Step>,
        slots: Arc<Semaphore>,
    ) -> (Arc<RunRegistry>, RunId, DeliveryQueue, ExecutionState, JoinHandle<()>) {
        let registry = RunRegistry::new(Duration::from_secs(60));
        let run = registry.create("task").await;
        let run_id = run.run_id.clone();
        let queue = run.queue.clone();
        let execution = run.execution.clone();
        let pump = TaskPump::new(
            run,
            "task",
            Arc::new(ScriptedRunner::new(script)),
            registry.clone(),
            slots,
        );
        let handle = pump.spawn();
        (registry, run_id, queue, execution, handle)
    }

    fn one_slot() -> Arc<Semaphore> {
        Arc::new(Semaphore::new(1))
    }

    #[tokio::test]
    async fn test_emits_newest_entry_per_growth_tick() {
        let script = vec![
            Step::Append(json!("e1")),
            Step::Tick,
            // two appends between ticks: only the newest is surfaced
            Step::Append(json!("e2")),
            Step::Append(json!("e3")),
            Step::Tick,
            // no growth: nothing emitted
            Step::Tick,
            Step::Append(json!("e4")),
            Step::Tick,
        ];
        let (registry, run_id, queue, _, handle) = launch(script, one_slot()).await;
        handle.await.unwrap();

        let messages = collect(queue.subscribe()).await;
        assert_eq!(
            messages,
            vec![
                DeliveryMessage::chat(json!("e1")),
                DeliveryMessage::chat(json!("e3")),
                DeliveryMessage::chat(json!("e4")),
                DeliveryMessage::Done,
            ]
        );
        assert_eq!(registry.list().await[0].status, RunStatus::Completed);
        assert!(registry.active_execution(&run_id).await.is_none());
    }

    #[tokio::test]
    async fn test_runner_error_is_reported_then_done() {
        let script = vec![
            Step::Append(json!("e1")),
            Step::Tick,
            Step::Fail("page crashed".to_string()),
        ];
        let (registry, _, queue, _, handle) = launch(script, one_slot()).await;
        handle.await.unwrap();

        let messages = collect(queue.subscribe()).await;
        assert_eq!(
            messages,
            vec![
                DeliveryMessage::chat(json!("e1")),
                DeliveryMessage::error("page crashed"),
                DeliveryMessage::Done,
            ]
        );
        let summary = &registry.list().await[0];
        assert_eq!(summary.status, RunStatus::Failed);
        assert_eq!(summary.error_message.as_deref(), Some("page crashed"));
    }

    #[tokio::test]
    async fn test_runner_panic_still_terminates_queue() {
        let (registry, _, queue, _, handle) = launch(vec![Step::Panic], one_slot()).await;
        handle.await.unwrap();

        let messages = collect(queue.subscribe()).await;
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], DeliveryMessage::Error { description } if description.contains("panicked")));
        assert_eq!(messages[1], DeliveryMessage::Done);
        assert_eq!(registry.list().await[0].status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_cancellation_emits_error_and_done() {
        let script = vec![Step::Append(json!("e1")), Step::Tick, Step::Hang];
        let (registry, _, queue, execution, handle) = launch(script, one_slot()).await;

        let mut sub = queue.subscribe();
        assert_eq!(sub.next().await, Some(DeliveryMessage::chat(json!("e1"))));

        execution.cancel();
        handle.await.unwrap();

        assert_eq!(sub.next().await, Some(DeliveryMessage::error("run cancelled")));
        assert_eq!(sub.next().await, Some(DeliveryMessage::Done));
        assert_eq!(sub.next().await, None);
        assert_eq!(registry.list().await[0].status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_waits_for_slot_and_cancel_while_waiting() {
        let slots = Arc::new(Semaphore::new(0));
        let (registry, _, queue, execution, handle) =
            launch(vec![Step::Append(json!("never")), Step::Tick], slots).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(registry.list().await[0].status, RunStatus::Pending);
        assert!(queue.is_empty());

        execution.cancel();
        handle.await.unwrap();
        let messages = collect(queue.subscribe()).await;
        assert_eq!(
            messages,
            vec![DeliveryMessage::error("run cancelled"), DeliveryMessage::Done]
        );
    }

    #[tokio::test]
    async fn test_slot_released_after_run() {
        let slots = one_slot();
        let gate = Arc::new(Notify::new());
        let (_, _, _, _, first) = launch(vec![Step::Wait(gate.clone())], slots.clone()).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(slots.available_permits(), 0);

        gate.notify_one();
        first.await.unwrap();
        assert_eq!(slots.available_permits(), 1);
    }
}
