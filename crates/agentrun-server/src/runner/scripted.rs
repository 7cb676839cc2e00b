//! Deterministic runner for tests.

use std::sync::Arc;

use futures_util::stream;
use serde_json::Value;
use tokio::sync::Notify;

use super::{RunContext, RunnerError, TaskRunner, Tick, TickStream};

#[derive(Clone)]
pub(crate) enum Step {
    /// Append an entry to the progress log without ticking.
    Append(Value),
    /// Yield a tick.
    Tick,
    /// Yield a runner error and end.
    Fail(String),
    /// Panic inside the runner.
    Panic,
    /// Wait until the notify fires.
    Wait(Arc<Notify>),
    /// Never finish.
    Hang,
}

pub(crate) struct ScriptedRunner {
    script: Vec<Step>,
}

impl ScriptedRunner {
    pub(crate) fn new(script: Vec<Step>) -> Self {
        Self { script }
    }
}

impl TaskRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    fn run(&self, _task: String, ctx: RunContext) -> TickStream {
        let steps = self.script.clone().into_iter();
        Box::pin(stream::unfold(
            (steps, ctx, 0u64),
            |(mut steps, ctx, tick)| async move {
                loop {
                    match steps.next()? {
                        Step::Append(entry) => {
                            ctx.progress.append(entry);
                        }
                        Step::Tick => {
                            return Some((Ok(Tick { step: tick }), (steps, ctx, tick + 1)));
                        }
                        Step::Fail(message) => {
                            let steps = Vec::new().into_iter();
                            return Some((Err(RunnerError::Failed(message)), (steps, ctx, tick)));
                        }
                        Step::Panic => panic!("scripted runner panic"),
                        Step::Wait(notify) => notify.notified().await,
                        Step::Hang => std::future::pending::<()>().await,
                    }
                }
            },
        ))
    }
}
