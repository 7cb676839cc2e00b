//! Starting runs.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use agentrun_core::RunId;

use crate::components::{ComponentError, TASK_INPUT};
use crate::pump::TaskPump;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Missing task")]
    EmptyTask,

    #[error("Component not found: {0}")]
    NotReady(String),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Validate `task`, register a run and spawn its pump.
///
/// Nothing is allocated when validation fails.
pub async fn launch_run(state: &Arc<AppState>, task: &str) -> Result<RunId, LaunchError> {
    let task = task.trim();
    if task.is_empty() {
        return Err(LaunchError::EmptyTask);
    }
    if !state.components.contains(TASK_INPUT)? {
        warn!(component = TASK_INPUT, "Start requested before the settings surface is ready");
        return Err(LaunchError::NotReady(TASK_INPUT.to_string()));
    }
    state.components.set(TASK_INPUT, json!(task))?;

    let run = state.registry.create(task).await;
    let run_id = run.run_id.clone();

    let handle = TaskPump::new(
        run,
        task,
        state.runner.clone(),
        state.registry.clone(),
        state.slots.clone(),
    )
    .spawn();
    state.registry.attach(&run_id, handle).await;

    info!(run_id = %run_id, runner = %state.runner.name(), "Run started");
    Ok(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::runner::SimulatedRunner;
    use agentrun_core::DeliveryMessage;
    use std::time::Duration;

    fn state() -> Arc<AppState> {
        let runner = Arc::new(SimulatedRunner::new(2, Duration::from_millis(1)));
        AppState::with_runner(Config::default(), runner).unwrap()
    }

    #[tokio::test]
    async fn test_empty_task_allocates_nothing() {
        let state = state();
        state.components.register(TASK_INPUT, json!("")).unwrap();

        assert!(matches!(launch_run(&state, "   ").await, Err(LaunchError::EmptyTask)));
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_not_ready_without_task_input() {
        let state = state();
        assert!(matches!(
            launch_run(&state, "go").await,
            Err(LaunchError::NotReady(id)) if id == TASK_INPUT
        ));
        assert!(state.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_launch_runs_to_done() {
        let state = state();
        state.components.register(TASK_INPUT, json!("")).unwrap();

        let run_id = launch_run(&state, "go to example.com").await.unwrap();
        assert_eq!(
            state.components.get(TASK_INPUT).unwrap(),
            Some(json!("go to example.com"))
        );

        let mut sub = state.registry.get(&run_id).await.subscribe();
        let mut chats = 0;
        loop {
            match sub.next().await {
                Some(DeliveryMessage::Chat { .. }) => chats += 1,
                Some(DeliveryMessage::Done) => break,
                other => panic!("unexpected message: {:?}", other),
            }
        }
        assert_eq!(chats, 3);
    }

    #[tokio::test]
    async fn test_each_launch_gets_a_new_id() {
        let state = state();
        state.components.register(TASK_INPUT, json!("")).unwrap();

        let a = launch_run(&state, "a").await.unwrap();
        let b = launch_run(&state, "b").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(state.registry.len().await, 2);
    }
}
