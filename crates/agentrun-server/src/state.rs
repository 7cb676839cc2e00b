//! Shared application state.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Semaphore;

use crate::components::{ComponentError, ComponentRegistry, TASK_INPUT};
use crate::config::{Config, ConfigError};
use crate::control::ControlSurface;
use crate::discovery::{DiscoveryError, TabDiscovery};
use crate::registry::RunRegistry;
use crate::runner::TaskRunner;

#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Component(#[from] ComponentError),
}

/// Shared application state.
pub struct AppState {
    /// Runs indexed by RunId.
    pub registry: Arc<RunRegistry>,

    pub control: ControlSurface,

    /// Settings surface; must contain the task input before runs can start.
    pub components: ComponentRegistry,

    pub discovery: TabDiscovery,

    /// Runner used for every new run.
    pub runner: Arc<dyn TaskRunner>,

    /// Execution slots shared by all runs.
    pub slots: Arc<Semaphore>,

    pub config: Config,
}

impl AppState {
    /// Build the state with the runner described by `config` and the
    /// settings surface registered.
    pub fn new(config: Config) -> Result<Arc<Self>, StateError> {
        let runner = config.build_runner()?;
        let state = Self::with_runner(config, runner)?;
        register_settings_surface(&state.components, &state.config)?;
        Ok(state)
    }

    /// Build the state around an explicit runner. No components are
    /// registered, so runs cannot start until the task input is.
    pub fn with_runner(
        config: Config,
        runner: Arc<dyn TaskRunner>,
    ) -> Result<Arc<Self>, StateError> {
        let registry = RunRegistry::new(config.run_retention);
        let control = ControlSurface::new(registry.clone(), config.stop_timeout);
        let discovery = TabDiscovery::new(config.discovery_timeout)?;
        let slots = Arc::new(Semaphore::new(config.max_concurrent_runs.max(1)));

        Ok(Arc::new(Self {
            registry,
            control,
            components: ComponentRegistry::new(),
            discovery,
            runner,
            slots,
            config,
        }))
    }

    /// Execution slots not held by a running run.
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}

/// Register the components of the settings surface with their initial values.
pub fn register_settings_surface(
    components: &ComponentRegistry,
    config: &Config,
) -> Result<(), ComponentError> {
    let entries: [(&str, Value); 5] = [
        (TASK_INPUT, json!("")),
        ("agent.runner", json!(config.runner)),
        ("agent.max_concurrent_runs", json!(config.max_concurrent_runs)),
        ("browser_settings.cdp_url", json!(config.cdp_url)),
        (
            "browser_settings.discovery_timeout_ms",
            json!(config.discovery_timeout.as_millis() as u64),
        ),
    ];
    for (id, value) in entries {
        components.register(id, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_registers_settings_surface() {
        let state = AppState::new(Config::default()).unwrap();
        let keys = state.components.keys().unwrap();
        assert_eq!(
            keys,
            vec![
                "agent.max_concurrent_runs",
                "agent.runner",
                TASK_INPUT,
                "browser_settings.cdp_url",
                "browser_settings.discovery_timeout_ms",
            ]
        );
        assert_eq!(
            state.components.get("agent.runner").unwrap(),
            Some(json!("simulated"))
        );
        assert_eq!(state.available_slots(), 1);
    }
}
