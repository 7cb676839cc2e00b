//! Server configuration.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::runner::{CommandRunner, SimulatedRunner, TaskRunner};

/// Which runner executes submitted tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RunnerKind {
    #[default]
    Simulated,
    Command,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("--runner-program is required with --runner command")]
    MissingProgram,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address.
    pub bind_addr: String,

    pub runner: RunnerKind,

    /// Program spawned per run by the command runner.
    pub runner_program: Option<String>,

    /// Arguments placed before the task.
    pub runner_args: Vec<String>,

    /// Assistant steps produced by the simulated runner.
    pub simulated_steps: u64,

    pub step_interval: Duration,

    /// Runs allowed to execute at once. Further runs wait for a slot.
    pub max_concurrent_runs: usize,

    /// How long a finished run stays streamable.
    pub run_retention: Duration,

    /// How long stop waits for a pump to wind down.
    pub stop_timeout: Duration,

    /// Default remote debugging endpoint for tab discovery.
    pub cdp_url: Option<String>,

    pub discovery_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7788".to_string(),
            runner: RunnerKind::Simulated,
            runner_program: None,
            runner_args: Vec::new(),
            simulated_steps: 5,
            step_interval: Duration::from_millis(1000),
            max_concurrent_runs: 1,
            run_retention: Duration::from_secs(300),
            stop_timeout: Duration::from_secs(10),
            cdp_url: None,
            discovery_timeout: Duration::from_millis(3000),
        }
    }
}

impl Config {
    /// Instantiate the configured runner.
    pub fn build_runner(&self) -> Result<Arc<dyn TaskRunner>, ConfigError> {
        match self.runner {
            RunnerKind::Simulated => Ok(Arc::new(SimulatedRunner::new(
                self.simulated_steps,
                self.step_interval,
            ))),
            RunnerKind::Command => {
                let program = self
                    .runner_program
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or(ConfigError::MissingProgram)?;
                Ok(Arc::new(
                    CommandRunner::new(program).with_args(self.runner_args.iter().cloned()),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "127.0.0.1:7788");
        assert_eq!(config.max_concurrent_runs, 1);
        assert_eq!(config.build_runner().unwrap().name(), "simulated");
    }

    #[test]
    fn test_command_runner_requires_program() {
        let mut config = Config {
            runner: RunnerKind::Command,
            ..Config::default()
        };
        assert!(matches!(
            config.build_runner(),
            Err(ConfigError::MissingProgram)
        ));

        config.runner_program = Some("agent-cli".to_string());
        assert_eq!(config.build_runner().unwrap().name(), "agent-cli");
    }
}
