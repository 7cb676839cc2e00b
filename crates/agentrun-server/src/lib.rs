//! AgentRun server library.
//!
//! Run lifecycle control for a long-running agent task: start, pause, resume
//! and stop, with each run's progress streamed to observers as Server-Sent
//! Events.

pub mod broker;
pub mod components;
pub mod config;
pub mod control;
pub mod discovery;
pub mod execution;
pub mod http;
pub mod launch;
pub mod metrics;
pub mod progress;
pub mod pump;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod state;

pub use config::{Config, RunnerKind};
pub use control::{ControlOutcome, ControlSurface};
pub use discovery::{TabDiscovery, TabTarget};
pub use registry::RunRegistry;
pub use state::AppState;
