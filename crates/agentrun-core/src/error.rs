//! Core domain errors.

use thiserror::Error;

/// Core domain errors for AgentRun.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A message was offered to a queue that already carries its terminal marker.
    #[error("Delivery queue for run {0} is already finished")]
    QueueFinished(String),
}
