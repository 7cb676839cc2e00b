//! Run summary type.

use crate::{RunId, RunStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of a Run's lifecycle, as reported by the run list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Unique run identifier.
    pub run_id: RunId,

    /// The task description, absent for entries created lazily by an observer.
    pub task: Option<String>,

    /// Current run status.
    pub status: RunStatus,

    /// Whether the run's execution state is paused.
    pub paused: bool,

    /// When the run was registered.
    pub created_at: DateTime<Utc>,

    /// When the runner started executing.
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached a terminal status.
    pub finished_at: Option<DateTime<Utc>>,

    /// Error message if the run failed or was cancelled.
    pub error_message: Option<String>,
}

impl RunSummary {
    /// Create a new pending RunSummary.
    pub fn new(run_id: RunId, task: Option<String>) -> Self {
        Self {
            run_id,
            task,
            status: RunStatus::Pending,
            paused: false,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    /// Mark the run as started.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the run as completed.
    pub fn complete(&mut self) {
        self.status = RunStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Mark the run as failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.finished_at = Some(Utc::now());
        self.error_message = Some(error.into());
    }

    /// Mark the run as cancelled.
    pub fn cancel(&mut self) {
        self.status = RunStatus::Cancelled;
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        let mut run = RunSummary::new(RunId::generate(), Some("go".to_string()));
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.started_at.is_none());

        run.start();
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.started_at.is_some());

        run.fail("boom");
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error_message.as_deref(), Some("boom"));
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_serializes_camel_case() {
        let run = RunSummary::new(RunId::new("r1"), None);
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["runId"], "r1");
        assert_eq!(value["status"], "PENDING");
        assert!(value.get("createdAt").is_some());
    }
}
