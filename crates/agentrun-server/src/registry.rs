//! Run registry: run id → delivery queue, execution state, pump handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use agentrun_core::{RunId, RunStatus, RunSummary};

use crate::execution::ExecutionState;
use crate::progress::ProgressLog;
use crate::queue::DeliveryQueue;

/// Registry bookkeeping for one run.
struct RunEntry {
    /// Registration order.
    seq: u64,
    /// Created by an observer for an id no run owns. Never active, never listed.
    placeholder: bool,
    summary: RunSummary,
    queue: DeliveryQueue,
    progress: ProgressLog,
    execution: ExecutionState,
    /// Pump driving this run. Held here so the pump lives as long as the entry.
    handle: Option<JoinHandle<()>>,
}

impl RunEntry {
    fn is_active(&self) -> bool {
        !self.placeholder && self.summary.status.is_active()
    }

    fn new(seq: u64, run_id: RunId, task: Option<String>) -> Self {
        Self {
            seq,
            placeholder: task.is_none(),
            queue: DeliveryQueue::new(run_id.clone()),
            summary: RunSummary::new(run_id, task),
            progress: ProgressLog::new(),
            execution: ExecutionState::new(),
            handle: None,
        }
    }
}

/// Handles the launcher needs to wire a pump for a fresh run.
pub struct NewRun {
    pub run_id: RunId,
    pub queue: DeliveryQueue,
    pub progress: ProgressLog,
    pub execution: ExecutionState,
}

/// Maps run identifiers to their queue and lifecycle state.
///
/// Entries are reclaimed `retention` after their run terminated. Reclaiming an
/// entry whose queue has no `Done` yet terminates the queue first.
pub struct RunRegistry {
    runs: RwLock<HashMap<RunId, RunEntry>>,
    next_seq: AtomicU64,
    retention: Duration,
}

impl RunRegistry {
    /// Create a new RunRegistry wrapped in Arc.
    pub fn new(retention: Duration) -> Arc<Self> {
        Arc::new(Self {
            runs: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            retention,
        })
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocate a fresh run id with an empty queue.
    pub async fn create(&self, task: &str) -> NewRun {
        let run_id = RunId::generate();
        let entry = RunEntry::new(self.next_seq(), run_id.clone(), Some(task.to_string()));
        let new_run = NewRun {
            run_id: run_id.clone(),
            queue: entry.queue.clone(),
            progress: entry.progress.clone(),
            execution: entry.execution.clone(),
        };

        self.runs.write().await.insert(run_id.clone(), entry);

        info!(run_id = %run_id, "Run registered");
        new_run
    }

    /// Queue for `run_id`, created empty if the id is unknown.
    ///
    /// Lazily created entries have no pump; they are reclaimed (and their
    /// queue terminated) after the retention period.
    pub async fn get(self: &Arc<Self>, run_id: &RunId) -> DeliveryQueue {
        if let Some(entry) = self.runs.read().await.get(run_id) {
            return entry.queue.clone();
        }

        let mut runs = self.runs.write().await;
        if let Some(entry) = runs.get(run_id) {
            return entry.queue.clone();
        }
        let entry = RunEntry::new(self.next_seq(), run_id.clone(), None);
        let queue = entry.queue.clone();
        runs.insert(run_id.clone(), entry);
        drop(runs);

        debug!(run_id = %run_id, "Created queue for unknown run");
        self.schedule_reclaim(run_id.clone());
        queue
    }

    /// Store the pump handle driving `run_id`.
    pub async fn attach(&self, run_id: &RunId, handle: JoinHandle<()>) {
        if let Some(entry) = self.runs.write().await.get_mut(run_id) {
            entry.handle = Some(handle);
        }
    }

    /// Take the pump handle out of the entry so the caller can await it.
    pub async fn take_handle(&self, run_id: &RunId) -> Option<JoinHandle<()>> {
        self.runs
            .write()
            .await
            .get_mut(run_id)
            .and_then(|entry| entry.handle.take())
    }

    /// Execution state of `run_id`, if the run is still active.
    pub async fn active_execution(&self, run_id: &RunId) -> Option<ExecutionState> {
        self.runs
            .read()
            .await
            .get(run_id)
            .filter(|entry| entry.is_active())
            .map(|entry| entry.execution.clone())
    }

    /// The explicit target if given. Otherwise the run currently executing,
    /// or the newest run still waiting for a slot when none is.
    pub async fn resolve(&self, target: Option<&RunId>) -> Option<RunId> {
        if let Some(run_id) = target {
            return Some(run_id.clone());
        }
        self.runs
            .read()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_active())
            .max_by_key(|(_, entry)| (entry.summary.status == RunStatus::Running, entry.seq))
            .map(|(run_id, _)| run_id.clone())
    }

    /// Record that the runner started executing.
    pub async fn mark_running(&self, run_id: &RunId) {
        if let Some(entry) = self.runs.write().await.get_mut(run_id) {
            entry.summary.start();
        }
    }

    /// Record the terminal status of a run.
    pub async fn mark_finished(&self, run_id: &RunId, status: RunStatus, error: Option<String>) {
        let mut runs = self.runs.write().await;
        let Some(entry) = runs.get_mut(run_id) else {
            return;
        };
        match status {
            RunStatus::Completed => entry.summary.complete(),
            RunStatus::Cancelled => {
                entry.summary.cancel();
                entry.summary.error_message = error;
            }
            RunStatus::Failed => entry.summary.fail(error.unwrap_or_default()),
            RunStatus::Pending | RunStatus::Running => {}
        }
    }

    /// Remove an entry, terminating its queue if needed.
    pub async fn remove(&self, run_id: &RunId) -> bool {
        let removed = self.runs.write().await.remove(run_id);
        let Some(entry) = removed else {
            return false;
        };

        if entry.queue.finish() {
            debug!(run_id = %run_id, "Terminated queue on reclaim");
        }

        info!(run_id = %run_id, "Run reclaimed");
        true
    }

    /// Remove `run_id` once the retention period has elapsed.
    pub fn schedule_reclaim(self: &Arc<Self>, run_id: RunId) {
        let registry = Arc::clone(self);
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            registry.remove(&run_id).await;
        });
    }

    /// Cancel every active run. Used on shutdown.
    pub async fn cancel_all(&self) -> usize {
        let runs = self.runs.read().await;
        let mut cancelled = 0;
        for entry in runs.values().filter(|e| e.is_active()) {
            entry.execution.cancel();
            cancelled += 1;
        }
        cancelled
    }

    /// Summaries of all started runs, oldest first.
    pub async fn list(&self) -> Vec<RunSummary> {
        let runs = self.runs.read().await;
        let mut entries: Vec<&RunEntry> = runs.values().filter(|e| !e.placeholder).collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
            .into_iter()
            .map(|entry| {
                let mut summary = entry.summary.clone();
                summary.paused = entry.execution.is_paused();
                summary
            })
            .collect()
    }

    /// Get the number of registered runs.
    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
