//! Append-only progress log written by a task runner.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::watch;

/// Counted, subscribable log of opaque progress entries.
///
/// The runner appends; everyone else reads. Every append bumps a `watch`
/// counter so readers can wait for growth instead of polling.
#[derive(Clone)]
pub struct ProgressLog {
    inner: Arc<Inner>,
}

struct Inner {
    entries: Mutex<Vec<Value>>,
    len_tx: watch::Sender<usize>,
}

impl ProgressLog {
    pub fn new() -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(Vec::new()),
                len_tx,
            }),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Value>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an entry and return the new length.
    pub fn append(&self, entry: Value) -> usize {
        let len = {
            let mut entries = self.entries();
            entries.push(entry);
            entries.len()
        };
        self.inner.len_tx.send_replace(len);
        len
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// If the log grew past `seen`, return the current length and the newest
    /// entry, read under one lock.
    pub fn observe_since(&self, seen: usize) -> Option<(usize, Value)> {
        let entries = self.entries();
        if entries.len() > seen {
            entries.last().cloned().map(|entry| (entries.len(), entry))
        } else {
            None
        }
    }

    /// Copy of every entry.
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<Value> {
        self.entries().clone()
    }

    /// Receiver notified with the new length on every append.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.inner.len_tx.subscribe()
    }
}

impl Default for ProgressLog {
    fn default() -> Self {
        Self::new()
    }
}
