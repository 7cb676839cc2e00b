//! Per-run delivery queue with fan-out to any number of observers.
//!
//! The queue is an append-only replay log. Each [`Subscription`] keeps its own
//! cursor, so every observer receives every message in enqueue order, and an
//! observer that reconnects starts again from the first message. Memory is
//! held until the run's registry entry is reclaimed.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use agentrun_core::{CoreError, DeliveryMessage, RunId};

/// Unbounded, single-writer, multi-reader queue of delivery messages.
#[derive(Clone)]
pub struct DeliveryQueue {
    inner: Arc<Inner>,
}

struct Inner {
    run_id: RunId,
    messages: Mutex<Vec<DeliveryMessage>>,
    len_tx: watch::Sender<usize>,
}

impl DeliveryQueue {
    pub fn new(run_id: RunId) -> Self {
        let (len_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                run_id,
                messages: Mutex::new(Vec::new()),
                len_tx,
            }),
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.inner.run_id
    }

    fn messages(&self) -> MutexGuard<'_, Vec<DeliveryMessage>> {
        self.inner
            .messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Enqueue a message.
    ///
    /// Fails once `Done` has been enqueued; a second `Done` is rejected too.
    pub fn push(&self, message: DeliveryMessage) -> Result<(), CoreError> {
        let len = {
            let mut messages = self.messages();
            if messages.last().is_some_and(DeliveryMessage::is_done) {
                return Err(CoreError::QueueFinished(self.inner.run_id.to_string()));
            }
            messages.push(message);
            messages.len()
        };
        self.inner.len_tx.send_replace(len);
        Ok(())
    }

    /// Enqueue `Done` unless it is already there. Returns true if this call
    /// terminated the queue.
    pub fn finish(&self) -> bool {
        self.push(DeliveryMessage::Done).is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.messages().last().is_some_and(DeliveryMessage::is_done)
    }

    pub fn len(&self) -> usize {
        self.messages().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attach a new observer reading from the first message.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            queue: self.clone(),
            len_rx: self.inner.len_tx.subscribe(),
            cursor: 0,
        }
    }
}

/// One observer's read position in a [`DeliveryQueue`].
pub struct Subscription {
    queue: DeliveryQueue,
    len_rx: watch::Receiver<usize>,
    cursor: usize,
}

impl Subscription {
    /// Wait for the next message. Returns `None` after `Done` was delivered.
    pub async fn next(&mut self) -> Option<DeliveryMessage> {
        loop {
            // Mark the current length seen before reading, so an append that
            // lands after the read still wakes `changed()`.
            self.len_rx.borrow_and_update();
            {
                let messages = self.queue.messages();
                if let Some(message) = messages.get(self.cursor) {
                    self.cursor += 1;
                    return Some(message.clone());
                }
                if messages.last().is_some_and(DeliveryMessage::is_done) {
                    return None;
                }
            }
            // The sender lives as long as the queue we hold.
            if self.len_rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Number of messages already delivered to this observer.
    pub fn position(&self) -> usize {
        self.cursor
    }
}
