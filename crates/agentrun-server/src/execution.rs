//! Per-run execution state shared between the control surface and the runner.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Paused flag and cancellation token for one run.
///
/// Cloning shares the same state. The runner reads it cooperatively;
/// the control surface writes it.
#[derive(Clone)]
pub struct ExecutionState {
    inner: Arc<Inner>,
}

struct Inner {
    paused: watch::Sender<bool>,
    cancel: CancellationToken,
}

impl ExecutionState {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                paused,
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.inner.paused.borrow()
    }

    /// Set the paused flag. Returns true if the value changed.
    pub fn set_paused(&self, paused: bool) -> bool {
        self.inner.paused.send_if_modified(|current| {
            if *current == paused {
                false
            } else {
                *current = paused;
                true
            }
        })
    }

    /// Flip the paused flag and return the new value.
    pub fn toggle_paused(&self) -> bool {
        let mut now = false;
        self.inner.paused.send_modify(|current| {
            *current = !*current;
            now = *current;
        });
        now
    }

    /// Wait until the run is not paused.
    ///
    /// Returns false if the run was cancelled while waiting.
    pub async fn wait_until_resumed(&self) -> bool {
        let mut rx = self.inner.paused.subscribe();
        loop {
            if self.inner.cancel.is_cancelled() {
                return false;
            }
            let paused = *rx.borrow_and_update();
            if !paused {
                return true;
            }
            tokio::select! {
                biased;
                _ = self.inner.cancel.cancelled() => return false,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    /// Request cancellation of the run.
    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Clone of the run's cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_set_paused_is_idempotent() {
        let state = ExecutionState::new();
        assert!(state.set_paused(true));
        assert!(!state.set_paused(true));
        assert!(state.is_paused());
        assert!(state.set_paused(false));
        assert!(!state.set_paused(false));
        assert!(!state.is_paused());
    }

    #[test]
    fn test_toggle_twice_restores_original() {
        let state = ExecutionState::new();
        let original = state.is_paused();
        assert!(state.toggle_paused());
        assert!(!state.toggle_paused());
        assert_eq!(state.is_paused(), original);
    }

    #[tokio::test]
    async fn test_wait_until_resumed_returns_immediately_when_running() {
        let state = ExecutionState::new();
        assert!(state.wait_until_resumed().await);
    }

    #[tokio::test]
    async fn test_wait_until_resumed_blocks_while_paused() {
        let state = ExecutionState::new();
        state.set_paused(true);

        let waiter = state.clone();
        let handle = tokio::spawn(async move { waiter.wait_until_resumed().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished());

        state.set_paused(false);
        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_releases_paused_waiter() {
        let state = ExecutionState::new();
        state.set_paused(true);

        let waiter = state.clone();
        let handle = tokio::spawn(async move { waiter.wait_until_resumed().await });

        state.cancel();
        assert!(!handle.await.unwrap());
        assert!(state.is_cancelled());
    }
}
