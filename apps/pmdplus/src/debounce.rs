//! Trailing-edge debouncer.
//!
//! Each trigger restarts the quiet period; the action runs once the period
//! elapses without another trigger. Dropping the `Debouncer` or cancelling
//! its token stops the background task and discards a pending action.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl Debouncer {
    /// Spawn the debounce task on the current runtime.
    pub fn spawn<F, Fut>(delay: Duration, cancel: CancellationToken, action: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    first = rx.recv() => if first.is_none() { return },
                }
                // Quiet period; any trigger restarts it
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        next = rx.recv() => match next {
                            Some(()) => {
                                trace!("debounce restarted");
                                continue;
                            }
                            None => return,
                        },
                        _ = tokio::time::sleep(delay) => break,
                    }
                }
                action().await;
            }
        });
        Debouncer { delay, tx, task }
    }

    pub fn trigger(&self) {
        // Send only fails once the task is gone, which means we are shutting down
        let _ = self.tx.send(());
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
