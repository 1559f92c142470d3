//! Request-scoped cancellation and deadlines
//!
//! Every long-running operation (API calls, state polling) takes a [`Context`]
//! so that an abort from Terraform, or an operation timeout, stops work early.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Context carries a cancellation signal and an optional deadline.
/// Pass it as the first parameter of async operations.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done,
                done_tx,
            }),
        }
    }

    /// Derives a child context that is cancelled when `timeout` elapses or
    /// when `self` is cancelled, whichever happens first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut deadline = Instant::now() + timeout;
        if let Some(parent_deadline) = self.inner.deadline {
            deadline = deadline.min(parent_deadline);
        }

        let (done_tx, done) = watch::channel(self.is_cancelled());

        let notifier = done_tx.clone();
        let parent = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep_until(deadline) => {}
                _ = parent.cancelled() => {}
                _ = notifier.closed() => return,
            }
            let _ = notifier.send(true);
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline: Some(deadline),
                done,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left before the deadline, `None` when there is no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.inner.done.clone();
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
