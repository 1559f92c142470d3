//! Polling until a remote object reaches a target status
//!
//! Cloud operations such as cluster creation finish asynchronously. A
//! [`StateChangeConf`] repeatedly calls a refresh function that reports the
//! object's current status and stops once the status is a target, a failure,
//! the timeout passes or the caller's [`Context`] is cancelled.

use crate::context::Context;
use futures::future::BoxFuture;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{self, Instant};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type RefreshResult<T> = Result<(T, String), BoxError>;

type RefreshFunc<T> = Box<dyn Fn() -> BoxFuture<'static, RefreshResult<T>> + Send + Sync>;

/// Wait before the first probe
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);

/// Wait between two probes
pub const DEFAULT_MIN_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timeout while waiting for state to become '{}' (last state: '{last_state}', timeout: {timeout:?})", .target.join(", "))]
    Timeout {
        last_state: String,
        target: Vec<String>,
        timeout: Duration,
    },

    #[error("unexpected state '{state}', wanted target '{}'", .target.join(", "))]
    FailState { state: String, target: Vec<String> },

    #[error("error refreshing state (last state: '{last_state}'): {source}")]
    Refresh {
        last_state: String,
        #[source]
        source: BoxError,
    },

    #[error("cancelled while waiting for state (last state: '{last_state}')")]
    Cancelled { last_state: String },
}

impl WaitError {
    /// Status observed last before the wait stopped
    pub fn last_state(&self) -> &str {
        match self {
            WaitError::Timeout { last_state, .. }
            | WaitError::Refresh { last_state, .. }
            | WaitError::Cancelled { last_state } => last_state,
            WaitError::FailState { state, .. } => state,
        }
    }
}

pub struct StateChangeConf<T> {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub fail: Vec<String>,
    pub timeout: Duration,
    pub delay: Duration,
    pub min_timeout: Duration,
    refresh: RefreshFunc<T>,
}

/// Builds a poll configuration with the standard delay and probe interval
pub fn build_state_conf<T, F, Fut>(
    pending: &[&str],
    target: &[&str],
    timeout: Duration,
    refresh: F,
) -> StateChangeConf<T>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RefreshResult<T>> + Send + 'static,
{
    StateChangeConf {
        pending: pending.iter().map(|s| s.to_string()).collect(),
        target: target.iter().map(|s| s.to_string()).collect(),
        fail: Vec::new(),
        timeout,
        delay: DEFAULT_DELAY,
        min_timeout: DEFAULT_MIN_TIMEOUT,
        refresh: Box::new(move || Box::pin(refresh())),
    }
}

impl<T> StateChangeConf<T> {
    /// Statuses that abort the wait immediately
    pub fn with_fail_states(mut self, fail: &[&str]) -> Self {
        self.fail = fail.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    /// Polls until the status is a target. Statuses that are neither pending,
    /// target nor failure are logged and polled again.
    pub async fn wait_for_state(&self, ctx: &Context) -> Result<T, WaitError> {
        let deadline = Instant::now() + self.timeout;
        let mut last_state = String::new();
        let mut wait = self.delay;

        loop {
            if !wait.is_zero() {
                let wake = (Instant::now() + wait).min(deadline);
                tokio::select! {
                    _ = ctx.cancelled() => return Err(self.interrupted(ctx, last_state)),
                    _ = time::sleep_until(wake) => {}
                }
            }
            wait = self.min_timeout;

            let outcome = tokio::select! {
                _ = ctx.cancelled() => return Err(self.interrupted(ctx, last_state)),
                outcome = (self.refresh)() => outcome,
            };

            let (object, state) = match outcome {
                Ok(result) => result,
                Err(source) => return Err(WaitError::Refresh { last_state, source }),
            };
            tracing::trace!("refreshed state: {}", state);

            if self.target.contains(&state) {
                return Ok(object);
            }
            if self.fail.contains(&state) {
                return Err(WaitError::FailState {
                    state,
                    target: self.target.clone(),
                });
            }
            if !self.pending.contains(&state) {
                tracing::warn!(
                    "unexpected state '{}' while waiting for '{}', continuing to poll",
                    state,
                    self.target.join(", ")
                );
            }
            last_state = state;

            if Instant::now() >= deadline {
                return Err(WaitError::Timeout {
                    last_state,
                    target: self.target.clone(),
                    timeout: self.timeout,
                });
            }
        }
    }
}

impl<T> StateChangeConf<T> {
    /// A context that hit its own deadline reports as a timeout
    fn interrupted(&self, ctx: &Context, last_state: String) -> WaitError {
        if ctx.remaining().is_some_and(|left| left.is_zero()) {
            WaitError::Timeout {
                last_state,
                target: self.target.clone(),
                timeout: self.timeout,
            }
        } else {
            WaitError::Cancelled { last_state }
        }
    }
}

/// Failures of a [`wait_for_all`] call, in input order
#[derive(Debug, thiserror::Error)]
#[error("{}", .messages.join("; "))]
pub struct WaitAllError {
    pub failed: Vec<String>,
    pub messages: Vec<String>,
}

/// Waits on every `(key, conf)` pair concurrently, one task per key.
/// All tasks are joined before returning; a failure does not stop siblings.
pub async fn wait_for_all<T>(
    ctx: &Context,
    waits: Vec<(String, StateChangeConf<T>)>,
) -> Result<Vec<(String, T)>, WaitAllError>
where
    T: Send + 'static,
{
    let total = waits.len();
    let mut tasks = JoinSet::new();

    for (idx, (key, conf)) in waits.into_iter().enumerate() {
        let ctx = ctx.clone();
        tasks.spawn(async move {
            let result = conf.wait_for_state(&ctx).await;
            (idx, key, result)
        });
    }

    let mut succeeded = Vec::with_capacity(total);
    let mut failures = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, key, Ok(object))) => succeeded.push((idx, key, object)),
            Ok((idx, key, Err(e))) => failures.push((idx, key.clone(), format!("{}: {}", key, e))),
            Err(e) => failures.push((total, String::new(), format!("wait task failed: {}", e))),
        }
    }

    if failures.is_empty() {
        succeeded.sort_by_key(|(idx, _, _)| *idx);
        return Ok(succeeded
            .into_iter()
            .map(|(_, key, object)| (key, object))
            .collect());
    }

    failures.sort_by_key(|(idx, _, _)| *idx);
    let (failed, messages): (Vec<String>, Vec<String>) = failures
        .into_iter()
        .map(|(_, key, message)| (key, message))
        .unzip();
    Err(WaitAllError { failed, messages })
}
