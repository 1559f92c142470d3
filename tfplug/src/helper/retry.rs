//! Retrying a fallible operation until it succeeds or a timeout passes

use crate::context::Context;
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};

const INITIAL_WAIT: Duration = Duration::from_millis(500);
const MAX_WAIT: Duration = Duration::from_secs(10);

/// Outcome of one failed attempt
#[derive(Debug)]
pub enum RetryError<E> {
    Retryable(E),
    NonRetryable(E),
}

impl<E> RetryError<E> {
    pub fn retryable(err: E) -> Self {
        RetryError::Retryable(err)
    }

    pub fn non_retryable(err: E) -> Self {
        RetryError::NonRetryable(err)
    }

    /// Classifies `err` with `is_retryable`
    pub fn classify(err: E, is_retryable: impl FnOnce(&E) -> bool) -> Self {
        if is_retryable(&err) {
            RetryError::Retryable(err)
        } else {
            RetryError::NonRetryable(err)
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetryFailure<E> {
    #[error("timeout after {timeout:?}: {last}")]
    Timeout { timeout: Duration, last: E },

    #[error("{0}")]
    Aborted(E),

    #[error("cancelled while retrying")]
    Cancelled,
}

impl<E> RetryFailure<E> {
    /// The underlying error, if any
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryFailure::Timeout { last, .. } | RetryFailure::Aborted(last) => Some(last),
            RetryFailure::Cancelled => None,
        }
    }
}

/// Calls `operation` until it returns `Ok`, a non-retryable error, or
/// `timeout` elapses. Waits start at 500ms and double up to 10s.
pub async fn retry<T, E, F, Fut>(
    ctx: &Context,
    timeout: Duration,
    mut operation: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RetryError<E>>>,
{
    let deadline = Instant::now() + timeout;
    let mut wait = INITIAL_WAIT;
    let mut attempt = 1u32;
    let mut previous: Option<E> = None;

    loop {
        let outcome = tokio::select! {
            _ = ctx.cancelled() => return Err(interrupted(ctx, timeout, previous)),
            outcome = operation() => outcome,
        };

        let last = match outcome {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(e)) => return Err(RetryFailure::Aborted(e)),
            Err(RetryError::Retryable(e)) => e,
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(RetryFailure::Timeout { timeout, last });
        }

        tracing::debug!("attempt {} failed with a retryable error, retrying", attempt);
        let sleep = wait.min(deadline - now);
        tokio::select! {
            _ = ctx.cancelled() => return Err(interrupted(ctx, timeout, Some(last))),
            _ = time::sleep(sleep) => {}
        }
        previous = Some(last);

        wait = (wait * 2).min(MAX_WAIT);
        attempt += 1;
    }
}

/// An expired context after at least one failed attempt is a timeout
fn interrupted<E>(ctx: &Context, timeout: Duration, last: Option<E>) -> RetryFailure<E> {
    match last {
        Some(last) if ctx.remaining().is_some_and(|left| left.is_zero()) => {
            RetryFailure::Timeout { timeout, last }
        }
        _ => RetryFailure::Cancelled,
    }
}
