//! Cancellation context threaded through every step of a walk.
//!
//! The engine never polls the context itself. Steps observe it
//! cooperatively, usually with `ctx.check()?` at the top of the step.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Reason a context is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellation scope handed to steps.
///
/// Cloning a context shares its cancellation state. [`Context::child`]
/// derives a scope that is cancelled with its parent but can also be
/// cancelled on its own.
///
/// # Example
///
/// ```rust
/// use statewalk::core::{Context, ContextError};
///
/// let parent = Context::background();
/// let child = parent.child();
///
/// parent.cancel();
/// assert_eq!(child.err(), Some(ContextError::Cancelled));
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<DateTime<Utc>>,
}

impl Context {
    /// A context that is never cancelled unless [`Context::cancel`] is called.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child scope that also expires after `timeout`.
    ///
    /// The child keeps the parent's deadline if that one is earlier.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta));
        match deadline {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// Derive a child scope that expires at `deadline`.
    pub fn with_deadline(&self, deadline: DateTime<Utc>) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Derive a child scope cancelled together with this one.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancel this scope and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Time left before the deadline; `None` without a deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| {
            deadline
                .signed_duration_since(Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO)
        })
    }

    /// Why the context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Utc::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// `Err` once the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Underlying token, for integration with async code.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
