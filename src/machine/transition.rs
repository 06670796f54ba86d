//! Transitions and the steps they run.

use crate::core::{Context, ContextError, Next, State};
use crate::BoxError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of a step other than a new payload.
///
/// `EndOfSequence` is not a failure: it stops the walk cleanly and hands
/// back the final payload.
#[derive(Debug, Error)]
pub enum StepError<D> {
    /// Stop the whole walk here with this payload.
    #[error("end of sequence")]
    EndOfSequence(D),

    /// The context was cancelled or ran past its deadline.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Business failure reported by the step.
    #[error(transparent)]
    Failed(BoxError),
}

impl<D> StepError<D> {
    /// Stop the walk cleanly with `data` as the final payload.
    pub fn stop(data: D) -> Self {
        Self::EndOfSequence(data)
    }

    /// Wrap any error (or message) as a step failure.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }

    pub fn is_end_of_sequence(&self) -> bool {
        matches!(self, Self::EndOfSequence(_))
    }
}

/// Result returned by every step.
pub type StepResult<D> = Result<D, StepError<D>>;

/// A payload transform run while the machine is in a state.
pub type Step<D> = Arc<dyn Fn(&Context, D) -> StepResult<D> + Send + Sync>;

/// A rule mapping one state to the next, with the steps to run in it.
///
/// # Example
///
/// ```rust
/// use statewalk::core::Next;
/// use statewalk::machine::Transition;
///
/// let transition = Transition::to("draft", "review")
///     .step(|_ctx, words: Vec<String>| Ok(words))
///     .step(|_ctx, mut words: Vec<String>| {
///         words.push("reviewed".to_string());
///         Ok(words)
///     });
///
/// assert_eq!(transition.next, Next::Continue("review"));
/// assert_eq!(transition.steps.len(), 2);
/// ```
pub struct Transition<S, D> {
    /// State this transition is registered under
    pub previous: S,
    /// Where the walk goes after the steps complete
    pub next: Next<S>,
    /// Steps run in order against the payload
    pub steps: Vec<Step<D>>,
}

impl<S: State, D> Transition<S, D> {
    /// Transition with no steps yet.
    pub fn new(previous: S, next: Next<S>) -> Self {
        Self {
            previous,
            next,
            steps: Vec::new(),
        }
    }

    /// Transition that continues to `next`.
    pub fn to(previous: S, next: S) -> Self {
        Self::new(previous, Next::Continue(next))
    }

    /// Transition that ends the walk after its steps.
    pub fn terminal(previous: S) -> Self {
        Self::new(previous, Next::Terminal)
    }

    /// Append a step.
    pub fn step<F>(mut self, step: F) -> Self
    where
        F: Fn(&Context, D) -> StepResult<D> + Send + Sync + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append an already shared step.
    pub fn shared_step(mut self, step: Step<D>) -> Self {
        self.steps.push(step);
        self
    }
}

impl<S: Clone, D> Clone for Transition<S, D> {
    fn clone(&self) -> Self {
        Self {
            previous: self.previous.clone(),
            next: self.next.clone(),
            steps: self.steps.iter().map(Arc::clone).collect(),
        }
    }
}

impl<S: fmt::Debug, D> fmt::Debug for Transition<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("previous", &self.previous)
            .field("next", &self.next)
            .field("steps", &self.steps.len())
            .finish()
    }
}
