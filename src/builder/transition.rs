//! Builder for constructing transitions.

use crate::builder::error::BuildError;
use crate::core::{Context, Next, State};
use crate::machine::{Step, StepResult, Transition};
use std::sync::Arc;

/// Builder for constructing transitions with a fluent API.
///
/// Unlike [`Transition`]'s own constructors, `build` refuses a transition
/// without a source, a successor, or steps.
pub struct TransitionBuilder<S, D> {
    from: Option<S>,
    next: Option<Next<S>>,
    steps: Vec<Step<D>>,
}

impl<S: State, D> TransitionBuilder<S, D> {
    /// Create a new transition builder.
    pub fn new() -> Self {
        Self {
            from: None,
            next: None,
            steps: Vec::new(),
        }
    }

    /// Set the source state (required).
    pub fn from(mut self, state: S) -> Self {
        self.from = Some(state);
        self
    }

    /// Continue to `state` after the steps run.
    pub fn to(mut self, state: S) -> Self {
        self.next = Some(Next::Continue(state));
        self
    }

    /// End the walk after the steps run.
    pub fn terminal(mut self) -> Self {
        self.next = Some(Next::Terminal);
        self
    }

    /// Append a step (at least one is required).
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

    /// Build the transition.
    pub fn build(self) -> Result<Transition<S, D>, BuildError> {
        let from = self.from.ok_or(BuildError::MissingFromState)?;
        let next = self.next.ok_or(BuildError::MissingNext)?;
        if self.steps.is_empty() {
            return Err(BuildError::MissingSteps);
        }

        Ok(Transition {
            previous: from,
            next,
            steps: self.steps,
        })
    }
}

impl<S: State, D> Default for TransitionBuilder<S, D> {
    fn default() -> Self {
        Self::new()
    }
}
