//! Builder for constructing state machines.

use crate::builder::error::BuildError;
use crate::builder::transition::TransitionBuilder;
use crate::core::State;
use crate::machine::{RegistrationError, StateMachine, Transition};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use tracing::debug;

const DEFAULT_NAME: &str = "state-machine";
const DEFAULT_CAPACITY: usize = 6;

/// Builder for constructing state machines with a fluent API.
///
/// Transitions are registered in the order they were added. Every
/// registration failure is reported, not just the first.
///
/// # Example
///
/// ```
/// use statewalk::builder::{StateMachineBuilder, TransitionBuilder};
/// use statewalk::core::Context;
///
/// let machine = StateMachineBuilder::new()
///     .name("counter")
///     .transition(
///         TransitionBuilder::new()
///             .from("start")
///             .to("finish")
///             .step(|_, n: u32| Ok(n + 1)),
///     )
///     .unwrap()
///     .transition(
///         TransitionBuilder::new()
///             .from("finish")
///             .terminal()
///             .step(|_, n: u32| Ok(n * 10)),
///     )
///     .unwrap()
///     .build()
///     .unwrap();
///
/// assert_eq!(machine.name(), "counter");
/// assert_eq!(machine.apply(&Context::background(), "start", 1).unwrap(), 20);
/// ```
pub struct StateMachineBuilder<S, D> {
    name: String,
    capacity: usize,
    transitions: Vec<Transition<S, D>>,
}

impl<S: State, D> StateMachineBuilder<S, D> {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            capacity: DEFAULT_CAPACITY,
            transitions: Vec::new(),
        }
    }

    /// Name used in log events and walk spans.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pre-size the transition map.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Add a transition using a builder.
    /// Returns an error if the builder fails validation.
    pub fn transition(mut self, builder: TransitionBuilder<S, D>) -> Result<Self, BuildError> {
        let transition = builder.build()?;
        self.transitions.push(transition);
        Ok(self)
    }

    /// Add a pre-built transition.
    pub fn add_transition(mut self, transition: Transition<S, D>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add multiple transitions at once.
    pub fn transitions(mut self, transitions: Vec<Transition<S, D>>) -> Self {
        self.transitions.extend(transitions);
        self
    }

    /// Build the state machine.
    pub fn build(self) -> Result<StateMachine<S, D>, BuildError> {
        if self.transitions.is_empty() {
            return Err(BuildError::NoTransitions);
        }

        let machine = StateMachine::configured(self.name, self.capacity);
        let checks: Vec<Validation<(), NonEmptyVec<RegistrationError>>> = self
            .transitions
            .into_iter()
            .map(|transition| match machine.add(transition) {
                Ok(()) => Validation::success(()),
                Err(err) => Validation::fail(err),
            })
            .collect();

        match Validation::all_vec(checks).map(|_| ()) {
            Validation::Success(_) => {
                debug!(machine = %machine.name(), transitions = machine.len(), "machine built");
                Ok(machine)
            }
            Validation::Failure(errors) => Err(BuildError::Rejected {
                errors: errors.iter().cloned().collect(),
            }),
        }
    }
}

impl<S: State, D> Default for StateMachineBuilder<S, D> {
    fn default() -> Self {
        Self::new()
    }
}
