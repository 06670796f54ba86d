//! Builder API for ergonomic state machine construction.
//!
//! This module provides fluent builders and macros for creating state machines
//! with minimal boilerplate.

pub mod error;
pub mod machine;
pub mod macros;
pub mod transition;

pub use error::BuildError;
pub use machine::StateMachineBuilder;
pub use transition::TransitionBuilder;

use crate::core::{Context, State};
use crate::machine::{StepResult, Transition};

/// Create a single-step transition from `from` to `to`.
///
/// # Example
///
/// ```
/// use statewalk::builder::simple_transition;
/// use statewalk::state_enum;
///
/// state_enum! {
///     enum MyState {
///         Start,
///         End,
///     }
/// }
///
/// let transition = simple_transition(MyState::Start, MyState::End, |_, n: u8| Ok(n + 1));
/// assert_eq!(transition.steps.len(), 1);
/// ```
pub fn simple_transition<S, D, F>(from: S, to: S, step: F) -> Transition<S, D>
where
    S: State,
    F: Fn(&Context, D) -> StepResult<D> + Send + Sync + 'static,
{
    Transition::to(from, to).step(step)
}

/// Create a single-step transition that ends the walk.
pub fn final_transition<S, D, F>(from: S, step: F) -> Transition<S, D>
where
    S: State,
    F: Fn(&Context, D) -> StepResult<D> + Send + Sync + 'static,
{
    Transition::terminal(from).step(step)
}
