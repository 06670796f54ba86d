//! State identifiers and successor declarations.
//!
//! A state is any value the caller can compare and hash: string slices,
//! integers, or enums (see [`state_enum!`](crate::state_enum)).

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// Trait for state identifiers.
///
/// Implemented for every type that is cloneable, hashable, comparable and
/// thread-safe, so callers never implement it by hand.
///
/// # Required Traits
///
/// - `Clone`: states are copied into walk reports
/// - `Eq` + `Hash`: states key the transition map
/// - `Debug`: states are named in errors and logs
/// - `Send` + `Sync`: machines are shared across threads
///
/// # Example
///
/// ```rust
/// use statewalk::core::State;
///
/// fn label<S: State>(state: &S) -> String {
///     state.label()
/// }
///
/// assert_eq!(label(&"init"), "\"init\"");
/// assert_eq!(label(&7u32), "7");
/// ```
pub trait State: Clone + Eq + Hash + Debug + Send + Sync {
    /// Human-readable label used in errors and log fields.
    fn label(&self) -> String {
        format!("{self:?}")
    }
}

impl<T> State for T where T: Clone + Eq + Hash + Debug + Send + Sync {}

/// Successor declared by a transition.
///
/// `Terminal` stops the walk once the transition's steps have run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Next<S> {
    /// Move on to this state after the steps complete.
    Continue(S),
    /// Stop the walk after the steps complete.
    Terminal,
}

impl<S> Next<S> {
    /// Returns the successor state, if any.
    pub fn state(&self) -> Option<&S> {
        match self {
            Self::Continue(state) => Some(state),
            Self::Terminal => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    /// Converts into an `Option`, consuming the declaration.
    pub fn into_state(self) -> Option<S> {
        match self {
            Self::Continue(state) => Some(state),
            Self::Terminal => None,
        }
    }
}

impl<S> From<Option<S>> for Next<S> {
    fn from(value: Option<S>) -> Self {
        match value {
            Some(state) => Self::Continue(state),
            None => Self::Terminal,
        }
    }
}
