//! State machine error types.

use crate::recovery::PanicError;
use crate::BoxError;
use std::error::Error as StdError;
use thiserror::Error;

/// Reasons a transition is refused at registration time.
///
/// States are rendered with their `Debug` form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("transition is missing")]
    InvalidTransition,

    #[error("transition from {state} has no steps")]
    EmptySteps { state: String },

    #[error("a transition from {state} is already registered")]
    DuplicateState { state: String },

    #[error("transition from {state} points back to itself")]
    SelfLoop { state: String },

    #[error("transition {from} -> {to} forms a direct loop with {to} -> {from}")]
    DirectLoop { from: String, to: String },

    #[error("cannot register a transition from a step of the same machine")]
    WalkInProgress,
}

/// Failure of a walk.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// A step panicked. The message carries the panic payload and trace.
    #[error("panic in state {state} on step #{step}: {source}")]
    Panic {
        state: String,
        step: usize,
        source: PanicError,
    },

    /// A step returned an error; it is displayed as-is.
    #[error("{source}")]
    Step {
        state: String,
        step: usize,
        source: BoxError,
    },
}

impl ApplyError {
    /// State whose transition was running.
    pub fn state(&self) -> &str {
        match self {
            Self::Panic { state, .. } | Self::Step { state, .. } => state,
        }
    }

    /// 1-based index of the failing step within its transition.
    pub fn step(&self) -> usize {
        match self {
            Self::Panic { step, .. } | Self::Step { step, .. } => *step,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic { .. })
    }

    pub fn panic(&self) -> Option<&PanicError> {
        match self {
            Self::Panic { source, .. } => Some(source),
            Self::Step { .. } => None,
        }
    }

    /// The error a step returned, downcast to its concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            Self::Step { source, .. } => source.downcast_ref::<E>(),
            Self::Panic { .. } => None,
        }
    }
}
