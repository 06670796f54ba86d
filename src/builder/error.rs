//! Build errors for state machine and transition builders.

use crate::machine::RegistrationError;
use thiserror::Error;

/// Errors that can occur when building state machines and transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Transition source state not specified. Call .from(state)")]
    MissingFromState,

    #[error("Transition successor not specified. Call .to(state) or .terminal()")]
    MissingNext,

    #[error("Transition has no steps. Call .step(f) at least once")]
    MissingSteps,

    #[error("No transitions defined. Add at least one transition")]
    NoTransitions,

    #[error("{} transition(s) rejected: {}", errors.len(), summarize(errors))]
    Rejected { errors: Vec<RegistrationError> },
}

impl BuildError {
    /// Registration failures collected while building a machine.
    pub fn rejections(&self) -> &[RegistrationError] {
        match self {
            Self::Rejected { errors } => errors,
            _ => &[],
        }
    }
}

fn summarize(errors: &[RegistrationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_lists_every_failure() {
        let err = BuildError::Rejected {
            errors: vec![
                RegistrationError::SelfLoop {
                    state: "A".to_string(),
                },
                RegistrationError::DuplicateState {
                    state: "B".to_string(),
                },
            ],
        };

        assert_eq!(
            err.to_string(),
            "2 transition(s) rejected: transition from A points back to itself; \
             a transition from B is already registered"
        );
        assert_eq!(err.rejections().len(), 2);
        assert!(BuildError::NoTransitions.rejections().is_empty());
    }
}
