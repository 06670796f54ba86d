//! Property-based tests for registration and walks.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use proptest::prelude::*;
use statewalk::core::{Context, WalkOutcome};
use statewalk::machine::{RegistrationError, StateMachine, Transition};
use statewalk::pipeline::Pipeline;
use statewalk::BoxError;
use std::collections::HashSet;

fn counting(previous: u8, next: u8, steps: usize) -> Transition<u8, u32> {
    (0..steps).fold(Transition::to(previous, next), |t, _| t.step(|_, n: u32| Ok(n + 1)))
}

prop_compose! {
    fn distinct_pair()(a in 0..32u8, offset in 1..32u8) -> (u8, u8) {
        (a, (a + offset) % 32)
    }
}

proptest! {
    #[test]
    fn duplicate_registration_always_fails(
        (a, b) in distinct_pair(),
        (_, c) in distinct_pair(),
    ) {
        prop_assume!(c != a);
        let machine = StateMachine::new();
        machine.add(counting(a, b, 1)).unwrap();

        let err = machine.add(counting(a, c, 1)).unwrap_err();
        let is_duplicate = matches!(err, RegistrationError::DuplicateState { .. });
        prop_assert!(is_duplicate);
        prop_assert_eq!(machine.next_of(&a).and_then(|n| n.into_state()), Some(b));
    }

    #[test]
    fn self_loop_always_fails(state in any::<u8>(), steps in 1..4usize) {
        let machine = StateMachine::new();
        let err = machine.add(counting(state, state, steps)).unwrap_err();
        let is_self_loop = matches!(err, RegistrationError::SelfLoop { .. });
        prop_assert!(is_self_loop);
        prop_assert!(machine.is_empty());
    }

    #[test]
    fn direct_loop_always_fails((a, b) in distinct_pair()) {
        let machine = StateMachine::new();
        machine.add(counting(a, b, 1)).unwrap();

        let err = machine.add(counting(b, a, 1)).unwrap_err();
        prop_assert_eq!(
            err,
            RegistrationError::DirectLoop {
                from: format!("{b:?}"),
                to: format!("{a:?}"),
            }
        );
        prop_assert_eq!(machine.len(), 1);
    }

    #[test]
    fn forward_chain_registers(len in 2..20u8) {
        let machine = StateMachine::new();
        for state in 0..len - 1 {
            prop_assert!(machine.add(counting(state, state + 1, 1)).is_ok());
        }
        prop_assert_eq!(machine.len(), usize::from(len - 1));
    }

    #[test]
    fn disjoint_sources_register(states in prop::collection::hash_set(0..200u8, 1..20)) {
        let machine = StateMachine::new();
        for state in &states {
            // Successors above 200 are never sources, so no loops can form.
            prop_assert!(machine.add(counting(*state, 201 + state % 50, 1)).is_ok());
        }
        prop_assert_eq!(machine.len(), states.len());
    }

    #[test]
    fn chain_walk_runs_every_step(step_counts in prop::collection::vec(1..5usize, 1..10)) {
        let machine = StateMachine::new();
        for (i, steps) in step_counts.iter().enumerate() {
            let state = i as u8;
            machine.add(counting(state, state + 1, *steps)).unwrap();
        }

        let (result, report) =
            machine.apply_with_report(&Context::background(), 0, 0);
        let expected: usize = step_counts.iter().sum();

        prop_assert_eq!(result.unwrap() as usize, expected);
        prop_assert_eq!(report.steps_run(), expected);
        prop_assert_eq!(report.hops().len(), step_counts.len());
        prop_assert_eq!(report.end().copied(), Some(step_counts.len() as u8));
        prop_assert_eq!(report.outcome(), Some(&WalkOutcome::Unregistered));
    }

    #[test]
    fn walk_from_unregistered_state_is_identity(start in any::<u8>(), payload in any::<u32>()) {
        let machine: StateMachine<u8, u32> = StateMachine::new();
        let result = machine.apply(&Context::background(), start, payload);
        prop_assert_eq!(result.unwrap(), payload);
    }

    #[test]
    fn pipeline_reports_first_failing_step(len in 1..12usize, fail_at in 1..12usize) {
        prop_assume!(fail_at <= len);
        let mut pipeline = Pipeline::new();
        for step in 1..=len {
            pipeline.add(move |seen: Vec<usize>| -> Result<Vec<usize>, BoxError> {
                if step == fail_at {
                    return Err(format!("step {step} refused").into());
                }
                let mut seen = seen;
                seen.push(step);
                Ok(seen)
            });
        }

        let err = pipeline.exec(Vec::new()).unwrap_err();
        prop_assert_eq!(err.step(), fail_at);
        prop_assert!(!err.is_panic());
        prop_assert_eq!(
            err.to_string(),
            format!("fail on step #{fail_at}: step {fail_at} refused")
        );
    }

    #[test]
    fn pipeline_applies_steps_in_order(values in prop::collection::vec(any::<u8>(), 0..10)) {
        let mut pipeline = Pipeline::new();
        for value in values.clone() {
            pipeline.add(move |mut acc: Vec<u8>| -> Result<Vec<u8>, BoxError> {
                acc.push(value);
                Ok(acc)
            });
        }

        prop_assert_eq!(pipeline.exec(Vec::new()).unwrap(), values);
    }

    #[test]
    fn state_labels_are_unique_per_state(states in prop::collection::hash_set(any::<u8>(), 0..30)) {
        use statewalk::core::State;
        let labels: HashSet<String> = states.iter().map(State::label).collect();
        prop_assert_eq!(labels.len(), states.len());
    }
}
