//! Statewalk: a declarative state machine executor
//!
//! Register transitions (a previous state, its successor, and the ordered
//! steps that transform a payload while in that state), then walk a payload
//! through the resulting graph. Every user callback runs behind a panic
//! recovery boundary, so a misbehaving step becomes an error instead of
//! taking the thread down.
//!
//! # Core Concepts
//!
//! - **Recovery**: [`recovery::catch`] turns a panic into a [`PanicError`]
//!   with the payload text and a short trace
//! - **Pipeline**: an ordered list of fallible transforms reporting the
//!   1-based step that failed
//! - **State machine**: a concurrent transition registry plus a walk
//!   executor with three clean stops (terminal, unregistered state, end of
//!   sequence)
//!
//! # Example
//!
//! ```rust
//! use statewalk::core::Context;
//! use statewalk::machine::{StateMachine, StepError, Transition};
//! use statewalk::state_enum;
//!
//! state_enum! {
//!     enum Order {
//!         Placed,
//!         Paid,
//!         Shipped,
//!     }
//! }
//!
//! let machine = StateMachine::new();
//! machine
//!     .add(Transition::to(Order::Placed, Order::Paid).step(|_, total: u32| Ok(total + 5)))
//!     .unwrap();
//! machine
//!     .add(Transition::to(Order::Paid, Order::Shipped).step(|_, total: u32| {
//!         if total > 100 {
//!             return Err(StepError::stop(total));
//!         }
//!         Ok(total * 2)
//!     }))
//!     .unwrap();
//!
//! let total = machine.apply(&Context::background(), Order::Placed, 10).unwrap();
//! assert_eq!(total, 30);
//! ```

pub mod builder;
pub mod core;
pub mod machine;
pub mod pipeline;
pub mod recovery;

/// Boxed error returned by caller-supplied steps.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// Re-export commonly used types
pub use builder::{BuildError, StateMachineBuilder, TransitionBuilder};
pub use core::{Context, ContextError, Next, State, WalkOutcome, WalkReport};
pub use machine::{ApplyError, RegistrationError, StateMachine, StepError, StepResult, Transition};
pub use pipeline::{Pipeline, PipelineError};
pub use recovery::{catch, recover, PanicError};
