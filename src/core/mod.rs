//! Core types shared by the pipeline and the state machine.
//!
//! - State identifiers via the `State` trait and successor declarations via `Next`
//! - The cancellation `Context` threaded into every step
//! - The `WalkReport` history of a single walk

mod context;
mod history;
mod state;

pub use context::{Context, ContextError};
pub use history::{Hop, WalkOutcome, WalkReport};
pub use state::{Next, State};
