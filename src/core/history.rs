//! Record of a single walk through a state machine.
//!
//! A [`WalkReport`] lists every state whose transition ran, how many steps
//! ran in each, and why the walk stopped. Reports are plain data and
//! serialize with serde whenever the state type does.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Why a walk stopped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WalkOutcome {
    /// The last transition declared no successor.
    Terminal,
    /// No transition is registered for the state the walk reached.
    Unregistered,
    /// A step returned the end-of-sequence signal.
    EndOfSequence,
    /// A step failed or panicked.
    Failed { message: String },
}

impl WalkOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// One visited state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hop<S> {
    /// State whose transition ran
    pub state: S,
    /// Steps that completed without error in this state
    pub steps_run: usize,
    /// When the walk entered the state
    pub entered_at: DateTime<Utc>,
}

/// Ordered history of one walk.
///
/// # Example
///
/// ```rust
/// use statewalk::core::{Context, WalkOutcome};
/// use statewalk::machine::{StateMachine, Transition};
///
/// let machine = StateMachine::<&str, u32>::new();
/// machine
///     .add(Transition::terminal("start").step(|_, n: u32| Ok(n + 1)))
///     .unwrap();
///
/// let (result, report) = machine.apply_with_report(&Context::background(), "start", 1);
/// assert_eq!(result.unwrap(), 2);
/// assert_eq!(report.path(), vec![&"start"]);
/// assert_eq!(report.outcome(), Some(&WalkOutcome::Terminal));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalkReport<S> {
    id: Uuid,
    start: S,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    hops: Vec<Hop<S>>,
    end: Option<S>,
    outcome: Option<WalkOutcome>,
}

impl<S: Clone> WalkReport<S> {
    /// Start a report for a walk beginning at `start`.
    pub fn begin(start: S) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            started_at: Utc::now(),
            finished_at: None,
            hops: Vec::new(),
            end: None,
            outcome: None,
        }
    }

    pub(crate) fn enter(&mut self, state: S) {
        self.hops.push(Hop {
            state,
            steps_run: 0,
            entered_at: Utc::now(),
        });
    }

    pub(crate) fn step_completed(&mut self) {
        if let Some(hop) = self.hops.last_mut() {
            hop.steps_run += 1;
        }
    }

    pub(crate) fn finish(&mut self, end: S, outcome: WalkOutcome) {
        self.end = Some(end);
        self.outcome = Some(outcome);
        self.finished_at = Some(Utc::now());
    }

    /// Unique id of the walk, also attached to its tracing span.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start(&self) -> &S {
        &self.start
    }

    pub fn hops(&self) -> &[Hop<S>] {
        &self.hops
    }

    /// States whose transitions ran, in order.
    pub fn path(&self) -> Vec<&S> {
        self.hops.iter().map(|hop| &hop.state).collect()
    }

    /// State the walk stopped in. For [`WalkOutcome::Unregistered`] this is
    /// the state that had no transition.
    pub fn end(&self) -> Option<&S> {
        self.end.as_ref()
    }

    /// `None` while the walk is still running.
    pub fn outcome(&self) -> Option<&WalkOutcome> {
        self.outcome.as_ref()
    }

    /// Total steps completed across every hop.
    pub fn steps_run(&self) -> usize {
        self.hops.iter().map(|hop| hop.steps_run).sum()
    }

    /// Time from start to finish; `None` while the walk is still running.
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at.and_then(|finished| {
            finished
                .signed_duration_since(self.started_at)
                .to_std()
                .ok()
        })
    }

    pub fn is_success(&self) -> bool {
        self.outcome.as_ref().is_some_and(WalkOutcome::is_success)
    }
}
