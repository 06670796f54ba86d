//! Declarative state machine executor.
//!
//! Callers register [`Transition`]s keyed by their previous state, then
//! [`StateMachine::apply`] walks a payload through the graph: run the
//! current state's steps, move to the declared successor, repeat.
//!
//! # Stopping
//!
//! A walk ends cleanly when it reaches a state with no registered
//! transition, a transition declaring [`Next::Terminal`], or a step
//! returning [`StepError::EndOfSequence`]. Any other step error, or a
//! panic inside a step, ends it with an [`ApplyError`].
//!
//! # Locking
//!
//! Walks run concurrently. `add` waits until no walk is in flight, then
//! swaps in the new transition while new walks wait for it. Steps may read
//! their own machine (`len`, `contains`, `next_of`) and may start nested
//! walks of it. A step calling `add` on its own machine is refused with
//! [`RegistrationError::WalkInProgress`]. A step blocking on an `add` made
//! by another thread for the same machine never returns.

mod error;
mod transition;

pub use error::{ApplyError, RegistrationError};
pub use transition::{Step, StepError, StepResult, Transition};

use crate::core::{Context, Next, State, WalkOutcome, WalkReport};
use crate::recovery::catch;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, debug_span, error, field, warn};

/// Initial room in the transition map.
const DEFAULT_CAPACITY: usize = 6;

static NEXT_MACHINE_ID: AtomicU64 = AtomicU64::new(0);

thread_local! {
    /// Machines with a walk running on this thread.
    static WALKING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

type Registry<S, D> = HashMap<S, Transition<S, D>>;

/// Registry of transitions plus the walk executor.
///
/// # Example
///
/// ```rust
/// use statewalk::core::Context;
/// use statewalk::machine::{StateMachine, Transition};
///
/// let machine = StateMachine::<&str, Vec<&str>>::new();
/// machine
///     .add(Transition::to("init", "working").step(|_, mut log: Vec<&str>| {
///         log.push("init");
///         Ok(log)
///     }))
///     .unwrap();
/// machine
///     .add(Transition::terminal("working").step(|_, mut log: Vec<&str>| {
///         log.push("working");
///         Ok(log)
///     }))
///     .unwrap();
///
/// let log = machine.apply(&Context::background(), "init", Vec::new()).unwrap();
/// assert_eq!(log, vec!["init", "working"]);
/// ```
pub struct StateMachine<S, D> {
    id: u64,
    name: String,
    /// Walks in flight; registration proceeds only at zero.
    walks: Mutex<usize>,
    idle: Condvar,
    states: RwLock<Registry<S, D>>,
}

impl<S: State, D> StateMachine<S, D> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Machine whose transition map is pre-sized for `capacity` states.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::configured("state-machine".to_string(), capacity)
    }

    pub(crate) fn configured(name: String, capacity: usize) -> Self {
        Self {
            id: NEXT_MACHINE_ID.fetch_add(1, Ordering::Relaxed),
            name,
            walks: Mutex::new(0),
            idle: Condvar::new(),
            states: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Name attached to log events and walk spans.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry<S, D>> {
        self.states.read().unwrap_or_else(|poisoned| {
            warn!(machine = %self.name, "transition lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry<S, D>> {
        self.states.write().unwrap_or_else(|poisoned| {
            warn!(machine = %self.name, "transition lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_walks(&self) -> MutexGuard<'_, usize> {
        self.walks.lock().unwrap_or_else(|poisoned| {
            warn!(machine = %self.name, "walk counter lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Block until no walk is in flight. New walks wait while the guard lives.
    fn wait_idle(&self) -> MutexGuard<'_, usize> {
        let walks = self.lock_walks();
        self.idle
            .wait_while(walks, |walks| *walks > 0)
            .unwrap_or_else(|poisoned| {
                warn!(machine = %self.name, "walk counter lock was poisoned, recovering");
                poisoned.into_inner()
            })
    }

    fn begin_walk(&self) -> WalkGuard<'_, S, D> {
        *self.lock_walks() += 1;
        let _ = WALKING.try_with(|walking| walking.borrow_mut().push(self.id));
        WalkGuard { machine: self }
    }

    fn walking_here(&self) -> bool {
        WALKING
            .try_with(|walking| walking.borrow().contains(&self.id))
            .unwrap_or(false)
    }

    /// Register a transition under its previous state.
    ///
    /// Checks, in order: the transition is present, it has at least one
    /// step, nothing is registered for its previous state yet, its
    /// successor differs from its previous state, and the successor's own
    /// transition (if any) does not point straight back. Longer cycles are
    /// not detected.
    ///
    /// Blocks while any walk is in progress. Called from one of this
    /// machine's own steps it fails with
    /// [`RegistrationError::WalkInProgress`].
    pub fn add<T>(&self, transition: T) -> Result<(), RegistrationError>
    where
        T: Into<Option<Transition<S, D>>>,
    {
        if self.walking_here() {
            warn!(machine = %self.name, "registration from inside a walk rejected");
            return Err(RegistrationError::WalkInProgress);
        }

        let _idle = self.wait_idle();
        let mut states = self.write();

        let Some(transition) = transition.into() else {
            warn!(machine = %self.name, "missing transition rejected");
            return Err(RegistrationError::InvalidTransition);
        };
        if let Err(err) = validate(&states, &transition) {
            warn!(machine = %self.name, error = %err, "transition rejected");
            return Err(err);
        }

        debug!(
            machine = %self.name,
            previous = ?transition.previous,
            next = ?transition.next,
            steps = transition.steps.len(),
            "transition registered"
        );
        states.insert(transition.previous.clone(), transition);
        Ok(())
    }

    /// Walk `data` through the graph starting at `start`.
    ///
    /// Returns the final payload when the walk stops cleanly. The context
    /// is handed to every step; the walk itself never checks it, and a
    /// graph containing a cycle longer than two states walks forever unless
    /// a step gives up.
    pub fn apply(&self, ctx: &Context, start: S, data: D) -> Result<D, ApplyError> {
        let span = debug_span!("walk", machine = %self.name, walk_id = field::Empty);
        let _entered = span.enter();
        self.walk(ctx, start, data, &mut ())
    }

    /// Like [`StateMachine::apply`], also returning the walk's history.
    pub fn apply_with_report(
        &self,
        ctx: &Context,
        start: S,
        data: D,
    ) -> (Result<D, ApplyError>, WalkReport<S>) {
        let mut report = WalkReport::begin(start.clone());
        let span = debug_span!("walk", machine = %self.name, walk_id = %report.id());
        let _entered = span.enter();

        let result = self.walk(ctx, start, data, &mut report);
        (result, report)
    }

    fn walk<R: Recorder<S>>(
        &self,
        ctx: &Context,
        start: S,
        data: D,
        recorder: &mut R,
    ) -> Result<D, ApplyError> {
        let _walk = self.begin_walk();
        let states = self.read();
        let mut state = start;
        let mut data = data;

        loop {
            let Some(transition) = states.get(&state) else {
                debug!(state = ?state, "no transition registered, walk finished");
                recorder.finish(state, || WalkOutcome::Unregistered);
                return Ok(data);
            };

            debug!(state = ?state, steps = transition.steps.len(), "entering state");
            recorder.enter(&state);

            for (index, step) in transition.steps.iter().enumerate() {
                let step_number = index + 1;
                data = match catch(|| step(ctx, data)) {
                    Ok(Ok(next)) => {
                        recorder.step_completed();
                        next
                    }
                    Ok(Err(StepError::EndOfSequence(last))) => {
                        recorder.step_completed();
                        debug!(state = ?state, step = step_number, "end of sequence");
                        recorder.finish(state, || WalkOutcome::EndOfSequence);
                        return Ok(last);
                    }
                    Ok(Err(StepError::Context(err))) => {
                        let err = self.step_failed(&state, step_number, Box::new(err));
                        recorder.finish(state, || failed(&err));
                        return Err(err);
                    }
                    Ok(Err(StepError::Failed(source))) => {
                        let err = self.step_failed(&state, step_number, source);
                        recorder.finish(state, || failed(&err));
                        return Err(err);
                    }
                    Err(source) => {
                        error!(
                            state = ?state,
                            step = step_number,
                            panic = %source.message(),
                            "step panicked"
                        );
                        let err = ApplyError::Panic {
                            state: state.label(),
                            step: step_number,
                            source,
                        };
                        recorder.finish(state, || failed(&err));
                        return Err(err);
                    }
                };
            }

            match &transition.next {
                Next::Terminal => {
                    debug!(state = ?state, "terminal transition, walk finished");
                    recorder.finish(state, || WalkOutcome::Terminal);
                    return Ok(data);
                }
                Next::Continue(next) => state = next.clone(),
            }
        }
    }

    fn step_failed(&self, state: &S, step: usize, source: crate::BoxError) -> ApplyError {
        warn!(state = ?state, step, error = %source, "step failed");
        ApplyError::Step {
            state: state.label(),
            step,
            source,
        }
    }

    /// Number of registered transitions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Whether a transition is registered for `state`.
    pub fn contains(&self, state: &S) -> bool {
        self.read().contains_key(state)
    }

    /// Successor declared by the transition registered for `state`.
    pub fn next_of(&self, state: &S) -> Option<Next<S>> {
        self.read().get(state).map(|t| t.next.clone())
    }
}

/// Marks a walk in flight until dropped.
struct WalkGuard<'a, S, D> {
    machine: &'a StateMachine<S, D>,
}

impl<S, D> Drop for WalkGuard<'_, S, D> {
    fn drop(&mut self) {
        let machine = self.machine;
        let _ = WALKING.try_with(|walking| {
            let mut walking = walking.borrow_mut();
            if let Some(pos) = walking.iter().rposition(|id| *id == machine.id) {
                walking.remove(pos);
            }
        });

        let mut walks = machine.walks.lock().unwrap_or_else(|p| p.into_inner());
        *walks = walks.saturating_sub(1);
        if *walks == 0 {
            machine.idle.notify_all();
        }
    }
}

/// Receives walk progress. `()` discards it.
trait Recorder<S> {
    fn enter(&mut self, state: &S);
    fn step_completed(&mut self);
    fn finish(&mut self, end: S, outcome: impl FnOnce() -> WalkOutcome);
}

impl<S> Recorder<S> for () {
    fn enter(&mut self, _state: &S) {}

    fn step_completed(&mut self) {}

    fn finish(&mut self, _end: S, _outcome: impl FnOnce() -> WalkOutcome) {}
}

impl<S: Clone> Recorder<S> for WalkReport<S> {
    fn enter(&mut self, state: &S) {
        WalkReport::enter(self, state.clone());
    }

    fn step_completed(&mut self) {
        WalkReport::step_completed(self);
    }

    fn finish(&mut self, end: S, outcome: impl FnOnce() -> WalkOutcome) {
        WalkReport::finish(self, end, outcome());
    }
}

/// Registration checks against the current registry (pure).
fn validate<S: State, D>(
    states: &Registry<S, D>,
    transition: &Transition<S, D>,
) -> Result<(), RegistrationError> {
    let previous = &transition.previous;

    if transition.steps.is_empty() {
        return Err(RegistrationError::EmptySteps {
            state: previous.label(),
        });
    }

    if states.contains_key(previous) {
        return Err(RegistrationError::DuplicateState {
            state: previous.label(),
        });
    }

    if let Next::Continue(next) = &transition.next {
        if next == previous {
            return Err(RegistrationError::SelfLoop {
                state: previous.label(),
            });
        }

        let loops_back = states
            .get(next)
            .is_some_and(|existing| existing.next.state() == Some(previous));
        if loops_back {
            return Err(RegistrationError::DirectLoop {
                from: previous.label(),
                to: next.label(),
            });
        }
    }

    Ok(())
}

fn failed(err: &ApplyError) -> WalkOutcome {
    WalkOutcome::Failed {
        message: err.to_string(),
    }
}

impl<S: State, D> Default for StateMachine<S, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, D> fmt::Debug for StateMachine<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("name", &self.name)
            .field("transitions", &self.len())
            .finish()
    }
}
