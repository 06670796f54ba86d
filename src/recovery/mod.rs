//! Panic recovery primitive.
//!
//! Every user callback in this crate runs through [`catch`], which turns a
//! panic into a [`PanicError`] carrying the payload text and a trace of the
//! frames that led to it. The panicking thread keeps running.
//!
//! # Example
//!
//! ```rust
//! use statewalk::recovery::recover;
//!
//! let err = recover(|| panic!("disk on fire")).unwrap_err();
//! assert_eq!(err.message(), "disk on fire");
//! assert!(err.to_string().starts_with("panic=disk on fire trace="));
//! ```

mod error;
mod spawn;
pub mod trace;

pub use error::PanicError;
pub use spawn::{run_group, spawn_recovered, Task, TaskError};

use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Run `operation`, converting a panic into a [`PanicError`].
///
/// The operation's return value is passed through on success.
pub fn catch<T, F>(operation: F) -> Result<T, PanicError>
where
    F: FnOnce() -> T,
{
    let scope = trace::CaptureScope::enter();
    // The operation is discarded on panic, so no broken invariant escapes.
    let result = panic::catch_unwind(AssertUnwindSafe(operation));

    match result {
        Ok(value) => Ok(value),
        Err(payload) => {
            let message = error::payload_message(payload.as_ref());
            let (location, trace) = trace::render(scope.take());
            debug!(panic = %message, location = ?location, "recovered from panic");
            Err(PanicError::new(message, location, trace))
        }
    }
}

/// Run a side-effecting `operation` under [`catch`].
///
/// Results flow out through variables captured by the closure.
pub fn recover<F>(operation: F) -> Result<(), PanicError>
where
    F: FnOnce(),
{
    catch(operation)
}

type Handler<'a> = Box<dyn FnOnce(PanicError) + 'a>;
type Cleanup<'a> = Box<dyn FnOnce() + 'a>;

/// Try / catch / finally over panics.
///
/// The body runs under [`catch`]. If it panics, the catch handler receives
/// the [`PanicError`]. The finally block always runs last. Handlers are
/// recovered as well; a panic inside one is logged and dropped.
///
/// # Example
///
/// ```rust
/// use statewalk::recovery::Try;
/// use std::cell::RefCell;
///
/// let log = RefCell::new(Vec::new());
/// Try::new(|| panic!("1"))
///     .catch(|err| log.borrow_mut().push(format!("{}+catch", err.message())))
///     .finally(|| log.borrow_mut().push("finally".to_string()))
///     .run();
///
/// assert_eq!(log.into_inner(), vec!["1+catch", "finally"]);
/// ```
pub struct Try<'a> {
    body: Cleanup<'a>,
    handler: Option<Handler<'a>>,
    cleanup: Option<Cleanup<'a>>,
}

impl<'a> Try<'a> {
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() + 'a,
    {
        Self {
            body: Box::new(body),
            handler: None,
            cleanup: None,
        }
    }

    /// Handle a panic raised by the body.
    pub fn catch<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(PanicError) + 'a,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    /// Run after the body and any handler, whatever happened.
    pub fn finally<F>(mut self, cleanup: F) -> Self
    where
        F: FnOnce() + 'a,
    {
        self.cleanup = Some(Box::new(cleanup));
        self
    }

    /// Execute the chain. Returns `true` if the body completed normally.
    pub fn run(self) -> bool {
        let completed = match recover(self.body) {
            Ok(()) => true,
            Err(err) => {
                if let Some(handler) = self.handler {
                    if let Err(nested) = recover(|| handler(err)) {
                        warn!(panic = %nested.message(), "catch handler panicked");
                    }
                }
                false
            }
        };

        if let Some(cleanup) = self.cleanup {
            if let Err(nested) = recover(cleanup) {
                warn!(panic = %nested.message(), "finally block panicked");
            }
        }
        completed
    }
}
