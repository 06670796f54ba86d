//! Background helpers built on the recovery primitive.

use super::{catch, PanicError};
use crate::core::Context;
use crate::BoxError;
use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::warn;

/// A fallible unit of work for [`run_group`].
pub type Task<'a> = Box<dyn FnOnce(&Context) -> Result<(), BoxError> + Send + 'a>;

/// Failure of one task in a group.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task #{index} panicked: {source}")]
    Panic { index: usize, source: PanicError },

    #[error("task #{index} failed: {source}")]
    Failed { index: usize, source: BoxError },

    #[error("task #{index} could not be spawned: {source}")]
    Spawn { index: usize, source: io::Error },
}

impl TaskError {
    /// Position of the task in the submitted list.
    pub fn index(&self) -> usize {
        match self {
            Self::Panic { index, .. } | Self::Failed { index, .. } | Self::Spawn { index, .. } => {
                *index
            }
        }
    }
}

/// Run `operation` on a new thread without waiting for it.
///
/// A panic in the operation is handed to `on_panic` instead of tearing the
/// thread down silently. The returned handle may be dropped.
pub fn spawn_recovered<F, E>(operation: F, on_panic: E) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
    E: FnOnce(PanicError) + Send + 'static,
{
    thread::Builder::new()
        .name("statewalk-task".to_string())
        .spawn(move || {
            if let Err(err) = catch(operation) {
                warn!(panic = %err.message(), "background task panicked");
                if let Err(nested) = catch(|| on_panic(err)) {
                    warn!(panic = %nested.message(), "panic handler panicked");
                }
            }
        })
}

/// Run every task concurrently and wait for all of them.
///
/// Returns one error per task that failed or panicked, in completion order.
/// An empty vector means every task succeeded.
///
/// # Example
///
/// ```rust
/// use statewalk::core::Context;
/// use statewalk::recovery::{run_group, Task};
/// use statewalk::BoxError;
///
/// let tasks: Vec<Task> = vec![
///     Box::new(|_ctx: &Context| -> Result<(), BoxError> { Ok(()) }),
///     Box::new(|_ctx: &Context| -> Result<(), BoxError> { Err("unreachable host".into()) }),
///     Box::new(|_ctx: &Context| panic!("bad state")),
/// ];
///
/// let mut failed: Vec<usize> = run_group(&Context::background(), tasks)
///     .iter()
///     .map(|err| err.index())
///     .collect();
/// failed.sort();
/// assert_eq!(failed, vec![1, 2]);
/// ```
pub fn run_group(ctx: &Context, tasks: Vec<Task<'_>>) -> Vec<TaskError> {
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for (index, task) in tasks.into_iter().enumerate() {
            let worker_tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("statewalk-group-{index}"))
                .spawn_scoped(scope, move || {
                    let failure = match catch(|| task(ctx)) {
                        Ok(Ok(())) => None,
                        Ok(Err(source)) => Some(TaskError::Failed { index, source }),
                        Err(source) => Some(TaskError::Panic { index, source }),
                    };
                    if let Some(failure) = failure {
                        let _ = worker_tx.send(failure);
                    }
                });
            if let Err(source) = spawned {
                let _ = tx.send(TaskError::Spawn { index, source });
            }
        }
    });
    drop(tx);

    rx.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn spawn_recovered_reports_panics() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_recovered(|| panic!("worker died"), move |err| {
            let _ = tx.send(err.message().to_string());
        })
        .unwrap();

        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap(), "worker died");
    }

    #[test]
    fn spawn_recovered_skips_handler_on_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let ran = Arc::clone(&calls);
        let handled = Arc::new(AtomicUsize::new(0));
        let handler_calls = Arc::clone(&handled);

        spawn_recovered(
            move || {
                ran.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                handler_calls.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap()
        .join()
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handled.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn run_group_succeeds_when_all_tasks_succeed() {
        let counter = AtomicUsize::new(0);
        let mut tasks: Vec<Task> = Vec::new();
        for _ in 0..4 {
            tasks.push(Box::new(|_ctx: &Context| -> Result<(), BoxError> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        let errors = run_group(&Context::background(), tasks);
        assert!(errors.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn run_group_collects_failures_and_panics() {
        let tasks: Vec<Task> = vec![
            Box::new(|_ctx: &Context| -> Result<(), BoxError> { Err("first failed".into()) }),
            Box::new(|_ctx: &Context| -> Result<(), BoxError> { Ok(()) }),
            Box::new(|_ctx: &Context| panic!("third panicked")),
        ];

        let mut errors = run_group(&Context::background(), tasks);
        errors.sort_by_key(TaskError::index);

        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], TaskError::Failed { index: 0, .. }));
        assert_eq!(errors[0].to_string(), "task #0 failed: first failed");
        assert!(matches!(errors[1], TaskError::Panic { index: 2, .. }));
        assert!(errors[1].to_string().contains("third panicked"));
    }

    #[test]
    fn run_group_shares_the_context() {
        let ctx = Context::background();
        ctx.cancel();
        let tasks: Vec<Task> = vec![Box::new(|ctx: &Context| -> Result<(), BoxError> {
            ctx.check()?;
            Ok(())
        })];

        let errors = run_group(&ctx, tasks);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "task #0 failed: context cancelled");
    }
}
