//! Ordered step pipelines.
//!
//! A [`Pipeline`] threads one value through a list of transform steps,
//! stopping at the first step that fails or panics. Errors name the
//! 1-based index of the offending step.

mod error;

pub use error::PipelineError;

use crate::recovery::catch;
use crate::BoxError;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A single transform in a pipeline.
pub type PipelineStep<V> = Arc<dyn Fn(V) -> Result<V, BoxError> + Send + Sync>;

/// Append-only list of transform steps over a value of type `V`.
///
/// A pipeline can be executed any number of times; each run starts from
/// the value passed to [`Pipeline::exec`].
///
/// # Example
///
/// ```rust
/// use statewalk::pipeline::Pipeline;
///
/// let mut pipeline = Pipeline::new();
/// pipeline.add(|s: String| Ok(s + "a"));
/// pipeline.add(|s: String| Ok(s + "b"));
///
/// assert_eq!(pipeline.exec("123".to_string()).unwrap(), "123ab");
/// ```
pub struct Pipeline<V> {
    steps: Vec<PipelineStep<V>>,
}

impl<V> Pipeline<V> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step. Steps run in the order they were added.
    pub fn add<F>(&mut self, step: F) -> &mut Self
    where
        F: Fn(V) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        self.steps.push(Arc::new(step));
        self
    }

    /// Builder-style variant of [`Pipeline::add`].
    pub fn then<F>(mut self, step: F) -> Self
    where
        F: Fn(V) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        self.add(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, feeding each the previous step's output.
    ///
    /// Stops at the first step that returns an error or panics. An empty
    /// pipeline returns its input unchanged.
    pub fn exec(&self, value: V) -> Result<V, PipelineError> {
        let mut value = value;
        for (index, step) in self.steps.iter().enumerate() {
            let step_number = index + 1;
            value = match catch(|| step(value)) {
                Ok(Ok(next)) => next,
                Ok(Err(source)) => {
                    warn!(step = step_number, error = %source, "pipeline step failed");
                    return Err(PipelineError::Failed {
                        step: step_number,
                        source,
                    });
                }
                Err(source) => {
                    warn!(step = step_number, panic = %source.message(), "pipeline step panicked");
                    return Err(PipelineError::Panic {
                        step: step_number,
                        source,
                    });
                }
            };
        }
        debug!(steps = self.steps.len(), "pipeline completed");
        Ok(value)
    }
}

impl<V> Default for Pipeline<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Pipeline<V> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<V> fmt::Debug for Pipeline<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn suffix(pipeline: &mut Pipeline<String>) {
        pipeline.add(|s: String| Ok(s + "a"));
        pipeline.add(|s: String| Ok(s + "b"));
    }

    #[test]
    fn exec_runs_steps_in_order() {
        let mut pipeline = Pipeline::new();
        suffix(&mut pipeline);
        assert_eq!(pipeline.exec("123".to_string()).unwrap(), "123ab");
    }

    #[test]
    fn empty_pipeline_returns_input() {
        let pipeline: Pipeline<u32> = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.exec(5).unwrap(), 5);
    }

    #[test]
    fn failure_names_the_step() {
        let mut pipeline = Pipeline::new();
        suffix(&mut pipeline);
        pipeline.add(|s: String| match s.as_str() {
            "000ab" => Err("1".into()),
            "111ab" => panic!("0"),
            _ => Ok(s),
        });

        let err = pipeline.exec("000".to_string()).unwrap_err();
        assert_eq!(err.step(), 3);
        assert!(!err.is_panic());
        assert_eq!(err.to_string(), "fail on step #3: 1");

        let err = pipeline.exec("111".to_string()).unwrap_err();
        assert_eq!(err.step(), 3);
        assert!(err.is_panic());
        assert!(err.to_string().starts_with("panic on step #3: panic=0 trace="));

        assert_eq!(pipeline.exec("222".to_string()).unwrap(), "222ab");
    }

    #[test]
    fn later_steps_do_not_run_after_failure() {
        let third_calls = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&third_calls);

        let pipeline = Pipeline::new()
            .then(|n: i32| Ok(n + 1))
            .then(|_n: i32| Err("step two broke".into()))
            .then(move |n: i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            });

        let err = pipeline.exec(0).unwrap_err();
        assert!(err.to_string().contains("step #2"));
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn later_steps_do_not_run_after_panic() {
        let third_calls = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&third_calls);

        let pipeline = Pipeline::new()
            .then(|n: i32| Ok(n + 1))
            .then(|n: i32| -> Result<i32, BoxError> { panic!("step two exploded at {n}") })
            .then(move |n: i32| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(n)
            });

        let err = pipeline.exec(0).unwrap_err();
        assert!(err.is_panic());
        assert_eq!(err.step(), 2);
        assert!(err
            .to_string()
            .starts_with("panic on step #2: panic=step two exploded at 1 trace="));
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pipeline_is_reusable() {
        let pipeline = Pipeline::new().then(|n: u64| Ok(n * 2)).then(|n: u64| Ok(n + 1));
        assert_eq!(pipeline.exec(1).unwrap(), 3);
        assert_eq!(pipeline.exec(10).unwrap(), 21);
        assert_eq!(pipeline.clone().exec(0).unwrap(), 1);
        assert_eq!(pipeline.len(), 2);
    }
}
