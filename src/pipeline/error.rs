//! Pipeline error types.

use crate::recovery::PanicError;
use crate::BoxError;
use thiserror::Error;

/// Errors raised while executing a pipeline. `step` is 1-based.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("panic on step #{step}: {source}")]
    Panic { step: usize, source: PanicError },

    #[error("fail on step #{step}: {source}")]
    Failed { step: usize, source: BoxError },
}

impl PipelineError {
    /// 1-based index of the step that stopped the pipeline.
    pub fn step(&self) -> usize {
        match self {
            Self::Panic { step, .. } | Self::Failed { step, .. } => *step,
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic { .. })
    }
}
