//! Error types for sluice using snafu.
//!
//! One pipeline invocation returns exactly one terminal error: the first
//! user error raised by a source or stage function, or the cancellation
//! error when a unit was parked on a conduit at the moment the shared
//! signal fired.

use snafu::prelude::*;

/// Boxed error returned by user-supplied source and stage functions.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can terminate a pipeline invocation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PipelineError {
    /// The shared cancellation signal fired while a unit was parked on a
    /// conduit send or receive.
    #[snafu(display("pipeline canceled"))]
    Canceled,

    /// A source function failed while producing items.
    #[snafu(display("source failed: {source}"))]
    Source { source: BoxedError },

    /// A stage transform failed.
    #[snafu(display("stage failed: {source}"))]
    Stage { source: BoxedError },
}

impl PipelineError {
    /// Classify a source function's boxed error.
    ///
    /// A producing function that stops because `put` failed returns the
    /// runtime's own error; unwrap it instead of double-wrapping so an
    /// externally canceled pipeline reports `Canceled`, not a user error.
    pub(crate) fn from_source(err: BoxedError) -> Self {
        match err.downcast::<PipelineError>() {
            Ok(inner) => *inner,
            Err(err) => PipelineError::Source { source: err },
        }
    }

    /// Classify a stage transform's boxed error. See [`Self::from_source`].
    pub(crate) fn from_stage(err: BoxedError) -> Self {
        match err.downcast::<PipelineError>() {
            Ok(inner) => *inner,
            Err(err) => PipelineError::Stage { source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxed_cancellation_passes_through() {
        let err = PipelineError::from_source(Box::new(PipelineError::Canceled));
        assert!(matches!(err, PipelineError::Canceled));
    }

    #[test]
    fn foreign_error_wraps_as_source() {
        let err = PipelineError::from_source("boom".into());
        assert!(matches!(err, PipelineError::Source { .. }));
        assert_eq!(err.to_string(), "source failed: boom");
    }

    #[test]
    fn foreign_error_wraps_as_stage() {
        let err = PipelineError::from_stage("boom".into());
        assert!(matches!(err, PipelineError::Stage { .. }));
        assert_eq!(err.to_string(), "stage failed: boom");
    }
}
