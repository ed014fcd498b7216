//! Execution unit group: shared cancellation plus a first-error latch.
//!
//! The coordination point between error propagation and liveness. Every
//! unit of one pipeline invocation is spawned here; the first unit to fail
//! latches its error and cancels the shared token, which unblocks every
//! sibling parked on a conduit, and the group converges instead of
//! deadlocking.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;

pub(crate) struct UnitGroup {
    units: JoinSet<()>,
    shutdown: CancellationToken,
    first_err: Arc<OnceLock<PipelineError>>,
}

impl UnitGroup {
    /// Derive a group from the caller's token.
    ///
    /// The group owns a child token: external cancellation flows in, but an
    /// internal first-error cancel never touches the caller's token.
    pub(crate) fn new(shutdown: &CancellationToken) -> Self {
        Self {
            units: JoinSet::new(),
            shutdown: shutdown.child_token(),
            first_err: Arc::new(OnceLock::new()),
        }
    }

    /// The shared cancellation signal observed by every unit.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Spawn one execution unit.
    ///
    /// A failing unit latches its error before it cancels the shared token,
    /// so the triggering error, not a cancellation error from an unwinding
    /// sibling, is the one surfaced by [`Self::wait`]. Siblings parked on a
    /// conduit unblock as soon as the token is canceled, without waiting
    /// for any join.
    pub(crate) fn spawn<F>(&mut self, unit: F)
    where
        F: Future<Output = Result<(), PipelineError>> + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let first_err = Arc::clone(&self.first_err);
        self.units.spawn(async move {
            if let Err(err) = unit.await {
                let _ = first_err.set(err);
                shutdown.cancel();
            }
        });
    }

    /// Wait for every unit to terminate and surface the latched error.
    ///
    /// Units that lose the latch race still terminate, but their error
    /// values are discarded. Which error wins among simultaneous failures
    /// is not guaranteed. A panicking unit resumes unwinding here.
    pub(crate) async fn wait(mut self) -> Result<(), PipelineError> {
        while let Some(joined) = self.units.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    // A panic skips the latch-and-cancel wrapper above;
                    // cancel here so no sibling stays parked on the signal
                    // while the panic unwinds through the waiter.
                    self.shutdown.cancel();
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }

        // Every unit has terminated and dropped its handle on the latch.
        match Arc::try_unwrap(self.first_err).map(OnceLock::into_inner) {
            Ok(Some(err)) => Err(err),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CanceledSnafu;

    #[tokio::test]
    async fn wait_succeeds_when_all_units_succeed() {
        let mut group = UnitGroup::new(&CancellationToken::new());
        group.spawn(async { Ok(()) });
        group.spawn(async { Ok(()) });
        assert!(group.wait().await.is_ok());
    }

    #[tokio::test]
    async fn first_error_cancels_group_token() {
        let mut group = UnitGroup::new(&CancellationToken::new());
        let token = group.token().clone();

        group.spawn(async { CanceledSnafu.fail() });
        group.spawn(async move {
            // Terminates only because the failing sibling cancels the token.
            token.cancelled().await;
            Ok(())
        });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, PipelineError::Canceled));
    }

    #[tokio::test]
    async fn internal_failure_does_not_cancel_caller_token() {
        let caller = CancellationToken::new();
        let mut group = UnitGroup::new(&caller);

        group.spawn(async { CanceledSnafu.fail() });
        let _ = group.wait().await;

        assert!(!caller.is_cancelled());
    }

    #[tokio::test]
    async fn triggering_error_beats_cancellation_errors() {
        let mut group = UnitGroup::new(&CancellationToken::new());
        let token = group.token().clone();

        group.spawn(async { Err(PipelineError::from_stage("boom".into())) });
        group.spawn(async move {
            // Fails with the cancellation error after the sibling's failure
            // has already been latched.
            token.cancelled().await;
            CanceledSnafu.fail()
        });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, PipelineError::Stage { .. }));
    }

    #[tokio::test]
    async fn surfaces_exactly_one_error() {
        let mut group = UnitGroup::new(&CancellationToken::new());
        group.spawn(async { Err(PipelineError::from_stage("first".into())) });
        group.spawn(async { Err(PipelineError::from_stage("second".into())) });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, PipelineError::Stage { .. }));
    }
}
