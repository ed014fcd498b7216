//! The handoff channel between adjacent execution units.
//!
//! Each conduit has exactly one writer (an [`Emitter`]) and one reader for
//! its whole lifetime. The channel holds a single item: a send parks until
//! the reader has drained the slot, so a slow downstream unit throttles all
//! upstream units transitively. The conduit closes when its emitter drops,
//! which happens exactly once, on every exit path of the owning unit.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{CanceledSnafu, PipelineError};

/// Smallest handoff tokio offers; one item of slack per hop.
const HANDOFF_CAPACITY: usize = 1;

/// Create a conduit bound to the shared cancellation signal.
pub(crate) fn conduit<T>(shutdown: &CancellationToken) -> (Emitter<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel(HANDOFF_CAPACITY);
    (
        Emitter {
            tx,
            shutdown: shutdown.clone(),
        },
        rx,
    )
}

/// Writer half of a conduit.
///
/// Source functions receive one of these as their `put` callback; stage
/// units use one internally to forward transformed items downstream.
pub struct Emitter<T> {
    tx: mpsc::Sender<T>,
    shutdown: CancellationToken,
}

impl<T> Emitter<T> {
    /// Hand one item to the downstream unit.
    ///
    /// Suspends until the downstream is ready or the cancellation signal
    /// fires, whichever happens first, and fails with
    /// [`PipelineError::Canceled`] once the signal has fired. A reader that
    /// is gone means a sibling unit failed; that failure is reported here
    /// as cancellation only after the sibling's error has canceled the
    /// pipeline.
    pub async fn put(&self, item: T) -> Result<(), PipelineError> {
        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => CanceledSnafu.fail(),
            sent = self.tx.send(item) => match sent {
                Ok(()) => Ok(()),
                Err(_) => {
                    // A dropped reader means a sibling unit failed, and its
                    // error is latched before the token cancels. Reporting
                    // cancellation only once the signal has fired keeps
                    // this outcome from racing ahead of that error.
                    self.shutdown.cancelled().await;
                    CanceledSnafu.fail()
                }
            },
        }
    }

    /// True once the pipeline's cancellation signal has fired.
    ///
    /// Producing functions doing long-running work between puts can poll
    /// this to stop early.
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Suspends until the pipeline's cancellation signal fires.
    pub async fn cancelled(&self) {
        self.shutdown.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn put_delivers_in_order() {
        let token = CancellationToken::new();
        let (put, mut rx) = conduit(&token);

        put.put(1).await.unwrap();
        assert_eq!(rx.recv().await, Some(1));

        put.put(2).await.unwrap();
        drop(put);
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn put_fails_once_canceled() {
        let token = CancellationToken::new();
        let (put, _rx) = conduit(&token);

        token.cancel();
        let err = put.put(1).await.unwrap_err();
        assert!(matches!(err, PipelineError::Canceled));
    }

    #[tokio::test]
    async fn put_with_reader_gone_fails_only_after_cancel() {
        let token = CancellationToken::new();
        let (put, rx) = conduit::<u32>(&token);
        drop(rx);

        let send = put.put(1);
        tokio::pin!(send);

        // The reader-gone outcome is held back until the signal fires.
        let parked = tokio::time::timeout(Duration::from_millis(50), &mut send).await;
        assert!(parked.is_err());

        token.cancel();
        let err = send.await.unwrap_err();
        assert!(matches!(err, PipelineError::Canceled));
    }

    #[tokio::test]
    async fn emitter_observes_cancellation() {
        let token = CancellationToken::new();
        let (put, _rx) = conduit::<u32>(&token);

        assert!(!put.is_cancelled());
        token.cancel();
        assert!(put.is_cancelled());
        put.cancelled().await;
    }
}
