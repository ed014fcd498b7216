//! Source adapter: lifts a producing function into the first pipeline unit.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::debug;

use crate::conduit::{conduit, Emitter};
use crate::error::{BoxedError, PipelineError};
use crate::pipeline::group::UnitGroup;

/// Future type returned by producing functions.
type ProduceFuture = Pin<Box<dyn Future<Output = Result<(), BoxedError>> + Send>>;

/// A producer of pipeline items.
///
/// Pure adapter: nothing runs until the pipeline runs. The producing
/// function is invoked exactly once with the `put` callback for the
/// source's output conduit; each `put` suspends until the downstream unit
/// takes the item or the pipeline is canceled.
pub struct Source<T> {
    produce: Box<dyn FnOnce(Emitter<T>) -> ProduceFuture + Send>,
}

impl<T: Send + 'static> Source<T> {
    /// Lift a producing function into a source.
    pub fn new<F, Fut>(produce: F) -> Self
    where
        F: FnOnce(Emitter<T>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), BoxedError>> + Send + 'static,
    {
        Self {
            produce: Box::new(move |put| Box::pin(produce(put))),
        }
    }

    /// Spawn this source's execution unit and return its output conduit.
    pub(crate) fn spawn(self, group: &mut UnitGroup) -> mpsc::Receiver<T> {
        let (put, rx) = conduit(group.token());
        group.spawn(async move {
            // The emitter moves into this task as the conduit's only
            // writer; dropping it on any exit path closes the conduit for
            // the downstream unit.
            match (self.produce)(put).await {
                Ok(()) => Ok(()),
                Err(err) => {
                    debug!(error = %err, "source unit failed");
                    Err(PipelineError::from_source(err))
                }
            }
        });
        rx
    }
}
