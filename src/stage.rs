//! Stage adapter: lifts a transform function into a pipeline unit.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tracing::debug;

use crate::conduit::conduit;
use crate::error::{BoxedError, PipelineError};
use crate::pipeline::group::UnitGroup;

/// Future type returned by transform functions.
type ApplyFuture<T> = Pin<Box<dyn Future<Output = Result<T, BoxedError>> + Send>>;

/// A transformation over pipeline items.
///
/// Pure adapter: nothing runs until the pipeline runs. The spawned unit
/// processes strictly one item at a time, so items leave a stage in the
/// order they entered it. The last stage of a pipeline is typically a sink
/// whose output is ignored; the orchestrator drains it.
pub struct Stage<T> {
    apply: Box<dyn FnMut(T) -> ApplyFuture<T> + Send>,
}

impl<T: Send + 'static> Stage<T> {
    /// Lift a transform function into a stage.
    pub fn new<F, Fut>(mut apply: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, BoxedError>> + Send + 'static,
    {
        Self {
            apply: Box::new(move |item| Box::pin(apply(item))),
        }
    }

    /// Spawn this stage's execution unit, consuming the upstream conduit
    /// and returning the downstream one.
    ///
    /// The unit exits when the upstream conduit closes, when the transform
    /// fails (the failed item is not forwarded and no further input is
    /// read), or when the pipeline is canceled while forwarding.
    pub(crate) fn spawn(
        mut self,
        group: &mut UnitGroup,
        mut input: mpsc::Receiver<T>,
    ) -> mpsc::Receiver<T> {
        let (output, rx) = conduit(group.token());
        group.spawn(async move {
            while let Some(item) = input.recv().await {
                let transformed = match (self.apply)(item).await {
                    Ok(transformed) => transformed,
                    Err(err) => {
                        debug!(error = %err, "stage unit failed");
                        return Err(PipelineError::from_stage(err));
                    }
                };
                output.put(transformed).await?;
            }
            Ok(())
        });
        rx
    }
}
