//! Orchestrator: wires a source and stages into one running pipeline.
//!
//! One tokio task per source/stage, coordinated only through conduits and
//! the shared cancellation token. Data flows strictly left to right; the
//! first error anywhere cancels every sibling and becomes the terminal
//! error of the invocation.

pub(crate) mod group;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::PipelineError;
use crate::source::Source;
use crate::stage::Stage;

use group::UnitGroup;

/// Run a pipeline to completion.
///
/// Spawns one execution unit per source/stage, drains the final stage's
/// output, waits for every unit to terminate, and returns the terminal
/// error: `Ok(())` when every unit completed cleanly, otherwise the first
/// error observed (a user error, or [`PipelineError::Canceled`] when
/// `shutdown` fired while a unit was parked on a conduit).
///
/// Cancellation is cooperative: a unit reacts at its next conduit send or
/// receive, so the invocation returns promptly even when user code is
/// mid-computation. No retry anywhere; any error is fatal to the whole
/// invocation.
pub async fn run<T>(
    shutdown: CancellationToken,
    source: Source<T>,
    stages: impl IntoIterator<Item = Stage<T>>,
) -> Result<(), PipelineError>
where
    T: Send + 'static,
{
    let mut group = UnitGroup::new(&shutdown);

    let mut next = source.spawn(&mut group);
    let mut units = 1usize;
    for stage in stages {
        next = stage.spawn(&mut group, next);
        units += 1;
    }
    debug!(units, "pipeline units spawned");

    // Drain the final conduit. Without a reader of last resort the final
    // stage would park forever on a send, and back-pressure would freeze
    // everything upstream of it.
    while next.recv().await.is_some() {}

    group.wait().await
}

/// Builder over [`run`] for assembling a pipeline stage by stage.
pub struct Pipeline<T> {
    source: Source<T>,
    stages: Vec<Stage<T>>,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Start a pipeline from a source.
    pub fn new(source: Source<T>) -> Self {
        Self {
            source,
            stages: Vec::new(),
        }
    }

    /// Append a stage to the chain.
    pub fn stage(mut self, stage: Stage<T>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Run the assembled pipeline. See [`run`].
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), PipelineError> {
        run(shutdown, self.source, self.stages).await
    }
}
