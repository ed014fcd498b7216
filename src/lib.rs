//! sluice: a small concurrent pipeline runtime.
//!
//! This library composes a producing function (the source) and an ordered
//! chain of transform functions (the stages) into a running concurrent
//! computation. Each source or stage runs as its own tokio task, adjacent
//! tasks hand items over a minimal-capacity channel (so a slow consumer
//! throttles every producer upstream of it), and the first error raised
//! anywhere in the chain cancels a shared token that unwinds the whole
//! pipeline without leaking a blocked task.
//!
//! # Example
//!
//! ```
//! use sluice::{run, Source, Stage};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sluice::PipelineError> {
//!     run(
//!         CancellationToken::new(),
//!         Source::new(|put| async move {
//!             put.put("pipe".to_string()).await?;
//!             put.put("line".to_string()).await?;
//!             Ok(())
//!         }),
//!         vec![
//!             Stage::new(|item: String| async move { Ok(item.to_uppercase()) }),
//!             Stage::new(|item: String| async move {
//!                 println!("{item}");
//!                 Ok(item)
//!             }),
//!         ],
//!     )
//!     .await
//! }
//! ```

pub mod conduit;
pub mod error;
pub mod pipeline;
pub mod source;
pub mod stage;

// Re-export main types
pub use conduit::Emitter;
pub use error::{BoxedError, PipelineError};
pub use pipeline::{run, Pipeline};
pub use source::Source;
pub use stage::Stage;
