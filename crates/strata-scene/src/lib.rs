//! Scene block wire format and the pull-based build protocol.
//!
//! Layer builders expose a [`TaskCursor`]: a lazy, finite sequence of build
//! tasks, each producing one serializable block. [`run_pass`] drives a cursor
//! to completion, polling cancellation between tasks and isolating failures
//! to the task that raised them.

mod block;
mod context;
mod error;
mod grid;
mod task;

pub use block::{
    BlockKind, BlockOutput, ClippedGeometry, DemBlock, FeatureBlock, MaterialBlock, MaterialRef,
    SidesRef, write_block,
};
pub use context::{BuildContext, ProgressFn};
pub use error::BuildError;
pub use grid::{GridData, GridPayload, encode_grid};
pub use task::{PassReport, TaskCursor, run_pass};
