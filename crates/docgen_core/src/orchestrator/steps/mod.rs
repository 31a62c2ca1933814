//! Pipeline step implementations.
//!
//! Each step handles one phase of a batch.

mod cleanup;
mod convert;
mod merge;
mod render;

pub use cleanup::CleanupStep;
pub use convert::ConvertStep;
pub use merge::MergeStep;
pub use render::RenderStep;
