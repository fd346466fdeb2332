//! Process execution and the side-effect seam used by the layer workflow.

pub mod effects;
pub mod process;
