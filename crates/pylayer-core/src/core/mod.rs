//! Internal implementation modules for `pylayer-core`.
//!
//! Callers should go through the re-exports in the crate root rather than
//! importing these modules directly.

pub mod aws;
pub mod config;
pub(crate) mod fs;
pub mod layer;
pub mod runtime;
pub mod tooling;
