//! Outcome shaping and the typed errors surfaced to the CLI.

pub(crate) mod errors;
pub(crate) mod outcome;
