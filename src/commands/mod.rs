//! CLI command implementations.

pub mod status;
pub mod update;
