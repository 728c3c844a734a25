//! CLI command implementations

pub mod predict;
pub mod session;
pub mod status;
