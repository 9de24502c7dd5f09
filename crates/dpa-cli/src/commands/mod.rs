//! CLI command implementations

pub mod calibrate;
pub mod plan;
pub mod targets;
