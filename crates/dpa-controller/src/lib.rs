//! Dynamic pod autoscaler controller
//!
//! Configuration loading and the HTTP API served next to the cycle
//! scheduler. The `dpa-controller` binary wires both to `dpa-lib`.

pub mod api;
pub mod config;

pub use config::{ControllerConfig, TargetConfig};
