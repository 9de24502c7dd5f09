//! Cycle orchestration
//!
//! Glue between the sample source, the history store, the forecaster and
//! the scaling policy, plus the registry of monitored targets and the
//! loop that triggers cycles.

mod registry;
mod runner;
mod scheduler;

#[cfg(test)]
mod tests;

pub use registry::{TargetRegistry, TargetStatus, TargetSummary};
pub use runner::{CycleRunner, DEFAULT_SAMPLE_TIMEOUT};
pub use scheduler::{CycleScheduler, SchedulerConfig, DEFAULT_POLL_INTERVAL};
