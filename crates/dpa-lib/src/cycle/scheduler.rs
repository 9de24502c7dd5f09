//! Cycle scheduling loop
//!
//! Triggers one cycle per registered target on a fixed cadence. Cycles
//! for different targets run concurrently; a tick never starts while the
//! previous one is still running, so one target never has two cycles in
//! flight.

use super::registry::TargetRegistry;
use super::runner::CycleRunner;
use crate::models::{CycleReport, Target};
use crate::observability::StructuredLogger;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default cadence between cycles of one target
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for the cycle scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub poll_interval: Duration,
    /// Capacity of the report channel
    pub report_buffer: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            report_buffer: 100,
        }
    }
}

/// Drives the cycle runner for every registered target
pub struct CycleScheduler {
    runner: Arc<CycleRunner>,
    registry: Arc<TargetRegistry>,
    config: SchedulerConfig,
    report_tx: mpsc::Sender<CycleReport>,
    logger: StructuredLogger,
}

impl CycleScheduler {
    pub fn new(
        runner: Arc<CycleRunner>,
        registry: Arc<TargetRegistry>,
        config: SchedulerConfig,
    ) -> (Self, mpsc::Receiver<CycleReport>) {
        let (tx, rx) = mpsc::channel(config.report_buffer.max(1));
        let scheduler = Self {
            runner,
            registry,
            config,
            report_tx: tx,
            logger: StructuredLogger::new("dpa-controller"),
        };
        (scheduler, rx)
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn runner(&self) -> &Arc<CycleRunner> {
        &self.runner
    }

    pub fn registry(&self) -> &Arc<TargetRegistry> {
        &self.registry
    }

    /// Run the scheduling loop until shutdown
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            targets = self.registry.len(),
            "Starting cycle scheduler"
        );

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_all().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down cycle scheduler");
                    break;
                }
            }
        }
    }

    /// Run one cycle for every registered target and publish the reports.
    ///
    /// Returns the number of reports produced.
    pub async fn run_all(&self) -> usize {
        let targets = self.registry.list();
        if targets.is_empty() {
            debug!("No targets registered, nothing to do");
            return 0;
        }

        let mut cycles = JoinSet::new();
        for target in targets {
            let runner = Arc::clone(&self.runner);
            let registry = Arc::clone(&self.registry);
            cycles.spawn(async move { run_target(&runner, &registry, &target).await });
        }

        let mut produced = 0;
        while let Some(joined) = cycles.join_next().await {
            match joined {
                Ok(report) => {
                    produced += 1;
                    if self.report_tx.send(report).await.is_err() {
                        debug!("Report receiver dropped");
                    }
                }
                Err(e) => warn!(error = %e, "Cycle task failed"),
            }
        }
        produced
    }

    /// Stop monitoring a target, drop its history and its metric series
    pub fn remove_target(&self, key: &str) -> bool {
        let removed = self.registry.unregister(key).is_some();
        let evicted = self.runner.history().evict(key);
        self.runner.metrics().forget_target(key);
        if removed {
            self.logger.log_target_removed(key, evicted);
        }
        removed
    }
}

async fn run_target(runner: &CycleRunner, registry: &TargetRegistry, target: &Target) -> CycleReport {
    let mut report = runner.run(target).await;
    if let Some(replicas) = registry.apply_report(&mut report) {
        debug!(target_key = %report.target, replicas = replicas, "Applied replica target");
    }
    report
}
