//! One scaling cycle for one target
//!
//! `Idle -> Sampled -> Forecasted -> Capacitated -> Decided`. The history
//! window is updated before the oracle is asked anything, so a failure
//! further down never leaves a half-applied observation behind.

use crate::error::CycleError;
use crate::history::HistoryStore;
use crate::models::{CyclePhase, CycleReport, Target};
use crate::observability::ControllerMetrics;
use crate::predictor::ForecastClient;
use crate::scaling::{max_throughput_per_pod, ScalingPolicy};
use crate::source::SampleSource;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Sample source timeout used when none is configured
pub const DEFAULT_SAMPLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs cycles against shared history, sample source and oracle
pub struct CycleRunner {
    source: Arc<dyn SampleSource>,
    forecaster: ForecastClient,
    history: Arc<HistoryStore>,
    policy: ScalingPolicy,
    sample_timeout: Duration,
    metrics: ControllerMetrics,
}

impl CycleRunner {
    pub fn new(
        source: Arc<dyn SampleSource>,
        forecaster: ForecastClient,
        history: Arc<HistoryStore>,
        policy: ScalingPolicy,
    ) -> Self {
        Self {
            source,
            forecaster,
            history,
            policy,
            sample_timeout: DEFAULT_SAMPLE_TIMEOUT,
            metrics: ControllerMetrics::new(),
        }
    }

    pub fn with_sample_timeout(mut self, timeout: Duration) -> Self {
        self.sample_timeout = timeout;
        self
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn metrics(&self) -> &ControllerMetrics {
        &self.metrics
    }

    pub fn policy(&self) -> ScalingPolicy {
        self.policy
    }

    /// Run one cycle, returning the decision report or the error that
    /// stopped it.
    ///
    /// A zero-cost bottleneck is not an error: the report comes back in
    /// the `Skipped` phase without a decision.
    pub async fn run_cycle(&self, target: &Target) -> Result<CycleReport, CycleError> {
        let start = Instant::now();
        let mut report = CycleReport::started(target.key());
        let outcome = self.advance(target, &mut report).await;
        report.duration_us = start.elapsed().as_micros() as u64;

        match outcome {
            Ok(()) => Ok(report),
            Err(e) if e.is_soft() => {
                report.mark_skipped(&e);
                Ok(report)
            }
            Err(e) => Err(e),
        }
    }

    /// Run one cycle and fold any error into a `Skipped` report.
    ///
    /// Unlike [`CycleRunner::run_cycle`] the report keeps the observed rate
    /// and forecast of a cycle that failed part way through.
    pub async fn run(&self, target: &Target) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::started(target.key());
        if let Err(e) = self.advance(target, &mut report).await {
            report.mark_skipped(&e);
        }
        report.duration_us = start.elapsed().as_micros() as u64;
        report
    }

    async fn advance(&self, target: &Target, report: &mut CycleReport) -> Result<(), CycleError> {
        let key = report.target.clone();

        // Hold the window for the whole sample-and-observe step so two
        // cycles of the same target cannot interleave observations.
        let window = self.history.window(&key);
        let delta_window = {
            let mut guard = window.lock_owned().await;
            let rate = self.sample(target).await?;
            report.observed_rate = Some(rate);
            guard.observe(rate)
        };
        report.phase = CyclePhase::Sampled;

        let forecast_start = Instant::now();
        let forecast = self.forecaster.forecast(&delta_window).await?;
        self.metrics
            .observe_forecast_latency(forecast_start.elapsed().as_secs_f64());
        report.forecast = Some(forecast);
        report.phase = CyclePhase::Forecasted;

        let current_workload = forecast.current_rate.ceil() as i64;
        let predicted_workload = forecast.predicted_rate.ceil() as i64;

        let capacity = max_throughput_per_pod(
            &key,
            &target.limits,
            target.request_cost.as_ref(),
            current_workload,
        )?;
        report.capacity = Some(capacity);
        report.phase = CyclePhase::Capacitated;

        let decision = self.policy.decide(
            target.replicas,
            capacity.max_workload_per_pod,
            predicted_workload,
        );
        report.decision = Some(decision);
        report.phase = CyclePhase::Decided;

        debug!(
            target_key = %key,
            current_workload = current_workload,
            predicted_workload = predicted_workload,
            bottleneck = capacity.bottleneck.as_str(),
            max_workload_per_pod = capacity.max_workload_per_pod,
            target_replicas = decision.target_replicas,
            "Cycle decided"
        );
        Ok(())
    }

    async fn sample(&self, target: &Target) -> Result<f64, CycleError> {
        match tokio::time::timeout(self.sample_timeout, self.source.latest_rate(target)).await {
            Ok(result) => result,
            Err(_) => Err(CycleError::SampleUnavailable {
                reason: format!("timed out after {}ms", self.sample_timeout.as_millis()),
            }),
        }
    }
}
