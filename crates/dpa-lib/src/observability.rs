//! Observability infrastructure for the autoscaler
//!
//! Provides:
//! - Prometheus metrics (cycle latency, forecast latency, decisions, errors, per-target rates)
//! - Structured JSON logging with tracing

use crate::models::{CycleReport, ScalingDecision};
use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter_vec, register_int_gauge,
    GaugeVec, Histogram, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<ControllerMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct ControllerMetricsInner {
    cycle_latency_seconds: Histogram,
    forecast_latency_seconds: Histogram,
    targets_monitored: IntGauge,
    decisions_total: IntCounterVec,
    cycle_errors_total: IntCounterVec,
    current_rate: GaugeVec,
    predicted_rate: GaugeVec,
    desired_replicas: GaugeVec,
}

impl ControllerMetricsInner {
    fn new() -> Self {
        Self {
            cycle_latency_seconds: register_histogram!(
                "dpa_cycle_latency_seconds",
                "Time spent running one scaling cycle for one target",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register cycle_latency_seconds"),

            forecast_latency_seconds: register_histogram!(
                "dpa_forecast_latency_seconds",
                "Time spent waiting for the forecasting oracle",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register forecast_latency_seconds"),

            targets_monitored: register_int_gauge!(
                "dpa_targets_monitored",
                "Number of targets currently being monitored"
            )
            .expect("Failed to register targets_monitored"),

            decisions_total: register_int_counter_vec!(
                "dpa_decisions_total",
                "Scaling decisions by direction",
                &["direction"]
            )
            .expect("Failed to register decisions_total"),

            cycle_errors_total: register_int_counter_vec!(
                "dpa_cycle_errors_total",
                "Skipped cycles by error kind",
                &["kind"]
            )
            .expect("Failed to register cycle_errors_total"),

            current_rate: register_gauge_vec!(
                "dpa_current_rate",
                "Most recent delta rate per target",
                &["target"]
            )
            .expect("Failed to register current_rate"),

            predicted_rate: register_gauge_vec!(
                "dpa_predicted_rate",
                "Forecast rate for the next step per target",
                &["target"]
            )
            .expect("Failed to register predicted_rate"),

            desired_replicas: register_gauge_vec!(
                "dpa_desired_replicas",
                "Replica target of the last decision per target",
                &["target"]
            )
            .expect("Failed to register desired_replicas"),
        }
    }
}

/// Controller metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct ControllerMetrics {
    _private: (),
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &ControllerMetricsInner {
        GLOBAL_METRICS.get_or_init(ControllerMetricsInner::new)
    }

    pub fn observe_cycle_latency(&self, duration_secs: f64) {
        self.inner().cycle_latency_seconds.observe(duration_secs);
    }

    pub fn observe_forecast_latency(&self, duration_secs: f64) {
        self.inner().forecast_latency_seconds.observe(duration_secs);
    }

    pub fn set_targets_monitored(&self, count: i64) {
        self.inner().targets_monitored.set(count);
    }

    pub fn inc_decision(&self, direction: &str) {
        self.inner().decisions_total.with_label_values(&[direction]).inc();
    }

    pub fn inc_cycle_error(&self, kind: &str) {
        self.inner().cycle_errors_total.with_label_values(&[kind]).inc();
    }

    pub fn set_rates(&self, target: &str, current: f64, predicted: f64) {
        self.inner().current_rate.with_label_values(&[target]).set(current);
        self.inner().predicted_rate.with_label_values(&[target]).set(predicted);
    }

    pub fn set_desired_replicas(&self, target: &str, replicas: i32) {
        self.inner()
            .desired_replicas
            .with_label_values(&[target])
            .set(f64::from(replicas));
    }

    /// Drop per-target series of a target that is no longer monitored
    pub fn forget_target(&self, target: &str) {
        let inner = self.inner();
        let _ = inner.current_rate.remove_label_values(&[target]);
        let _ = inner.predicted_rate.remove_label_values(&[target]);
        let _ = inner.desired_replicas.remove_label_values(&[target]);
    }

    /// Record everything a cycle report carries
    pub fn record_report(&self, report: &CycleReport) {
        self.observe_cycle_latency(report.duration_us as f64 / 1_000_000.0);

        if let Some(forecast) = report.forecast {
            self.set_rates(&report.target, forecast.current_rate, forecast.predicted_rate);
        }
        if let Some(decision) = report.decision {
            self.inc_decision(decision.direction.as_str());
            self.set_desired_replicas(&report.target, decision.target_replicas);
        }
        if let Some(kind) = &report.error_kind {
            self.inc_cycle_error(kind);
        }
    }
}

/// Structured logger for controller events
///
/// Provides consistent JSON-formatted logging for decisions, skipped
/// cycles and lifecycle events.
#[derive(Clone)]
pub struct StructuredLogger {
    controller_name: String,
}

impl StructuredLogger {
    pub fn new(controller_name: impl Into<String>) -> Self {
        Self {
            controller_name: controller_name.into(),
        }
    }

    /// Log a scaling decision
    pub fn log_decision(&self, target_key: &str, decision: &ScalingDecision, applied: bool) {
        info!(
            event = "scaling_decision",
            controller = %self.controller_name,
            target_key = %target_key,
            direction = decision.direction.as_str(),
            current_replicas = decision.current_replicas,
            predicted_pods = decision.predicted_pods,
            target_replicas = decision.target_replicas,
            applied = applied,
            "Scaling decision"
        );
    }

    /// Log a forecast
    pub fn log_forecast(&self, target_key: &str, current_rate: f64, predicted_rate: f64) {
        info!(
            event = "forecast_generated",
            controller = %self.controller_name,
            target_key = %target_key,
            current_rate = current_rate,
            predicted_rate = predicted_rate,
            "Generated load forecast"
        );
    }

    /// Log a cycle that ended without a decision
    pub fn log_cycle_skipped(&self, target_key: &str, kind: &str, reason: &str, soft: bool) {
        if soft {
            info!(
                event = "cycle_skipped",
                controller = %self.controller_name,
                target_key = %target_key,
                kind = %kind,
                reason = %reason,
                "Scaling cycle completed without a decision"
            );
        } else {
            warn!(
                event = "cycle_skipped",
                controller = %self.controller_name,
                target_key = %target_key,
                kind = %kind,
                reason = %reason,
                "Scaling cycle failed, skipping this interval"
            );
        }
    }

    /// Log a whole cycle report
    pub fn log_report(&self, report: &CycleReport) {
        if let Some(forecast) = report.forecast {
            self.log_forecast(&report.target, forecast.current_rate, forecast.predicted_rate);
        }
        if let Some(decision) = report.decision {
            self.log_decision(
                &report.target,
                &decision,
                report.phase == crate::models::CyclePhase::Applied,
            );
        }
        if let Some(reason) = &report.skipped_reason {
            let kind = report.error_kind.as_deref().unwrap_or("unknown");
            self.log_cycle_skipped(&report.target, kind, reason, kind == "zero_cost_unscalable");
        }
    }

    pub fn log_target_registered(&self, target_key: &str, replicas: i32) {
        info!(
            event = "target_registered",
            controller = %self.controller_name,
            target_key = %target_key,
            replicas = replicas,
            "Target registered"
        );
    }

    pub fn log_target_removed(&self, target_key: &str, history_evicted: bool) {
        info!(
            event = "target_removed",
            controller = %self.controller_name,
            target_key = %target_key,
            history_evicted = history_evicted,
            "Target removed"
        );
    }

    /// Log controller startup
    pub fn log_startup(&self, version: &str, oracle: &str, targets: usize) {
        info!(
            event = "controller_started",
            controller = %self.controller_name,
            controller_version = %version,
            oracle = %oracle,
            targets = targets,
            "Autoscaler controller started"
        );
    }

    /// Log controller shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "controller_shutdown",
            controller = %self.controller_name,
            reason = %reason,
            "Autoscaler controller shutting down"
        );
    }
}
