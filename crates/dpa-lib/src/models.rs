//! Core data models for the autoscaler

use serde::{Deserialize, Serialize};
use std::fmt;

/// A monitored workload (deployment-like entity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub namespace: String,
    pub name: String,
    /// Current replica count, updated by the apply step
    pub replicas: i32,
    /// Instant-query URL returning the target's request rate
    pub scrape_url: String,
    pub limits: ResourceLimits,
    /// Per-request cost from the offline benchmark, if one has been run
    pub request_cost: Option<RequestCost>,
}

impl Target {
    /// Identity used to key per-target state
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Per-pod resource ceilings
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_millicores: Option<f64>,
    pub memory_mib: Option<f64>,
}

/// Estimated resource cost of serving a single request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestCost {
    pub cpu_millicores: f64,
    pub memory_mib: f64,
}

/// The resource that limits per-pod throughput
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bottleneck {
    Cpu,
    Memory,
}

impl Bottleneck {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bottleneck::Cpu => "cpu",
            Bottleneck::Memory => "memory",
        }
    }
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of the capacity model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacity {
    pub bottleneck: Bottleneck,
    /// Maximum sustainable workload for one pod, in rate units
    pub max_workload_per_pod: i64,
}

/// Output of one forecast step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    /// Most recent entry of the delta window
    pub current_rate: f64,
    /// Denormalized prediction for the next step
    pub predicted_rate: f64,
    /// Raw oracle output before denormalization
    pub predicted_norm: f64,
}

/// Direction of a scaling decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleDirection {
    Up,
    Down,
    None,
}

impl ScaleDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleDirection::Up => "up",
            ScaleDirection::Down => "down",
            ScaleDirection::None => "none",
        }
    }
}

/// Replica target produced by the scaling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingDecision {
    pub current_replicas: i32,
    pub predicted_pods: i64,
    pub target_replicas: i32,
    pub scaled: bool,
    pub direction: ScaleDirection,
}

/// Phases of one scaling cycle
///
/// `Idle -> Sampled -> Forecasted -> Capacitated -> Decided -> (Applied | Skipped)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Sampled,
    Forecasted,
    Capacitated,
    Decided,
    Applied,
    Skipped,
}

/// Result of one cycle for one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub target: String,
    pub phase: CyclePhase,
    pub observed_rate: Option<f64>,
    pub forecast: Option<Forecast>,
    pub capacity: Option<Capacity>,
    pub decision: Option<ScalingDecision>,
    pub skipped_reason: Option<String>,
    pub error_kind: Option<String>,
    pub duration_us: u64,
    pub generated_at: i64,
}

impl CycleReport {
    /// Empty report for a cycle that has not sampled yet
    pub fn started(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            phase: CyclePhase::Idle,
            observed_rate: None,
            forecast: None,
            capacity: None,
            decision: None,
            skipped_reason: None,
            error_kind: None,
            duration_us: 0,
            generated_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Report for a cycle that stopped on an error
    pub fn failed(target: impl Into<String>, error: &crate::CycleError, duration_us: u64) -> Self {
        let mut report = Self::started(target);
        report.mark_skipped(error);
        report.duration_us = duration_us;
        report
    }

    /// Move to `Skipped`, keeping whatever the cycle produced so far
    pub fn mark_skipped(&mut self, error: &crate::CycleError) {
        self.phase = CyclePhase::Skipped;
        self.skipped_reason = Some(error.to_string());
        self.error_kind = Some(error.kind().to_string());
    }

    /// True when the cycle produced a decision that changes the replica count
    pub fn wants_scale(&self) -> bool {
        self.decision.map(|d| d.scaled).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_key() {
        let target = Target {
            namespace: "shop".to_string(),
            name: "checkout".to_string(),
            replicas: 2,
            scrape_url: "http://prometheus:9090/api/v1/query?query=rps".to_string(),
            limits: ResourceLimits::default(),
            request_cost: None,
        };
        assert_eq!(target.key(), "shop/checkout");
    }

    #[test]
    fn test_bottleneck_serde() {
        let json = serde_json::to_string(&Bottleneck::Memory).unwrap();
        assert_eq!(json, "\"memory\"");
        assert_eq!(Bottleneck::Cpu.to_string(), "cpu");
    }

    #[test]
    fn test_failed_report() {
        let err = crate::CycleError::SampleUnavailable {
            reason: "timed out".to_string(),
        };
        let report = CycleReport::failed("default/web", &err, 42);
        assert_eq!(report.phase, CyclePhase::Skipped);
        assert_eq!(report.error_kind.as_deref(), Some("sample_unavailable"));
        assert!(!report.wants_scale());
    }
}
