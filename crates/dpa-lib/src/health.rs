//! Health check infrastructure for the controller
//!
//! Tracks the health of the sample source, the oracle and the cycle
//! scheduler for Kubernetes liveness and readiness probes.
//!
//! Dependency outages never fail liveness: a failing sample source or
//! oracle is reported as degraded, and a long failure streak only takes
//! the controller out of readiness.

use crate::models::CycleReport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is experiencing issues but still operational
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// Compute overall status from component statuses
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        let mut has_degraded = false;

        for health in components.values() {
            match health.status {
                ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
                ComponentStatus::Degraded => has_degraded = true,
                ComponentStatus::Healthy => {}
            }
        }

        if has_degraded {
            ComponentStatus::Degraded
        } else {
            ComponentStatus::Healthy
        }
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const SAMPLE_SOURCE: &str = "sample_source";
    pub const ORACLE: &str = "oracle";
    pub const SCHEDULER: &str = "scheduler";

    /// Component blamed for a cycle error kind
    pub fn for_error_kind(kind: &str) -> Option<&'static str> {
        match kind {
            "sample_unavailable" | "no_sample_data" => Some(SAMPLE_SOURCE),
            "oracle_unavailable" | "oracle_protocol_error" => Some(ORACLE),
            _ => None,
        }
    }
}

/// Consecutive failed cycles before a dependency makes the controller unready
pub const DEFAULT_UNREADY_AFTER: u32 = 5;

/// Health registry for tracking component health
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    failure_streaks: Arc<RwLock<HashMap<&'static str, u32>>>,
    unready_after: u32,
    ready: Arc<RwLock<bool>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::with_threshold(DEFAULT_UNREADY_AFTER)
    }

    pub fn with_threshold(unready_after: u32) -> Self {
        Self {
            components: Arc::new(RwLock::new(HashMap::new())),
            failure_streaks: Arc::new(RwLock::new(HashMap::new())),
            unready_after: unready_after.max(1),
            ready: Arc::new(RwLock::new(false)),
        }
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Update component health status
    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut components = self.components.write().await;
        components.insert(name.to_string(), health);
    }

    /// Mark component as healthy
    pub async fn set_healthy(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    /// Mark component as degraded
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::degraded(message)).await;
    }

    /// Mark component as unhealthy
    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Update the sample source and oracle health from a cycle outcome.
    ///
    /// A failure degrades the blamed component and extends its streak.
    /// Any cycle that got past a component clears its streak.
    pub async fn record_cycle(&self, report: &CycleReport) {
        if let Some(component) = report.error_kind.as_deref().and_then(components::for_error_kind) {
            let streak = {
                let mut streaks = self.failure_streaks.write().await;
                let streak = streaks.entry(component).or_insert(0);
                *streak += 1;
                *streak
            };
            let reason = report.skipped_reason.clone().unwrap_or_default();
            let message = if streak > 1 {
                format!("{} consecutive failures: {}", streak, reason)
            } else {
                reason
            };
            self.set_degraded(component, message).await;
        }

        let mut recovered = Vec::new();
        if report.observed_rate.is_some() {
            recovered.push(components::SAMPLE_SOURCE);
        }
        if report.forecast.is_some() {
            recovered.push(components::ORACLE);
        }
        for component in recovered {
            self.failure_streaks.write().await.remove(component);
            self.set_healthy(component).await;
        }
    }

    /// Set readiness status
    pub async fn set_ready(&self, ready: bool) {
        let mut r = self.ready.write().await;
        *r = ready;
    }

    /// Get health response
    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    /// Dependency whose failure streak reached the readiness threshold
    async fn failing_dependency(&self) -> Option<(&'static str, u32)> {
        let streaks = self.failure_streaks.read().await;
        let mut failing: Vec<_> = streaks
            .iter()
            .filter(|(_, streak)| **streak >= self.unready_after)
            .map(|(component, streak)| (*component, *streak))
            .collect();
        failing.sort();
        failing.into_iter().next()
    }

    /// Get readiness response
    pub async fn readiness(&self) -> ReadinessResponse {
        let ready = *self.ready.read().await;
        let health = self.health().await;

        // Not ready if any critical component is unhealthy
        let critical_healthy = health.status != ComponentStatus::Unhealthy;

        if !ready {
            ReadinessResponse {
                ready: false,
                reason: Some("Controller not yet initialized".to_string()),
            }
        } else if !critical_healthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Critical component unhealthy".to_string()),
            }
        } else if let Some((component, streak)) = self.failing_dependency().await {
            ReadinessResponse {
                ready: false,
                reason: Some(format!("{} failed {} consecutive cycles", component, streak)),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}
