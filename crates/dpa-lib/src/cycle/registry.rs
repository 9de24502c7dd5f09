//! Registry of monitored targets and their last cycle outcome

use crate::models::{Capacity, CyclePhase, CycleReport, Forecast, ScalingDecision, Target};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the controller last learned about a target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetStatus {
    /// Unix seconds of the last applied replica change
    pub last_scale_time: Option<i64>,
    pub last_decision: Option<ScalingDecision>,
    pub last_forecast: Option<Forecast>,
    pub last_capacity: Option<Capacity>,
    pub last_error: Option<String>,
    pub last_phase: Option<CyclePhase>,
    pub last_cycle_at: Option<i64>,
    pub cycles: u64,
}

/// Target plus status, as served by the status API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSummary {
    #[serde(flatten)]
    pub target: Target,
    pub status: TargetStatus,
}

#[derive(Debug, Clone)]
struct TargetEntry {
    target: Target,
    status: TargetStatus,
}

/// Concurrency-safe map of target key -> target and status
#[derive(Default)]
pub struct TargetRegistry {
    targets: DashMap<String, TargetEntry>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target. Re-registering replaces the definition and
    /// keeps the status. Returns true if the target is new.
    pub fn register(&self, target: Target) -> bool {
        let key = target.key();
        match self.targets.get_mut(&key) {
            Some(mut entry) => {
                entry.target = target;
                false
            }
            None => {
                debug!(target_key = %key, "Registering target");
                self.targets.insert(
                    key,
                    TargetEntry {
                        target,
                        status: TargetStatus::default(),
                    },
                );
                true
            }
        }
    }

    pub fn unregister(&self, key: &str) -> Option<Target> {
        debug!(target_key = %key, "Unregistering target");
        self.targets.remove(key).map(|(_, entry)| entry.target)
    }

    pub fn get(&self, key: &str) -> Option<Target> {
        self.targets.get(key).map(|entry| entry.target.clone())
    }

    pub fn status(&self, key: &str) -> Option<TargetStatus> {
        self.targets.get(key).map(|entry| entry.status.clone())
    }

    /// All targets, ordered by key
    pub fn list(&self) -> Vec<Target> {
        let mut targets: Vec<Target> = self.targets.iter().map(|r| r.target.clone()).collect();
        targets.sort_by_key(|t| t.key());
        targets
    }

    pub fn summary(&self, key: &str) -> Option<TargetSummary> {
        self.targets.get(key).map(|entry| TargetSummary {
            target: entry.target.clone(),
            status: entry.status.clone(),
        })
    }

    /// Summaries of all targets, ordered by key
    pub fn summaries(&self) -> Vec<TargetSummary> {
        let mut summaries: Vec<TargetSummary> = self
            .targets
            .iter()
            .map(|r| TargetSummary {
                target: r.target.clone(),
                status: r.status.clone(),
            })
            .collect();
        summaries.sort_by_key(|s| s.target.key());
        summaries
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Record a cycle outcome and apply its decision.
    ///
    /// A decided cycle that changes the replica count updates the target
    /// and moves the report to `Applied`. Returns the new replica count
    /// when one was applied. Reports for unknown targets are ignored.
    pub fn apply_report(&self, report: &mut CycleReport) -> Option<i32> {
        let mut entry = self.targets.get_mut(&report.target)?;
        let mut applied = None;

        if report.phase == CyclePhase::Decided {
            if let Some(decision) = report.decision {
                if decision.scaled && decision.target_replicas != entry.target.replicas {
                    entry.target.replicas = decision.target_replicas;
                    entry.status.last_scale_time = Some(report.generated_at);
                    applied = Some(decision.target_replicas);
                }
                if decision.scaled {
                    report.phase = CyclePhase::Applied;
                }
            }
        }

        let status = &mut entry.status;
        status.cycles += 1;
        status.last_cycle_at = Some(report.generated_at);
        status.last_phase = Some(report.phase);
        if report.forecast.is_some() {
            status.last_forecast = report.forecast;
        }
        if report.capacity.is_some() {
            status.last_capacity = report.capacity;
        }
        if report.decision.is_some() {
            status.last_decision = report.decision;
        }
        status.last_error = report.skipped_reason.clone();

        applied
    }
}
