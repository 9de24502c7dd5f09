//! Per-request cost calibration from benchmark output
//!
//! The benchmark itself runs elsewhere. This module only turns its
//! aggregate numbers (completed requests, container usage) into a
//! per-request cost.

use crate::models::RequestCost;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Resource usage of one container, CPU in millicores and memory in MiB
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub cpu_millicores: f64,
    pub memory_mib: f64,
}

/// Output of a benchmark run against one target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub completed_requests: u64,
    #[serde(default)]
    pub failed_requests: u64,
    pub usage: Vec<ResourceUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalibrationError {
    #[error("benchmark completed no requests")]
    NoCompletedRequests,
    #[error("no container usage samples available")]
    NoUsageSamples,
}

/// Sum usage across containers
pub fn total_usage(usage: &[ResourceUsage]) -> ResourceUsage {
    usage.iter().fold(ResourceUsage::default(), |acc, u| ResourceUsage {
        cpu_millicores: acc.cpu_millicores + u.cpu_millicores,
        memory_mib: acc.memory_mib + u.memory_mib,
    })
}

/// Average usage across containers
pub fn average_usage(usage: &[ResourceUsage]) -> Result<ResourceUsage, CalibrationError> {
    if usage.is_empty() {
        return Err(CalibrationError::NoUsageSamples);
    }
    let total = total_usage(usage);
    let n = usage.len() as f64;
    Ok(ResourceUsage {
        cpu_millicores: total.cpu_millicores / n,
        memory_mib: total.memory_mib / n,
    })
}

/// Total usage divided by completed (not failed) requests
pub fn per_request_cost(report: &BenchmarkReport) -> Result<RequestCost, CalibrationError> {
    if report.completed_requests == 0 {
        return Err(CalibrationError::NoCompletedRequests);
    }
    if report.usage.is_empty() {
        return Err(CalibrationError::NoUsageSamples);
    }

    let total = total_usage(&report.usage);
    let requests = report.completed_requests as f64;
    Ok(RequestCost {
        cpu_millicores: total.cpu_millicores / requests,
        memory_mib: total.memory_mib / requests,
    })
}
