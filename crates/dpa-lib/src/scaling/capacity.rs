//! Per-pod capacity model
//!
//! The resource with less headroom after one request is the bottleneck,
//! and the bottleneck's limit and per-request cost bound the workload a
//! single pod can sustain.

use crate::error::CycleError;
use crate::models::{Bottleneck, Capacity, RequestCost, ResourceLimits};

/// Pick the resource with less remaining headroom per request
pub fn bottleneck(cpu_limit: f64, memory_limit: f64, cpu_per_req: f64, memory_per_req: f64) -> Bottleneck {
    if (cpu_limit - cpu_per_req) < (memory_limit - memory_per_req) {
        Bottleneck::Cpu
    } else {
        Bottleneck::Memory
    }
}

/// `ceil(limit) * current_workload / ceil(per_req)`, truncated.
///
/// Returns `None` when the per-request cost is zero.
pub fn max_workload_for(limit: f64, per_req: f64, current_workload: i64) -> Option<i64> {
    if per_req == 0.0 {
        return None;
    }
    Some((limit.ceil() * current_workload as f64 / per_req.ceil()) as i64)
}

/// Compute the bottleneck resource and the maximum sustainable per-pod workload
pub fn max_throughput_per_pod(
    target: &str,
    limits: &ResourceLimits,
    cost: Option<&RequestCost>,
    current_workload: i64,
) -> Result<Capacity, CycleError> {
    let missing = |resource| CycleError::MissingResourceLimits {
        target: target.to_string(),
        resource,
    };
    let cpu_limit = limits.cpu_millicores.ok_or_else(|| missing("cpu"))?;
    let memory_limit = limits.memory_mib.ok_or_else(|| missing("memory"))?;

    let cost = cost.ok_or_else(|| CycleError::MissingRequestCost {
        target: target.to_string(),
    })?;

    let bottleneck = bottleneck(cpu_limit, memory_limit, cost.cpu_millicores, cost.memory_mib);
    let (limit, per_req) = match bottleneck {
        Bottleneck::Cpu => (cpu_limit, cost.cpu_millicores),
        Bottleneck::Memory => (memory_limit, cost.memory_mib),
    };

    let max_workload_per_pod = max_workload_for(limit, per_req, current_workload)
        .ok_or(CycleError::ZeroCostUnscalable { bottleneck })?;

    Ok(Capacity {
        bottleneck,
        max_workload_per_pod,
    })
}
