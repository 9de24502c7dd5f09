//! Replica scaling policy
//!
//! Scale-up is immediate. Scale-down only removes a fraction of the
//! surplus per cycle and never goes below the replica floor.

use crate::models::{ScaleDirection, ScalingDecision};
use serde::{Deserialize, Serialize};

/// Fraction of the surplus removed per scale-down cycle
pub const DEFAULT_REDUCTION_RATIO: f64 = 0.5;

/// Replica floor
pub const DEFAULT_MIN_REPLICAS: i32 = 1;

/// Damped scaling policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingPolicy {
    pub reduction_ratio: f64,
    pub min_replicas: i32,
}

impl Default for ScalingPolicy {
    fn default() -> Self {
        Self {
            reduction_ratio: DEFAULT_REDUCTION_RATIO,
            min_replicas: DEFAULT_MIN_REPLICAS,
        }
    }
}

impl ScalingPolicy {
    pub fn new(reduction_ratio: f64, min_replicas: i32) -> Self {
        Self {
            reduction_ratio,
            min_replicas,
        }
    }

    /// Pods needed for the predicted workload, truncated toward zero.
    ///
    /// Unknown capacity (zero) falls back to a single pod.
    pub fn predicted_pods(max_workload_per_pod: i64, predicted_workload: i64) -> i64 {
        if max_workload_per_pod == 0 {
            return 1;
        }
        predicted_workload / max_workload_per_pod
    }

    /// Decide the replica target for one cycle
    pub fn decide(
        &self,
        current_replicas: i32,
        max_workload_per_pod: i64,
        predicted_workload: i64,
    ) -> ScalingDecision {
        let predicted_pods = Self::predicted_pods(max_workload_per_pod, predicted_workload);
        let current = i64::from(current_replicas);

        let (target_replicas, direction) = if predicted_pods > current {
            (clamp_replicas(predicted_pods), ScaleDirection::Up)
        } else if predicted_pods < current {
            let surplus = ((current - predicted_pods) as f64 * self.reduction_ratio).floor() as i64;
            let adjusted = (current - surplus).max(i64::from(self.min_replicas));
            (clamp_replicas(adjusted), ScaleDirection::Down)
        } else {
            (current_replicas, ScaleDirection::None)
        };

        ScalingDecision {
            current_replicas,
            predicted_pods,
            target_replicas,
            scaled: direction != ScaleDirection::None,
            direction,
        }
    }
}

fn clamp_replicas(replicas: i64) -> i32 {
    replicas.clamp(0, i64::from(i32::MAX)) as i32
}
