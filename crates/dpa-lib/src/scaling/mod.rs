//! Capacity modelling and replica scaling policy

mod calibration;
mod capacity;
mod policy;

pub use calibration::{
    average_usage, per_request_cost, total_usage, BenchmarkReport, CalibrationError,
    ResourceUsage,
};
pub use capacity::{bottleneck, max_throughput_per_pod, max_workload_for};
pub use policy::{ScalingPolicy, DEFAULT_MIN_REPLICAS, DEFAULT_REDUCTION_RATIO};
