//! Live load samples
//!
//! A sample source returns the latest request rate for a target.

mod prometheus;

pub use self::prometheus::PrometheusSource;

use crate::error::CycleError;
use crate::models::Target;
use async_trait::async_trait;

/// Trait for sample source implementations
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fetch the latest rate observation for a target
    async fn latest_rate(&self, target: &Target) -> Result<f64, CycleError>;
}
