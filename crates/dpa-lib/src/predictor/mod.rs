//! Load forecasting
//!
//! The delta window is min-max normalized, handed to an oracle and the
//! oracle's normalized answer is mapped back onto the window's range.

mod forecast;
mod http;
mod local;
mod normalize;

pub use forecast::{ForecastClient, DEFAULT_ORACLE_TIMEOUT};
pub use http::HttpOracle;
pub use local::{sha256_hex, verify_checksum, OnnxOracle};
pub use normalize::{normalize, Normalized};

use crate::error::CycleError;
use async_trait::async_trait;

/// Trait for forecasting oracle implementations
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Predict the next normalized value from a normalized window
    async fn predict(&self, input: &[f64]) -> Result<f64, CycleError>;

    /// Short description used in logs
    fn describe(&self) -> String;
}
