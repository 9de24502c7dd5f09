//! Forecast client: normalize, ask the oracle, denormalize

use super::{normalize, Oracle};
use crate::error::CycleError;
use crate::models::Forecast;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Oracle call timeout used when none is configured
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Turns a delta window into current and predicted rates
#[derive(Clone)]
pub struct ForecastClient {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
}

impl ForecastClient {
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    pub fn with_default_timeout(oracle: Arc<dyn Oracle>) -> Self {
        Self::new(oracle, DEFAULT_ORACLE_TIMEOUT)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Forecast the next delta from a delta window.
    ///
    /// The prediction is denormalized with the window's own min/max and
    /// rounded up. No retry happens here.
    pub async fn forecast(&self, delta_window: &[f64]) -> Result<Forecast, CycleError> {
        let normalized = normalize(delta_window);

        let predicted_norm =
            match tokio::time::timeout(self.timeout, self.oracle.predict(&normalized.scaled)).await
            {
                Ok(result) => result?,
                Err(_) => {
                    return Err(CycleError::OracleUnavailable {
                        reason: format!("timed out after {}ms", self.timeout.as_millis()),
                    })
                }
            };

        let predicted_rate = normalized.denormalize(predicted_norm).ceil();
        let current_rate = delta_window.last().copied().unwrap_or(0.0);

        debug!(
            oracle = %self.oracle.describe(),
            predicted_norm = predicted_norm,
            min = normalized.min,
            max = normalized.max,
            predicted_rate = predicted_rate,
            "Forecast completed"
        );

        Ok(Forecast {
            current_rate,
            predicted_rate,
            predicted_norm,
        })
    }
}
