//! Cycle error kinds
//!
//! Every error here is local to one cycle of one target. None of them is
//! fatal to the process and none of them touches the history store.

use crate::models::{Bottleneck, CyclePhase};
use thiserror::Error;

/// Reasons a scaling cycle ends without an applied decision
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CycleError {
    /// The sample source could not be reached or answered with garbage
    #[error("sample source unavailable: {reason}")]
    SampleUnavailable { reason: String },

    /// The sample source answered, but with no result rows
    #[error("no sample data returned for {query}")]
    NoSampleData { query: String },

    /// The oracle call did not complete (transport failure, bad status, timeout)
    #[error("forecast oracle unavailable: {reason}")]
    OracleUnavailable { reason: String },

    /// The oracle replied with something that is not a usable prediction
    #[error("forecast oracle protocol error: {reason}")]
    OracleProtocolError { reason: String },

    /// A per-pod resource ceiling is not declared on the target
    #[error("{resource} limit is not declared for {target}")]
    MissingResourceLimits {
        target: String,
        resource: &'static str,
    },

    /// No per-request cost estimate is available for the target
    #[error("no per-request resource cost configured for {target}")]
    MissingRequestCost { target: String },

    /// The bottleneck resource has zero per-request cost
    #[error("{bottleneck} cost per request is 0, skipping scaling decision")]
    ZeroCostUnscalable { bottleneck: Bottleneck },
}

impl CycleError {
    /// Stable label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            CycleError::SampleUnavailable { .. } => "sample_unavailable",
            CycleError::NoSampleData { .. } => "no_sample_data",
            CycleError::OracleUnavailable { .. } => "oracle_unavailable",
            CycleError::OracleProtocolError { .. } => "oracle_protocol_error",
            CycleError::MissingResourceLimits { .. } => "missing_resource_limits",
            CycleError::MissingRequestCost { .. } => "missing_request_cost",
            CycleError::ZeroCostUnscalable { .. } => "zero_cost_unscalable",
        }
    }

    /// Soft errors complete the cycle with no decision instead of failing it
    pub fn is_soft(&self) -> bool {
        matches!(self, CycleError::ZeroCostUnscalable { .. })
    }

    /// The last phase the cycle reached before this error stopped it
    pub fn failed_phase(&self) -> CyclePhase {
        match self {
            CycleError::SampleUnavailable { .. } | CycleError::NoSampleData { .. } => {
                CyclePhase::Idle
            }
            CycleError::OracleUnavailable { .. } | CycleError::OracleProtocolError { .. } => {
                CyclePhase::Sampled
            }
            CycleError::MissingResourceLimits { .. }
            | CycleError::MissingRequestCost { .. }
            | CycleError::ZeroCostUnscalable { .. } => CyclePhase::Forecasted,
        }
    }
}
