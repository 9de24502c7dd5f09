//! Decision library for the dynamic pod autoscaler
//!
//! This crate provides the core functionality for:
//! - Per-target load history windows
//! - Normalized forecasting through an external or in-process oracle
//! - Capacity modelling from resource limits and per-request cost
//! - Damped replica scaling decisions
//! - Cycle orchestration, health checks and observability

pub mod cycle;
pub mod error;
pub mod health;
pub mod history;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod quantity;
pub mod scaling;
pub mod source;

pub use error::CycleError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ControllerMetrics, StructuredLogger};
