//! PII Shield Observability
//!
//! This crate provides observability features:
//! - Metrics collection (Prometheus)
//! - Health endpoints

pub mod health;
pub mod metrics;

pub use health::{
    ComponentStatus, HealthResponse, HealthState, ReadinessChecker, ReadinessResponse,
    health_router,
};
pub use metrics::{Metrics, Outcome};
