//! Core library for house price prediction
//!
//! This crate provides:
//! - Collection and validation of raw property attributes
//! - Feature derivation and schema reconciliation
//! - Inference against a loaded scaler/model artifact
//! - Per-session Idle/Predicted lifecycle
//! - Health checks and observability

pub mod collector;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod session;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{PricingMetrics, StructuredLogger};
pub use predictor::{Artifact, ArtifactLoader, ArtifactSource, PredictionResult, PricingPipeline};
pub use session::{LifecycleManager, LifecycleState, Session, SessionStore, SessionView};
