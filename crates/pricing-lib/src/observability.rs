//! Observability infrastructure for the pricing service
//!
//! Provides:
//! - Prometheus metrics (prediction latency, outcomes, schema fallbacks, sessions)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<PricingMetricsInner> = OnceLock::new();

/// Inner metrics structure that holds the actual Prometheus metrics
struct PricingMetricsInner {
    prediction_latency_seconds: Histogram,
    predictions_generated: IntCounter,
    prediction_failures: IntCounterVec,
    schema_fallbacks: IntCounter,
    artifacts_loaded: IntCounter,
    artifact_load_failures: IntCounter,
    sessions_active: IntGauge,
    session_resets: IntCounter,
}

impl PricingMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "pricing_prediction_latency_seconds",
                "Time spent deriving features and running inference for one submission",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            predictions_generated: register_int_counter!(
                "pricing_predictions_generated_total",
                "Total number of successful predictions"
            )
            .expect("Failed to register predictions_generated"),

            prediction_failures: register_int_counter_vec!(
                "pricing_prediction_failures_total",
                "Total number of rejected or failed submissions by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_failures"),

            schema_fallbacks: register_int_counter!(
                "pricing_schema_fallbacks_total",
                "Predictions made in raw field order because the artifact declared no schema"
            )
            .expect("Failed to register schema_fallbacks"),

            artifacts_loaded: register_int_counter!(
                "pricing_artifacts_loaded_total",
                "Total number of artifacts loaded into sessions"
            )
            .expect("Failed to register artifacts_loaded"),

            artifact_load_failures: register_int_counter!(
                "pricing_artifact_load_failures_total",
                "Total number of artifact loads that failed"
            )
            .expect("Failed to register artifact_load_failures"),

            sessions_active: register_int_gauge!(
                "pricing_sessions_active",
                "Number of sessions currently held in memory"
            )
            .expect("Failed to register sessions_active"),

            session_resets: register_int_counter!(
                "pricing_session_resets_total",
                "Total number of reset actions"
            )
            .expect("Failed to register session_resets"),
        }
    }
}

/// Pricing metrics for Prometheus exposition
///
/// This is a lightweight handle to the global metrics instance.
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct PricingMetrics {
    _private: (),
}

impl Default for PricingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(PricingMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &PricingMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions_generated(&self) {
        self.inner().predictions_generated.inc();
    }

    /// Count a failed submission under its error kind
    pub fn inc_prediction_failure(&self, kind: &str) {
        self.inner().prediction_failures.with_label_values(&[kind]).inc();
    }

    pub fn inc_schema_fallbacks(&self) {
        self.inner().schema_fallbacks.inc();
    }

    pub fn inc_artifacts_loaded(&self) {
        self.inner().artifacts_loaded.inc();
    }

    pub fn inc_artifact_load_failures(&self) {
        self.inner().artifact_load_failures.inc();
    }

    pub fn set_sessions_active(&self, count: i64) {
        self.inner().sessions_active.set(count);
    }

    pub fn inc_session_resets(&self) {
        self.inner().session_resets.inc();
    }

    pub fn predictions_generated(&self) -> u64 {
        self.inner().predictions_generated.get()
    }

    pub fn prediction_failures(&self, kind: &str) -> u64 {
        self.inner().prediction_failures.with_label_values(&[kind]).get()
    }
}

/// Structured logger for pricing events
///
/// Provides consistent JSON-formatted logging for predictions,
/// artifact loads, and session lifecycle transitions.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a prediction generation event
    pub fn log_prediction(
        &self,
        session_id: &str,
        value: f64,
        mode: &str,
        artifact_version: &str,
        latency_us: u128,
    ) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            session_id = %session_id,
            value = value,
            mode = %mode,
            artifact_version = %artifact_version,
            latency_us = latency_us as u64,
            "Generated price prediction"
        );
    }

    /// Log a failed submission
    pub fn log_prediction_failed(&self, session_id: &str, kind: &str, message: &str) {
        warn!(
            event = "prediction_failed",
            service = %self.service,
            session_id = %session_id,
            kind = %kind,
            message = %message,
            "Prediction failed, session state unchanged"
        );
    }

    /// Log an artifact load
    pub fn log_artifact_loaded(&self, session_id: &str, version: &str, schema_columns: Option<usize>) {
        info!(
            event = "artifact_loaded",
            service = %self.service,
            session_id = %session_id,
            artifact_version = %version,
            schema_columns = ?schema_columns,
            "Artifact attached to session"
        );
    }

    /// Log a failed artifact load
    pub fn log_artifact_load_failed(&self, session_id: &str, reason: &str) {
        warn!(
            event = "artifact_load_failed",
            service = %self.service,
            session_id = %session_id,
            reason = %reason,
            "Artifact load failed, keeping previous artifact"
        );
    }

    /// Log a reset transition
    pub fn log_reset(&self, session_id: &str, cleared: bool) {
        info!(
            event = "session_reset",
            service = %self.service,
            session_id = %session_id,
            cleared = cleared,
            "Session reset"
        );
    }

    /// Log service startup
    pub fn log_startup(&self, version: &str, reference_year: i64) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            reference_year = reference_year,
            "Pricing service started"
        );
    }

    /// Log service shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Pricing service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_metrics_creation() {
        let metrics = PricingMetrics::new();

        metrics.observe_prediction_latency(0.002);
        metrics.inc_schema_fallbacks();
        metrics.inc_artifacts_loaded();
        metrics.set_sessions_active(3);
        metrics.inc_session_resets();

        let before = metrics.prediction_failures("test_kind");
        metrics.inc_prediction_failure("test_kind");
        assert_eq!(metrics.prediction_failures("test_kind"), before + 1);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-service");
        assert_eq!(logger.service, "test-service");
    }
}
