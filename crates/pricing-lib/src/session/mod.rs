//! Session lifecycle
//!
//! Each session owns its artifact and a two-state lifecycle:
//!
//! ```text
//!   Idle --submit ok--> Predicted --reset--> Idle
//!   Predicted --submit ok--> Predicted (result replaced)
//!   any --submit err--> unchanged
//! ```
//!
//! The artifact is orthogonal to the lifecycle; reset never clears it.

mod store;

#[cfg(test)]
mod tests;

pub use store::{SessionStore, DEFAULT_SESSION_TTL};

use crate::collector::InputCollector;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{PropertyRecord, RawInput};
use crate::observability::{PricingMetrics, StructuredLogger};
use crate::predictor::{
    Artifact, ArtifactInfo, PredictionResult, PricingPipeline, ReconcileMode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Whether a prediction is currently displayed
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LifecycleState {
    #[default]
    Idle,
    Predicted(PredictionResult),
}

/// Serialized name of a lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Idle,
    Predicted,
}

impl LifecycleState {
    pub fn kind(&self) -> StateKind {
        match self {
            LifecycleState::Idle => StateKind::Idle,
            LifecycleState::Predicted(_) => StateKind::Predicted,
        }
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            LifecycleState::Idle => None,
            LifecycleState::Predicted(result) => Some(result),
        }
    }
}

/// One user's interaction context
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    artifact: Option<Arc<Artifact>>,
    state: LifecycleState,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            artifact: None,
            state: LifecycleState::Idle,
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn artifact(&self) -> Option<&Arc<Artifact>> {
        self.artifact.as_ref()
    }

    /// Attach a newly loaded artifact; the lifecycle state is left as is
    pub fn attach_artifact(&mut self, artifact: Arc<Artifact>) {
        self.artifact = Some(artifact);
        self.touch();
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.state.prediction()
    }

    pub fn is_predicted(&self) -> bool {
        matches!(self.state, LifecycleState::Predicted(_))
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub(crate) fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            state: self.state.kind(),
            prediction: self.prediction().map(PredictionView::from),
            artifact: self.artifact.as_ref().map(|a| a.info()),
            created_at: self.created_at.timestamp(),
            last_active: self.last_active.timestamp(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Prediction as shown to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionView {
    pub value: f64,
    pub formatted: String,
    pub mode: ReconcileMode,
    pub artifact_version: String,
    pub generated_at: i64,
}

impl From<&PredictionResult> for PredictionView {
    fn from(result: &PredictionResult) -> Self {
        Self {
            value: result.value,
            formatted: result.formatted(),
            mode: result.mode,
            artifact_version: result.artifact_version.clone(),
            generated_at: result.generated_at,
        }
    }
}

/// Snapshot of a session for API responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub id: Uuid,
    pub state: StateKind,
    pub prediction: Option<PredictionView>,
    pub artifact: Option<ArtifactInfo>,
    pub created_at: i64,
    pub last_active: i64,
}

/// Drives the submit/reset transitions of sessions.
///
/// Holds no per-session data; every call receives the session it acts on.
#[derive(Clone)]
pub struct LifecycleManager {
    collector: InputCollector,
    pipeline: PricingPipeline,
    metrics: PricingMetrics,
    logger: StructuredLogger,
}

impl LifecycleManager {
    pub fn new(config: &PipelineConfig, metrics: PricingMetrics, logger: StructuredLogger) -> Self {
        Self {
            collector: InputCollector::new(),
            pipeline: PricingPipeline::new(config),
            metrics,
            logger,
        }
    }

    pub fn pipeline(&self) -> &PricingPipeline {
        &self.pipeline
    }

    /// Collect the raw input, then submit it
    pub fn submit(&self, session: &mut Session, input: &RawInput) -> Result<PredictionResult, PipelineError> {
        match self.collector.collect(input) {
            Ok(record) => self.submit_record(session, &record),
            Err(err) => {
                self.record_failure(session, &err);
                Err(err)
            }
        }
    }

    /// Run the pipeline for an already collected record.
    ///
    /// On success the session moves to `Predicted` with the new result; on
    /// failure the session's state is untouched.
    pub fn submit_record(
        &self,
        session: &mut Session,
        record: &PropertyRecord,
    ) -> Result<PredictionResult, PipelineError> {
        let start = Instant::now();
        session.touch();

        let outcome = match session.artifact() {
            Some(artifact) => self.pipeline.run(record, artifact),
            None => Err(PipelineError::NoArtifact),
        };

        match outcome {
            Ok(result) => {
                let elapsed = start.elapsed();
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.metrics.inc_predictions_generated();
                if result.mode == ReconcileMode::FieldOrder {
                    self.metrics.inc_schema_fallbacks();
                }
                self.logger.log_prediction(
                    &session.id().to_string(),
                    result.value,
                    mode_label(result.mode),
                    &result.artifact_version,
                    elapsed.as_micros(),
                );
                session.state = LifecycleState::Predicted(result.clone());
                Ok(result)
            }
            Err(err) => {
                self.record_failure(session, &err);
                Err(err)
            }
        }
    }

    /// Clear the displayed prediction. Returns whether one was cleared.
    pub fn reset(&self, session: &mut Session) -> bool {
        session.touch();
        let cleared = session.is_predicted();
        session.state = LifecycleState::Idle;
        self.metrics.inc_session_resets();
        self.logger.log_reset(&session.id().to_string(), cleared);
        cleared
    }

    /// Count and log a failure originating outside the lifecycle (e.g. form validation)
    pub fn record_failure(&self, session: &Session, err: &PipelineError) {
        self.metrics.inc_prediction_failure(err.kind());
        self.logger
            .log_prediction_failed(&session.id().to_string(), err.kind(), &err.to_string());
    }
}

fn mode_label(mode: ReconcileMode) -> &'static str {
    match mode {
        ReconcileMode::Schema => "schema",
        ReconcileMode::FieldOrder => "field_order",
    }
}
