//! HTTP API for pricing sessions, health checks and Prometheus metrics

use crate::config::ServerConfig;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use pricing_lib::{
    collector::{domain, FieldDomain, InputCollector, FIELD_DOMAINS},
    health::{components, ComponentStatus, HealthRegistry},
    models::RawInput,
    observability::{PricingMetrics, StructuredLogger},
    predictor::{Artifact, ArtifactLoader, ArtifactSource},
    session::{LifecycleManager, SessionStore, SessionView},
    PipelineError,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: PricingMetrics,
    pub logger: StructuredLogger,
    pub store: Arc<SessionStore>,
    pub manager: LifecycleManager,
    pub loader: ArtifactLoader,
    pub collector: InputCollector,
    pub default_artifact: Option<ArtifactSource>,
}

impl AppState {
    pub fn new(config: &ServerConfig, health_registry: HealthRegistry, metrics: PricingMetrics) -> Self {
        let logger = StructuredLogger::new(&config.service_name);
        Self {
            health_registry,
            store: Arc::new(SessionStore::new(
                Duration::from_secs(config.session_ttl_secs),
                metrics.clone(),
            )),
            manager: LifecycleManager::new(&config.pipeline, metrics.clone(), logger.clone()),
            loader: ArtifactLoader::new(config.max_artifact_bytes),
            collector: InputCollector::new(),
            default_artifact: config.default_artifact.clone(),
            metrics,
            logger,
        }
    }
}

/// Error body returned by every failing API call
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(Uuid),
    Pipeline(PipelineError),
    Internal(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "session_not_found",
                format!("Session {} not found", id),
            ),
            ApiError::Pipeline(err) => {
                let status = match &err {
                    PipelineError::NoArtifact => StatusCode::CONFLICT,
                    PipelineError::SchemaUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, err.kind(), err.to_string())
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        };

        let body = ErrorBody {
            error: kind.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed or wrong-typed request bodies surface as invalid input
fn invalid_body(rejection: JsonRejection) -> PipelineError {
    PipelineError::InvalidInput {
        field: "body".to_string(),
        reason: rejection.body_text(),
    }
}

/// Body of `POST /api/v1/sessions`
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub artifact: Option<ArtifactSource>,
}

/// Health check response - returns 200 if healthy, 503 if degraded/unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse, ApiError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("Failed to encode metrics: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Load an artifact off the async runtime, counting and logging the outcome
async fn load_artifact(
    state: &AppState,
    session_id: Uuid,
    source: ArtifactSource,
) -> Result<Arc<Artifact>, PipelineError> {
    let loader = state.loader.clone();
    let path = source.scaler_path.display().to_string();
    let result = tokio::task::spawn_blocking(move || loader.load(&source))
        .await
        .unwrap_or_else(|e| {
            Err(PipelineError::ArtifactLoad {
                path,
                reason: e.to_string(),
            })
        });

    match result {
        Ok(artifact) => {
            state.health_registry.set_healthy(components::ARTIFACTS).await;
            state.metrics.inc_artifacts_loaded();
            state.logger.log_artifact_loaded(
                &session_id.to_string(),
                artifact.version(),
                artifact.schema().declared().map(|s| s.len()),
            );
            Ok(Arc::new(artifact))
        }
        Err(err) => {
            state
                .health_registry
                .set_degraded(components::ARTIFACTS, err.to_string())
                .await;
            state.metrics.inc_artifact_load_failures();
            state
                .logger
                .log_artifact_load_failed(&session_id.to_string(), &err.to_string());
            Err(err)
        }
    }
}

/// Open a new session. An explicit artifact that fails to load rejects the
/// request; a failing default artifact leaves the session without one.
async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = match body {
        Ok(Json(request)) => request,
        // No JSON body at all means "open with defaults"
        Err(JsonRejection::MissingJsonContentType(_)) => CreateSessionRequest::default(),
        Err(rejection) => return Err(invalid_body(rejection).into()),
    };
    let view = state.store.create(None);

    let (source, explicit) = match request.artifact {
        Some(source) => (Some(source), true),
        None => (state.default_artifact.clone(), false),
    };

    if let Some(source) = source {
        match load_artifact(&state, view.id, source).await {
            Ok(artifact) => {
                state
                    .store
                    .with_session(view.id, |session| session.attach_artifact(artifact));
            }
            Err(err) if explicit => {
                state.store.remove(view.id);
                return Err(err.into());
            }
            Err(_) => {}
        }
    }

    let view = state
        .store
        .view(view.id)
        .ok_or(ApiError::SessionNotFound(view.id))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .store
        .view(id)
        .map(Json)
        .ok_or(ApiError::SessionNotFound(id))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.store.remove(id) {
        info!(session_id = %id, "Session deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

/// Replace a session's artifact. A failed load keeps the previous one.
async fn put_artifact(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Result<Json<ArtifactSource>, JsonRejection>,
) -> Result<Json<SessionView>, ApiError> {
    if state.store.view(id).is_none() {
        return Err(ApiError::SessionNotFound(id));
    }
    let Json(source) = body.map_err(invalid_body)?;

    let artifact = load_artifact(&state, id, source).await?;
    state
        .store
        .with_session(id, |session| {
            session.attach_artifact(artifact);
            session.view()
        })
        .map(Json)
        .ok_or(ApiError::SessionNotFound(id))
}

/// Validate the form fields, then run one submission against the session.
/// Inference runs on the blocking pool so a slow model never stalls the runtime.
async fn predict(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Result<Json<RawInput>, JsonRejection>,
) -> Result<Json<SessionView>, ApiError> {
    let input = body.map(|Json(input)| input).map_err(invalid_body);

    let task_state = state.clone();
    let outcome = tokio::task::spawn_blocking(move || submit_blocking(&task_state, id, input))
        .await
        .map_err(|e| ApiError::Internal(format!("Prediction task failed: {}", e)))?
        .ok_or(ApiError::SessionNotFound(id))?;

    match &outcome {
        Ok(_) => state.health_registry.set_healthy(components::INFERENCE).await,
        Err(err @ PipelineError::PredictionFailed(_)) => {
            state
                .health_registry
                .set_degraded(components::INFERENCE, err.to_string())
                .await
        }
        Err(_) => {}
    }

    Ok(Json(outcome?))
}

fn submit_blocking(
    state: &AppState,
    id: Uuid,
    input: Result<RawInput, PipelineError>,
) -> Option<Result<SessionView, PipelineError>> {
    state.store.with_session(id, |session| {
        let record = input
            .and_then(|input| state.collector.collect(&input))
            .and_then(|record| domain::check(&record).map(|_| record));

        match record {
            Ok(record) => state
                .manager
                .submit_record(session, &record)
                .map(|_| session.view()),
            Err(err) => {
                state.manager.record_failure(session, &err);
                Err(err)
            }
        }
    })
}

async fn reset(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    state
        .store
        .with_session(id, |session| {
            state.manager.reset(session);
            session.view()
        })
        .map(Json)
        .ok_or(ApiError::SessionNotFound(id))
}

/// Kind, range, step and default of every raw field
async fn fields() -> Json<Vec<FieldDomain>> {
    Json(FIELD_DOMAINS.to_vec())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/fields", get(fields))
        .route("/api/v1/sessions", post(create_session))
        .route(
            "/api/v1/sessions/:id",
            get(get_session).delete(delete_session),
        )
        .route("/api/v1/sessions/:id/artifact", put(put_artifact))
        .route("/api/v1/sessions/:id/predict", post(predict))
        .route("/api/v1/sessions/:id/reset", post(reset))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "API server stopped");
        return Err(e.into());
    }

    Ok(())
}
