//! ML prediction engine

pub mod artifact;
mod features;
mod inference;
mod output;
mod scaler;
mod schema;

pub use artifact::{
    compute_version, Artifact, ArtifactInfo, ArtifactLoader, ArtifactSource, ModelFormat,
    DEFAULT_MAX_ARTIFACT_BYTES,
};
pub use features::{
    city_part_column, FeatureDeriver, AGE_OF_HOUSE, CITY_PART_PREFIX, HAS_GARAGE_OR_STORAGE,
    PRICE_PER_SQM,
};
pub use inference::{InferenceExecutor, LinearRegressor, ModelSpec, OnnxRegressor};
pub use output::{format_price, PredictionResult, CURRENCY_SYMBOL};
pub use scaler::{IdentityScaler, MinMaxScaler, ScalerSpec, StandardScaler};
pub use schema::{ArtifactSchema, FeatureSchema, ReconcileMode, ReconciledVector, SchemaReconciler};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::models::{DerivedFeatureSet, PropertyRecord};
use anyhow::Result;
use tract_onnx::prelude::tract_ndarray::Array2;
use tracing::debug;

/// Scaling capability of an artifact
pub trait Scaler: Send + Sync {
    /// Short name of the transform
    fn kind(&self) -> &'static str;

    /// Ordered feature names the scaler was fitted on, if it declares them
    fn feature_names(&self) -> Option<&[String]>;

    /// Number of columns the transform accepts, when known
    fn input_width(&self) -> Option<usize>;

    /// Transform a `rows x features` matrix
    fn transform(&self, input: &Array2<f64>) -> Result<Array2<f64>>;
}

/// Prediction capability of an artifact
pub trait Regressor: Send + Sync {
    fn kind(&self) -> &'static str;

    /// One prediction per input row
    fn predict(&self, input: &Array2<f64>) -> Result<Vec<f64>>;
}

/// Derive -> reconcile -> infer, once per submission
#[derive(Debug, Clone)]
pub struct PricingPipeline {
    deriver: FeatureDeriver,
    reconciler: SchemaReconciler,
    executor: InferenceExecutor,
}

impl PricingPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            deriver: FeatureDeriver::new(config),
            reconciler: SchemaReconciler::new(),
            executor: InferenceExecutor::new(),
        }
    }

    pub fn deriver(&self) -> &FeatureDeriver {
        &self.deriver
    }

    pub fn derive(&self, record: &PropertyRecord) -> DerivedFeatureSet {
        self.deriver.derive(record)
    }

    pub fn reconcile(&self, derived: &DerivedFeatureSet, artifact: &Artifact) -> ReconciledVector {
        self.reconciler.reconcile(derived, artifact.schema())
    }

    /// Run the full pipeline for one record against a loaded artifact
    pub fn run(&self, record: &PropertyRecord, artifact: &Artifact) -> Result<PredictionResult, PipelineError> {
        let derived = self.derive(record);
        let vector = self.reconcile(&derived, artifact);
        debug!(
            derived = derived.len(),
            columns = vector.len(),
            mode = ?vector.mode(),
            artifact = %artifact.version(),
            "Feature vector ready"
        );
        let value = self.executor.execute(&vector, artifact)?;
        Ok(PredictionResult::new(value, vector.mode(), artifact.version()))
    }
}

impl Default for PricingPipeline {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}
