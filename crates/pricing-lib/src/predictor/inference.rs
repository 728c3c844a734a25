//! Model inference
//!
//! Provides the regression models an artifact may carry (ONNX graphs run
//! through tract, or plain linear models exported as JSON) and the
//! executor that applies an artifact's scaler and model to one row.

use super::artifact::Artifact;
use super::schema::ReconciledVector;
use super::Regressor;
use crate::error::PipelineError;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX regression model evaluated with tract
pub struct OnnxRegressor {
    model: TractModel,
    n_features: Option<usize>,
}

impl OnnxRegressor {
    /// Load and optimize an ONNX model from bytes.
    ///
    /// When `n_features` is known (from the scaler) the input is pinned to
    /// `f32[1, n_features]`; otherwise the graph's own input fact is used.
    pub fn from_bytes(model_bytes: &[u8], n_features: Option<usize>) -> Result<Self> {
        let mut model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?;
        if let Some(n) = n_features {
            model = model
                .with_input_fact(0, f32::fact([1, n]).into())
                .context("Failed to set input shape")?;
        }
        let model = model
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model, n_features })
    }
}

impl Regressor for OnnxRegressor {
    fn kind(&self) -> &'static str {
        "onnx"
    }

    fn predict(&self, input: &tract_ndarray::Array2<f64>) -> Result<Vec<f64>> {
        if let Some(n) = self.n_features {
            if input.ncols() != n {
                bail!("Model expects {} features, got {}", n, input.ncols());
            }
        }
        let data: Vec<f32> = input.iter().map(|&v| v as f32).collect();
        let tensor: Tensor = tract_ndarray::Array2::from_shape_vec(input.dim(), data)
            .context("Invalid input shape")?
            .into();

        let result = self.model.run(tvec!(tensor.into()))?;
        let output = result.get(0).context("No output from model")?;
        let output = output.cast_to::<f32>()?;
        let view = output.to_array_view::<f32>()?;
        Ok(view.iter().map(|&v| v as f64).collect())
    }
}

/// Ordinary least squares model: `x · coefficients + intercept`
#[derive(Debug, Clone)]
pub struct LinearRegressor {
    coefficients: tract_ndarray::Array1<f64>,
    intercept: f64,
}

impl LinearRegressor {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        if coefficients.is_empty() {
            bail!("coefficients must not be empty");
        }
        if coefficients.iter().any(|c| !c.is_finite()) || !intercept.is_finite() {
            bail!("model parameters must be finite");
        }
        Ok(Self {
            coefficients: tract_ndarray::Array1::from(coefficients),
            intercept,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }
}

impl Regressor for LinearRegressor {
    fn kind(&self) -> &'static str {
        "linear"
    }

    fn predict(&self, input: &tract_ndarray::Array2<f64>) -> Result<Vec<f64>> {
        if input.ncols() != self.coefficients.len() {
            bail!(
                "X has {} features, but LinearRegression is expecting {} features as input",
                input.ncols(),
                self.coefficients.len()
            );
        }
        let scores = input.dot(&self.coefficients);
        Ok(scores.iter().map(|s| s + self.intercept).collect())
    }
}

/// Serialized JSON model description
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Linear { coefficients: Vec<f64>, intercept: f64 },
}

impl ModelSpec {
    pub fn build(self) -> Result<Box<dyn Regressor>> {
        match self {
            ModelSpec::Linear { coefficients, intercept } => {
                Ok(Box::new(LinearRegressor::new(coefficients, intercept)?))
            }
        }
    }
}

/// Applies an artifact's scaler and model to a reconciled row
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceExecutor;

impl InferenceExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Scale then predict; any capability failure becomes `PredictionFailed`
    pub fn execute(&self, vector: &ReconciledVector, artifact: &Artifact) -> Result<f64, PipelineError> {
        let start = Instant::now();
        let failed = |e: anyhow::Error| PipelineError::PredictionFailed(format!("{:#}", e));

        let row = tract_ndarray::Array2::from_shape_vec((1, vector.len()), vector.values().to_vec())
            .map_err(|e| PipelineError::PredictionFailed(e.to_string()))?;

        let scaled = artifact.scaler().transform(&row).map_err(failed)?;
        let predictions = artifact.model().predict(&scaled).map_err(failed)?;

        let value = *predictions.first().ok_or_else(|| {
            PipelineError::PredictionFailed("Model returned no predictions".to_string())
        })?;
        if !value.is_finite() {
            return Err(PipelineError::PredictionFailed(format!(
                "Model returned a non-finite value ({})",
                value
            )));
        }

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::artifact::Artifact;
    use crate::predictor::scaler::ScalerSpec;
    use crate::predictor::schema::{ArtifactSchema, SchemaReconciler};
    use crate::collector::domain::default_record;
    use crate::predictor::features::FeatureDeriver;

    fn artifact(scaler: &str, model: &str) -> Artifact {
        let scaler = serde_json::from_str::<ScalerSpec>(scaler).unwrap().build().unwrap();
        let model = serde_json::from_str::<ModelSpec>(model).unwrap().build().unwrap();
        Artifact::new(scaler, model, "test")
    }

    fn vector_for(artifact: &Artifact) -> ReconciledVector {
        let derived = FeatureDeriver::default().derive(&default_record());
        SchemaReconciler::new().reconcile(&derived, artifact.schema())
    }

    #[test]
    fn test_linear_regressor_predicts_per_row() {
        let model = LinearRegressor::new(vec![2.0, 1.0], 10.0).unwrap();
        let input = tract_ndarray::Array2::from_shape_vec((2, 2), vec![1.0, 1.0, 3.0, 0.0]).unwrap();
        assert_eq!(model.predict(&input).unwrap(), vec![13.0, 16.0]);
    }

    #[test]
    fn test_execute_scales_then_predicts() {
        let artifact = artifact(
            r#"{"kind":"standard","mean":[0.0,2000.0],"scale":[50.0,1.0],"feature_names":["squareMeters","made"]}"#,
            r#"{"kind":"linear","coefficients":[100.0,1.0],"intercept":5.0}"#,
        );
        let vector = vector_for(&artifact);
        let value = InferenceExecutor::new().execute(&vector, &artifact).unwrap();
        // squareMeters 50 -> 1.0, made 2000 -> 0.0
        assert_eq!(value, 105.0);
    }

    #[test]
    fn test_dimension_mismatch_becomes_prediction_failed() {
        let artifact = artifact(
            r#"{"kind":"identity"}"#,
            r#"{"kind":"linear","coefficients":[1.0,1.0],"intercept":0.0}"#,
        );
        assert_eq!(artifact.schema(), &ArtifactSchema::Undeclared);
        let vector = vector_for(&artifact);
        let err = InferenceExecutor::new().execute(&vector, &artifact).unwrap_err();
        match err {
            PipelineError::PredictionFailed(msg) => assert!(msg.contains("expecting 2 features")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_onnx_bytes_rejected() {
        assert!(OnnxRegressor::from_bytes(b"not an onnx graph", Some(3)).is_err());
    }

    #[test]
    fn test_linear_model_requires_finite_parameters() {
        assert!(LinearRegressor::new(vec![], 0.0).is_err());
        assert!(LinearRegressor::new(vec![f64::NAN], 0.0).is_err());
    }
}
