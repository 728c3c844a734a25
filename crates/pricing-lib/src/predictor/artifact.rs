//! Artifact loading
//!
//! An artifact is the scaler + model pair produced at training time. It is
//! loaded once per session, fingerprinted, and never mutated afterwards.
//! The scaler's declared feature names are captured here as the artifact's
//! schema so reconciliation never has to query the scaler again.

use super::inference::{ModelSpec, OnnxRegressor};
use super::scaler::ScalerSpec;
use super::schema::ArtifactSchema;
use super::{Regressor, Scaler};
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default maximum size of a single artifact file (64MB)
pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 64 * 1024 * 1024;

/// Length of the version fingerprint in hex characters
const VERSION_LEN: usize = 12;

/// Loaded scaler + model pair
pub struct Artifact {
    scaler: Box<dyn Scaler>,
    model: Box<dyn Regressor>,
    schema: ArtifactSchema,
    version: String,
    loaded_at: i64,
}

impl Artifact {
    pub fn new(scaler: Box<dyn Scaler>, model: Box<dyn Regressor>, version: impl Into<String>) -> Self {
        let schema = ArtifactSchema::from_names(scaler.feature_names().map(|n| n.to_vec()));
        Self {
            scaler,
            model,
            schema,
            version: version.into(),
            loaded_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn scaler(&self) -> &dyn Scaler {
        self.scaler.as_ref()
    }

    pub fn model(&self) -> &dyn Regressor {
        self.model.as_ref()
    }

    pub fn schema(&self) -> &ArtifactSchema {
        &self.schema
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            version: self.version.clone(),
            scaler_kind: self.scaler.kind().to_string(),
            model_kind: self.model.kind().to_string(),
            feature_names: self.schema.declared().map(|s| s.names().to_vec()),
            loaded_at: self.loaded_at,
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("version", &self.version)
            .field("scaler", &self.scaler.kind())
            .field("model", &self.model.kind())
            .field("schema", &self.schema)
            .finish()
    }
}

/// Serializable summary of a loaded artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub version: String,
    pub scaler_kind: String,
    pub model_kind: String,
    pub feature_names: Option<Vec<String>>,
    pub loaded_at: i64,
}

/// Locations of the two files making up an artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSource {
    pub scaler_path: PathBuf,
    pub model_path: PathBuf,
}

/// How the model bytes should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFormat {
    Onnx,
    Json,
}

impl ModelFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("onnx") => ModelFormat::Onnx,
            _ => ModelFormat::Json,
        }
    }
}

/// Reads, validates and fingerprints artifact files
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    max_bytes: u64,
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ARTIFACT_BYTES)
    }
}

impl ArtifactLoader {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    /// Load both files of an artifact from disk
    pub fn load(&self, source: &ArtifactSource) -> Result<Artifact, PipelineError> {
        let scaler_bytes = self.read(&source.scaler_path)?;
        let model_bytes = self.read(&source.model_path)?;
        let format = ModelFormat::from_path(&source.model_path);

        let artifact = self
            .load_bytes(&scaler_bytes, &model_bytes, format)
            .map_err(|err| match err {
                PipelineError::ArtifactLoad { path, reason } => {
                    let path = if path == "scaler" {
                        source.scaler_path.display().to_string()
                    } else {
                        source.model_path.display().to_string()
                    };
                    PipelineError::ArtifactLoad { path, reason }
                }
                other => other,
            })?;

        info!(
            version = %artifact.version(),
            scaler = %source.scaler_path.display(),
            model = %source.model_path.display(),
            "Artifact loaded"
        );
        Ok(artifact)
    }

    /// Build an artifact from in-memory scaler and model bytes
    pub fn load_bytes(
        &self,
        scaler_bytes: &[u8],
        model_bytes: &[u8],
        format: ModelFormat,
    ) -> Result<Artifact, PipelineError> {
        let scaler = serde_json::from_slice::<ScalerSpec>(scaler_bytes)
            .map_err(anyhow::Error::from)
            .and_then(ScalerSpec::build)
            .map_err(|e| load_error("scaler", e))?;

        let model: Box<dyn Regressor> = match format {
            ModelFormat::Onnx => OnnxRegressor::from_bytes(model_bytes, scaler.input_width())
                .map(|m| Box::new(m) as Box<dyn Regressor>),
            ModelFormat::Json => serde_json::from_slice::<ModelSpec>(model_bytes)
                .map_err(anyhow::Error::from)
                .and_then(ModelSpec::build),
        }
        .map_err(|e| load_error("model", e))?;

        let version = compute_version(scaler_bytes, model_bytes);
        debug!(
            version = %version,
            scaler = scaler.kind(),
            model = model.kind(),
            "Artifact parsed"
        );

        Ok(Artifact::new(scaler, model, version))
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, PipelineError> {
        let metadata = fs::metadata(path).map_err(|e| load_error_at(path, e))?;
        if metadata.len() > self.max_bytes {
            return Err(load_error_at(
                path,
                format!("file size {} exceeds maximum {}", metadata.len(), self.max_bytes),
            ));
        }
        fs::read(path).map_err(|e| load_error_at(path, e))
    }
}

fn load_error(path: &str, reason: anyhow::Error) -> PipelineError {
    PipelineError::ArtifactLoad {
        path: path.to_string(),
        reason: format!("{:#}", reason),
    }
}

fn load_error_at(path: &Path, reason: impl fmt::Display) -> PipelineError {
    PipelineError::ArtifactLoad {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

/// Version fingerprint: truncated SHA256 over scaler then model bytes
pub fn compute_version(scaler_bytes: &[u8], model_bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(scaler_bytes);
    hasher.update(model_bytes);
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(VERSION_LEN);
    digest
}
