//! Error taxonomy for the pricing pipeline
//!
//! Every variant is recovered at the submission boundary: none of them
//! crash a session or change its lifecycle state.

use thiserror::Error;

/// Errors produced while turning raw input into a prediction
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// One or more recognized raw fields were absent from the input map
    #[error("Incomplete input: missing field(s) {}", .missing.join(", "))]
    IncompleteInput { missing: Vec<String> },

    /// A raw field was present but had the wrong type or an out-of-range value
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// The loaded artifact declares no feature list
    #[error("Artifact declares no feature schema")]
    SchemaUnavailable,

    /// The artifact's transform or predict capability failed
    #[error("Prediction failed: {0}")]
    PredictionFailed(String),

    /// An artifact file could not be read or parsed
    #[error("Failed to load artifact from {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },

    /// A submission arrived before any artifact was loaded
    #[error("No artifact loaded; load a model and scaler first")]
    NoArtifact,
}

impl PipelineError {
    /// Stable machine-readable kind, used for metrics labels and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::IncompleteInput { .. } => "incomplete_input",
            PipelineError::InvalidInput { .. } => "invalid_input",
            PipelineError::SchemaUnavailable => "schema_unavailable",
            PipelineError::PredictionFailed(_) => "prediction_failed",
            PipelineError::ArtifactLoad { .. } => "artifact_load",
            PipelineError::NoArtifact => "no_artifact",
        }
    }

    /// Whether the error was caused by the caller's input rather than the artifact
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::IncompleteInput { .. } | PipelineError::InvalidInput { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_input_lists_fields() {
        let err = PipelineError::IncompleteInput {
            missing: vec!["garage".to_string(), "attic".to_string()],
        };
        assert_eq!(err.to_string(), "Incomplete input: missing field(s) garage, attic");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            PipelineError::IncompleteInput { missing: vec![] },
            PipelineError::InvalidInput { field: "a".into(), reason: "b".into() },
            PipelineError::SchemaUnavailable,
            PipelineError::PredictionFailed("x".into()),
            PipelineError::ArtifactLoad { path: "p".into(), reason: "r".into() },
            PipelineError::NoArtifact,
        ];
        let mut kinds: Vec<&str> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
