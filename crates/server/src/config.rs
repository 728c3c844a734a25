//! Server configuration

use anyhow::{ensure, Context, Result};
use pricing_lib::predictor::{ArtifactSource, DEFAULT_MAX_ARTIFACT_BYTES};
use pricing_lib::PipelineConfig;
use serde::Deserialize;

/// Environment variable naming an optional config file
pub const CONFIG_FILE_ENV: &str = "PRICER_CONFIG";

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Service name attached to structured log events
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Port for the session API and health/metrics endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Largest scaler or model file accepted
    #[serde(default = "default_max_artifact_bytes")]
    pub max_artifact_bytes: u64,

    /// Idle time after which a session is evicted
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// How often idle sessions are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Artifact loaded into every new session that does not bring its own
    #[serde(default)]
    pub default_artifact: Option<ArtifactSource>,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

fn default_service_name() -> String {
    "price-server".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_max_artifact_bytes() -> u64 {
    DEFAULT_MAX_ARTIFACT_BYTES
}

fn default_session_ttl() -> u64 {
    3600
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            api_port: default_api_port(),
            max_artifact_bytes: default_max_artifact_bytes(),
            session_ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_sweep_interval(),
            default_artifact: None,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from an optional file and `PRICER_*` environment variables.
    ///
    /// Nested keys use `__`, e.g. `PRICER_PIPELINE__REFERENCE_YEAR=2026`.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            builder = builder.add_source(config::File::with_name(&path));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("PRICER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("pipeline.city_part_buckets"),
            )
            .build()
            .context("Failed to read configuration")?;

        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        let parsed: ServerConfig = config
            .try_deserialize()
            .context("Invalid server configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        ensure!(self.sweep_interval_secs > 0, "sweep_interval_secs must be positive");
        ensure!(self.max_artifact_bytes > 0, "max_artifact_bytes must be positive");
        ensure!(
            self.pipeline.price_per_sqm_multiplier.is_finite(),
            "pipeline.price_per_sqm_multiplier must be finite"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = config::Config::builder().build().unwrap();
        let parsed = ServerConfig::from_config(config).unwrap();

        assert_eq!(parsed.api_port, 8080);
        assert_eq!(parsed.session_ttl_secs, 3600);
        assert_eq!(parsed.max_artifact_bytes, DEFAULT_MAX_ARTIFACT_BYTES);
        assert!(parsed.default_artifact.is_none());
        assert_eq!(parsed.pipeline, PipelineConfig::default());
    }

    #[test]
    fn test_nested_overrides() {
        let config = config::Config::builder()
            .set_override("api_port", 9090)
            .unwrap()
            .set_override("pipeline.reference_year", 2030)
            .unwrap()
            .set_override("default_artifact.scaler_path", "/models/scaler.json")
            .unwrap()
            .set_override("default_artifact.model_path", "/models/model.onnx")
            .unwrap()
            .build()
            .unwrap();
        let parsed = ServerConfig::from_config(config).unwrap();

        assert_eq!(parsed.api_port, 9090);
        assert_eq!(parsed.pipeline.reference_year, 2030);
        assert_eq!(parsed.pipeline.city_part_buckets, vec![3, 4, 5, 6, 7, 9, 10]);
        let artifact = parsed.default_artifact.unwrap();
        assert_eq!(artifact.model_path.to_str(), Some("/models/model.onnx"));
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let config = config::Config::builder()
            .set_override("sweep_interval_secs", 0)
            .unwrap()
            .build()
            .unwrap();
        assert!(ServerConfig::from_config(config).is_err());
    }
}
