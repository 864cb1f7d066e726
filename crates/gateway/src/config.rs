use common::Environment;
use custom_vision::CustomVisionConfig;
use serde::Deserialize;
use std::path::PathBuf;

const ENV_PREFIX: &str = "VALIDATOR";

/// Which classifier answers `/validate-bill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Onnx,
    CustomVision,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Onnx => "onnx",
            BackendKind::CustomVision => "custom_vision",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub bind_addr: String,
    pub backend: BackendKind,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub intra_threads: usize,
    pub max_upload_bytes: usize,
    pub max_concurrent_inferences: usize,
    #[serde(default)]
    pub otel_endpoint: Option<String>,
    #[serde(default)]
    pub custom_vision: CustomVisionConfig,
}

impl GatewayConfig {
    pub fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(config::ConfigError::Message(format!(
                "input size must be non-zero, got {}x{}",
                self.input_width, self.input_height
            )));
        }
        if self.max_concurrent_inferences == 0 {
            return Err(config::ConfigError::Message(
                "max_concurrent_inferences must be at least 1".to_string(),
            ));
        }
        if self.backend == BackendKind::CustomVision {
            self.custom_vision
                .validate()
                .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        }
        Ok(())
    }
}

/// Load configuration from `VALIDATOR_*` environment variables.
///
/// Nested keys use `__`, e.g. `VALIDATOR_CUSTOM_VISION__PREDICTION_KEY`.
pub fn get_configuration() -> Result<GatewayConfig, config::ConfigError> {
    load(config::Environment::with_prefix(ENV_PREFIX))
}

fn load(source: config::Environment) -> Result<GatewayConfig, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("environment", Environment::from_env().as_str())?
        .set_default("bind_addr", "0.0.0.0:8000")?
        .set_default("backend", BackendKind::Onnx.as_str())?
        .set_default("model_path", "onnx/model.onnx")?
        .set_default("labels_path", "onnx/labels.txt")?
        .set_default("input_width", 224_i64)?
        .set_default("input_height", 224_i64)?
        .set_default("intra_threads", 4_i64)?
        .set_default("max_upload_bytes", 16_i64 * 1024 * 1024)?
        .set_default("max_concurrent_inferences", 4_i64)?
        .add_source(
            source
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let config: GatewayConfig = config.try_deserialize()?;
    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(vars: &[(&str, &str)]) -> Result<GatewayConfig, config::ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load(config::Environment::with_prefix(ENV_PREFIX).source(Some(map)))
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.backend, BackendKind::Onnx);
        assert_eq!(config.model_path, PathBuf::from("onnx/model.onnx"));
        assert_eq!(config.labels_path, PathBuf::from("onnx/labels.txt"));
        assert_eq!(config.input_size(), (224, 224));
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(config.otel_endpoint, None);
    }

    #[test]
    fn test_env_overrides() {
        let config = load_with(&[
            ("VALIDATOR_BIND_ADDR", "127.0.0.1:9000"),
            ("VALIDATOR_ENVIRONMENT", "production"),
            ("VALIDATOR_INPUT_WIDTH", "256"),
            ("VALIDATOR_MAX_CONCURRENT_INFERENCES", "2"),
            ("VALIDATOR_OTEL_ENDPOINT", "http://collector:4317"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.input_size(), (256, 224));
        assert_eq!(config.max_concurrent_inferences, 2);
        assert_eq!(config.otel_endpoint.as_deref(), Some("http://collector:4317"));
    }

    #[test]
    fn test_custom_vision_backend_requires_credentials() {
        let err = load_with(&[("VALIDATOR_BACKEND", "custom_vision")]).unwrap_err();
        assert!(err.to_string().contains("prediction_key"), "{err}");

        let config = load_with(&[
            ("VALIDATOR_BACKEND", "custom_vision"),
            (
                "VALIDATOR_CUSTOM_VISION__ENDPOINT",
                "https://billclassifier.cognitiveservices.azure.com/",
            ),
            ("VALIDATOR_CUSTOM_VISION__PROJECT_ID", "proj"),
            ("VALIDATOR_CUSTOM_VISION__ITERATION_NAME", "Iteration4"),
            ("VALIDATOR_CUSTOM_VISION__PREDICTION_KEY", "key"),
        ])
        .unwrap();
        assert_eq!(config.backend, BackendKind::CustomVision);
        assert_eq!(config.custom_vision.iteration_name, "Iteration4");
        assert_eq!(config.custom_vision.timeout_secs, 30);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        assert!(load_with(&[("VALIDATOR_MAX_CONCURRENT_INFERENCES", "0")]).is_err());
    }
}
