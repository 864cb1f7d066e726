use crate::error::UpstreamServiceError;
use serde::Deserialize;
use std::fmt;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Where and how to reach the published classifier iteration.
#[derive(Clone, Deserialize)]
pub struct CustomVisionConfig {
    /// Prediction resource base URL, e.g. `https://<name>.cognitiveservices.azure.com/`.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub project_id: String,
    /// Published iteration name, e.g. `Iteration4`.
    #[serde(default)]
    pub iteration_name: String,
    #[serde(default)]
    pub prediction_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CustomVisionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            project_id: String::new(),
            iteration_name: String::new(),
            prediction_key: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CustomVisionConfig {
    pub fn validate(&self) -> Result<(), UpstreamServiceError> {
        let missing: Vec<&str> = [
            ("endpoint", &self.endpoint),
            ("project_id", &self.project_id),
            ("iteration_name", &self.iteration_name),
            ("prediction_key", &self.prediction_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(UpstreamServiceError::Config(format!(
                "missing {}",
                missing.join(", ")
            )));
        }
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(UpstreamServiceError::Config(format!(
                "endpoint must be an http(s) URL, got {}",
                self.endpoint
            )));
        }
        Ok(())
    }

    /// Classify-image URL for the configured project and iteration.
    pub fn classify_url(&self) -> String {
        format!(
            "{}/customvision/v3.0/Prediction/{}/classify/iterations/{}/image",
            self.endpoint.trim_end_matches('/'),
            self.project_id,
            self.iteration_name
        )
    }
}

impl fmt::Debug for CustomVisionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomVisionConfig")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("iteration_name", &self.iteration_name)
            .field("prediction_key", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CustomVisionConfig {
        CustomVisionConfig {
            endpoint: "https://billclassifier.cognitiveservices.azure.com/".to_string(),
            project_id: "proj".to_string(),
            iteration_name: "Iteration4".to_string(),
            prediction_key: "secret-key".to_string(),
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_classify_url() {
        assert_eq!(
            sample().classify_url(),
            "https://billclassifier.cognitiveservices.azure.com/customvision/v3.0/Prediction/proj/classify/iterations/Iteration4/image"
        );
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let config = CustomVisionConfig {
            project_id: String::new(),
            prediction_key: "  ".to_string(),
            ..sample()
        };

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("project_id"), "{err}");
        assert!(err.contains("prediction_key"), "{err}");
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_non_http_endpoint() {
        let config = CustomVisionConfig {
            endpoint: "billclassifier.cognitiveservices.azure.com".to_string(),
            ..sample()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let rendered = format!("{:?}", sample());
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
