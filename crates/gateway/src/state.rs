use crate::config::{BackendKind, GatewayConfig};
use crate::error::ApiError;
use crate::metrics::RequestMetrics;
use axum::body::Bytes;
use custom_vision::CustomVisionClient;
use inference::ModelClassifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Success body of `/validate-bill`.
///
/// The ONNX-backed service answers with `result` only; the hosted
/// classifier also reports `probability`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidateBillResponse {
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
}

#[derive(Clone)]
pub enum Classifier {
    Onnx(Arc<ModelClassifier>),
    CustomVision(CustomVisionClient),
}

impl Classifier {
    pub fn kind(&self) -> BackendKind {
        match self {
            Classifier::Onnx(_) => BackendKind::Onnx,
            Classifier::CustomVision(_) => BackendKind::CustomVision,
        }
    }
}

/// Everything a request handler needs; built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Classifier,
    pub inference_permits: Arc<Semaphore>,
    pub metrics: RequestMetrics,
}

impl AppState {
    pub fn new(classifier: Classifier, max_concurrent_inferences: usize) -> Self {
        Self {
            classifier,
            inference_permits: Arc::new(Semaphore::new(max_concurrent_inferences)),
            metrics: RequestMetrics::new("gateway"),
        }
    }

    /// Load the configured classifier. Any failure here must stop startup.
    pub fn initialize(config: &GatewayConfig) -> anyhow::Result<Self> {
        let classifier = match config.backend {
            BackendKind::Onnx => Classifier::Onnx(Arc::new(load_onnx(config)?)),
            BackendKind::CustomVision => {
                tracing::info!(
                    config = ?config.custom_vision,
                    "Using hosted classification service"
                );
                Classifier::CustomVision(CustomVisionClient::new(&config.custom_vision)?)
            }
        };

        Ok(Self::new(classifier, config.max_concurrent_inferences))
    }

    pub async fn classify(&self, bytes: Bytes) -> Result<ValidateBillResponse, ApiError> {
        match &self.classifier {
            Classifier::Onnx(model) => {
                let permit = self
                    .inference_permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| ApiError::Worker(e.to_string()))?;
                let model = Arc::clone(model);

                let classification = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    model.classify(&bytes)
                })
                .await
                .map_err(|e| ApiError::Worker(e.to_string()))??;

                Ok(ValidateBillResponse {
                    result: classification.label,
                    probability: None,
                })
            }
            Classifier::CustomVision(client) => {
                let best = client.best_prediction(bytes).await?;
                Ok(ValidateBillResponse {
                    result: best.tag_name,
                    probability: Some(best.probability),
                })
            }
        }
    }
}

#[cfg(feature = "ort-backend")]
fn load_onnx(config: &GatewayConfig) -> anyhow::Result<ModelClassifier> {
    tracing::info!(
        model_path = %config.model_path.display(),
        labels_path = %config.labels_path.display(),
        "Loading inference model"
    );
    let classifier = ModelClassifier::load_onnx(
        &config.model_path,
        &config.labels_path,
        config.input_size(),
        config.intra_threads,
    )?;
    tracing::info!(labels = classifier.labels().len(), "Model loaded successfully");
    Ok(classifier)
}

#[cfg(not(feature = "ort-backend"))]
fn load_onnx(_config: &GatewayConfig) -> anyhow::Result<ModelClassifier> {
    anyhow::bail!("built without the `ort-backend` feature; set VALIDATOR_BACKEND=custom_vision")
}
