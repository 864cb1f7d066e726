use crate::config::CustomVisionConfig;
use crate::error::UpstreamServiceError;
use crate::types::{ImagePrediction, TagPrediction};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;

const PREDICTION_KEY_HEADER: &str = "Prediction-Key";
const MAX_ERROR_BODY: usize = 512;

/// Hosted classifier client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct CustomVisionClient {
    http_client: reqwest::Client,
    classify_url: String,
    prediction_key: String,
}

impl CustomVisionClient {
    pub fn new(config: &CustomVisionConfig) -> Result<Self, UpstreamServiceError> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamServiceError::Config(e.to_string()))?;

        Ok(Self {
            http_client,
            classify_url: config.classify_url(),
            prediction_key: config.prediction_key.clone(),
        })
    }

    /// Send raw image bytes and return every tag the service scored.
    pub async fn classify_image(
        &self,
        image: impl Into<reqwest::Body>,
    ) -> Result<ImagePrediction, UpstreamServiceError> {
        let response = self
            .http_client
            .post(&self.classify_url)
            .header(PREDICTION_KEY_HEADER, &self.prediction_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await
            .map_err(UpstreamServiceError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let mut body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to read error response body");
                    String::new()
                }
            };
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| body.is_char_boundary(i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            tracing::warn!(status = status.as_u16(), body = %body, "Classification service rejected request");
            return Err(UpstreamServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let prediction: ImagePrediction = response
            .json()
            .await
            .map_err(UpstreamServiceError::Decode)?;

        tracing::debug!(
            predictions = prediction.predictions.len(),
            iteration = ?prediction.iteration,
            "Classification service responded"
        );
        Ok(prediction)
    }

    /// Highest-probability tag for the image.
    pub async fn best_prediction(
        &self,
        image: impl Into<reqwest::Body>,
    ) -> Result<TagPrediction, UpstreamServiceError> {
        let prediction = self.classify_image(image).await?;
        prediction
            .best()
            .cloned()
            .ok_or(UpstreamServiceError::NoPredictions)
    }
}
