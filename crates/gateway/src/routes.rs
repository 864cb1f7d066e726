use crate::error::ApiError;
use crate::state::{AppState, ValidateBillResponse};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
};
use serde::Serialize;
use std::time::Instant;

/// Multipart part carrying the image.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: state.classifier.kind().as_str(),
    })
}

pub async fn validate_bill(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ValidateBillResponse>, ApiError> {
    let start = Instant::now();
    let backend = state.classifier.kind().as_str();

    let outcome = match read_file_field(multipart).await {
        Ok(bytes) => state.classify(bytes).await,
        Err(e) => Err(e),
    };

    let label = match &outcome {
        Ok(_) => "ok",
        Err(e) => e.outcome(),
    };
    state.metrics.record(backend, label, start.elapsed());

    if let Ok(response) = &outcome {
        tracing::info!(
            backend,
            result = %response.result,
            probability = ?response.probability,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Bill classified"
        );
    }

    outcome.map(Json)
}

/// Bytes of the first file part named [`FILE_FIELD`].
///
/// A request that is not multipart at all, or whose `file` part is a plain
/// form value rather than an upload, counts as having no file.
async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Bytes, ApiError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(%rejection, "Request is not multipart");
            return Err(ApiError::MissingFile);
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) || field.file_name().is_none() {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        tracing::debug!(file_name = ?file_name, bytes = bytes.len(), "Received upload");
        return Ok(bytes);
    }

    Err(ApiError::MissingFile)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ApiError::Multipart(err.body_text())
    }
}
