use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use custom_vision::UpstreamServiceError;
use inference::ClassifyError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    /// Message and status are part of the public contract.
    #[error("No file uploaded")]
    MissingFile,

    #[error("Malformed multipart body: {0}")]
    Multipart(String),

    #[error("Uploaded file exceeds the size limit")]
    PayloadTooLarge,

    #[error("Uploaded file is not a valid image")]
    Decode(#[source] ClassifyError),

    #[error("Inference failed")]
    Inference(#[source] ClassifyError),

    #[error("Classification service unavailable")]
    Upstream(#[from] UpstreamServiceError),

    #[error("Classification worker failed")]
    Worker(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Inference(_) | ApiError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Metric attribute value.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::MissingFile => "missing_file",
            ApiError::Multipart(_) => "bad_multipart",
            ApiError::PayloadTooLarge => "too_large",
            ApiError::Decode(_) => "decode_error",
            ApiError::Inference(_) => "inference_error",
            ApiError::Upstream(_) => "upstream_error",
            ApiError::Worker(_) => "worker_error",
        }
    }
}

impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        if err.is_decode() {
            ApiError::Decode(err)
        } else {
            ApiError::Inference(err)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ApiError::Decode(source) | ApiError::Inference(source) => {
                tracing::warn!(status = status.as_u16(), error = %source, "{}", self);
            }
            ApiError::Upstream(source) => {
                tracing::error!(status = status.as_u16(), error = %source, "{}", self);
            }
            ApiError::Worker(detail) => {
                tracing::error!(status = status.as_u16(), error = %detail, "{}", self);
            }
            _ => tracing::debug!(status = status.as_u16(), "{}", self),
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference::InferenceError;

    #[test]
    fn test_missing_file_contract() {
        let err = ApiError::MissingFile;
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "No file uploaded");
    }

    #[test]
    fn test_classify_error_mapping() {
        let decode = preprocess::CpuPreProcessor::decode(b"nope").unwrap_err();
        let err = ApiError::from(ClassifyError::from(decode));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err = ApiError::from(ClassifyError::from(InferenceError::ShapeMismatch {
            expected: vec![1, 3, 224, 224],
            actual: vec![1, 3, 10, 10],
        }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.outcome(), "inference_error");
    }

    #[test]
    fn test_upstream_is_bad_gateway() {
        let err = ApiError::from(UpstreamServiceError::NoPredictions);
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }
}
