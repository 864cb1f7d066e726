use thiserror::Error;

/// Failure talking to the hosted classifier. Never retried.
#[derive(Error, Debug)]
pub enum UpstreamServiceError {
    #[error("invalid classification service configuration: {0}")]
    Config(String),

    #[error("request to classification service failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("classification service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response from classification service: {0}")]
    Decode(#[source] reqwest::Error),

    #[error("classification service returned no predictions")]
    NoPredictions,
}

impl UpstreamServiceError {
    /// The service rejected our prediction key.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}
