//! Client for a hosted image-classification prediction endpoint
//! (Azure Custom Vision, v3.0 prediction API).

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::CustomVisionClient;
pub use config::CustomVisionConfig;
pub use error::UpstreamServiceError;
pub use types::{ImagePrediction, TagPrediction};
