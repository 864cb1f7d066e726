pub mod backend;
pub mod classifier;
pub mod error;
pub mod labels;
pub mod postprocessing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use classifier::{Classification, ModelClassifier};
#[cfg(feature = "ort-backend")]
pub use classifier::StartupError;
pub use error::{ClassifyError, InferenceError, LabelLoadError, ModelLoadError};
pub use labels::LabelStore;
pub use postprocessing::argmax;
