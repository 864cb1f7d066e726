use preprocess::PreprocessError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Startup-fatal: the service must not serve without a model.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("model file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load model from {path}: {reason}")]
    Runtime { path: PathBuf, reason: String },

    #[error("model {path} does not accept the preprocessed image: {reason}")]
    InputSignature { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum LabelLoadError {
    #[error("failed to read labels from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("input shape {actual:?} does not match model input {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("inference runtime error: {0}")]
    Runtime(String),

    #[error("unexpected model output: {0}")]
    Output(String),
}

/// Everything that can go wrong between upload bytes and a label.
#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl ClassifyError {
    /// The upload was not a decodable image.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Preprocess(e) if e.is_decode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_formatting() {
        let err = InferenceError::ShapeMismatch {
            expected: vec![1, 3, 224, 224],
            actual: vec![1, 3, 160, 320],
        };
        assert_eq!(
            err.to_string(),
            "input shape [1, 3, 160, 320] does not match model input [1, 3, 224, 224]"
        );

        let err = ModelLoadError::NotFound(PathBuf::from("onnx/model.onnx"));
        assert_eq!(err.to_string(), "model file not found: onnx/model.onnx");

        let err = LabelLoadError::Io {
            path: PathBuf::from("labels.txt"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(
            err.to_string(),
            "failed to read labels from labels.txt: no such file"
        );
    }

    #[test]
    fn test_classify_error_decode_classification() {
        let decode = image_decode_error();
        assert!(ClassifyError::from(decode).is_decode());

        let inference = ClassifyError::from(InferenceError::Runtime("boom".into()));
        assert!(!inference.is_decode());
        assert_eq!(inference.to_string(), "inference runtime error: boom");
    }

    fn image_decode_error() -> PreprocessError {
        preprocess::CpuPreProcessor::decode(b"not an image").unwrap_err()
    }
}
