use crate::error::{InferenceError, ModelLoadError};
use ndarray::ArrayD;
use preprocess::ImageTensor;
use std::path::Path;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// A loaded classification model.
///
/// `infer` takes `&mut self` because runtimes keep per-session scratch
/// state; callers sharing a backend across threads wrap it in a mutex.
pub trait InferenceBackend {
    fn load_model(path: &Path) -> Result<Self, ModelLoadError>
    where
        Self: Sized;

    /// Run the forward pass on a single `[1, 3, H, W]` tensor.
    fn infer(&mut self, input: &ImageTensor) -> Result<InferenceOutput, InferenceError>;

    /// Input shape the model was loaded for, if known.
    fn input_shape(&self) -> Option<&[usize]> {
        None
    }
}

/// Raw per-class scores, typically `[1, num_classes]`.
#[derive(Debug, Clone)]
pub struct InferenceOutput {
    pub scores: ArrayD<f32>,
}

/// Reject a tensor whose shape differs from the declared model input.
pub fn check_input_shape(expected: &[usize], input: &ImageTensor) -> Result<(), InferenceError> {
    if input.shape() != expected {
        return Err(InferenceError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}
