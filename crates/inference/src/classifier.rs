use crate::backend::InferenceBackend;
use crate::error::ClassifyError;
use crate::labels::LabelStore;
use crate::postprocessing::argmax;
use common::span;
use preprocess::Preprocess;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub index: usize,
    pub label: String,
    /// Raw model score for `index`, not necessarily a probability.
    pub score: f32,
}

/// Preprocessor, model and labels, loaded once and shared by every request.
pub struct ModelClassifier {
    preprocessor: Box<dyn Preprocess>,
    backend: Mutex<Box<dyn InferenceBackend + Send>>,
    labels: LabelStore,
}

impl ModelClassifier {
    pub fn new(
        preprocessor: impl Preprocess + 'static,
        backend: impl InferenceBackend + Send + 'static,
        labels: LabelStore,
    ) -> Self {
        if let Some(shape) = backend.input_shape() {
            let produced = preprocessor.output_shape();
            if shape != produced.as_slice() {
                tracing::warn!(
                    model_input = ?shape,
                    preprocessor_output = ?produced,
                    "Preprocessor output does not match model input; every request will fail"
                );
            }
        }

        Self {
            preprocessor: Box::new(preprocessor),
            backend: Mutex::new(Box::new(backend)),
            labels,
        }
    }

    pub fn labels(&self) -> &LabelStore {
        &self.labels
    }

    /// A panic in an earlier `infer` call only failed that request; the
    /// backend holds no state across calls, so keep serving with it.
    fn lock_backend(&self) -> MutexGuard<'_, Box<dyn InferenceBackend + Send>> {
        self.backend.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            tracing::warn!("Inference backend panicked on an earlier request; recovering");
            self.backend.clear_poison();
            poisoned.into_inner()
        })
    }

    /// Decode, run the model, and name the top class.
    ///
    /// Blocking: call from a worker thread, not an async task.
    pub fn classify(&self, bytes: &[u8]) -> Result<Classification, ClassifyError> {
        let _s = span!("classify", bytes = bytes.len());

        let tensor = self.preprocessor.preprocess(bytes)?;

        let output = self.lock_backend().infer(&tensor)?;

        let (index, score) = argmax(output.scores.view())?;

        if !self.labels.contains(index) {
            tracing::warn!(
                index,
                labels = self.labels.len(),
                "Predicted class has no label; reporting index"
            );
        }
        let label = self.labels.label_for(index).into_owned();

        tracing::debug!(index, score, label = %label, "Classified image");
        Ok(Classification {
            index,
            label,
            score,
        })
    }
}

#[cfg(feature = "ort-backend")]
mod ort_loader {
    use super::ModelClassifier;
    use crate::backend::ort::{OrtBackend, OrtOptions};
    use crate::error::{LabelLoadError, ModelLoadError};
    use crate::labels::LabelStore;
    use preprocess::CpuPreProcessor;
    use std::path::Path;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum StartupError {
        #[error(transparent)]
        Model(#[from] ModelLoadError),

        #[error(transparent)]
        Labels(#[from] LabelLoadError),
    }

    impl ModelClassifier {
        /// Load the ONNX model and label file for the given input size.
        pub fn load_onnx(
            model_path: &Path,
            labels_path: &Path,
            input_size: (u32, u32),
            intra_threads: usize,
        ) -> Result<Self, StartupError> {
            let labels = LabelStore::load(labels_path)?;
            let options = OrtOptions {
                intra_threads,
                ..OrtOptions::for_input_size(input_size)
            };
            let backend = OrtBackend::load_model_with_options(model_path, options)?;

            Ok(Self::new(CpuPreProcessor::new(input_size), backend, labels))
        }
    }
}

#[cfg(feature = "ort-backend")]
pub use ort_loader::StartupError;
