use super::{InferenceBackend, InferenceOutput, check_input_shape};
use crate::error::{InferenceError, ModelLoadError};
use common::span;
use ort::{
    environment::Environment,
    session::{Session, builder::GraphOptimizationLevel},
    value::{TensorElementType, TensorRef, ValueType},
};
use preprocess::{CHANNELS, DEFAULT_INPUT_SIZE, ImageTensor};
use std::fmt::Display;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// ONNX Runtime allows one environment per process; every session shares it.
static ENVIRONMENT: Mutex<Option<Environment>> = Mutex::new(None);

fn shared_environment() -> ort::Result<Environment> {
    let mut slot = ENVIRONMENT.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(environment) = slot.as_ref() {
        return Ok(environment.clone());
    }
    let environment = ort::init().with_name("bill-validator").build()?;
    *slot = Some(environment.clone());
    Ok(environment)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    #[cfg(feature = "cuda")]
    Cuda,
}

#[derive(Debug, Clone)]
pub struct OrtOptions {
    pub provider: ExecutionProvider,
    pub intra_threads: usize,
    /// Shape every input tensor must have, `[1, 3, H, W]`.
    pub input_shape: Vec<usize>,
}

impl OrtOptions {
    pub fn for_input_size(input_size: (u32, u32)) -> Self {
        let (width, height) = input_size;
        Self {
            input_shape: vec![1, CHANNELS, height as usize, width as usize],
            ..Self::default()
        }
    }
}

impl Default for OrtOptions {
    fn default() -> Self {
        let (width, height) = DEFAULT_INPUT_SIZE;
        Self {
            provider: ExecutionProvider::default(),
            intra_threads: 4,
            input_shape: vec![1, CHANNELS, height as usize, width as usize],
        }
    }
}

/// ONNX Runtime session feeding the first model input and reading the first
/// output as `f32` class scores.
pub struct OrtBackend {
    session: Session,
    input_shape: Vec<usize>,
}

fn load_error(path: &Path, reason: impl Display) -> ModelLoadError {
    ModelLoadError::Runtime {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn runtime_error(reason: impl Display) -> InferenceError {
    InferenceError::Runtime(reason.to_string())
}

impl OrtBackend {
    pub fn load_model_with_options(
        path: &Path,
        options: OrtOptions,
    ) -> Result<Self, ModelLoadError> {
        if !path.is_file() {
            return Err(ModelLoadError::NotFound(path.to_path_buf()));
        }

        let environment = shared_environment().map_err(|e| load_error(path, e))?;

        let mut builder = Session::builder(&environment)
            .map_err(|e| load_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_error(path, e))?
            .with_intra_threads(options.intra_threads)
            .map_err(|e| load_error(path, e))?;

        match options.provider {
            #[cfg(feature = "cuda")]
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder
                    .with_execution_providers([
                        ort::ep::CUDA::default()
                            .with_device_id(0)
                            .build()
                            .error_on_failure(),
                    ])
                    .map_err(|e| load_error(path, e))?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder
            .commit_from_file(path)
            .map_err(|e| load_error(path, e))?;

        let input = session
            .inputs()
            .first()
            .ok_or_else(|| load_error(path, "model declares no inputs"))?;
        check_declared_input(input.dtype(), &options.input_shape).map_err(|reason| {
            ModelLoadError::InputSignature {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        tracing::info!(
            path = %path.display(),
            input_shape = ?options.input_shape,
            intra_threads = options.intra_threads,
            "Model loaded"
        );

        Ok(Self {
            session,
            input_shape: options.input_shape,
        })
    }
}

/// Compare the model's first declared input with the tensor the preprocessor
/// emits. Negative (symbolic) dimensions match any size.
fn check_declared_input(declared: &ValueType, expected: &[usize]) -> Result<(), String> {
    let (Some(element_type), Some(shape)) = (declared.tensor_type(), declared.tensor_shape())
    else {
        return Err(format!("first input is not a tensor: {declared:?}"));
    };

    if element_type != TensorElementType::Float32 {
        return Err(format!(
            "first input expects {element_type:?} elements, preprocessing produces Float32"
        ));
    }

    let dims: &[i64] = shape;
    let matches = dims.len() == expected.len()
        && dims
            .iter()
            .zip(expected)
            .all(|(&dim, &produced)| dim < 0 || dim as usize == produced);
    if !matches {
        return Err(format!(
            "first input has shape {dims:?}, preprocessing produces {expected:?}"
        ));
    }

    Ok(())
}

impl InferenceBackend for OrtBackend {
    fn load_model(path: &Path) -> Result<Self, ModelLoadError> {
        Self::load_model_with_options(path, OrtOptions::default())
    }

    fn infer(&mut self, input: &ImageTensor) -> Result<InferenceOutput, InferenceError> {
        let _s = span!("ort_infer");

        check_input_shape(&self.input_shape, input)?;

        let tensor = TensorRef::from_array_view(input.view().into_dyn()).map_err(runtime_error)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(runtime_error)?;

        let scores = outputs[0]
            .try_extract_array::<f32>()
            .map_err(runtime_error)?
            .into_owned();

        tracing::trace!(shape = ?scores.shape(), "Model output");
        Ok(InferenceOutput { scores })
    }

    fn input_shape(&self) -> Option<&[usize]> {
        Some(&self.input_shape)
    }
}
