//! Turns uploaded image bytes into the fixed-shape tensor the classifier
//! consumes: decode, force RGB, resize without preserving aspect ratio,
//! scale to `[0, 1]`, and lay out as `[1, 3, H, W]`.

pub mod config;
pub mod cpu;

use ndarray::Array4;
use thiserror::Error;

pub use config::{CHANNELS, DEFAULT_INPUT_SIZE};
pub use cpu::CpuPreProcessor;

/// Batch-first, channel-first `f32` tensor: `[1, 3, height, width]`.
pub type ImageTensor = Array4<f32>;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("invalid pixel buffer: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),

    #[error("resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),

    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl PreprocessError {
    /// True when the input bytes themselves are at fault rather than the
    /// pipeline.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::EmptyImage { .. })
    }
}

/// Trait for image preprocessing implementations.
pub trait Preprocess: Send + Sync {
    /// Produce an [`ImageTensor`] from encoded image bytes.
    fn preprocess(&self, bytes: &[u8]) -> Result<ImageTensor, PreprocessError>;

    /// Target (width, height) of the produced tensor.
    fn input_size(&self) -> (u32, u32);

    /// Full tensor shape this preprocessor emits.
    fn output_shape(&self) -> [usize; 4] {
        let (width, height) = self.input_size();
        [1, CHANNELS, height as usize, width as usize]
    }
}
