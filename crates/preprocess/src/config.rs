/// Spatial resolution (width, height) the bill classifier was trained on.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (224, 224);

/// Number of colour channels in every produced tensor.
pub const CHANNELS: usize = 3;

pub(crate) const PIXEL_SCALE: f32 = 255.0;
