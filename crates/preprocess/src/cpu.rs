use crate::config::{CHANNELS, DEFAULT_INPUT_SIZE, PIXEL_SCALE};
use crate::{ImageTensor, Preprocess, PreprocessError};
use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::RgbImage;
use ndarray::Array4;

/// Bicubic, matching the resampling the classifier was trained with.
const RESIZE_FILTER: FilterType = FilterType::CatmullRom;

/// Stateless CPU preprocessor; safe to share across request handlers.
#[derive(Debug, Clone)]
pub struct CpuPreProcessor {
    pub input_size: (u32, u32),
}

impl CpuPreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }

    /// Decode `bytes` (any enabled format) into an 8-bit RGB grid.
    ///
    /// Alpha is dropped and grayscale expanded to three channels.
    pub fn decode(bytes: &[u8]) -> Result<RgbImage, PreprocessError> {
        let _s = span!("decode_image", bytes = bytes.len());

        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width == 0 || height == 0 {
            return Err(PreprocessError::EmptyImage { width, height });
        }

        tracing::trace!(width, height, "Decoded image");
        Ok(rgb)
    }

    /// Run the tensor stage on already decoded pixels.
    pub fn preprocess_rgb(&self, rgb: &RgbImage) -> Result<ImageTensor, PreprocessError> {
        let resized = self.resize(rgb)?;
        Self::to_chw_tensor(&resized)
    }

    fn resize(&self, rgb: &RgbImage) -> Result<Image<'static>, PreprocessError> {
        let _s = span!("resize");

        let (width, height) = rgb.dimensions();
        let (target_width, target_height) = self.input_size;

        let src = ImageRef::new(width, height, rgb.as_raw(), PixelType::U8x3)?;
        let mut resized = Image::new(target_width, target_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(RESIZE_FILTER)),
        )?;

        Ok(resized)
    }

    /// Interleaved HWC `u8` pixels to planar `[1, 3, H, W]` in `[0, 1]`.
    fn to_chw_tensor(image: &Image) -> Result<ImageTensor, PreprocessError> {
        let _s = span!("to_chw_tensor");

        let width = image.width() as usize;
        let height = image.height() as usize;
        let spatial = width * height;

        let mut output = vec![0.0f32; CHANNELS * spatial];

        for (i, px) in image.buffer().chunks_exact(CHANNELS).enumerate() {
            output[i] = px[0] as f32 / PIXEL_SCALE;
            output[i + spatial] = px[1] as f32 / PIXEL_SCALE;
            output[i + 2 * spatial] = px[2] as f32 / PIXEL_SCALE;
        }

        Ok(Array4::from_shape_vec((1, CHANNELS, height, width), output)?)
    }
}

impl Default for CpuPreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl Preprocess for CpuPreProcessor {
    fn preprocess(&self, bytes: &[u8]) -> Result<ImageTensor, PreprocessError> {
        let _s = span!("preprocess");
        let rgb = Self::decode(bytes)?;
        self.preprocess_rgb(&rgb)
    }

    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn solid_png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
    }

    fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
    }

    #[test]
    fn test_output_shape_is_fixed() {
        let preprocessor = CpuPreProcessor::default();

        for (width, height) in [(2, 2), (640, 480), (100, 900), (224, 224)] {
            let tensor = preprocessor
                .preprocess(&gradient_jpeg(width, height))
                .unwrap();
            assert_eq!(
                tensor.shape(),
                &[1, 3, 224, 224],
                "{width}x{height} input should produce the fixed shape"
            );
        }
    }

    #[test]
    fn test_values_within_unit_range() {
        let preprocessor = CpuPreProcessor::default();
        let tensor = preprocessor.preprocess(&gradient_jpeg(300, 200)).unwrap();

        assert!(
            tensor.iter().all(|v| (0.0f32..=1.0).contains(v)),
            "all values should be scaled into [0, 1]"
        );
    }

    #[test]
    fn test_preprocessing_is_deterministic() {
        let preprocessor = CpuPreProcessor::default();
        let bytes = gradient_jpeg(513, 377);

        let first = preprocessor.preprocess(&bytes).unwrap();
        let second = preprocessor.preprocess(&bytes).unwrap();

        assert_eq!(first, second, "identical bytes should yield identical tensors");
    }

    #[test]
    fn test_channel_first_layout() {
        // Same-size PNG: no resampling, lossless, so values are exact.
        let bytes = solid_png(224, 224, [255, 0, 51]);
        let tensor = CpuPreProcessor::default().preprocess(&bytes).unwrap();

        assert_eq!(tensor[[0, 0, 10, 20]], 1.0, "red plane");
        assert_eq!(tensor[[0, 1, 10, 20]], 0.0, "green plane");
        assert_eq!(tensor[[0, 2, 10, 20]], 51.0 / 255.0, "blue plane");
    }

    #[test]
    fn test_aspect_ratio_not_preserved() {
        // A solid wide strip must fill the whole target, with no padding.
        let bytes = solid_png(800, 50, [200, 200, 200]);
        let tensor = CpuPreProcessor::default().preprocess(&bytes).unwrap();

        let expected = 200.0 / 255.0;
        for (y, x) in [(0, 0), (0, 223), (112, 112), (223, 0), (223, 223)] {
            let v = tensor[[0, 0, y, x]];
            assert!(
                (v - expected).abs() < 1e-2,
                "pixel ({y}, {x}) should be image content, got {v}"
            );
        }
    }

    #[test]
    fn test_alpha_channel_dropped() {
        let img = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 0]));
        let bytes = encode(DynamicImage::ImageRgba8(img), ImageFormat::Png);

        let tensor = CpuPreProcessor::default().preprocess(&bytes).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
        assert!((tensor[[0, 0, 50, 50]] - 10.0 / 255.0).abs() < 1e-2);
        assert!((tensor[[0, 2, 50, 50]] - 30.0 / 255.0).abs() < 1e-2);
    }

    #[test]
    fn test_grayscale_expanded_to_rgb() {
        let img = GrayImage::from_pixel(32, 32, Luma([128]));
        let bytes = encode(DynamicImage::ImageLuma8(img), ImageFormat::Png);

        let tensor = CpuPreProcessor::default().preprocess(&bytes).unwrap();

        let r = tensor[[0, 0, 100, 100]];
        let g = tensor[[0, 1, 100, 100]];
        let b = tensor[[0, 2, 100, 100]];
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert!((r - 128.0 / 255.0).abs() < 1e-2);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = CpuPreProcessor::default()
            .preprocess(b"%PDF-1.7 definitely not an image")
            .unwrap_err();

        assert!(err.is_decode(), "expected decode error, got {err:?}");
    }

    #[test]
    fn test_empty_payload_fails_to_decode() {
        let err = CpuPreProcessor::default().preprocess(&[]).unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_custom_input_size() {
        let preprocessor = CpuPreProcessor::new((320, 160));
        let tensor = preprocessor.preprocess(&gradient_jpeg(50, 50)).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 160, 320]);
        assert_eq!(preprocessor.output_shape(), [1, 3, 160, 320]);
    }
}
