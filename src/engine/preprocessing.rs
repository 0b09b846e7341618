//! Image preprocessing for segmentation inference
//!
//! Images are letterboxed: resized with preserved aspect ratio, centered on a
//! padded square canvas of the model's input size, then normalized per
//! channel into an NCHW tensor.

use crate::models::PreprocessingConfig;
use image::{DynamicImage, ImageBuffer, RgbImage};
use ndarray::Array4;

/// Padding color for the letterbox canvas (RGB)
pub const PADDING_COLOR: [u8; 3] = [255, 255, 255];

/// Placement of the resized image inside the square model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    /// Scale factor applied to the original image
    pub scale: f32,
    /// Horizontal offset of the resized image on the canvas
    pub offset_x: u32,
    /// Vertical offset of the resized image on the canvas
    pub offset_y: u32,
    /// Resized width
    pub width: u32,
    /// Resized height
    pub height: u32,
}

impl Letterbox {
    /// Compute the letterbox placement of an image on a `target_size` square
    #[must_use]
    pub fn compute(original_dimensions: (u32, u32), target_size: u32) -> Self {
        let (orig_width, orig_height) = original_dimensions;
        let target = target_size as f32;
        let scale = (target / orig_width.max(1) as f32).min(target / orig_height.max(1) as f32);

        let width = ((orig_width as f32 * scale).round() as u32).clamp(1, target_size);
        let height = ((orig_height as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            offset_x: (target_size - width) / 2,
            offset_y: (target_size - height) / 2,
            width,
            height,
        }
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Preprocess an image into a normalized `1x3xSxS` tensor
    ///
    /// Returns the tensor together with the letterbox placement needed to map
    /// the model output back onto the original image.
    #[must_use]
    pub fn preprocess(
        image: &DynamicImage,
        config: &PreprocessingConfig,
    ) -> (Array4<f32>, Letterbox) {
        let target_size = config.target_size[0];
        let rgb_image = image.to_rgb8();
        let letterbox = Letterbox::compute(rgb_image.dimensions(), target_size);

        let resized = image::imageops::resize(
            &rgb_image,
            letterbox.width,
            letterbox.height,
            image::imageops::FilterType::Triangle,
        );

        let mut canvas = ImageBuffer::from_pixel(target_size, target_size, image::Rgb(PADDING_COLOR));
        image::imageops::replace(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        (Self::canvas_to_tensor(&canvas, config), letterbox)
    }

    /// Convert canvas to normalized tensor
    fn canvas_to_tensor(canvas: &RgbImage, config: &PreprocessingConfig) -> Array4<f32> {
        let (width, height) = canvas.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in canvas.enumerate_pixels() {
            for channel in 0..3 {
                let value = (f32::from(pixel.0[channel]) / 255.0
                    - config.normalization_mean[channel])
                    / config.normalization_std[channel];
                if let Some(slot) = tensor.get_mut([0, channel, y as usize, x as usize]) {
                    *slot = value;
                }
            }
        }

        tensor
    }
}
