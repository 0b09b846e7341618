//! Turning model output into an alpha mask and a transparent PNG

use super::preprocessing::Letterbox;
use image::{DynamicImage, ImageBuffer, ImageFormat, RgbaImage};
use ndarray::Array4;
use std::io::Cursor;

/// Single channel alpha mask in original image coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationMask {
    /// Row-major alpha values (0 = background, 255 = foreground)
    pub data: Vec<u8>,
    /// Mask dimensions `(width, height)`
    pub dimensions: (u32, u32),
}

impl SegmentationMask {
    /// Build a mask from the first channel of a `1x1xHxW` prediction
    ///
    /// The prediction is min-max normalized first, then sampled back onto the
    /// original image through the inverse letterbox transform. Returns `None`
    /// for tensors that are not single-batch, single-channel maps.
    #[must_use]
    pub fn from_prediction(
        prediction: &Array4<f32>,
        letterbox: &Letterbox,
        original_dimensions: (u32, u32),
    ) -> Option<Self> {
        let &[batch, channels, mask_height, mask_width] = prediction.shape() else {
            return None;
        };
        if batch != 1 || channels != 1 {
            return None;
        }

        let (min, max) = prediction
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;

        let (orig_width, orig_height) = original_dimensions;
        let mut data = Vec::with_capacity(orig_width as usize * orig_height as usize);

        for y in 0..orig_height {
            for x in 0..orig_width {
                let tensor_x = (x as f32 * letterbox.scale).round() as usize + letterbox.offset_x as usize;
                let tensor_y = (y as f32 * letterbox.scale).round() as usize + letterbox.offset_y as usize;

                let raw = if tensor_x < mask_width && tensor_y < mask_height {
                    prediction.get([0, 0, tensor_y, tensor_x]).copied().unwrap_or(0.0)
                } else {
                    0.0
                };
                let normalized = if range > f32::EPSILON {
                    (raw - min) / range
                } else {
                    raw
                };
                data.push((normalized.clamp(0.0, 1.0) * 255.0).round() as u8);
            }
        }

        Some(Self {
            data,
            dimensions: original_dimensions,
        })
    }

    /// Apply the mask as alpha channel; fully transparent pixels become transparent black
    #[must_use]
    pub fn apply(&self, image: &DynamicImage) -> RgbaImage {
        let rgba_image = image.to_rgba8();
        let (width, height) = rgba_image.dimensions();
        let mut result = ImageBuffer::new(width, height);

        for (x, y, pixel) in rgba_image.enumerate_pixels() {
            let pixel_index = (y * width + x) as usize;
            let alpha = self.data.get(pixel_index).copied().unwrap_or(0);

            if alpha > 0 {
                result.put_pixel(x, y, image::Rgba([pixel[0], pixel[1], pixel[2], alpha]));
            } else {
                result.put_pixel(x, y, image::Rgba([0, 0, 0, 0]));
            }
        }

        result
    }
}

/// Encode an RGBA image as PNG bytes
///
/// # Errors
/// - PNG encoder failure
pub fn encode_png(image: RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(image).write_to(&mut buffer, ImageFormat::Png)?;
    Ok(buffer.into_inner())
}
