// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for the landmark models.
//!
//! The YOLO-pose backend expects a letterboxed NCHW tensor in `[0, 1]`; the
//! `MoveNet` backend expects a plain square resize in NHWC layout with raw
//! `0..=255` pixel values.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

use crate::error::{PoseError, Result};

/// Default letterbox padding color (gray).
pub const LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Letterboxed tensor plus the transform needed to map model coordinates back.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Image tensor in NCHW format, normalized to [0, 1].
    pub tensor: Array4<f32>,
    /// Original image dimensions (height, width).
    pub orig_shape: (u32, u32),
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

impl PreprocessResult {
    /// Map a point from model input space to normalized original-image space.
    #[must_use]
    pub fn to_normalized(&self, x: f32, y: f32) -> (f32, f32) {
        let (x, y) = scale_point((x, y), self.scale, self.padding);
        let (h, w) = (self.orig_shape.0 as f32, self.orig_shape.1 as f32);
        ((x / w).clamp(0.0, 1.0), (y / h).clamp(0.0, 1.0))
    }
}

/// Letterbox an image into `target_size` (height, width) and build an NCHW tensor.
///
/// # Errors
///
/// Returns [`PoseError::ImageError`] for zero-sized images.
pub fn letterbox_image(image: &DynamicImage, target_size: (u32, u32)) -> Result<PreprocessResult> {
    let (orig_width, orig_height) = image.dimensions();
    if orig_width == 0 || orig_height == 0 {
        return Err(PoseError::ImageError("image has zero size".to_string()));
    }

    let (new_width, new_height, pad_left, pad_top, scale) =
        calculate_letterbox_params(orig_width, orig_height, target_size);

    let resized = imageops::resize(
        &image.to_rgb8(),
        new_width.max(1),
        new_height.max(1),
        FilterType::Triangle,
    );
    let mut canvas = RgbImage::from_pixel(target_size.1, target_size.0, Rgb(LETTERBOX_COLOR));
    imageops::overlay(&mut canvas, &resized, i64::from(pad_left), i64::from(pad_top));

    Ok(PreprocessResult {
        tensor: image_to_tensor(&canvas),
        orig_shape: (orig_height, orig_width),
        scale,
        padding: (pad_top as f32, pad_left as f32),
    })
}

/// Stretch an image to a `size` x `size` square and build an NHWC tensor.
///
/// Pixel values are kept in `0..=255` as `f32`.
///
/// # Errors
///
/// Returns [`PoseError::ImageError`] for zero-sized images.
pub fn square_resize_nhwc(image: &DynamicImage, size: u32) -> Result<Array4<f32>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PoseError::ImageError("image has zero size".to_string()));
    }
    let resized = imageops::resize(&image.to_rgb8(), size, size, FilterType::Triangle);
    let side = size as usize;
    let data: Vec<f32> = resized.as_raw().iter().map(|&v| f32::from(v)).collect();
    Array4::from_shape_vec((1, side, side, 3), data)
        .map_err(|e| PoseError::ImageError(format!("failed to build input tensor: {e}")))
}

/// Calculate letterbox parameters for resizing.
///
/// Returns `(new_width, new_height, pad_left, pad_top, (scale_y, scale_x))`.
fn calculate_letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target_size: (u32, u32),
) -> (u32, u32, u32, u32, (f32, f32)) {
    let (target_h, target_w) = (target_size.0 as f32, target_size.1 as f32);
    let (orig_h, orig_w) = (orig_height as f32, orig_width as f32);

    let scale = (target_h / orig_h).min(target_w / orig_w);

    let new_w = (orig_w * scale).round() as u32;
    let new_h = (orig_h * scale).round() as u32;

    // Center alignment: divide padding equally on both sides
    let pad_left = target_size.1.saturating_sub(new_w) / 2;
    let pad_top = target_size.0.saturating_sub(new_h) / 2;

    let scale_x = new_w as f32 / orig_w;
    let scale_y = new_h as f32 / orig_h;

    (new_w, new_h, pad_left, pad_top, (scale_y, scale_x))
}

/// Convert an RGB image to a normalized NCHW tensor.
fn image_to_tensor(image: &RgbImage) -> Array4<f32> {
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);

    let mut tensor = Array4::zeros((1, 3, h, w));
    for (x, y, pixel) in image.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            tensor[[0, c, y, x]] = f32::from(pixel[c]) * INV_255;
        }
    }
    tensor
}

/// Scale a point from model input space back to original image space.
#[must_use]
pub fn scale_point(point: (f32, f32), scale: (f32, f32), padding: (f32, f32)) -> (f32, f32) {
    let (scale_y, scale_x) = scale;
    let (pad_top, pad_left) = padding;
    ((point.0 - pad_left) / scale_x, (point.1 - pad_top) / scale_y)
}
