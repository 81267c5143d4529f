//! Conversion between host image tensors and wire images.
//!
//! Outgoing images are PNG-encoded and base64-wrapped for the request
//! payload. Incoming images are whatever the service links to (PNG, JPEG or
//! WebP) and come back as a batched `[1, H, W, C]` tensor in `[0, 1]`.
//!
//! # Value range
//!
//! A tensor whose largest value is at most `1.0` is treated as normalized and
//! scaled by 255. Anything larger is assumed to already be in `[0, 255]`.
//! An all-black image in `[0, 255]` form is therefore indistinguishable from
//! a near-black normalized one; both are encoded as black.

use crate::core::error::ApiError;
use crate::core::tensor::ImageTensor;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

/// Prefix for PNG data URIs.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// A PNG image as a base64 string, without the data-URI prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    /// Wrap an existing base64 string.
    pub fn from_base64(data: impl Into<String>) -> Self {
        Self(data.into())
    }

    /// Base64-encode raw PNG bytes.
    pub fn from_png_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// The raw base64 payload.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The payload with the `data:image/png;base64,` prefix.
    pub fn data_uri(&self) -> String {
        format!("{}{}", PNG_DATA_URI_PREFIX, self.0)
    }

    /// Decode back into a tensor.
    pub fn decode(&self) -> Result<ImageTensor, ApiError> {
        let bytes = BASE64
            .decode(self.0.as_bytes())
            .map_err(|e| ApiError::unexpected_format(format!("Invalid base64 image data: {}", e)))?;
        decode(&bytes)
    }
}

// ============================================================================
// Tensor -> Wire
// ============================================================================

/// Encode a tensor as a base64 PNG.
///
/// Accepts `H×W`, `H×W×C` and `1×H×W×C` tensors with 1, 3 or 4 channels.
pub fn encode(tensor: &ImageTensor) -> Result<EncodedImage, ApiError> {
    let png = encode_png(tensor)?;
    Ok(EncodedImage::from_png_bytes(&png))
}

/// Encode a tensor as PNG bytes.
pub fn encode_png(tensor: &ImageTensor) -> Result<Vec<u8>, ApiError> {
    let image = image_from_tensor(tensor)?;
    let mut cursor = Cursor::new(Vec::new());
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ApiError::unexpected_format(format!("PNG encoding failed: {}", e)))?;
    Ok(cursor.into_inner())
}

/// Convert a tensor into an 8-bit image.
pub fn image_from_tensor(tensor: &ImageTensor) -> Result<DynamicImage, ApiError> {
    if tensor.batch_size() != 1 {
        return Err(ApiError::unexpected_format(format!(
            "Expected a single image, got a batch of {}",
            tensor.batch_size()
        )));
    }

    let (height, width, channels) = tensor.dimensions();
    if height == 0 || width == 0 {
        return Err(ApiError::unexpected_format(format!(
            "Image has no pixels (shape {:?})",
            tensor.shape()
        )));
    }

    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(ApiError::unexpected_format(format!(
                "Image is too large (shape {:?})",
                tensor.shape()
            )))
        }
    };

    let scale = match tensor.max_value() {
        Some(max) if max <= 1.0 => 255.0,
        _ => 1.0,
    };
    let pixels: Vec<u8> = tensor.data().iter().map(|&v| to_u8(v, scale)).collect();

    let image = match channels {
        1 => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgba8),
        other => {
            return Err(ApiError::unexpected_format(format!(
                "Unsupported channel count {} (expected 1, 3 or 4)",
                other
            )))
        }
    };

    image.ok_or_else(|| {
        ApiError::unexpected_format(format!("Pixel buffer does not match shape {:?}", tensor.shape()))
    })
}

#[inline]
fn to_u8(value: f32, scale: f32) -> u8 {
    // NaN saturates to 0
    (value * scale).round().clamp(0.0, 255.0) as u8
}

// ============================================================================
// Wire -> Tensor
// ============================================================================

/// Decode image bytes into a `[1, H, W, C]` tensor in `[0, 1]`.
pub fn decode(bytes: &[u8]) -> Result<ImageTensor, ApiError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| ApiError::unexpected_format(format!("Could not decode image: {}", e)))?;
    tensor_from_image(&image)
}

/// Convert a decoded image into a `[1, H, W, C]` tensor in `[0, 1]`.
///
/// Grayscale stays single-channel, grayscale with alpha is widened to RGBA,
/// everything else becomes RGB or RGBA. Deeper formats are quantized to
/// 8 bits first.
pub fn tensor_from_image(image: &DynamicImage) -> Result<ImageTensor, ApiError> {
    let color = image.color();
    let (width, height) = (image.width() as usize, image.height() as usize);

    let (channels, raw) = if color.has_alpha() {
        (4, image.to_rgba8().into_raw())
    } else if color.has_color() {
        (3, image.to_rgb8().into_raw())
    } else {
        (1, image.to_luma8().into_raw())
    };

    let data = raw.into_iter().map(|b| f32::from(b) / 255.0).collect();
    ImageTensor::new(vec![1, height, width, channels], data)
        .map_err(|e| ApiError::unexpected_format(e.to_string()))
}
