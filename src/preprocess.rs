//! Image normalization: data-URL/base64 string → `(1, 224, 224, 3)` tensor.
//!
//! The pipeline order is fixed: strip the data-URL header, base64-decode,
//! decode the raster, convert to RGB, resize to 224×224, scale to `[0, 1]`,
//! add the batch dimension. Every failure surfaces as
//! [`InferenceError::Decode`].

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use image::imageops::FilterType;
use image::RgbImage;

use crate::error::InferenceError;

/// Side length of the square model input.
pub const INPUT_SIZE: usize = 224;

/// RGB.
pub const CHANNELS: usize = 3;

/// Marker separating a data-URL header from its payload.
const DATA_URL_MARKER: &str = "base64,";

/// Standard alphabet with mandatory padding. Non-zero trailing bits in the
/// final quantum are accepted.
const PADDED_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

fn is_base64_symbol(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')
}

/// A single NHWC image batch of shape `(1, 224, 224, 3)` with values in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
}

impl NormalizedTensor {
    pub const SHAPE: [usize; 4] = [1, INPUT_SIZE, INPUT_SIZE, CHANNELS];

    /// Build from an already-resized 224×224 RGB image.
    pub fn from_rgb(image: &RgbImage) -> Result<Self, InferenceError> {
        if image.width() as usize != INPUT_SIZE || image.height() as usize != INPUT_SIZE {
            return Err(InferenceError::Decode(format!(
                "Expected a {INPUT_SIZE}x{INPUT_SIZE} image, got {}x{}",
                image.width(),
                image.height()
            )));
        }
        let data = image.as_raw().iter().map(|&v| f32::from(v) / 255.0).collect();
        Ok(Self { data })
    }

    pub fn shape(&self) -> [usize; 4] {
        Self::SHAPE
    }

    /// Row-major NHWC values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Value at row `y`, column `x`, channel `c` of the single batch entry.
    pub fn get(&self, y: usize, x: usize, c: usize) -> Option<f32> {
        if y >= INPUT_SIZE || x >= INPUT_SIZE || c >= CHANNELS {
            return None;
        }
        self.data.get((y * INPUT_SIZE + x) * CHANNELS + c).copied()
    }
}

/// Drop everything up to and including the first `"base64,"`, if present.
pub fn strip_data_url(image_data: &str) -> &str {
    match image_data.find(DATA_URL_MARKER) {
        Some(idx) => &image_data[idx + DATA_URL_MARKER.len()..],
        None => image_data,
    }
}

/// Decode the base64 payload of a (possibly data-URL prefixed) image string.
///
/// Characters outside the base64 alphabet (whitespace, line breaks, stray
/// punctuation) are discarded before decoding; the remaining text must be
/// correctly padded.
pub fn decode_base64(image_data: &str) -> Result<Vec<u8>, InferenceError> {
    let payload: String = strip_data_url(image_data)
        .chars()
        .filter(|&c| is_base64_symbol(c))
        .collect();
    PADDED_BASE64
        .decode(payload.as_bytes())
        .map_err(|e| InferenceError::Decode(format!("Invalid base64 image data: {e}")))
}

/// Decode raw raster bytes and normalize them into a model input tensor.
pub fn normalize_bytes(bytes: &[u8]) -> Result<NormalizedTensor, InferenceError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| InferenceError::Decode(format!("Cannot identify image file: {e}")))?;

    tracing::debug!(
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "decoded input image"
    );

    // into_rgb8 is a move when the image is already 8-bit RGB.
    let rgb = decoded.into_rgb8();
    let resized = image::imageops::resize(
        &rgb,
        INPUT_SIZE as u32,
        INPUT_SIZE as u32,
        FilterType::CatmullRom,
    );
    NormalizedTensor::from_rgb(&resized)
}

/// Full pipeline from the request's `image` field.
pub fn normalize_image(image_data: &str) -> Result<NormalizedTensor, InferenceError> {
    let bytes = decode_base64(image_data)?;
    normalize_bytes(&bytes)
}
