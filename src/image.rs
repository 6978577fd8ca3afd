//! Upload normalization: downscale to a bounded edge and re-encode as JPEG,
//! walking quality down until the inline representation fits the size budget
//! or the quality floor is hit. The floor is a hard stop, so the result is
//! best effort under the floor rather than guaranteed under budget.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use serde::Serialize;

pub const MAX_DIMENSION: u32 = 1200;
pub const SIZE_BUDGET_BYTES: usize = 500 * 1024;
pub const QUALITY_START: u8 = 90;
pub const QUALITY_STEP: u8 = 10;
pub const QUALITY_FLOOR: u8 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid file type")]
    InvalidFileType,
    #[error("failed to process image")]
    ProcessingFailed,
}

#[derive(Debug, Serialize, Clone)]
pub struct NormalizedImage {
    pub data_uri: String,
    pub quality: u8,
    pub width: u32,
    pub height: u32,
    pub approx_bytes: usize,
}

/// Approximate byte size of the base64 representation. Used both for the
/// re-encode loop and for size displays so the two always agree.
pub fn approx_encoded_bytes(data_uri: &str) -> usize {
    data_uri.len() * 3 / 4
}

pub fn normalize(bytes: &[u8]) -> Result<NormalizedImage, ImageError> {
    let format = image::guess_format(bytes).map_err(|_| ImageError::InvalidFileType)?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|_| ImageError::ProcessingFailed)?;

    let (width, height) = decoded.dimensions();
    let (target_width, target_height) = target_dimensions(width, height);

    let scaled = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_width, target_height, FilterType::Triangle)
    };
    let rgb = scaled.to_rgb8();

    let mut quality = QUALITY_START;
    loop {
        let mut jpeg = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, quality))
            .map_err(|_| ImageError::ProcessingFailed)?;

        let data_uri = format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg));
        let approx_bytes = approx_encoded_bytes(&data_uri);

        if approx_bytes < SIZE_BUDGET_BYTES || quality <= QUALITY_FLOOR {
            return Ok(NormalizedImage {
                data_uri,
                quality,
                width: target_width,
                height: target_height,
                approx_bytes,
            });
        }
        quality -= QUALITY_STEP;
    }
}

// Scale down, never up, keeping aspect ratio; the longer edge is capped at
// MAX_DIMENSION.
fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    if width > height && width > MAX_DIMENSION {
        let scaled = (height as f64 * MAX_DIMENSION as f64 / width as f64).round() as u32;
        (MAX_DIMENSION, scaled.max(1))
    } else if height > MAX_DIMENSION {
        let scaled = (width as f64 * MAX_DIMENSION as f64 / height as f64).round() as u32;
        (scaled.max(1), MAX_DIMENSION)
    } else {
        (width, height)
    }
}
