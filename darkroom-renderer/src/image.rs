//! Image decoding utilities.
//!
//! Supports decoding from raw bytes, files and base64-encoded data URIs
//! into engine [`PixelBuffer`]s.

use std::path::Path;

use base64::Engine;
use darkroom_core::PixelBuffer;
use image::imageops::FilterType;

use crate::error::{RenderError, RenderResult};

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Detect format from a path's extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, Self::from_extension)
    }

    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }

    /// MIME type for data URIs and HTTP uploads.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Unknown => "application/octet-stream",
        }
    }
}

/// Decode an image from raw bytes into RGBA pixels.
///
/// # Errors
///
/// Returns [`RenderError::Decode`] if the bytes are not a supported image.
pub fn decode_image(data: &[u8]) -> RenderResult<PixelBuffer> {
    let format = ImageFormat::from_magic_bytes(data);
    let img = image::load_from_memory(data).map_err(|e| RenderError::Decode(e.to_string()))?;

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    tracing::debug!("Decoded {format:?} image ({width}x{height})");
    Ok(PixelBuffer::from_raw(width, height, rgba.into_raw())?)
}

/// Read and decode an image file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_image_file(path: impl AsRef<Path>) -> RenderResult<PixelBuffer> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_image(&bytes)
}

/// Load an image from a data URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns an error if the data URI is malformed or the image cannot be decoded.
pub fn load_image_from_data_uri(uri: &str) -> RenderResult<PixelBuffer> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| RenderError::DataUri("missing data: scheme".to_string()))?;
    let (metadata, encoded) = rest
        .split_once(',')
        .ok_or_else(|| RenderError::DataUri("missing comma".to_string()))?;

    let bytes = if metadata.contains(";base64") {
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| RenderError::DataUri(format!("bad base64: {e}")))?
    } else {
        percent_decode(encoded)?
    };

    decode_image(&bytes)
}

/// Wrap encoded image bytes in a base64 data URI.
#[must_use]
pub fn encode_data_uri(bytes: &[u8], format: ImageFormat) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{encoded}", format.mime())
}

fn percent_decode(input: &str) -> RenderResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = input
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| RenderError::DataUri("invalid percent encoding".to_string()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

/// Resample pixels by `factor` (Lanczos3). A factor of 1 returns a copy.
///
/// # Errors
///
/// Returns an error if `factor` is not positive and finite.
pub fn scale_pixels(pixels: &PixelBuffer, factor: f32) -> RenderResult<PixelBuffer> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(RenderError::Encode(format!("invalid scale factor {factor}")));
    }
    if (factor - 1.0).abs() < f32::EPSILON {
        return Ok(pixels.clone());
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let (width, height) = (
        ((pixels.width() as f32 * factor).round() as u32).max(1),
        ((pixels.height() as f32 * factor).round() as u32).max(1),
    );
    let img = to_rgba_image(pixels)?;
    let resized = image::imageops::resize(&img, width, height, FilterType::Lanczos3);
    Ok(PixelBuffer::from_raw(width, height, resized.into_raw())?)
}

pub(crate) fn to_rgba_image(pixels: &PixelBuffer) -> RenderResult<image::RgbaImage> {
    image::RgbaImage::from_raw(pixels.width(), pixels.height(), pixels.data().to_vec())
        .ok_or_else(|| RenderError::Encode("pixel buffer size mismatch".to_string()))
}
