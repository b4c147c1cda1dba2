//! Frame export to image formats.
//!
//! Takes a composited [`PixelBuffer`] (or renders one from an [`Editor`]),
//! optionally flattens it onto a background and rescales it, then encodes
//! it as PNG, JPEG or WebP with the `image` crate.

use std::io::Cursor;

use darkroom_core::{blend::blend_pixel, BlendMode, Editor, PixelBuffer, Rgba};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::error::{RenderError, RenderResult};
use crate::image::{scale_pixels, ImageFormat};

/// Export output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// PNG image.
    #[default]
    Png,
    /// JPEG image. Always flattened, alpha is lost.
    Jpeg,
    /// Lossless WebP image.
    WebP,
}

impl ExportFormat {
    /// Matching [`ImageFormat`] for data URIs.
    #[must_use]
    pub const fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::WebP => ImageFormat::WebP,
        }
    }

    /// Pick a format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ImageFormat::from_extension(ext) {
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::WebP => Some(Self::WebP),
            ImageFormat::Unknown => None,
        }
    }
}

/// Configuration for frame export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Output encoding.
    pub format: ExportFormat,
    /// JPEG quality 1-100 (default: 90). Ignored by lossless formats.
    pub quality: u8,
    /// Colour to flatten onto. `None` keeps transparency where the format
    /// allows it; JPEG falls back to white.
    pub background: Option<Rgba>,
    /// Scale factor (e.g. 2.0 for retina).
    pub scale: f32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 90,
            background: None,
            scale: 1.0,
        }
    }
}

impl ExportOptions {
    /// Default options for `format`.
    #[must_use]
    pub fn new(format: ExportFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}

/// Encode a composited frame.
///
/// # Errors
///
/// Returns an error if the scale factor is invalid or encoding fails.
pub fn export_pixels(pixels: &PixelBuffer, options: &ExportOptions) -> RenderResult<Vec<u8>> {
    let background = match (options.background, options.format) {
        (Some(color), _) => Some(color),
        (None, ExportFormat::Jpeg) => Some(Rgba::WHITE),
        (None, _) => None,
    };
    let flat = background.map(|bg| flatten(pixels, bg));
    let scaled = scale_pixels(flat.as_ref().unwrap_or(pixels), options.scale)?;
    let (width, height) = (scaled.width(), scaled.height());

    let mut buf = Cursor::new(Vec::new());
    let encoded = match options.format {
        ExportFormat::Png => PngEncoder::new(&mut buf).write_image(
            scaled.data(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        ExportFormat::Jpeg => {
            let rgb: Vec<u8> = scaled
                .data()
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            JpegEncoder::new_with_quality(&mut buf, options.quality.clamp(1, 100)).write_image(
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            )
        }
        ExportFormat::WebP => WebPEncoder::new_lossless(&mut buf).write_image(
            scaled.data(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };
    encoded.map_err(|e| RenderError::Encode(format!("{:?} encoding failed: {e}", options.format)))?;

    let bytes = buf.into_inner();
    tracing::debug!(
        "Exported {width}x{height} {:?} ({} bytes)",
        options.format,
        bytes.len()
    );
    Ok(bytes)
}

fn flatten(pixels: &PixelBuffer, background: Rgba) -> PixelBuffer {
    let opaque = Rgba::new(background.r(), background.g(), background.b(), 255);
    pixels.map_pixels(|px| blend_pixel(opaque, px, BlendMode::Normal, 1.0))
}

/// Export support for [`Editor`].
pub trait EditorExport {
    /// Render the document and encode the frame.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    fn export(&mut self, options: &ExportOptions) -> RenderResult<Vec<u8>>;
}

impl EditorExport for Editor {
    fn export(&mut self, options: &ExportOptions) -> RenderResult<Vec<u8>> {
        let frame = self.render();
        export_pixels(frame, options)
    }
}
