//! Image payloads and per-feature results.
//!
//! Payloads are opaque encoded images; results are always complete.

use base64::Engine;
use darkroom_renderer::ImageFormat;

/// An encoded image travelling to or from a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    /// Encoded bytes.
    pub bytes: Vec<u8>,
    /// Detected encoding.
    pub format: ImageFormat,
}

impl ImagePayload {
    /// Wrap encoded bytes, sniffing the format.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        let format = ImageFormat::from_magic_bytes(&bytes);
        Self { bytes, format }
    }

    /// Base64 without a data URI prefix.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:` URI, as accepted by hosted model APIs.
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        darkroom_renderer::encode_data_uri(&self.bytes, self.format)
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Output of background removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundRemovalResult {
    /// Subject on a transparent background.
    pub foreground: ImagePayload,
    /// Alpha mask, when the provider returns one.
    pub mask: Option<ImagePayload>,
    /// Removed background, when the provider returns one.
    pub background: Option<ImagePayload>,
}

/// Output of enhancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhanceResult {
    /// Enhanced image.
    pub enhanced: ImagePayload,
}

/// Output of upscaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleResult {
    /// Upscaled image.
    pub upscaled: ImagePayload,
    /// Factor the provider actually applied.
    pub scale: u32,
}

/// Output of generative fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerativeFillResult {
    /// Image with the masked area regenerated.
    pub filled: ImagePayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_sniffs_format() {
        let payload = ImagePayload::new(vec![0x89, 0x50, 0x4E, 0x47, 0, 0]);
        assert_eq!(payload.format, ImageFormat::Png);
        assert!(payload.to_data_uri().starts_with("data:image/png;base64,"));

        let unknown = ImagePayload::new(b"abc".to_vec());
        assert_eq!(unknown.format, ImageFormat::Unknown);
        assert_eq!(unknown.to_base64(), "YWJj");
    }
}
