//! Renderer error types.

use darkroom_core::EditorError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur while decoding or exporting images.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Bytes could not be decoded as an image.
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// A frame could not be encoded.
    #[error("Failed to encode image: {0}")]
    Encode(String),

    /// Malformed data URI.
    #[error("Invalid data URI: {0}")]
    DataUri(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Decoded pixels were rejected by the engine.
    #[error(transparent)]
    Editor(#[from] EditorError),
}
