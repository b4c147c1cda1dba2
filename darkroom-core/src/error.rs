//! Error types for editor operations.

use thiserror::Error;

/// Result type for editor operations.
pub type EditorResult<T> = Result<T, EditorError>;

/// Errors that can occur in editor operations.
///
/// Layer, history and tool errors never leave the engine in a partial state:
/// the operation that produced them is a no-op.
#[derive(Debug, Error)]
pub enum EditorError {
    /// Layer not found in the stack.
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// An operation needed an active layer and there was none.
    #[error("No active layer")]
    NoActiveLayer,

    /// Undo requested at the bottom of the history stack.
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Redo requested at the top of the history stack.
    #[error("Nothing to redo")]
    NothingToRedo,

    /// A tool was driven without being attached and activated.
    #[error("Tool has no context: {0}")]
    NoToolContext(String),

    /// The tool is not enabled in the editor configuration.
    #[error("Tool not available: {0}")]
    ToolUnavailable(String),

    /// Pixel data does not match the declared dimensions.
    #[error("Invalid pixel buffer: {0}")]
    InvalidBuffer(String),

    /// Filter preset id is not registered.
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),

    /// Snapshot or configuration (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid operation on the document.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
