//! # Darkroom Core
//!
//! Non-destructive, layer-based image editing engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Editor                         │
//! ├─────────────────────────────────────────────────────┤
//! │  Layer Manager    │  History        │  Tools        │
//! │  - Layer stack    │  - Snapshots    │  - Crop       │
//! │  - Active layer   │  - Undo/redo    │  - Transform  │
//! │  - Revisions      │  - Eviction     │  - Brush      │
//! ├─────────────────────────────────────────────────────┤
//! │  Canvas           │  Filter Engine  │  Sources      │
//! │  - Rasterise      │  - Registry     │  - Immutable  │
//! │  - Composite      │  - Presets      │    pixels     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Layers never own pixels directly. Image and sticker layers point into an
//! append-only [`SourceStore`], so a history snapshot is just the serialized
//! layer stack and restoring it never loses image data.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod blend;
pub mod canvas;
pub mod composite;
pub mod config;
pub mod editor;
pub mod error;
pub mod event;
pub mod filter;
pub mod filters;
pub mod history;
pub mod layer;
pub mod layers;
pub mod pixel;
pub mod raster;
pub mod source;
pub mod tool;

pub use canvas::{Canvas, CanvasSize, GlyphRasterizer};
pub use config::{CropPreset, EditorConfig};
pub use editor::Editor;
pub use error::{EditorError, EditorResult};
pub use event::{KeyEvent, KeyModifiers, PointerEvent, TouchEvent, TouchPhase, TouchPoint};
pub use filter::{AppliedFilter, FilterDefinition, FilterParams, FilterPreset, FilterRegistry};
pub use history::{DocumentSnapshot, History, HistoryEntry};
pub use layer::{
    AdjustmentParams, BlendMode, DrawingPath, Layer, LayerId, LayerKind, LayerProps, ShapeKind,
    StrokeTool, Transform,
};
pub use layers::{LayerManager, LayerStack};
pub use pixel::{PixelBuffer, Point, Rgba};
pub use source::{SourceId, SourceStore};
pub use tool::{
    BrushSettings, BrushTool, CropRect, CropState, CropTool, ResizeHandle, Tool, ToolContext,
    ToolKind, TransformTool,
};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
