//! # Darkroom Renderer
//!
//! The codec boundary of the editor: decodes encoded images into engine
//! pixel buffers and encodes composited frames for export.
//!
//! ```text
//! bytes / data URI ──decode_image──▶ PixelBuffer ──Editor──▶ frame
//!                                                         │
//!                     PNG / JPEG / WebP ◀──export_pixels──┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod export;
pub mod image;

pub use error::{RenderError, RenderResult};
pub use export::{export_pixels, EditorExport, ExportFormat, ExportOptions};
pub use image::{
    decode_image, encode_data_uri, load_image_file, load_image_from_data_uri, scale_pixels,
    ImageFormat,
};
