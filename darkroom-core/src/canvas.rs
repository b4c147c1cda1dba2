//! Canvas: output surface and render scheduling.
//!
//! The canvas does not own layers. Each pass reads the layer manager, the
//! source store and the filter registry it is handed, and caches the result
//! until either the layer revision moves or a pass is explicitly requested.

use serde::{Deserialize, Serialize};

use crate::composite::{composite, CompositeContext};
use crate::filter::FilterRegistry;
use crate::layers::LayerManager;
use crate::pixel::{PixelBuffer, Rgba};
use crate::source::SourceStore;

/// Canvas dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CanvasSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CanvasSize {
    /// Create a size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Host-supplied text renderer for text layers.
///
/// Without one, text layers contribute no pixels.
pub trait GlyphRasterizer: Send + Sync + std::fmt::Debug {
    /// Render `text` tightly bounded, or `None` if it cannot be drawn.
    fn rasterize(&self, text: &str, font_size: f32, color: Rgba) -> Option<PixelBuffer>;
}

/// The render target.
#[derive(Debug)]
pub struct Canvas {
    size: CanvasSize,
    background: Rgba,
    frame: PixelBuffer,
    render_requested: bool,
    rendered_revision: Option<u64>,
    frame_count: u64,
    glyphs: Option<Box<dyn GlyphRasterizer>>,
}

impl Canvas {
    /// Create a transparent canvas with a pass pending.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: CanvasSize::new(width, height),
            background: Rgba::TRANSPARENT,
            frame: PixelBuffer::new(width, height),
            render_requested: true,
            rendered_revision: None,
            frame_count: 0,
            glyphs: None,
        }
    }

    /// Current size.
    #[must_use]
    pub const fn size(&self) -> CanvasSize {
        self.size
    }

    /// Change the output size. Layers are not touched.
    pub fn resize(&mut self, width: u32, height: u32) {
        let size = CanvasSize::new(width, height);
        if size != self.size {
            tracing::debug!("Canvas resized to {width}x{height}");
            self.size = size;
            self.request_render();
        }
    }

    /// Colour beneath the bottom layer.
    #[must_use]
    pub const fn background(&self) -> Rgba {
        self.background
    }

    /// Set the colour beneath the bottom layer.
    pub fn set_background(&mut self, color: Rgba) {
        if color != self.background {
            self.background = color;
            self.request_render();
        }
    }

    /// Register the text renderer.
    pub fn set_glyph_rasterizer(&mut self, glyphs: Box<dyn GlyphRasterizer>) {
        self.glyphs = Some(glyphs);
        self.request_render();
    }

    /// Mark a pass as pending.
    pub fn request_render(&mut self) {
        self.render_requested = true;
    }

    /// Whether the next [`Canvas::render_if_needed`] would composite.
    #[must_use]
    pub fn needs_render(&self, layers: &LayerManager) -> bool {
        self.render_requested || self.rendered_revision != Some(layers.revision())
    }

    /// Composite only when requested or when the layers changed.
    pub fn render_if_needed(
        &mut self,
        layers: &LayerManager,
        sources: &SourceStore,
        filters: &FilterRegistry,
    ) -> Option<&PixelBuffer> {
        if self.needs_render(layers) {
            Some(self.render(layers, sources, filters))
        } else {
            None
        }
    }

    /// Composite unconditionally and return the frame.
    pub fn render(
        &mut self,
        layers: &LayerManager,
        sources: &SourceStore,
        filters: &FilterRegistry,
    ) -> &PixelBuffer {
        let ctx = CompositeContext {
            sources,
            filters,
            size: self.size,
            background: self.background,
            glyphs: self.glyphs.as_deref(),
        };
        self.frame = composite(layers.layers(), &ctx);
        self.render_requested = false;
        self.rendered_revision = Some(layers.revision());
        self.frame_count += 1;
        tracing::trace!(
            "Frame {} rendered at revision {}",
            self.frame_count,
            layers.revision()
        );
        &self.frame
    }

    /// The last composited frame.
    #[must_use]
    pub const fn frame(&self) -> &PixelBuffer {
        &self.frame
    }

    /// Number of passes run so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{LayerKind, LayerProps};

    #[derive(Debug)]
    struct BlockGlyphs;

    impl GlyphRasterizer for BlockGlyphs {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        fn rasterize(&self, text: &str, font_size: f32, color: Rgba) -> Option<PixelBuffer> {
            let width = u32::try_from(text.len()).ok()?;
            Some(PixelBuffer::filled(width, font_size as u32, color))
        }
    }

    #[test]
    fn test_render_only_when_dirty() {
        let mut canvas = Canvas::new(4, 4);
        let mut layers = LayerManager::new();
        let sources = SourceStore::new();
        let filters = FilterRegistry::with_builtins();

        assert!(canvas.render_if_needed(&layers, &sources, &filters).is_some());
        assert!(canvas.render_if_needed(&layers, &sources, &filters).is_none());

        layers.add_layer(LayerKind::drawing(), LayerProps::default());
        assert!(canvas.render_if_needed(&layers, &sources, &filters).is_some());

        canvas.request_render();
        assert!(canvas.render_if_needed(&layers, &sources, &filters).is_some());
        assert_eq!(canvas.frame_count(), 3);
    }

    #[test]
    fn test_background_fills_empty_canvas() {
        let mut canvas = Canvas::new(2, 2);
        canvas.set_background(Rgba::WHITE);
        let frame = canvas.render(
            &LayerManager::new(),
            &SourceStore::new(),
            &FilterRegistry::new(),
        );
        assert_eq!(frame.get(1, 1), Some(Rgba::WHITE));
    }

    #[test]
    fn test_text_needs_rasterizer() {
        let mut layers = LayerManager::new();
        layers.add_layer(
            LayerKind::Text {
                content: "ab".to_string(),
                font_size: 2.0,
                color: Rgba::BLACK,
            },
            LayerProps::default(),
        );
        let (sources, filters) = (SourceStore::new(), FilterRegistry::new());

        let mut canvas = Canvas::new(4, 4);
        assert_eq!(
            canvas.render(&layers, &sources, &filters).get(0, 0),
            Some(Rgba::TRANSPARENT)
        );

        canvas.set_glyph_rasterizer(Box::new(BlockGlyphs));
        // 2x2 text raster at the layer origin.
        assert_eq!(
            canvas.render(&layers, &sources, &filters).get(1, 1),
            Some(Rgba::BLACK)
        );
    }
}
