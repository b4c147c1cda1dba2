//! Crop tool: an interactive rectangle with eight resize handles.

use serde::{Deserialize, Serialize};

use super::{ResizeHandle, Tool, ToolContext, ToolKind};
use crate::canvas::CanvasSize;
use crate::config::CropPreset;
use crate::error::EditorResult;
use crate::event::PointerEvent;
use crate::pixel::Point;

/// Grab distance around a handle, in canvas pixels.
pub const HANDLE_TOLERANCE: f32 = 10.0;

/// Smallest crop edge, in canvas pixels.
pub const MIN_CROP_SIZE: f32 = 20.0;

/// Fraction of the canvas left outside the seeded rectangle on each side.
const SEED_MARGIN: f32 = 0.1;

/// A crop rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl CropRect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Top-left corner.
    #[must_use]
    pub const fn min(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Bottom-right corner.
    #[must_use]
    pub fn max(&self) -> Point {
        Point::new(self.right(), self.bottom())
    }

    /// Whether `p` lies inside.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }
}

/// What a drag is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropState {
    /// No drag in progress.
    #[default]
    Idle,
    /// Dragging a resize handle.
    DraggingHandle(ResizeHandle),
    /// Moving the whole rectangle.
    DraggingRect,
}

/// Interactive crop rectangle.
///
/// The tool never touches layers; the editor applies the returned rectangle.
#[derive(Debug, Clone, Default)]
pub struct CropTool {
    rect: CropRect,
    state: CropState,
    bounds: CanvasSize,
    aspect_ratio: Option<f32>,
    drag_start: Point,
    start_rect: CropRect,
}

impl CropTool {
    /// A tool with a free aspect ratio.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current rectangle.
    #[must_use]
    pub const fn rect(&self) -> CropRect {
        self.rect
    }

    /// Current drag state.
    #[must_use]
    pub const fn state(&self) -> CropState {
        self.state
    }

    /// Locked aspect ratio (width / height), if any.
    #[must_use]
    pub const fn aspect_ratio(&self) -> Option<f32> {
        self.aspect_ratio
    }

    /// Lock or unlock the aspect ratio and refit the rectangle.
    pub fn set_aspect_ratio(&mut self, ratio: Option<f32>) {
        self.aspect_ratio = ratio.filter(|r| r.is_finite() && *r > 0.0);
        if let Some(ratio) = self.aspect_ratio {
            self.rect = self.fit_aspect(self.rect, ratio);
        }
    }

    /// Use a preset's aspect ratio.
    pub fn apply_preset(&mut self, preset: &CropPreset) {
        self.set_aspect_ratio(preset.aspect_ratio);
    }

    /// Restart from the default rectangle for a canvas of `bounds`.
    pub fn reseed(&mut self, bounds: CanvasSize) {
        #[allow(clippy::cast_precision_loss)]
        let (w, h) = (bounds.width as f32, bounds.height as f32);
        self.bounds = bounds;
        self.state = CropState::Idle;
        self.rect = CropRect::new(
            w * SEED_MARGIN,
            h * SEED_MARGIN,
            w * (1.0 - 2.0 * SEED_MARGIN),
            h * (1.0 - 2.0 * SEED_MARGIN),
        );
        if let Some(ratio) = self.aspect_ratio {
            self.rect = self.fit_aspect(self.rect, ratio);
        }
    }

    /// Place the rectangle directly, for hosts without a pointer.
    ///
    /// A locked aspect ratio is reapplied. Clamping happens in [`CropTool::apply`].
    pub fn set_rect(&mut self, rect: CropRect) {
        self.state = CropState::Idle;
        self.rect = match self.aspect_ratio {
            Some(ratio) => self.fit_aspect(rect, ratio),
            None => rect,
        };
    }

    /// Discard the rectangle without touching the document.
    pub fn cancel(&mut self) {
        self.reseed(self.bounds);
    }

    /// The rectangle clamped to the canvas and snapped to whole pixels.
    ///
    /// Returns `None` if nothing of it lies on the canvas.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(&mut self) -> Option<CropRect> {
        self.state = CropState::Idle;
        let (w, h) = (self.bounds.width as f32, self.bounds.height as f32);
        let x0 = self.rect.x.max(0.0).round();
        let y0 = self.rect.y.max(0.0).round();
        let x1 = self.rect.right().min(w).round();
        let y1 = self.rect.bottom().min(h).round();
        if x1 - x0 < 1.0 || y1 - y0 < 1.0 {
            tracing::debug!("Crop rectangle lies outside the canvas");
            return None;
        }
        Some(CropRect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Adjust height to the ratio, shrinking to stay on the canvas.
    #[allow(clippy::cast_precision_loss)]
    fn fit_aspect(&self, rect: CropRect, ratio: f32) -> CropRect {
        let mut out = rect;
        out.height = out.width / ratio;
        let room = self.bounds.height as f32 - out.y;
        if out.height > room && room > 0.0 {
            out.height = room;
            out.width = room * ratio;
        }
        out
    }

    /// New rectangle for `handle` dragged by `(dx, dy)` from `start`.
    fn resize(&self, start: CropRect, handle: ResizeHandle, dx: f32, dy: f32) -> CropRect {
        let mut r = start;
        if handle.west() {
            r.x = start.x + dx;
            r.width = start.width - dx;
        } else if handle.east() {
            r.width = start.width + dx;
        }
        if handle.north() {
            r.y = start.y + dy;
            r.height = start.height - dy;
        } else if handle.south() {
            r.height = start.height + dy;
        }

        if let Some(ratio) = self.aspect_ratio {
            // The dragged dimension is clamped before the ratio derives the other.
            match handle {
                ResizeHandle::N | ResizeHandle::S => {
                    r.height = r.height.max(MIN_CROP_SIZE);
                    r.width = r.height * ratio;
                }
                _ => {
                    r.width = r.width.max(MIN_CROP_SIZE);
                    r.height = r.width / ratio;
                }
            }
            let grow = (MIN_CROP_SIZE / r.width).max(MIN_CROP_SIZE / r.height);
            if grow > 1.0 {
                r.width *= grow;
                r.height *= grow;
            }
        } else {
            r.width = r.width.max(MIN_CROP_SIZE);
            r.height = r.height.max(MIN_CROP_SIZE);
        }

        // Keep the edge opposite the dragged one fixed.
        if handle.west() {
            r.x = start.right() - r.width;
        }
        if handle.north() {
            r.y = start.bottom() - r.height;
        }
        r
    }

    #[allow(clippy::cast_precision_loss)]
    fn moved(&self, start: CropRect, dx: f32, dy: f32) -> CropRect {
        let max_x = (self.bounds.width as f32 - start.width).max(0.0);
        let max_y = (self.bounds.height as f32 - start.height).max(0.0);
        CropRect {
            x: (start.x + dx).clamp(0.0, max_x),
            y: (start.y + dy).clamp(0.0, max_y),
            ..start
        }
    }
}

impl Tool for CropTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Crop
    }

    fn on_activate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        self.reseed(ctx.canvas_size());
        Ok(())
    }

    fn on_pointer_down(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        let p = event.point();
        self.drag_start = p;
        self.start_rect = self.rect;
        let hit = ResizeHandle::hit(self.rect.min(), self.rect.max(), p, HANDLE_TOLERANCE);
        self.state = match hit {
            Some(handle) => CropState::DraggingHandle(handle),
            None if self.rect.contains(p) => CropState::DraggingRect,
            None => CropState::Idle,
        };
        Ok(())
    }

    fn on_pointer_move(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        let dx = event.x - self.drag_start.x;
        let dy = event.y - self.drag_start.y;
        match self.state {
            CropState::Idle => {}
            CropState::DraggingHandle(handle) => {
                self.rect = self.resize(self.start_rect, handle, dx, dy);
            }
            CropState::DraggingRect => self.rect = self.moved(self.start_rect, dx, dy),
        }
        Ok(())
    }

    fn on_pointer_up(
        &mut self,
        _ctx: &mut ToolContext<'_>,
        _event: &PointerEvent,
    ) -> EditorResult<()> {
        self.state = CropState::Idle;
        Ok(())
    }

    fn on_deactivate(&mut self, _ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        self.state = CropState::Idle;
        Ok(())
    }
}
