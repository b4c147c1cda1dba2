//! Interactive tools.
//!
//! A tool is a state machine over pointer input. It never holds layer
//! references; every call receives a [`ToolContext`] borrowing the document
//! for the duration of that call only. [`ToolSlot`] enforces the lifecycle:
//!
//! ```text
//! Detached ──attach──► Attached ──activate──► Active
//!    ▲                   │   ▲                  │
//!    └──────detach───────┘   └────deactivate────┘
//! ```

mod brush;
mod crop;
mod transform;

pub use brush::{BrushSettings, BrushTool};
pub use crop::{CropRect, CropState, CropTool, HANDLE_TOLERANCE, MIN_CROP_SIZE};
pub use transform::{TransformHandle, TransformTool, ROTATE_HANDLE_OFFSET};

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::canvas::{Canvas, CanvasSize};
use crate::error::{EditorError, EditorResult};
use crate::event::PointerEvent;
use crate::history::{DocumentSnapshot, History};
use crate::layers::LayerManager;
use crate::pixel::Point;
use crate::source::SourceStore;

/// The tools an editor can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Crop rectangle.
    Crop,
    /// Move, rotate, scale and flip the active layer.
    Transform,
    /// Freehand drawing.
    Brush,
}

impl ToolKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crop => "crop",
            Self::Transform => "transform",
            Self::Brush => "brush",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The eight resize handles around a rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeHandle {
    /// Top edge.
    N,
    /// Top-right corner.
    Ne,
    /// Right edge.
    E,
    /// Bottom-right corner.
    Se,
    /// Bottom edge.
    S,
    /// Bottom-left corner.
    Sw,
    /// Left edge.
    W,
    /// Top-left corner.
    Nw,
}

impl ResizeHandle {
    /// Corners first so they win over the edges they touch.
    pub const ALL: [Self; 8] = [
        Self::Nw,
        Self::Ne,
        Self::Se,
        Self::Sw,
        Self::N,
        Self::E,
        Self::S,
        Self::W,
    ];

    /// Short code: `"n"`, `"ne"`, ...
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::N => "n",
            Self::Ne => "ne",
            Self::E => "e",
            Self::Se => "se",
            Self::S => "s",
            Self::Sw => "sw",
            Self::W => "w",
            Self::Nw => "nw",
        }
    }

    /// Moves the top edge.
    #[must_use]
    pub const fn north(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    /// Moves the bottom edge.
    #[must_use]
    pub const fn south(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }

    /// Moves the right edge.
    #[must_use]
    pub const fn east(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    /// Moves the left edge.
    #[must_use]
    pub const fn west(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    /// Whether this is a corner handle.
    #[must_use]
    pub const fn is_corner(self) -> bool {
        matches!(self, Self::Ne | Self::Se | Self::Sw | Self::Nw)
    }

    /// Position of the handle on the rectangle `min..max`.
    #[must_use]
    pub fn position(self, min: Point, max: Point) -> Point {
        let cx = (min.x + max.x) / 2.0;
        let cy = (min.y + max.y) / 2.0;
        let x = if self.west() {
            min.x
        } else if self.east() {
            max.x
        } else {
            cx
        };
        let y = if self.north() {
            min.y
        } else if self.south() {
            max.y
        } else {
            cy
        };
        Point::new(x, y)
    }

    /// First handle within `tolerance` of `point`.
    #[must_use]
    pub fn hit(min: Point, max: Point, point: Point, tolerance: f32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|h| h.position(min, max).distance(point) <= tolerance)
    }
}

/// Borrowed document state handed to a tool for one call.
#[derive(Debug)]
pub struct ToolContext<'a> {
    /// The layer stack.
    pub layers: &'a mut LayerManager,
    /// Undo history.
    pub history: &'a mut History,
    /// Render target, for its size.
    pub canvas: &'a Canvas,
    /// Pixel sources, for layer bounds.
    pub sources: &'a SourceStore,
}

impl ToolContext<'_> {
    /// Current canvas size.
    #[must_use]
    pub fn canvas_size(&self) -> CanvasSize {
        self.canvas.size()
    }

    /// Commit the current document state as one undo step.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn save_to_history(&mut self, label: &str) -> EditorResult<()> {
        let size = self.canvas.size();
        let snapshot = DocumentSnapshot::capture(self.layers, size.width, size.height);
        self.history.push(label, &snapshot)
    }
}

/// Behaviour shared by every tool.
///
/// Hooks default to doing nothing so a tool only implements what it uses.
#[allow(unused_variables)]
pub trait Tool: Send + Sync + Debug {
    /// Which tool this is.
    fn kind(&self) -> ToolKind;

    /// Called once when the tool is bound to a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool cannot work with the document.
    fn on_attach(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        Ok(())
    }

    /// Called when the tool becomes the active tool.
    ///
    /// # Errors
    ///
    /// Returns an error if activation needs a document mutation that failed.
    fn on_activate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        Ok(())
    }

    /// Pointer pressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool has nothing to act on.
    fn on_pointer_down(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()>;

    /// Pointer moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool has nothing to act on.
    fn on_pointer_move(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()>;

    /// Pointer released.
    ///
    /// # Errors
    ///
    /// Returns an error if committing the gesture failed.
    fn on_pointer_up(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()>;

    /// Called when another tool takes over or the tool is switched off.
    ///
    /// # Errors
    ///
    /// Returns an error if tearing down failed.
    fn on_deactivate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        Ok(())
    }

    /// Called when the tool is unbound. Drop any document ids held.
    fn on_detach(&mut self) {}
}

/// Lifecycle phase of a tool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolPhase {
    /// Not bound to a document.
    #[default]
    Detached,
    /// Bound, not receiving input.
    Attached,
    /// Bound and receiving input.
    Active,
}

/// A tool plus the lifecycle phase it is in.
#[derive(Debug, Default)]
pub struct ToolSlot<T> {
    tool: T,
    phase: ToolPhase,
}

impl<T: Tool> ToolSlot<T> {
    /// Wrap a detached tool.
    #[must_use]
    pub fn new(tool: T) -> Self {
        Self {
            tool,
            phase: ToolPhase::Detached,
        }
    }

    /// The tool.
    #[must_use]
    pub const fn tool(&self) -> &T {
        &self.tool
    }

    /// The tool, for settings changes that need no document.
    pub fn tool_mut(&mut self) -> &mut T {
        &mut self.tool
    }

    fn no_context(&self, what: &str) -> EditorError {
        EditorError::NoToolContext(format!(
            "{} tool is {:?}, cannot {what}",
            self.tool.kind(),
            self.phase
        ))
    }

    /// Run `f` against the tool if it is attached or active.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] when detached, or whatever `f`
    /// returns.
    pub fn with_attached<R>(
        &mut self,
        f: impl FnOnce(&mut T) -> EditorResult<R>,
    ) -> EditorResult<R> {
        if self.phase == ToolPhase::Detached {
            return Err(self.no_context("run a command"));
        }
        f(&mut self.tool)
    }

    fn require_active(&self, what: &str) -> EditorResult<()> {
        if self.phase == ToolPhase::Active {
            Ok(())
        } else {
            Err(self.no_context(what))
        }
    }
}

/// Object-safe view of a [`ToolSlot`], so the editor can dispatch by kind.
pub trait ToolDriver: Debug {
    /// Kind of the wrapped tool.
    fn kind(&self) -> ToolKind;

    /// Current phase.
    fn phase(&self) -> ToolPhase;

    /// Detached → Attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool rejects the document.
    fn attach(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()>;

    /// Attached → Active.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] if not attached.
    fn activate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()>;

    /// Forward a pointer press.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] if not active.
    fn pointer_down(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) -> EditorResult<()>;

    /// Forward a pointer move.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] if not active.
    fn pointer_move(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) -> EditorResult<()>;

    /// Forward a pointer release.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] if not active.
    fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) -> EditorResult<()>;

    /// Active → Attached.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] if not active.
    fn deactivate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()>;

    /// Attached → Detached. Deactivates first if needed.
    fn detach(&mut self);
}

impl<T: Tool> ToolDriver for ToolSlot<T> {
    fn kind(&self) -> ToolKind {
        self.tool.kind()
    }

    fn phase(&self) -> ToolPhase {
        self.phase
    }

    fn attach(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        if self.phase != ToolPhase::Detached {
            return Ok(());
        }
        self.tool.on_attach(ctx)?;
        self.phase = ToolPhase::Attached;
        Ok(())
    }

    fn activate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        match self.phase {
            ToolPhase::Detached => Err(self.no_context("activate")),
            ToolPhase::Active => Ok(()),
            ToolPhase::Attached => {
                self.tool.on_activate(ctx)?;
                self.phase = ToolPhase::Active;
                tracing::debug!("Tool {} activated", self.tool.kind());
                Ok(())
            }
        }
    }

    fn pointer_down(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        self.require_active("handle pointer down")?;
        self.tool.on_pointer_down(ctx, event)
    }

    fn pointer_move(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        self.require_active("handle pointer move")?;
        self.tool.on_pointer_move(ctx, event)
    }

    fn pointer_up(&mut self, ctx: &mut ToolContext<'_>, event: &PointerEvent) -> EditorResult<()> {
        self.require_active("handle pointer up")?;
        self.tool.on_pointer_up(ctx, event)
    }

    fn deactivate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        self.require_active("deactivate")?;
        self.phase = ToolPhase::Attached;
        tracing::debug!("Tool {} deactivated", self.tool.kind());
        self.tool.on_deactivate(ctx)
    }

    fn detach(&mut self) {
        if self.phase != ToolPhase::Detached {
            self.tool.on_detach();
            self.phase = ToolPhase::Detached;
        }
    }
}

/// One slot per tool kind.
#[derive(Debug, Default)]
pub struct ToolBox {
    /// Crop tool slot.
    pub crop: ToolSlot<CropTool>,
    /// Transform tool slot.
    pub transform: ToolSlot<TransformTool>,
    /// Brush tool slot.
    pub brush: ToolSlot<BrushTool>,
}

impl ToolBox {
    /// The slot for `kind`.
    pub fn driver(&mut self, kind: ToolKind) -> &mut dyn ToolDriver {
        match kind {
            ToolKind::Crop => &mut self.crop,
            ToolKind::Transform => &mut self.transform,
            ToolKind::Brush => &mut self.brush,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_handles_win_over_edges() {
        let (min, max) = (Point::new(0.0, 0.0), Point::new(100.0, 100.0));
        assert_eq!(
            ResizeHandle::hit(min, max, Point::new(98.0, 97.0), 10.0),
            Some(ResizeHandle::Se)
        );
        assert_eq!(
            ResizeHandle::hit(min, max, Point::new(100.0, 50.0), 10.0),
            Some(ResizeHandle::E)
        );
        assert_eq!(ResizeHandle::hit(min, max, Point::new(50.0, 50.0), 10.0), None);
    }

    #[test]
    fn test_handle_codes() {
        let codes: Vec<_> = ResizeHandle::ALL.iter().map(|h| h.code()).collect();
        assert_eq!(codes, vec!["nw", "ne", "se", "sw", "n", "e", "s", "w"]);
    }

    #[test]
    fn test_tool_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ToolKind::Brush).expect("serialize");
        assert_eq!(json, "\"brush\"");
    }
}
