//! Transform tool: move, scale and rotate the active layer by dragging.

use std::f32::consts::{PI, TAU};

use super::{ResizeHandle, Tool, ToolContext, ToolKind, HANDLE_TOLERANCE};
use crate::error::{EditorError, EditorResult};
use crate::event::PointerEvent;
use crate::layer::{LayerId, LayerProps, Transform};
use crate::pixel::Point;
use crate::raster::layer_bounds;

/// Distance of the rotate handle above the top edge.
pub const ROTATE_HANDLE_OFFSET: f32 = 30.0;

/// Smallest scale factor a drag can produce.
const MIN_SCALE_FACTOR: f32 = 0.01;

/// What a drag grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformHandle {
    /// The layer body.
    Move,
    /// One of the eight resize handles.
    Scale(ResizeHandle),
    /// The rotate handle above the top edge.
    Rotate,
}

impl TransformHandle {
    /// History label for a completed drag.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Move => "Move",
            Self::Scale(_) => "Scale",
            Self::Rotate => "Rotate",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Drag {
    layer: LayerId,
    handle: TransformHandle,
    start: Point,
    centre: Point,
    initial: Transform,
}

impl Drag {
    fn transform_at(&self, event: &PointerEvent) -> Transform {
        let dx = event.x - self.start.x;
        let dy = event.y - self.start.y;
        let mut t = self.initial;
        match self.handle {
            TransformHandle::Move => {
                t.x += dx;
                t.y += dy;
            }
            TransformHandle::Rotate => {
                let from = (self.start.y - self.centre.y).atan2(self.start.x - self.centre.x);
                let to = (event.y - self.centre.y).atan2(event.x - self.centre.x);
                let mut delta = to - from;
                if delta > PI {
                    delta -= TAU;
                } else if delta <= -PI {
                    delta += TAU;
                }
                t.rotation += delta;
            }
            TransformHandle::Scale(handle) => {
                let mut sx = if handle.east() {
                    dx
                } else if handle.west() {
                    -dx
                } else {
                    0.0
                };
                let mut sy = if handle.south() {
                    dy
                } else if handle.north() {
                    -dy
                } else {
                    0.0
                };
                if handle.is_corner() && event.modifiers.shift {
                    let uniform = sx.max(sy);
                    sx = uniform;
                    sy = uniform;
                }
                t.scale_x *= (1.0 + sx / 100.0).max(MIN_SCALE_FACTOR);
                t.scale_y *= (1.0 + sy / 100.0).max(MIN_SCALE_FACTOR);
            }
        }
        t
    }
}

/// Drags the active layer's transform; one history entry per drag.
#[derive(Debug, Clone, Default)]
pub struct TransformTool {
    drag: Option<Drag>,
}

impl TransformTool {
    /// A tool with no drag in progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The handle being dragged, if any.
    #[must_use]
    pub fn dragging(&self) -> Option<TransformHandle> {
        self.drag.map(|d| d.handle)
    }

    /// Rotate the active layer by `degrees` and commit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveLayer`] without an active layer.
    pub fn rotate(&mut self, ctx: &mut ToolContext<'_>, degrees: f32) -> EditorResult<()> {
        Self::commit_with(ctx, "Rotate", |t| t.rotation += degrees.to_radians())
    }

    /// Mirror the active layer left to right and commit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveLayer`] without an active layer.
    pub fn flip_horizontal(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        Self::commit_with(ctx, "Flip Horizontal", |t| t.scale_x = -t.scale_x)
    }

    /// Mirror the active layer top to bottom and commit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoActiveLayer`] without an active layer.
    pub fn flip_vertical(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        Self::commit_with(ctx, "Flip Vertical", |t| t.scale_y = -t.scale_y)
    }

    fn commit_with(
        ctx: &mut ToolContext<'_>,
        label: &str,
        edit: impl FnOnce(&mut Transform),
    ) -> EditorResult<()> {
        let layer = ctx.layers.active_layer().ok_or(EditorError::NoActiveLayer)?;
        let (id, mut transform) = (layer.id, layer.transform);
        edit(&mut transform);
        ctx.layers.update_layer(id, LayerProps::transform(transform));
        ctx.save_to_history(label)
    }
}

impl Tool for TransformTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Transform
    }

    fn on_pointer_down(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        self.drag = None;
        let layer = ctx.layers.active_layer().ok_or(EditorError::NoActiveLayer)?;
        let (min, max) = layer_bounds(layer, ctx.sources, ctx.canvas_size());
        let centre = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
        let p = event.point();

        let rotate_at = Point::new(centre.x, min.y - ROTATE_HANDLE_OFFSET);
        let inside = p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y;
        let handle = if p.distance(rotate_at) <= HANDLE_TOLERANCE {
            TransformHandle::Rotate
        } else if let Some(h) = ResizeHandle::hit(min, max, p, HANDLE_TOLERANCE) {
            TransformHandle::Scale(h)
        } else if inside {
            TransformHandle::Move
        } else {
            return Ok(());
        };

        self.drag = Some(Drag {
            layer: layer.id,
            handle,
            start: p,
            centre,
            initial: layer.transform,
        });
        Ok(())
    }

    fn on_pointer_move(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        let Some(drag) = self.drag else {
            return Ok(());
        };
        let transform = drag.transform_at(event);
        if !ctx.layers.update_layer(drag.layer, LayerProps::transform(transform)) {
            self.drag = None;
            return Err(EditorError::LayerNotFound(drag.layer.to_string()));
        }
        Ok(())
    }

    fn on_pointer_up(
        &mut self,
        ctx: &mut ToolContext<'_>,
        _event: &PointerEvent,
    ) -> EditorResult<()> {
        let Some(drag) = self.drag.take() else {
            return Ok(());
        };
        let changed = ctx
            .layers
            .get_layer(drag.layer)
            .is_some_and(|l| l.transform != drag.initial);
        if changed {
            ctx.save_to_history(drag.handle.label())?;
        }
        Ok(())
    }

    fn on_deactivate(&mut self, _ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        self.drag = None;
        Ok(())
    }

    fn on_detach(&mut self) {
        self.drag = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::event::KeyModifiers;
    use crate::history::{DocumentSnapshot, History};
    use crate::layer::{LayerKind, ShapeKind};
    use crate::layers::LayerManager;
    use crate::pixel::Rgba;
    use crate::source::SourceStore;

    struct Doc {
        layers: LayerManager,
        history: History,
        canvas: Canvas,
        sources: SourceStore,
        id: LayerId,
    }

    impl Doc {
        fn new() -> Self {
            let mut layers = LayerManager::new();
            let id = layers.add_layer(
                LayerKind::Shape {
                    shape: ShapeKind::Rectangle,
                    width: 100.0,
                    height: 100.0,
                    fill: Rgba::WHITE,
                    stroke: Rgba::TRANSPARENT,
                    stroke_width: 0.0,
                },
                LayerProps::transform(Transform::at(50.0, 50.0)),
            );
            layers.set_active_layer(Some(id));
            let history =
                History::new(10, &DocumentSnapshot::capture(&layers, 400, 400)).expect("history");
            Self {
                layers,
                history,
                canvas: Canvas::new(400, 400),
                sources: SourceStore::new(),
                id,
            }
        }

        fn ctx(&mut self) -> ToolContext<'_> {
            ToolContext {
                layers: &mut self.layers,
                history: &mut self.history,
                canvas: &self.canvas,
                sources: &self.sources,
            }
        }

        fn transform(&self) -> Transform {
            self.layers.get_layer(self.id).map(|l| l.transform).expect("layer")
        }
    }

    fn drag(doc: &mut Doc, tool: &mut TransformTool, from: PointerEvent, to: PointerEvent) {
        tool.on_pointer_down(&mut doc.ctx(), &from).expect("down");
        tool.on_pointer_move(&mut doc.ctx(), &to).expect("move");
        tool.on_pointer_up(&mut doc.ctx(), &to).expect("up");
    }

    #[test]
    fn test_body_drag_moves() {
        let (mut doc, mut tool) = (Doc::new(), TransformTool::new());
        drag(&mut doc, &mut tool, PointerEvent::at(100.0, 100.0), PointerEvent::at(110.0, 95.0));
        let t = doc.transform();
        assert!((t.x - 60.0).abs() < 1e-4);
        assert!((t.y - 45.0).abs() < 1e-4);
        assert_eq!(doc.history.undo_label(), Some("Move"));
        assert_eq!(doc.history.len(), 1);
    }

    #[test]
    fn test_east_handle_scales_x_only() {
        let (mut doc, mut tool) = (Doc::new(), TransformTool::new());
        drag(&mut doc, &mut tool, PointerEvent::at(150.0, 100.0), PointerEvent::at(200.0, 100.0));
        let t = doc.transform();
        assert!((t.scale_x - 1.5).abs() < 1e-4);
        assert!((t.scale_y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_shift_corner_scales_uniformly() {
        let (mut doc, mut tool) = (Doc::new(), TransformTool::new());
        drag(
            &mut doc,
            &mut tool,
            PointerEvent::at(150.0, 150.0),
            PointerEvent::at(160.0, 180.0).with_modifiers(KeyModifiers::shift()),
        );
        let t = doc.transform();
        assert!((t.scale_x - 1.3).abs() < 1e-4);
        assert!((t.scale_y - 1.3).abs() < 1e-4);
    }

    #[test]
    fn test_rotate_handle_adds_signed_angle() {
        let (mut doc, mut tool) = (Doc::new(), TransformTool::new());
        drag(&mut doc, &mut tool, PointerEvent::at(100.0, 20.0), PointerEvent::at(180.0, 100.0));
        assert!((doc.transform().rotation - PI / 2.0).abs() < 1e-4);
        assert_eq!(doc.history.undo_label(), Some("Rotate"));
    }

    #[test]
    fn test_click_without_motion_commits_nothing() {
        let (mut doc, mut tool) = (Doc::new(), TransformTool::new());
        let at = PointerEvent::at(100.0, 100.0);
        drag(&mut doc, &mut tool, at, at);
        assert!(doc.history.is_empty());
    }

    #[test]
    fn test_flips_commit_each() {
        let (mut doc, mut tool) = (Doc::new(), TransformTool::new());
        tool.flip_horizontal(&mut doc.ctx()).expect("flip");
        tool.flip_vertical(&mut doc.ctx()).expect("flip");
        let t = doc.transform();
        assert!((t.scale_x + 1.0).abs() < 1e-4);
        assert!((t.scale_y + 1.0).abs() < 1e-4);
        assert_eq!(doc.history.len(), 2);
    }

    #[test]
    fn test_no_active_layer_is_error() {
        let (mut doc, mut tool) = (Doc::new(), TransformTool::new());
        doc.layers.set_active_layer(None);
        assert!(matches!(
            tool.on_pointer_down(&mut doc.ctx(), &PointerEvent::at(100.0, 100.0)),
            Err(EditorError::NoActiveLayer)
        ));
    }
}
