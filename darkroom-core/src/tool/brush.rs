//! Brush tool: freehand strokes onto the document's drawing layer.

use serde::{Deserialize, Serialize};

use super::{Tool, ToolContext, ToolKind};
use crate::error::EditorResult;
use crate::event::PointerEvent;
use crate::layer::{DrawingPath, LayerId, LayerKind, LayerProps, StrokeTool};
use crate::pixel::{Point, Rgba};

/// Stroke appearance for new paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Stroke colour.
    pub color: Rgba,
    /// Stroke width in pixels.
    pub width: f32,
    /// Stroke opacity (0.0 to 1.0).
    pub opacity: f32,
    /// Paint or erase.
    pub mode: StrokeTool,
}

impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            width: 4.0,
            opacity: 1.0,
            mode: StrokeTool::Brush,
        }
    }
}

/// Records pointer drags as [`DrawingPath`]s.
///
/// All strokes land on one drawing layer: an existing one is reused,
/// otherwise one is created and committed as its own undo step.
#[derive(Debug, Clone, Default)]
pub struct BrushTool {
    settings: BrushSettings,
    layer: Option<LayerId>,
    points: Vec<Point>,
    drawing: bool,
}

impl BrushTool {
    /// A tool with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current settings.
    #[must_use]
    pub const fn settings(&self) -> &BrushSettings {
        &self.settings
    }

    /// Replace the settings. Takes effect from the next stroke.
    pub fn set_settings(&mut self, settings: BrushSettings) {
        self.settings = BrushSettings {
            opacity: settings.opacity.clamp(0.0, 1.0),
            width: settings.width.max(0.5),
            ..settings
        };
    }

    /// The drawing layer strokes go to, once resolved.
    #[must_use]
    pub const fn layer(&self) -> Option<LayerId> {
        self.layer
    }

    /// Points of the stroke in progress.
    #[must_use]
    pub fn pending_points(&self) -> &[Point] {
        &self.points
    }

    /// Whether a stroke is in progress.
    #[must_use]
    pub const fn is_drawing(&self) -> bool {
        self.drawing
    }

    fn ensure_layer(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<LayerId> {
        if let Some(id) = self.layer {
            if ctx.layers.get_layer(id).is_some_and(|l| l.kind.is_drawing()) {
                return Ok(id);
            }
        }
        if let Some(existing) = ctx.layers.find(|l| l.kind.is_drawing()).map(|l| l.id) {
            ctx.layers.set_active_layer(Some(existing));
            self.layer = Some(existing);
            return Ok(existing);
        }
        let id = ctx
            .layers
            .add_layer(LayerKind::drawing(), LayerProps::named("Drawing"));
        ctx.save_to_history("Add Drawing Layer")?;
        self.layer = Some(id);
        Ok(id)
    }
}

impl Tool for BrushTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Brush
    }

    fn on_activate(&mut self, ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        self.ensure_layer(ctx).map(|_| ())
    }

    fn on_pointer_down(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        let id = self.ensure_layer(ctx)?;
        self.points.clear();
        self.points.push(local_point(ctx, id, event));
        self.drawing = true;
        Ok(())
    }

    fn on_pointer_move(
        &mut self,
        ctx: &mut ToolContext<'_>,
        event: &PointerEvent,
    ) -> EditorResult<()> {
        if !self.drawing {
            return Ok(());
        }
        let Some(id) = self.layer else {
            return Ok(());
        };
        let point = local_point(ctx, id, event);
        if self.points.last() != Some(&point) {
            self.points.push(point);
        }
        Ok(())
    }

    fn on_pointer_up(
        &mut self,
        ctx: &mut ToolContext<'_>,
        _event: &PointerEvent,
    ) -> EditorResult<()> {
        if !self.drawing {
            return Ok(());
        }
        self.drawing = false;
        let points = std::mem::take(&mut self.points);
        if points.len() < 2 {
            tracing::debug!("Discarding stroke with {} point(s)", points.len());
            return Ok(());
        }
        let id = self.ensure_layer(ctx)?;
        let path = DrawingPath {
            points,
            color: self.settings.color,
            width: self.settings.width,
            opacity: self.settings.opacity,
            tool: self.settings.mode,
        };
        if ctx.layers.append_path(id, path) {
            ctx.save_to_history("Draw")
        } else {
            tracing::warn!("Dropping stroke, layer {id} is not a drawing layer");
            Ok(())
        }
    }

    fn on_deactivate(&mut self, _ctx: &mut ToolContext<'_>) -> EditorResult<()> {
        self.points.clear();
        self.drawing = false;
        Ok(())
    }

    fn on_detach(&mut self) {
        self.layer = None;
        self.points.clear();
        self.drawing = false;
    }
}

/// Pointer position in the drawing layer's local raster.
#[allow(clippy::cast_precision_loss)]
fn local_point(ctx: &ToolContext<'_>, id: LayerId, event: &PointerEvent) -> Point {
    let point = event.point();
    match ctx.layers.get_layer(id) {
        Some(layer) if !layer.transform.is_identity() => {
            let size = ctx.canvas_size();
            let pivot = Point::new(size.width as f32 / 2.0, size.height as f32 / 2.0);
            layer.transform.to_local(point, pivot)
        }
        _ => point,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use crate::history::{DocumentSnapshot, History};
    use crate::layers::LayerManager;
    use crate::source::SourceStore;

    struct Doc {
        layers: LayerManager,
        history: History,
        canvas: Canvas,
        sources: SourceStore,
    }

    impl Doc {
        fn new() -> Self {
            let layers = LayerManager::new();
            let history =
                History::new(10, &DocumentSnapshot::capture(&layers, 50, 50)).expect("history");
            Self {
                layers,
                history,
                canvas: Canvas::new(50, 50),
                sources: SourceStore::new(),
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
    }

    #[test]
    fn test_activate_creates_single_drawing_layer() {
        let mut doc = Doc::new();
        let mut tool = BrushTool::new();
        tool.on_activate(&mut doc.ctx()).expect("activate");
        tool.on_activate(&mut doc.ctx()).expect("activate again");

        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.history.labels().collect::<Vec<_>>(), vec!["Add Drawing Layer"]);
        assert_eq!(doc.layers.active_layer_id(), tool.layer());
    }

    #[test]
    fn test_reuses_existing_drawing_layer() {
        let mut doc = Doc::new();
        let existing = doc
            .layers
            .add_layer(LayerKind::drawing(), LayerProps::default());
        let mut tool = BrushTool::new();
        tool.on_activate(&mut doc.ctx()).expect("activate");

        assert_eq!(tool.layer(), Some(existing));
        assert!(doc.history.is_empty());
    }

    #[test]
    fn test_duplicate_points_are_skipped() {
        let mut doc = Doc::new();
        let mut tool = BrushTool::new();
        tool.on_pointer_down(&mut doc.ctx(), &PointerEvent::at(1.0, 1.0))
            .expect("down");
        tool.on_pointer_move(&mut doc.ctx(), &PointerEvent::at(1.0, 1.0))
            .expect("move");
        tool.on_pointer_move(&mut doc.ctx(), &PointerEvent::at(2.0, 1.0))
            .expect("move");
        assert_eq!(tool.pending_points().len(), 2);
    }

    #[test]
    fn test_eraser_mode_is_recorded() {
        let mut doc = Doc::new();
        let mut tool = BrushTool::new();
        tool.set_settings(BrushSettings {
            mode: StrokeTool::Eraser,
            ..BrushSettings::default()
        });
        tool.on_pointer_down(&mut doc.ctx(), &PointerEvent::at(1.0, 1.0))
            .expect("down");
        tool.on_pointer_move(&mut doc.ctx(), &PointerEvent::at(9.0, 9.0))
            .expect("move");
        tool.on_pointer_up(&mut doc.ctx(), &PointerEvent::at(9.0, 9.0))
            .expect("up");

        let id = tool.layer().expect("layer");
        let Some(LayerKind::Drawing { paths }) = doc.layers.get_layer(id).map(|l| &l.kind) else {
            panic!("expected drawing layer");
        };
        assert_eq!(paths[0].tool, StrokeTool::Eraser);
    }

    #[test]
    fn test_points_follow_layer_transform() {
        let mut doc = Doc::new();
        let id = doc.layers.add_layer(
            LayerKind::drawing(),
            LayerProps::transform(crate::layer::Transform {
                scale_x: 2.0,
                scale_y: 2.0,
                ..crate::layer::Transform::default()
            }),
        );
        let mut tool = BrushTool::new();
        tool.on_pointer_down(&mut doc.ctx(), &PointerEvent::at(25.0, 25.0))
            .expect("down");
        tool.on_pointer_move(&mut doc.ctx(), &PointerEvent::at(35.0, 25.0))
            .expect("move");

        assert_eq!(tool.layer(), Some(id));
        assert_eq!(
            tool.pending_points(),
            &[Point::new(25.0, 25.0), Point::new(30.0, 25.0)]
        );
    }
}
