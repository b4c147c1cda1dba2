//! The editor: one document plus the machinery that edits it.

use crate::canvas::{Canvas, CanvasSize};
use crate::config::{CropPreset, EditorConfig};
use crate::error::{EditorError, EditorResult};
use crate::event::{KeyEvent, PointerEvent, TouchEvent, TouchPhase};
use crate::filter::{builtin_presets, AppliedFilter, FilterPreset, FilterRegistry};
use crate::history::{DocumentSnapshot, History};
use crate::layer::{DrawingPath, LayerId, LayerKind, LayerProps, Transform};
use crate::layers::{LayerManager, LayerStack};
use crate::pixel::{PixelBuffer, Point};
use crate::raster;
use crate::source::{SourceId, SourceStore};
use crate::tool::{
    BrushTool, CropRect, CropTool, ToolBox, ToolContext, ToolDriver, ToolKind, TransformTool,
};

/// A document and its editing state.
///
/// All editing is synchronous and single-threaded through `&mut Editor`.
#[derive(Debug)]
pub struct Editor {
    config: EditorConfig,
    layers: LayerManager,
    history: History,
    canvas: Canvas,
    sources: SourceStore,
    filters: FilterRegistry,
    presets: Vec<FilterPreset>,
    tools: ToolBox,
    active_tool: Option<ToolKind>,
    last_touch: Option<PointerEvent>,
}

impl Editor {
    /// Create an empty document from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial history snapshot cannot be serialized.
    pub fn new(config: EditorConfig) -> EditorResult<Self> {
        let layers = LayerManager::new();
        let history = History::new(
            config.max_history_steps,
            &DocumentSnapshot::capture(&layers, config.width, config.height),
        )?;
        let filters = FilterRegistry::with_builtins().restricted_to(&config.filters);
        let presets = builtin_presets()
            .into_iter()
            .filter(|p| config.presets.is_empty() || config.presets.contains(&p.id))
            .collect();
        tracing::debug!(
            "Editor created ({}x{}, tools: {:?})",
            config.width,
            config.height,
            config.tools
        );
        Ok(Self {
            canvas: Canvas::new(config.width, config.height),
            config,
            layers,
            history,
            sources: SourceStore::new(),
            filters,
            presets,
            tools: ToolBox::default(),
            active_tool: None,
            last_touch: None,
        })
    }

    // -- accessors ---------------------------------------------------------

    /// The configuration this editor was built from.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// The layer stack.
    #[must_use]
    pub const fn layers(&self) -> &LayerManager {
        &self.layers
    }

    /// Direct layer access. Commit with [`Editor::save_to_history`].
    pub fn layers_mut(&mut self) -> &mut LayerManager {
        &mut self.layers
    }

    /// Undo history.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// Render target.
    #[must_use]
    pub const fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Render target, for background and text renderer settings.
    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    /// Pixel sources.
    #[must_use]
    pub const fn sources(&self) -> &SourceStore {
        &self.sources
    }

    /// Filter registry.
    #[must_use]
    pub const fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// Filter registry, for registering host filters.
    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// Filter presets on offer.
    #[must_use]
    pub fn presets(&self) -> &[FilterPreset] {
        &self.presets
    }

    /// Crop presets on offer.
    #[must_use]
    pub fn crop_presets(&self) -> &[CropPreset] {
        &self.config.crop_presets
    }

    /// Mutation counter of the document; changes whenever the layers do.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.layers.revision()
    }

    /// The current document state.
    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        let size = self.canvas.size();
        DocumentSnapshot::capture(&self.layers, size.width, size.height)
    }

    // -- document ----------------------------------------------------------

    /// Store pixels for image or sticker layers.
    pub fn add_source(&mut self, pixels: PixelBuffer) -> SourceId {
        self.sources.add(pixels)
    }

    /// Start a new document from an image.
    ///
    /// Replaces every layer, sizes the canvas to the image and makes the
    /// result the undo floor.
    ///
    /// # Errors
    ///
    /// Returns an error if the new baseline cannot be serialized.
    pub fn load_image(&mut self, pixels: PixelBuffer, name: &str) -> EditorResult<LayerId> {
        self.deactivate_tool()?;
        let (width, height) = (pixels.width(), pixels.height());
        let source = self.sources.add(pixels);
        self.layers.restore(LayerStack::default());
        let id = self
            .layers
            .add_layer(LayerKind::Image { source }, LayerProps::named(name));
        self.layers.set_active_layer(Some(id));
        self.canvas.resize(width, height);
        let baseline = self.snapshot();
        self.history.reset(&baseline)?;
        tracing::info!("Loaded image \"{name}\" ({width}x{height})");
        Ok(id)
    }

    /// Add an image layer on top and commit it.
    ///
    /// # Errors
    ///
    /// Returns an error if the history entry cannot be recorded.
    pub fn add_image_layer(&mut self, pixels: PixelBuffer, name: &str) -> EditorResult<LayerId> {
        let source = self.sources.add(pixels);
        self.add_layer(LayerKind::Image { source }, LayerProps::named(name))
    }

    /// Add a layer on top and commit it.
    ///
    /// # Errors
    ///
    /// Returns an error if the history entry cannot be recorded.
    pub fn add_layer(&mut self, kind: LayerKind, props: LayerProps) -> EditorResult<LayerId> {
        let label = format!("Add {} Layer", kind.type_name());
        let id = self.layers.add_layer(kind, props);
        self.save_to_history(&label)?;
        Ok(id)
    }

    /// Point an image or sticker layer at new pixels and commit.
    ///
    /// The old source stays in the store so undo can return to it.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::LayerNotFound`] for unknown ids and
    /// [`EditorError::InvalidOperation`] for layers without a source.
    pub fn replace_layer_source(
        &mut self,
        id: LayerId,
        pixels: PixelBuffer,
        label: &str,
    ) -> EditorResult<SourceId> {
        let layer = self
            .layers
            .get_layer(id)
            .ok_or_else(|| EditorError::LayerNotFound(id.to_string()))?;
        let sticker = match layer.kind {
            LayerKind::Image { .. } => false,
            LayerKind::Sticker { .. } => true,
            _ => {
                return Err(EditorError::InvalidOperation(format!(
                    "{} layer has no pixel source",
                    layer.kind.type_name()
                )))
            }
        };
        let source = self.sources.add(pixels);
        let kind = if sticker {
            LayerKind::Sticker { source }
        } else {
            LayerKind::Image { source }
        };
        self.layers.update_layer(
            id,
            LayerProps {
                kind: Some(kind),
                ..LayerProps::default()
            },
        );
        self.save_to_history(label)?;
        Ok(source)
    }

    // -- history -----------------------------------------------------------

    /// Commit the current state as one undo step.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized.
    pub fn save_to_history(&mut self, label: &str) -> EditorResult<()> {
        let snapshot = self.snapshot();
        self.history.push(label, &snapshot)
    }

    /// Revert the last committed step.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NothingToUndo`] at the bottom of the history.
    pub fn undo(&mut self) -> EditorResult<()> {
        let label = self.history.undo_label().map(str::to_owned);
        let snapshot = self.history.undo()?;
        tracing::debug!("Undo {label:?}");
        self.restore(snapshot);
        Ok(())
    }

    /// Reapply the last undone step.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NothingToRedo`] at the top of the history.
    pub fn redo(&mut self) -> EditorResult<()> {
        let snapshot = self.history.redo()?;
        tracing::debug!("Redo to {}", self.history.cursor());
        self.restore(snapshot);
        Ok(())
    }

    /// Whether [`Editor::undo`] would succeed.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether [`Editor::redo`] would succeed.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn restore(&mut self, snapshot: DocumentSnapshot) {
        self.layers.restore(snapshot.stack);
        self.canvas.resize(snapshot.width, snapshot.height);
        if self.active_tool == Some(ToolKind::Crop) {
            self.tools.crop.tool_mut().reseed(self.canvas.size());
        }
    }

    // -- tools -------------------------------------------------------------

    /// Run `f` with the slot for `kind` and a context over this document.
    fn dispatch<R>(
        &mut self,
        kind: ToolKind,
        f: impl FnOnce(&mut dyn ToolDriver, &mut ToolContext<'_>) -> EditorResult<R>,
    ) -> EditorResult<R> {
        let Self {
            tools,
            layers,
            history,
            canvas,
            sources,
            ..
        } = self;
        let mut ctx = ToolContext {
            layers,
            history,
            canvas: &*canvas,
            sources: &*sources,
        };
        f(tools.driver(kind), &mut ctx)
    }

    /// The active tool, if any.
    #[must_use]
    pub const fn active_tool(&self) -> Option<ToolKind> {
        self.active_tool
    }

    /// Make `kind` the active tool, retiring the previous one first.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ToolUnavailable`] if the tool is not enabled,
    /// or whatever the tool's activation hooks return.
    pub fn activate_tool(&mut self, kind: ToolKind) -> EditorResult<()> {
        if !self.config.tool_enabled(kind) {
            return Err(EditorError::ToolUnavailable(kind.to_string()));
        }
        if self.active_tool == Some(kind) {
            return Ok(());
        }
        self.deactivate_tool()?;
        let activated = self.dispatch(kind, |driver, ctx| {
            driver.attach(ctx)?;
            driver.activate(ctx)
        });
        if let Err(err) = activated {
            self.tools.driver(kind).detach();
            return Err(err);
        }
        self.active_tool = Some(kind);
        Ok(())
    }

    /// Deactivate and detach the active tool, if any.
    ///
    /// # Errors
    ///
    /// Returns whatever the tool's deactivation hook returns; the tool is
    /// detached regardless.
    pub fn deactivate_tool(&mut self) -> EditorResult<()> {
        let Some(kind) = self.active_tool.take() else {
            return Ok(());
        };
        let result = self.dispatch(kind, |driver, ctx| driver.deactivate(ctx));
        self.tools.driver(kind).detach();
        result
    }

    fn forward(
        &mut self,
        what: &str,
        f: impl FnOnce(&mut dyn ToolDriver, &mut ToolContext<'_>) -> EditorResult<()>,
    ) -> bool {
        let Some(kind) = self.active_tool else {
            tracing::debug!("{what} ignored, no active tool");
            return false;
        };
        match self.dispatch(kind, f) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!("{what} ignored by {kind} tool: {err}");
                false
            }
        }
    }

    /// Forward a pointer press to the active tool. Returns whether it was handled.
    pub fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        self.forward("Pointer down", |driver, ctx| driver.pointer_down(ctx, event))
    }

    /// Forward a pointer move to the active tool. Returns whether it was handled.
    pub fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        self.forward("Pointer move", |driver, ctx| driver.pointer_move(ctx, event))
    }

    /// Forward a pointer release to the active tool. Returns whether it was handled.
    pub fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        self.forward("Pointer up", |driver, ctx| driver.pointer_up(ctx, event))
    }

    /// Apply a keyboard shortcut. Returns whether the key was consumed.
    ///
    /// | Key | Action |
    /// |-----|--------|
    /// | Ctrl/Cmd+Z | undo |
    /// | Ctrl/Cmd+Shift+Z, Ctrl/Cmd+Y | redo |
    /// | Enter | apply crop (crop tool) |
    /// | Escape | cancel crop (crop tool) |
    /// | C, V, B | crop, transform, brush tool |
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if !self.config.enable_keyboard_shortcuts {
            return false;
        }
        let m = event.modifiers;
        let cropping = self.active_tool == Some(ToolKind::Crop);
        let result = match event.key.to_lowercase().as_str() {
            "z" if m.command() && m.shift => self.redo(),
            "z" if m.command() => self.undo(),
            "y" if m.command() => self.redo(),
            "enter" if cropping => self.apply_crop().map(|_| ()),
            "escape" if cropping => self.cancel_crop(),
            "c" if !m.command() => self.activate_tool(ToolKind::Crop),
            "v" if !m.command() => self.activate_tool(ToolKind::Transform),
            "b" if !m.command() => self.activate_tool(ToolKind::Brush),
            _ => return false,
        };
        if let Err(err) = result {
            tracing::debug!("Shortcut {:?} had no effect: {err}", event.key);
        }
        true
    }

    /// Forward the primary touch as pointer input. Multi-touch is ignored.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> bool {
        if !self.config.enable_touch_gestures || event.is_multi_touch() {
            return false;
        }
        let pointer = event.primary_pointer().or(self.last_touch);
        let Some(pointer) = pointer else {
            return false;
        };
        match event.phase {
            TouchPhase::Start => {
                self.last_touch = Some(pointer);
                self.pointer_down(&pointer)
            }
            TouchPhase::Move => {
                self.last_touch = Some(pointer);
                self.pointer_move(&pointer)
            }
            TouchPhase::End | TouchPhase::Cancel => {
                self.last_touch = None;
                self.pointer_up(&pointer)
            }
        }
    }

    /// The crop tool.
    #[must_use]
    pub const fn crop_tool(&self) -> &CropTool {
        self.tools.crop.tool()
    }

    /// The crop tool, for aspect ratio and preset changes.
    pub fn crop_tool_mut(&mut self) -> &mut CropTool {
        self.tools.crop.tool_mut()
    }

    /// The transform tool.
    #[must_use]
    pub const fn transform_tool(&self) -> &TransformTool {
        self.tools.transform.tool()
    }

    /// The transform tool.
    pub fn transform_tool_mut(&mut self) -> &mut TransformTool {
        self.tools.transform.tool_mut()
    }

    /// The brush tool.
    #[must_use]
    pub const fn brush_tool(&self) -> &BrushTool {
        self.tools.brush.tool()
    }

    /// The brush tool, for settings changes.
    pub fn brush_tool_mut(&mut self) -> &mut BrushTool {
        self.tools.brush.tool_mut()
    }

    /// Apply the crop rectangle: shift every layer, resize the canvas and
    /// commit "Crop".
    ///
    /// Layers keep their place on the canvas whatever their scale or
    /// rotation, including canvas-sized layers whose pivot moves.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] unless the crop tool is active,
    /// and [`EditorError::InvalidOperation`] if the rectangle is off-canvas.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply_crop(&mut self) -> EditorResult<CropRect> {
        let rect = self.tools.crop.with_attached(|tool| {
            tool.apply()
                .ok_or_else(|| EditorError::InvalidOperation("crop outside canvas".into()))
        })?;

        let old_size = self.canvas.size();
        let new_size = CanvasSize::new(rect.width as u32, rect.height as u32);
        let offset = Point::new(rect.x, rect.y);
        let ids: Vec<LayerId> = self.layers.layers().iter().map(|l| l.id).collect();
        for id in ids {
            let Some(layer) = self.layers.get_layer(id) else {
                continue;
            };
            // Canvas-sized rasters shrink with the canvas, moving their pivot.
            let before = half(raster::local_size(layer, &self.sources, old_size));
            let after = half(raster::local_size(layer, &self.sources, new_size));
            let props = match &layer.kind {
                LayerKind::Drawing { paths } => {
                    // Re-centre the strokes on the part still visible, which
                    // zeroes the translation.
                    let centre = Point::new(offset.x + after.x, offset.y + after.y);
                    let local = layer.transform.to_local(centre, before);
                    let shift = Point::new(local.x - after.x, local.y - after.y);
                    LayerProps {
                        kind: Some(LayerKind::Drawing {
                            paths: paths.iter().map(|p| shifted(p, shift)).collect(),
                        }),
                        transform: Some(Transform {
                            x: 0.0,
                            y: 0.0,
                            ..layer.transform
                        }),
                        ..LayerProps::default()
                    }
                }
                _ => {
                    let pivot_shift = Point::new(after.x - before.x, after.y - before.y);
                    LayerProps::transform(compensated(layer.transform, pivot_shift, offset))
                }
            };
            self.layers.update_layer(id, props);
        }

        self.canvas.resize(new_size.width, new_size.height);
        self.save_to_history("Crop")?;
        self.tools.crop.tool_mut().reseed(self.canvas.size());
        tracing::info!(
            "Cropped to {}x{} at ({}, {})",
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        Ok(rect)
    }

    /// Discard the crop rectangle without touching the document.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] unless the crop tool is attached.
    pub fn cancel_crop(&mut self) -> EditorResult<()> {
        self.tools.crop.with_attached(|tool| {
            tool.cancel();
            Ok(())
        })
    }

    /// Rotate the active layer by `degrees` through the transform tool.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::NoToolContext`] unless the transform tool is
    /// active, or [`EditorError::NoActiveLayer`].
    pub fn rotate_active_layer(&mut self, degrees: f32) -> EditorResult<()> {
        self.transform_command(|tool, ctx| tool.rotate(ctx, degrees))
    }

    /// Mirror the active layer left to right.
    ///
    /// # Errors
    ///
    /// As [`Editor::rotate_active_layer`].
    pub fn flip_horizontal(&mut self) -> EditorResult<()> {
        self.transform_command(TransformTool::flip_horizontal)
    }

    /// Mirror the active layer top to bottom.
    ///
    /// # Errors
    ///
    /// As [`Editor::rotate_active_layer`].
    pub fn flip_vertical(&mut self) -> EditorResult<()> {
        self.transform_command(TransformTool::flip_vertical)
    }

    fn transform_command(
        &mut self,
        f: impl FnOnce(&mut TransformTool, &mut ToolContext<'_>) -> EditorResult<()>,
    ) -> EditorResult<()> {
        let Self {
            tools,
            layers,
            history,
            canvas,
            sources,
            ..
        } = self;
        let mut ctx = ToolContext {
            layers,
            history,
            canvas: &*canvas,
            sources: &*sources,
        };
        tools.transform.with_attached(|tool| f(tool, &mut ctx))
    }

    // -- filters -----------------------------------------------------------

    /// Append a filter to a layer and commit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::LayerNotFound`] for unknown layers and
    /// [`EditorError::InvalidOperation`] for unregistered filters.
    pub fn add_filter(&mut self, id: LayerId, filter: AppliedFilter) -> EditorResult<()> {
        let name = self
            .filters
            .get(&filter.id)
            .map(|d| d.name.clone())
            .ok_or_else(|| {
                EditorError::InvalidOperation(format!("Unknown filter: {}", filter.id))
            })?;
        self.append_filters(id, vec![filter], &format!("Filter: {name}"))
    }

    /// Append a preset's filters to a layer as one step.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::UnknownPreset`] or [`EditorError::LayerNotFound`].
    pub fn apply_preset(&mut self, id: LayerId, preset_id: &str) -> EditorResult<()> {
        let preset = self
            .presets
            .iter()
            .find(|p| p.id == preset_id)
            .cloned()
            .ok_or_else(|| EditorError::UnknownPreset(preset_id.to_string()))?;
        self.append_filters(id, preset.filters, &format!("Preset: {}", preset.name))
    }

    /// Remove every filter from a layer and commit.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::LayerNotFound`] for unknown layers.
    pub fn clear_filters(&mut self, id: LayerId) -> EditorResult<()> {
        if !self.layers.update_layer(
            id,
            LayerProps {
                filters: Some(Vec::new()),
                ..LayerProps::default()
            },
        ) {
            return Err(EditorError::LayerNotFound(id.to_string()));
        }
        self.save_to_history("Clear Filters")
    }

    fn append_filters(
        &mut self,
        id: LayerId,
        extra: Vec<AppliedFilter>,
        label: &str,
    ) -> EditorResult<()> {
        let layer = self
            .layers
            .get_layer(id)
            .ok_or_else(|| EditorError::LayerNotFound(id.to_string()))?;
        let mut filters = layer.filters.clone();
        filters.extend(extra);
        self.layers.update_layer(
            id,
            LayerProps {
                filters: Some(filters),
                ..LayerProps::default()
            },
        );
        self.save_to_history(label)
    }

    // -- rendering ---------------------------------------------------------

    /// Composite now and return the frame.
    pub fn render(&mut self) -> &PixelBuffer {
        self.canvas.render(&self.layers, &self.sources, &self.filters)
    }

    /// Composite only if something changed since the last pass.
    pub fn render_if_needed(&mut self) -> Option<&PixelBuffer> {
        self.canvas.render_if_needed(&self.layers, &self.sources, &self.filters)
    }
}

/// Translation that keeps a layer's content still on the canvas when its
/// pivot moves by `pivot_shift` and the canvas origin by `offset`.
fn compensated(transform: Transform, pivot_shift: Point, offset: Point) -> Transform {
    let moved = transform.linear(pivot_shift);
    Transform {
        x: transform.x - offset.x + moved.x - pivot_shift.x,
        y: transform.y - offset.y + moved.y - pivot_shift.y,
        ..transform
    }
}

#[allow(clippy::cast_precision_loss)]
fn half(size: (u32, u32)) -> Point {
    Point::new(size.0 as f32 / 2.0, size.1 as f32 / 2.0)
}

fn shifted(path: &DrawingPath, by: Point) -> DrawingPath {
    DrawingPath {
        points: path
            .points
            .iter()
            .map(|p| Point::new(p.x - by.x, p.y - by.y))
            .collect(),
        ..path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::KeyModifiers;
    use crate::pixel::Rgba;

    fn editor() -> Editor {
        Editor::new(EditorConfig::with_size(100, 100)).expect("editor")
    }

    #[test]
    fn test_disabled_tool_is_unavailable() {
        let mut editor = Editor::new(EditorConfig {
            tools: vec![ToolKind::Brush],
            ..EditorConfig::with_size(10, 10)
        })
        .expect("editor");
        assert!(matches!(
            editor.activate_tool(ToolKind::Crop),
            Err(EditorError::ToolUnavailable(_))
        ));
        assert_eq!(editor.active_tool(), None);
    }

    #[test]
    fn test_switching_tools_retires_previous() {
        let mut editor = editor();
        editor.activate_tool(ToolKind::Crop).expect("crop");
        editor.activate_tool(ToolKind::Brush).expect("brush");
        assert_eq!(editor.active_tool(), Some(ToolKind::Brush));
        assert!(matches!(editor.cancel_crop(), Err(EditorError::NoToolContext(_))));
    }

    #[test]
    fn test_pointer_without_tool_is_ignored() {
        let mut editor = editor();
        assert!(!editor.pointer_down(&PointerEvent::at(1.0, 1.0)));
    }

    #[test]
    fn test_load_image_resets_history_and_canvas() {
        let mut editor = editor();
        editor
            .add_layer(LayerKind::drawing(), LayerProps::default())
            .expect("add");
        let id = editor
            .load_image(PixelBuffer::filled(30, 20, Rgba::WHITE), "photo")
            .expect("load");

        assert_eq!(editor.layers().len(), 1);
        assert_eq!(editor.layers().active_layer_id(), Some(id));
        assert_eq!(editor.canvas().size().width, 30);
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_apply_crop_shifts_layers_and_resizes() {
        let mut editor = editor();
        let id = editor
            .load_image(PixelBuffer::filled(100, 100, Rgba::WHITE), "photo")
            .expect("load");
        editor.activate_tool(ToolKind::Crop).expect("crop");

        let rect = editor.apply_crop().expect("apply");
        assert_eq!(rect, CropRect::new(10.0, 10.0, 80.0, 80.0));
        assert_eq!(editor.canvas().size().width, 80);
        let t = editor.layers().get_layer(id).map(|l| l.transform).expect("layer");
        assert!((t.x + 10.0).abs() < 1e-4);
        assert_eq!(editor.history().undo_label(), Some("Crop"));

        editor.undo().expect("undo");
        assert_eq!(editor.canvas().size().width, 100);
    }

    #[test]
    fn test_compensated_keeps_scaled_content_in_place() {
        let plain = compensated(
            Transform::at(4.0, 6.0),
            Point::new(-50.0, -50.0),
            Point::new(10.0, 20.0),
        );
        assert!((plain.x + 6.0).abs() < 1e-4);
        assert!((plain.y + 14.0).abs() < 1e-4);

        let scaled = Transform {
            scale_x: 2.0,
            scale_y: 2.0,
            ..Transform::default()
        };
        let out = compensated(scaled, Point::new(-50.0, -50.0), Point::new(0.0, 0.0));
        // Local 60 sat at canvas 20 around pivot 100 and stays there around 50.
        let canvas_x = 2.0f32.mul_add(60.0 - 50.0, 50.0) + out.x;
        assert!((canvas_x - 20.0).abs() < 1e-4);
        assert!((out.scale_x - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_keyboard_undo_redo() {
        let mut editor = editor();
        editor
            .add_layer(LayerKind::drawing(), LayerProps::default())
            .expect("add");

        assert!(editor.handle_key(&KeyEvent::new("z", KeyModifiers::ctrl())));
        assert!(editor.layers().is_empty());
        let redo = KeyModifiers {
            shift: true,
            ..KeyModifiers::ctrl()
        };
        assert!(editor.handle_key(&KeyEvent::new("Z", redo)));
        assert_eq!(editor.layers().len(), 1);
    }

    #[test]
    fn test_shortcuts_can_be_disabled() {
        let mut editor = Editor::new(EditorConfig {
            enable_keyboard_shortcuts: false,
            ..EditorConfig::default()
        })
        .expect("editor");
        assert!(!editor.handle_key(&KeyEvent::new("b", KeyModifiers::default())));
        assert_eq!(editor.active_tool(), None);
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let mut editor = editor();
        let id = editor
            .load_image(PixelBuffer::filled(4, 4, Rgba::WHITE), "photo")
            .expect("load");
        assert!(matches!(
            editor.apply_preset(id, "nope"),
            Err(EditorError::UnknownPreset(_))
        ));
        editor.apply_preset(id, "noir").expect("preset");
        assert_eq!(editor.layers().get_layer(id).map(|l| l.filters.len()), Some(2));
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_replace_source_keeps_old_for_undo() {
        let mut editor = editor();
        let id = editor
            .load_image(PixelBuffer::filled(4, 4, Rgba::WHITE), "photo")
            .expect("load");
        let before = editor.render().clone();
        editor
            .replace_layer_source(id, PixelBuffer::filled(4, 4, Rgba::BLACK), "Enhance")
            .expect("replace");
        assert_ne!(editor.render(), &before);
        editor.undo().expect("undo");
        assert_eq!(editor.render(), &before);
    }
}
