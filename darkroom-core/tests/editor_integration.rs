//! Editor Integration Tests
//!
//! Drives the editor the way a host surface would:
//! - Compositing order and determinism
//! - Crop, transform and brush gestures through pointer input
//! - Filter order on a loaded image
//! - Undo across tool sessions

use darkroom_core::{
    AppliedFilter, BlendMode, CropRect, Editor, EditorConfig, KeyEvent, KeyModifiers, LayerKind,
    LayerProps, PixelBuffer, PointerEvent, Rgba, ShapeKind, ToolKind, TouchEvent, TouchPhase,
    TouchPoint, Transform,
};

/// Drag from `from` to `to` through the given intermediate points.
fn drag(editor: &mut Editor, points: &[(f32, f32)]) {
    let (first, rest) = points.split_first().expect("at least one point");
    editor.pointer_down(&PointerEvent::at(first.0, first.1));
    for &(x, y) in rest {
        editor.pointer_move(&PointerEvent::at(x, y));
    }
    let last = points.last().expect("at least one point");
    editor.pointer_up(&PointerEvent::at(last.0, last.1));
}

fn opaque_square(color: Rgba, blend_mode: BlendMode) -> (LayerKind, LayerProps) {
    (
        LayerKind::Shape {
            shape: ShapeKind::Rectangle,
            width: 10.0,
            height: 10.0,
            fill: color,
            stroke: Rgba::TRANSPARENT,
            stroke_width: 0.0,
        },
        LayerProps {
            blend_mode: Some(blend_mode),
            ..LayerProps::default()
        },
    )
}

fn drawing_path_count(editor: &Editor) -> Option<usize> {
    editor.layers().layers().iter().find_map(|l| match &l.kind {
        LayerKind::Drawing { paths } => Some(paths.len()),
        _ => None,
    })
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_render_is_idempotent() {
    let mut editor = Editor::new(EditorConfig::with_size(32, 32)).expect("editor");
    let (kind, props) = opaque_square(Rgba::new(10, 200, 30, 255), BlendMode::Normal);
    editor.add_layer(kind, props).expect("add");
    let (kind, props) = opaque_square(Rgba::new(90, 90, 250, 200), BlendMode::Overlay);
    editor.add_layer(kind, props).expect("add");

    let first = editor.render().clone();
    let second = editor.render().clone();
    assert_eq!(first, second);
    assert_eq!(editor.canvas().frame_count(), 2);
}

#[test]
fn test_swapping_z_order_changes_output() {
    let mut editor = Editor::new(EditorConfig::with_size(10, 10)).expect("editor");
    let (kind, props) = opaque_square(Rgba::new(255, 0, 0, 255), BlendMode::Normal);
    let red = editor.add_layer(kind, props).expect("add");
    let (kind, props) = opaque_square(Rgba::new(0, 0, 255, 255), BlendMode::Screen);
    editor.add_layer(kind, props).expect("add");

    let before = editor.render().get(5, 5);
    assert_eq!(before, Some(Rgba::new(255, 0, 255, 255)));

    editor.layers_mut().reorder(red, 1);
    let after = editor.render().get(5, 5);
    assert_eq!(after, Some(Rgba::new(255, 0, 0, 255)));
}

#[test]
fn test_render_if_needed_tracks_mutations() {
    let mut editor = Editor::new(EditorConfig::with_size(8, 8)).expect("editor");
    assert!(editor.render_if_needed().is_some());
    assert!(editor.render_if_needed().is_none());

    editor
        .add_layer(LayerKind::drawing(), LayerProps::default())
        .expect("add");
    assert!(editor.render_if_needed().is_some());
}

// ============================================================================
// Filters
// ============================================================================

#[test]
fn test_filter_order_is_observable() {
    let run = |filters: [AppliedFilter; 2]| {
        let mut editor = Editor::new(EditorConfig::default()).expect("editor");
        let id = editor
            .load_image(
                PixelBuffer::filled(100, 100, Rgba::new(240, 40, 40, 255)),
                "photo",
            )
            .expect("load");
        for filter in filters {
            editor.add_filter(id, filter).expect("filter");
        }
        editor.render().get(50, 50).expect("pixel")
    };
    let grayscale = AppliedFilter::new("grayscale");
    let brighten = AppliedFilter::new("brighten").with_param("amount", 0.2);

    let gray_then_bright = run([grayscale.clone(), brighten.clone()]);
    let bright_then_gray = run([brighten, grayscale]);

    assert_eq!(gray_then_bright, Rgba::new(134, 134, 134, 255));
    assert_eq!(bright_then_gray, Rgba::new(126, 126, 126, 255));
    assert_ne!(gray_then_bright, bright_then_gray);
}

#[test]
fn test_unknown_filter_is_rejected() {
    let mut editor = Editor::new(EditorConfig::default()).expect("editor");
    let id = editor
        .load_image(PixelBuffer::filled(4, 4, Rgba::WHITE), "photo")
        .expect("load");
    assert!(editor.add_filter(id, AppliedFilter::new("vignette")).is_err());
    assert!(!editor.can_undo());
}

// ============================================================================
// Crop
// ============================================================================

fn crop_editor() -> Editor {
    let mut editor = Editor::new(EditorConfig::with_size(200, 200)).expect("editor");
    editor.activate_tool(ToolKind::Crop).expect("crop");
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 160.0, 160.0));
    editor
}

#[test]
fn test_crop_east_handle_changes_width_only() {
    let mut editor = crop_editor();
    drag(&mut editor, &[(180.0, 100.0), (210.0, 100.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 190.0, 160.0));
}

#[test]
fn test_crop_south_east_handle_changes_both() {
    let mut editor = crop_editor();
    drag(&mut editor, &[(180.0, 180.0), (190.0, 200.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 170.0, 180.0));
}

#[test]
fn test_crop_aspect_lock_recomputes_height() {
    let mut editor = crop_editor();
    editor.crop_tool_mut().set_aspect_ratio(Some(2.0));
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 160.0, 80.0));

    drag(&mut editor, &[(180.0, 60.0), (200.0, 60.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 180.0, 90.0));
}

#[test]
fn test_crop_body_drag_stays_on_canvas() {
    let mut editor = crop_editor();
    drag(&mut editor, &[(100.0, 100.0), (300.0, -50.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(40.0, 0.0, 160.0, 160.0));
}

#[test]
fn test_escape_cancels_without_history() {
    let mut editor = crop_editor();
    drag(&mut editor, &[(180.0, 100.0), (120.0, 100.0)]);
    assert!(editor.handle_key(&KeyEvent::new("Escape", KeyModifiers::default())));
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 160.0, 160.0));
    assert!(!editor.can_undo());
}

#[test]
fn test_enter_applies_crop() {
    let mut editor = crop_editor();
    assert!(editor.handle_key(&KeyEvent::new("Enter", KeyModifiers::default())));
    assert_eq!(editor.canvas().size().width, 160);
    assert_eq!(editor.history().undo_label(), Some("Crop"));
}

#[test]
fn test_locked_east_drag_past_west_edge_hits_min_size() {
    let mut editor = crop_editor();
    editor.crop_tool_mut().set_aspect_ratio(Some(1.0));
    drag(&mut editor, &[(180.0, 100.0), (-20.0, 100.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 20.0, 20.0));
}

#[test]
fn test_locked_west_drag_past_east_edge_keeps_right_edge() {
    let mut editor = crop_editor();
    editor.crop_tool_mut().set_aspect_ratio(Some(1.0));
    drag(&mut editor, &[(20.0, 100.0), (300.0, 100.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(160.0, 20.0, 20.0, 20.0));
}

#[test]
fn test_locked_north_drag_past_south_edge_keeps_bottom_edge() {
    let mut editor = crop_editor();
    editor.crop_tool_mut().set_aspect_ratio(Some(1.0));
    drag(&mut editor, &[(100.0, 20.0), (100.0, 300.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 160.0, 20.0, 20.0));
}

#[test]
fn test_locked_drag_exactly_onto_opposite_edge() {
    let mut editor = crop_editor();
    editor.crop_tool_mut().set_aspect_ratio(Some(1.0));
    drag(&mut editor, &[(180.0, 100.0), (20.0, 100.0)]);
    let rect = editor.crop_tool().rect();
    assert!(rect.width.is_finite() && rect.height.is_finite());
    assert_eq!(rect, CropRect::new(20.0, 20.0, 20.0, 20.0));
}

#[test]
fn test_locked_resizes_chain_and_apply() {
    let mut editor = crop_editor();
    editor.crop_tool_mut().set_aspect_ratio(Some(1.0));
    drag(&mut editor, &[(180.0, 100.0), (120.0, 100.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 100.0, 100.0));

    drag(&mut editor, &[(70.0, 120.0), (70.0, -100.0)]);
    assert_eq!(editor.crop_tool().rect(), CropRect::new(20.0, 20.0, 20.0, 20.0));

    let applied = editor.apply_crop().expect("apply");
    assert_eq!(applied, CropRect::new(20.0, 20.0, 20.0, 20.0));
    assert_eq!(editor.canvas().size().width, 20);
    assert_eq!(editor.canvas().size().height, 20);
}

/// Alpha-weighted centre of the painted pixels.
#[allow(clippy::cast_precision_loss)]
fn painted_centroid(frame: &PixelBuffer) -> Option<(f32, f32)> {
    let (mut sx, mut sy, mut total) = (0.0f32, 0.0f32, 0.0f32);
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let a = f32::from(frame.get(x, y).map_or(0, Rgba::a));
            sx += a * x as f32;
            sy += a * y as f32;
            total += a;
        }
    }
    (total > 0.0).then(|| (sx / total, sy / total))
}

fn transformed_stroke_editor(transform: Transform) -> Editor {
    let mut editor = Editor::new(EditorConfig::with_size(200, 200)).expect("editor");
    editor.activate_tool(ToolKind::Brush).expect("brush");
    drag(&mut editor, &[(60.0, 60.0), (70.0, 60.0)]);
    editor.deactivate_tool().expect("deactivate");
    let id = editor.layers().active_layer_id().expect("drawing layer");
    editor
        .layers_mut()
        .update_layer(id, LayerProps::transform(transform));
    editor.save_to_history("Scale").expect("commit");
    editor
}

#[test]
fn test_crop_keeps_scaled_drawing_in_place() {
    let mut editor = transformed_stroke_editor(Transform {
        scale_x: 2.0,
        scale_y: 2.0,
        ..Transform::default()
    });
    let before = painted_centroid(editor.render()).expect("stroke visible");
    assert!((before.0 - 30.0).abs() < 1.5 && (before.1 - 20.0).abs() < 1.5);

    editor.activate_tool(ToolKind::Crop).expect("crop");
    editor
        .crop_tool_mut()
        .set_rect(CropRect::new(0.0, 0.0, 100.0, 100.0));
    editor.apply_crop().expect("apply");

    let after = painted_centroid(editor.render()).expect("stroke still visible");
    assert!((after.0 - before.0).abs() < 0.5, "{before:?} -> {after:?}");
    assert!((after.1 - before.1).abs() < 0.5, "{before:?} -> {after:?}");
}

#[test]
fn test_crop_keeps_rotated_drawing_in_place() {
    let mut editor = transformed_stroke_editor(Transform {
        rotation: std::f32::consts::FRAC_PI_2,
        ..Transform::default()
    });
    let before = painted_centroid(editor.render()).expect("stroke visible");

    editor.activate_tool(ToolKind::Crop).expect("crop");
    editor
        .crop_tool_mut()
        .set_rect(CropRect::new(100.0, 40.0, 80.0, 80.0));
    editor.apply_crop().expect("apply");

    let after = painted_centroid(editor.render()).expect("stroke still visible");
    assert!((after.0 + 100.0 - before.0).abs() < 1.0, "{before:?} -> {after:?}");
    assert!((after.1 + 40.0 - before.1).abs() < 1.0, "{before:?} -> {after:?}");
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn test_transform_commands_need_active_tool() {
    let mut editor = Editor::new(EditorConfig::with_size(50, 50)).expect("editor");
    editor
        .load_image(PixelBuffer::filled(10, 10, Rgba::WHITE), "photo")
        .expect("load");
    assert!(editor.rotate_active_layer(90.0).is_err());

    editor.activate_tool(ToolKind::Transform).expect("transform");
    editor.rotate_active_layer(90.0).expect("rotate");
    editor.flip_horizontal().expect("flip");
    let labels: Vec<_> = editor.history().labels().collect();
    assert_eq!(labels, vec!["Rotate", "Flip Horizontal"]);
}

#[test]
fn test_transform_drag_is_one_history_entry() {
    let mut editor = Editor::new(EditorConfig::default()).expect("editor");
    let id = editor
        .load_image(PixelBuffer::filled(100, 100, Rgba::WHITE), "photo")
        .expect("load");
    editor.activate_tool(ToolKind::Transform).expect("transform");

    drag(&mut editor, &[(50.0, 50.0), (55.0, 52.0), (60.0, 54.0), (70.0, 60.0)]);
    let t = editor.layers().get_layer(id).map(|l| l.transform).expect("layer");
    assert!((t.x - 20.0).abs() < 1e-4);
    assert!((t.y - 10.0).abs() < 1e-4);
    assert_eq!(editor.history().len(), 1);
}

// ============================================================================
// Brush
// ============================================================================

#[test]
fn test_single_point_stroke_is_discarded() {
    let mut editor = Editor::new(EditorConfig::with_size(40, 40)).expect("editor");
    editor.activate_tool(ToolKind::Brush).expect("brush");
    let base = editor.history().len();

    drag(&mut editor, &[(5.0, 5.0)]);
    assert_eq!(editor.history().len(), base);
    assert_eq!(drawing_path_count(&editor), Some(0));

    drag(&mut editor, &[(5.0, 5.0), (10.0, 10.0)]);
    assert_eq!(editor.history().len(), base + 1);
    assert_eq!(editor.history().undo_label(), Some("Draw"));
    assert_eq!(drawing_path_count(&editor), Some(1));
}

#[test]
fn test_stroke_then_undo_leaves_empty_drawing_layer() {
    let mut editor = Editor::new(EditorConfig::with_size(100, 100)).expect("editor");
    editor.activate_tool(ToolKind::Brush).expect("brush");
    drag(
        &mut editor,
        &[(10.0, 10.0), (20.0, 15.0), (30.0, 20.0), (40.0, 25.0), (50.0, 30.0)],
    );
    assert_eq!(drawing_path_count(&editor), Some(1));

    editor.deactivate_tool().expect("deactivate");
    editor.undo().expect("undo");
    assert_eq!(drawing_path_count(&editor), Some(0));
}

#[test]
fn test_stroke_renders() {
    let mut editor = Editor::new(EditorConfig::with_size(20, 20)).expect("editor");
    editor.activate_tool(ToolKind::Brush).expect("brush");
    drag(&mut editor, &[(2.0, 10.0), (18.0, 10.0)]);
    assert_eq!(editor.render().get(10, 9), Some(Rgba::BLACK));
}

#[test]
fn test_touch_drives_brush() {
    let mut editor = Editor::new(EditorConfig::with_size(40, 40)).expect("editor");
    editor.activate_tool(ToolKind::Brush).expect("brush");
    let touch = |phase, x, y| {
        TouchEvent::new(
            phase,
            vec![TouchPoint {
                id: 0,
                x,
                y,
                pressure: None,
            }],
            0,
        )
    };

    assert!(editor.handle_touch(&touch(TouchPhase::Start, 1.0, 1.0)));
    assert!(editor.handle_touch(&touch(TouchPhase::Move, 20.0, 20.0)));
    assert!(editor.handle_touch(&TouchEvent::new(TouchPhase::End, Vec::new(), 10)));
    assert_eq!(drawing_path_count(&editor), Some(1));
}

// ============================================================================
// History bound
// ============================================================================

#[test]
fn test_history_is_bounded_by_config() {
    let mut editor = Editor::new(EditorConfig {
        max_history_steps: 3,
        ..EditorConfig::with_size(10, 10)
    })
    .expect("editor");
    for _ in 0..5 {
        editor
            .add_layer(LayerKind::drawing(), LayerProps::default())
            .expect("add");
    }
    assert_eq!(editor.history().len(), 3);

    let mut undone = 0;
    while editor.undo().is_ok() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(editor.layers().len(), 2);
}
