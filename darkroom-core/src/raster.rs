//! Turning layer payloads into pixels and placing them in canvas space.

use crate::blend::blend_pixel;
use crate::canvas::{CanvasSize, GlyphRasterizer};
use crate::layer::{BlendMode, DrawingPath, Layer, LayerKind, ShapeKind, StrokeTool, Transform};
use crate::pixel::{PixelBuffer, Point, Rgba};
use crate::source::SourceStore;

/// Size of a layer's own raster before its transform is applied.
///
/// Image and sticker layers use their source size, shapes their declared
/// size, everything else the canvas.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn local_size(layer: &Layer, sources: &SourceStore, canvas: CanvasSize) -> (u32, u32) {
    match &layer.kind {
        LayerKind::Image { source } | LayerKind::Sticker { source } => sources
            .get(*source)
            .map_or((canvas.width, canvas.height), |s| (s.width(), s.height())),
        LayerKind::Shape { width, height, .. } => {
            (width.max(1.0).ceil() as u32, height.max(1.0).ceil() as u32)
        }
        _ => (canvas.width, canvas.height),
    }
}

/// Axis-aligned bounds of a placed layer as `(min, max)` corners.
///
/// Rotation is ignored.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn layer_bounds(layer: &Layer, sources: &SourceStore, canvas: CanvasSize) -> (Point, Point) {
    let (w, h) = local_size(layer, sources, canvas);
    let t = &layer.transform;
    let (half_w, half_h) = (w as f32 / 2.0, h as f32 / 2.0);
    let centre = Point::new(t.x + half_w, t.y + half_h);
    let (ext_x, ext_y) = (half_w * t.scale_x.abs(), half_h * t.scale_y.abs());
    (
        Point::new(centre.x - ext_x, centre.y - ext_y),
        Point::new(centre.x + ext_x, centre.y + ext_y),
    )
}

/// Produce the layer's own pixels, or `None` if it has none.
#[must_use]
pub fn rasterize(
    layer: &Layer,
    sources: &SourceStore,
    canvas: CanvasSize,
    glyphs: Option<&dyn GlyphRasterizer>,
) -> Option<PixelBuffer> {
    match &layer.kind {
        LayerKind::Image { source } | LayerKind::Sticker { source } => {
            let found = sources.get(*source);
            if found.is_none() {
                tracing::warn!("Layer {} references missing source {source}", layer.id);
            }
            found.map(|s| s.as_ref().clone())
        }
        LayerKind::Drawing { paths } => Some(rasterize_paths(paths, canvas)),
        LayerKind::Shape {
            shape,
            width,
            height,
            fill,
            stroke,
            stroke_width,
        } => Some(rasterize_shape(*shape, *width, *height, *fill, *stroke, *stroke_width)),
        LayerKind::Text {
            content,
            font_size,
            color,
        } => glyphs.and_then(|g| g.rasterize(content, *font_size, *color)),
        LayerKind::Adjustment { .. } => None,
    }
}

/// Rasterise strokes oldest first into a canvas-sized buffer.
#[must_use]
pub fn rasterize_paths(paths: &[DrawingPath], canvas: CanvasSize) -> PixelBuffer {
    let mut out = PixelBuffer::new(canvas.width, canvas.height);
    for path in paths {
        let coverage = stroke_coverage(path, canvas);
        let opacity = path.opacity.clamp(0.0, 1.0);
        for (i, &cov) in coverage.iter().enumerate() {
            if cov == 0 {
                continue;
            }
            let idx = i * 4;
            let strength = f32::from(cov) / 255.0 * opacity;
            let data = out.data_mut();
            let base = Rgba::new(data[idx], data[idx + 1], data[idx + 2], data[idx + 3]);
            let px = match path.tool {
                StrokeTool::Brush => blend_pixel(base, path.color, BlendMode::Normal, strength),
                StrokeTool::Eraser => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let a = (f32::from(base.a()) * (1.0 - strength)).round() as u8;
                    Rgba::new(base.r(), base.g(), base.b(), a)
                }
            };
            data[idx..idx + 4].copy_from_slice(&px.0);
        }
    }
    out
}

/// Per-pixel coverage (0..=255) of one stroke, stamping discs along segments.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn stroke_coverage(path: &DrawingPath, canvas: CanvasSize) -> Vec<u8> {
    let (w, h) = (canvas.width as usize, canvas.height as usize);
    let mut coverage = vec![0u8; w * h];
    let radius = (path.width / 2.0).max(0.5);
    let alpha = path.color.a();

    let mut stamp = |c: Point| {
        let min_x = (c.x - radius).floor().max(0.0) as usize;
        let min_y = (c.y - radius).floor().max(0.0) as usize;
        let max_x = ((c.x + radius).ceil().max(0.0) as usize).min(w);
        let max_y = ((c.y + radius).ceil().max(0.0) as usize).min(h);
        for y in min_y..max_y {
            for x in min_x..max_x {
                let centre = Point::new(x as f32 + 0.5, y as f32 + 0.5);
                if centre.distance(c) <= radius {
                    let slot = &mut coverage[y * w + x];
                    *slot = (*slot).max(alpha);
                }
            }
        }
    };

    let step = (radius / 2.0).max(0.5);
    for pair in path.points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let steps = (a.distance(b) / step).ceil().max(1.0) as usize;
        for s in 0..=steps {
            let t = s as f32 / steps as f32;
            stamp(Point::new(
                (b.x - a.x).mul_add(t, a.x),
                (b.y - a.y).mul_add(t, a.y),
            ));
        }
    }
    if let [only] = path.points.as_slice() {
        stamp(*only);
    }
    coverage
}

/// Rasterise a rectangle or ellipse with optional outline.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn rasterize_shape(
    shape: ShapeKind,
    width: f32,
    height: f32,
    fill: Rgba,
    stroke: Rgba,
    stroke_width: f32,
) -> PixelBuffer {
    let (w, h) = (width.max(1.0).ceil() as u32, height.max(1.0).ceil() as u32);
    let mut out = PixelBuffer::new(w, h);
    let (rx, ry) = (width / 2.0, height / 2.0);
    let sw = stroke_width.max(0.0);

    for y in 0..h {
        for x in 0..w {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let (inside, in_stroke) = match shape {
                ShapeKind::Rectangle => {
                    let inside = px <= width && py <= height;
                    let edge = px.min(py).min(width - px).min(height - py);
                    (inside, inside && edge < sw)
                }
                ShapeKind::Ellipse => {
                    let nx = (px - rx) / rx;
                    let ny = (py - ry) / ry;
                    let d = nx.hypot(ny);
                    let inside = d <= 1.0;
                    // Approximate distance to the outline in pixels.
                    let edge = (1.0 - d) * rx.min(ry);
                    (inside, inside && edge < sw)
                }
            };
            if in_stroke {
                out.put(x, y, stroke);
            } else if inside {
                out.put(x, y, fill);
            }
        }
    }
    out
}

/// Map a local raster into a canvas-sized buffer through `transform`.
///
/// Uses inverse mapping with nearest sampling, pivoting on the local centre.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn place(local: &PixelBuffer, transform: &Transform, canvas: CanvasSize) -> PixelBuffer {
    if transform.is_identity() && local.width() == canvas.width && local.height() == canvas.height
    {
        return local.clone();
    }
    let mut out = PixelBuffer::new(canvas.width, canvas.height);
    if transform.scale_x.abs() < f32::EPSILON || transform.scale_y.abs() < f32::EPSILON {
        return out;
    }

    let pivot = Point::new(local.width() as f32 / 2.0, local.height() as f32 / 2.0);
    let (sin, cos) = (-transform.rotation).sin_cos();

    for cy in 0..canvas.height {
        for cx in 0..canvas.width {
            let qx = cx as f32 + 0.5 - transform.x - pivot.x;
            let qy = cy as f32 + 0.5 - transform.y - pivot.y;
            let rx = qx.mul_add(cos, -qy * sin);
            let ry = qx.mul_add(sin, qy * cos);
            let lx = (rx / transform.scale_x + pivot.x).floor();
            let ly = (ry / transform.scale_y + pivot.y).floor();
            if lx < 0.0 || ly < 0.0 {
                continue;
            }
            #[allow(clippy::cast_sign_loss)]
            if let Some(px) = local.get(lx as u32, ly as u32) {
                out.put(cx, cy, px);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(w: u32, h: u32) -> CanvasSize {
        CanvasSize {
            width: w,
            height: h,
        }
    }

    #[test]
    fn test_place_translates() {
        let local = PixelBuffer::filled(2, 2, Rgba::WHITE);
        let placed = place(&local, &Transform::at(3.0, 1.0), canvas(8, 8));
        assert_eq!(placed.get(3, 1), Some(Rgba::WHITE));
        assert_eq!(placed.get(4, 2), Some(Rgba::WHITE));
        assert_eq!(placed.get(2, 1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_place_flips_horizontally() {
        let mut local = PixelBuffer::new(4, 1);
        local.put(0, 0, Rgba::WHITE);
        let transform = Transform {
            scale_x: -1.0,
            ..Transform::default()
        };
        let placed = place(&local, &transform, canvas(4, 1));
        assert_eq!(placed.get(3, 0), Some(Rgba::WHITE));
        assert_eq!(placed.get(0, 0), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_stroke_covers_segment() {
        let path = DrawingPath {
            points: vec![Point::new(1.0, 5.0), Point::new(9.0, 5.0)],
            color: Rgba::BLACK,
            width: 2.0,
            opacity: 1.0,
            tool: StrokeTool::Brush,
        };
        let out = rasterize_paths(&[path], canvas(10, 10));
        assert_eq!(out.get(5, 4), Some(Rgba::BLACK));
        assert_eq!(out.get(5, 0), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_eraser_clears_alpha() {
        let brush = DrawingPath {
            points: vec![Point::new(0.0, 2.0), Point::new(10.0, 2.0)],
            color: Rgba::BLACK,
            width: 4.0,
            opacity: 1.0,
            tool: StrokeTool::Brush,
        };
        let eraser = DrawingPath {
            tool: StrokeTool::Eraser,
            ..brush.clone()
        };
        let out = rasterize_paths(&[brush, eraser], canvas(10, 5));
        assert_eq!(out.get(5, 2).map(Rgba::a), Some(0));
    }

    #[test]
    fn test_rectangle_outline() {
        let out = rasterize_shape(ShapeKind::Rectangle, 10.0, 10.0, Rgba::WHITE, Rgba::BLACK, 2.0);
        assert_eq!(out.get(0, 0), Some(Rgba::BLACK));
        assert_eq!(out.get(5, 5), Some(Rgba::WHITE));
    }
}
