//! Bottom-to-top layer compositing.

use rayon::prelude::*;

use crate::blend::blend_pixel;
use crate::canvas::{CanvasSize, GlyphRasterizer};
use crate::filter::FilterRegistry;
use crate::layer::{AdjustmentParams, Layer, LayerKind};
use crate::pixel::{PixelBuffer, Rgba};
use crate::raster;
use crate::source::SourceStore;

/// Inputs shared by every layer of one pass.
#[derive(Debug, Clone, Copy)]
pub struct CompositeContext<'a> {
    /// Pixel sources for image and sticker layers.
    pub sources: &'a SourceStore,
    /// Filters referenced by layers.
    pub filters: &'a FilterRegistry,
    /// Output size.
    pub size: CanvasSize,
    /// Colour the accumulator starts from.
    pub background: Rgba,
    /// Text renderer, if the host supplied one.
    pub glyphs: Option<&'a dyn GlyphRasterizer>,
}

/// Composite `layers` (bottom first) into a new canvas-sized buffer.
#[must_use]
pub fn composite(layers: &[Layer], ctx: &CompositeContext<'_>) -> PixelBuffer {
    let mut acc = PixelBuffer::filled(ctx.size.width, ctx.size.height, ctx.background);
    for layer in layers.iter().filter(|l| l.is_rendered()) {
        if let LayerKind::Adjustment { params } = &layer.kind {
            adjust_in_place(&mut acc, params, layer.opacity);
            continue;
        }
        let Some(local) = raster::rasterize(layer, ctx.sources, ctx.size, ctx.glyphs) else {
            continue;
        };
        let placed = raster::place(&local, &layer.transform, ctx.size);
        let filtered = ctx.filters.apply(layer, placed);
        blend_onto(&mut acc, &filtered, layer);
    }
    acc
}

fn blend_onto(acc: &mut PixelBuffer, top: &PixelBuffer, layer: &Layer) {
    let (mode, opacity) = (layer.blend_mode, layer.opacity);
    acc.data_mut()
        .par_chunks_mut(4)
        .zip(top.data().par_chunks(4))
        .for_each(|(base, src)| {
            let out = blend_pixel(
                Rgba::new(base[0], base[1], base[2], base[3]),
                Rgba::new(src[0], src[1], src[2], src[3]),
                mode,
                opacity,
            );
            base.copy_from_slice(&out.0);
        });
}

/// Apply grading to every pixel, mixing with the original by `opacity`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn adjust_in_place(acc: &mut PixelBuffer, params: &AdjustmentParams, opacity: f32) {
    if *params == AdjustmentParams::default() {
        return;
    }
    let opacity = opacity.clamp(0.0, 1.0);
    let exposure = 2f32.powf(params.exposure);
    let brightness = params.brightness * 255.0;
    let contrast = 1.0 + params.contrast;
    let saturation = 1.0 + params.saturation;
    let hue = hue_matrix(params.hue);

    acc.data_mut().par_chunks_mut(4).for_each(|px| {
        let original = [f32::from(px[0]), f32::from(px[1]), f32::from(px[2])];
        let mut c = original.map(|v| v * exposure + brightness);
        c = c.map(|v| (v - 128.0).mul_add(contrast, 128.0));
        let l = 0.0722f32.mul_add(c[2], 0.2126f32.mul_add(c[0], 0.7152 * c[1]));
        c = c.map(|v| (v - l).mul_add(saturation, l));
        if let Some(m) = &hue {
            c = [
                m[0][2].mul_add(c[2], m[0][0].mul_add(c[0], m[0][1] * c[1])),
                m[1][2].mul_add(c[2], m[1][0].mul_add(c[0], m[1][1] * c[1])),
                m[2][2].mul_add(c[2], m[2][0].mul_add(c[0], m[2][1] * c[1])),
            ];
        }
        for (slot, (&new, &old)) in px.iter_mut().zip(c.iter().zip(&original)) {
            *slot = (new - old).mul_add(opacity, old).round().clamp(0.0, 255.0) as u8;
        }
    });
}

/// Luminance-preserving hue rotation, `None` for zero degrees.
fn hue_matrix(degrees: f32) -> Option<[[f32; 3]; 3]> {
    if degrees.abs() < f32::EPSILON {
        return None;
    }
    let (sin, cos) = degrees.to_radians().sin_cos();
    Some([
        [
            0.213 + cos * 0.787 - sin * 0.213,
            0.715 - cos * 0.715 - sin * 0.715,
            0.072 - cos * 0.072 + sin * 0.928,
        ],
        [
            0.213 - cos * 0.213 + sin * 0.143,
            0.715 + cos * 0.285 + sin * 0.140,
            0.072 - cos * 0.072 - sin * 0.283,
        ],
        [
            0.213 - cos * 0.213 - sin * 0.787,
            0.715 - cos * 0.715 + sin * 0.715,
            0.072 + cos * 0.928 + sin * 0.072,
        ],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AppliedFilter;
    use crate::layer::{BlendMode, ShapeKind};

    fn square(color: Rgba) -> Layer {
        Layer::new(LayerKind::Shape {
            shape: ShapeKind::Rectangle,
            width: 4.0,
            height: 4.0,
            fill: color,
            stroke: Rgba::TRANSPARENT,
            stroke_width: 0.0,
        })
    }

    fn run(layers: &[Layer]) -> PixelBuffer {
        let sources = SourceStore::new();
        let filters = FilterRegistry::with_builtins();
        composite(
            layers,
            &CompositeContext {
                sources: &sources,
                filters: &filters,
                size: CanvasSize {
                    width: 4,
                    height: 4,
                },
                background: Rgba::TRANSPARENT,
                glyphs: None,
            },
        )
    }

    #[test]
    fn test_hidden_layers_are_skipped() {
        let mut layer = square(Rgba::WHITE);
        layer.visible = false;
        assert_eq!(run(&[layer]).get(1, 1), Some(Rgba::TRANSPARENT));
    }

    #[test]
    fn test_top_layer_wins_in_normal_mode() {
        let out = run(&[square(Rgba::WHITE), square(Rgba::new(255, 0, 0, 255))]);
        assert_eq!(out.get(2, 2), Some(Rgba::new(255, 0, 0, 255)));
    }

    #[test]
    fn test_layer_filters_apply_before_blending() {
        let mut layer = square(Rgba::new(255, 0, 0, 255));
        layer.filters.push(AppliedFilter::new("invert"));
        assert_eq!(run(&[layer]).get(0, 0), Some(Rgba::new(0, 255, 255, 255)));
    }

    #[test]
    fn test_multiply_darkens() {
        let top = square(Rgba::new(128, 128, 128, 255)).with_blend_mode(BlendMode::Multiply);
        let out = run(&[square(Rgba::new(200, 200, 200, 255)), top]);
        assert_eq!(out.get(0, 0), Some(Rgba::new(100, 100, 100, 255)));
    }

    #[test]
    fn test_adjustment_brightens_below_only() {
        let adjustment = Layer::new(LayerKind::Adjustment {
            params: AdjustmentParams {
                brightness: 0.2,
                ..AdjustmentParams::default()
            },
        });
        let out = run(&[square(Rgba::new(100, 100, 100, 255)), adjustment]);
        assert_eq!(out.get(0, 0), Some(Rgba::new(151, 151, 151, 255)));
    }

    #[test]
    fn test_neutral_adjustment_changes_nothing() {
        let adjustment = Layer::new(LayerKind::Adjustment {
            params: AdjustmentParams::default(),
        });
        let base = run(&[square(Rgba::new(10, 20, 30, 255))]);
        let adjusted = run(&[square(Rgba::new(10, 20, 30, 255)), adjustment]);
        assert_eq!(base, adjusted);
    }
}
