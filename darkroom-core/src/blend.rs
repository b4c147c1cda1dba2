//! Per-pixel blend math.

use crate::layer::BlendMode;
use crate::pixel::Rgba;

/// Composite `top` over `base` using `mode`, with `opacity` scaling top alpha.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend_pixel(base: Rgba, top: Rgba, mode: BlendMode, opacity: f32) -> Rgba {
    if top.a() == 0 || opacity <= 0.0 {
        return base;
    }
    if mode == BlendMode::Normal && opacity >= 1.0 && top.a() == 255 {
        return top;
    }

    let unit = |v: u8| f32::from(v) / 255.0;
    let (br, bg, bb, ba) = (unit(base.r()), unit(base.g()), unit(base.b()), unit(base.a()));
    let (tr, tg, tb) = (unit(top.r()), unit(top.g()), unit(top.b()));
    let ta = unit(top.a()) * opacity.clamp(0.0, 1.0);

    let channel = |b: f32, t: f32| -> f32 {
        match mode {
            BlendMode::Normal => t,
            BlendMode::Multiply => b * t,
            BlendMode::Screen => 1.0 - (1.0 - b) * (1.0 - t),
            BlendMode::Overlay => overlay(b, t),
            BlendMode::Darken => b.min(t),
            BlendMode::Lighten => b.max(t),
            BlendMode::ColorDodge => {
                if t >= 1.0 {
                    1.0
                } else {
                    (b / (1.0 - t)).min(1.0)
                }
            }
            BlendMode::ColorBurn => {
                if t <= 0.0 {
                    0.0
                } else {
                    (1.0 - (1.0 - b) / t).max(0.0)
                }
            }
            BlendMode::HardLight => overlay(t, b),
            BlendMode::SoftLight => soft_light(b, t),
            BlendMode::Difference => (b - t).abs(),
            BlendMode::Exclusion => b + t - 2.0 * b * t,
            BlendMode::Additive => (b + t).min(1.0),
        }
    };

    // Where the base is transparent the top colour shows through unmixed.
    let mix = |b: f32, t: f32| -> f32 { channel(b, t).mul_add(ba, t * (1.0 - ba)) };
    let (r, g, b) = (mix(br, tr), mix(bg, tg), mix(bb, tb));

    let out_a = ta + ba * (1.0 - ta);
    if out_a <= 0.0 {
        return Rgba::TRANSPARENT;
    }
    let out = |c: f32, base_c: f32| -> u8 {
        let v = c.mul_add(ta, base_c * ba * (1.0 - ta)) / out_a;
        (v * 255.0).round().clamp(0.0, 255.0) as u8
    };
    Rgba::new(
        out(r, br),
        out(g, bg),
        out(b, bb),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    )
}

fn overlay(base: f32, top: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}

/// W3C soft light.
fn soft_light(base: f32, top: f32) -> f32 {
    if top <= 0.5 {
        base - (1.0 - 2.0 * top) * base * (1.0 - base)
    } else {
        let d = if base <= 0.25 {
            ((16.0 * base - 12.0) * base + 4.0) * base
        } else {
            base.sqrt()
        };
        base + (2.0 * top - 1.0) * (d - base)
    }
}
