//! Builtin filters.
//!
//! Every filter keeps alpha untouched except where noted and clamps colour
//! channels to 0..=255, so order of application is observable.

use rayon::prelude::*;

use crate::filter::{FilterDefinition, FilterParams};
use crate::pixel::{PixelBuffer, Rgba};

/// Every builtin filter definition.
#[must_use]
pub fn builtins() -> Vec<FilterDefinition> {
    vec![
        FilterDefinition::new("grayscale", "Grayscale", grayscale),
        FilterDefinition::new("brighten", "Brighten", brighten),
        FilterDefinition::new("contrast", "Contrast", contrast),
        FilterDefinition::new("saturate", "Saturate", saturate),
        FilterDefinition::new("invert", "Invert", invert),
        FilterDefinition::new("sepia", "Sepia", sepia),
        FilterDefinition::new("blur", "Blur", blur),
        FilterDefinition::new("sharpen", "Sharpen", sharpen),
        FilterDefinition::new("threshold", "Threshold", threshold),
    ]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// BT.709 luminance.
fn luma(px: Rgba) -> f32 {
    0.0722f32.mul_add(
        f32::from(px.b()),
        0.2126f32.mul_add(f32::from(px.r()), 0.7152 * f32::from(px.g())),
    )
}

fn map_rgb(px: Rgba, f: impl Fn(f32) -> f32) -> Rgba {
    Rgba::new(
        to_u8(f(f32::from(px.r()))),
        to_u8(f(f32::from(px.g()))),
        to_u8(f(f32::from(px.b()))),
        px.a(),
    )
}

fn grayscale(src: &PixelBuffer, _params: &FilterParams) -> PixelBuffer {
    src.map_pixels(|px| {
        let l = to_u8(luma(px));
        Rgba::new(l, l, l, px.a())
    })
}

/// `amount` in -1.0..=1.0 is added as a fraction of full scale.
fn brighten(src: &PixelBuffer, params: &FilterParams) -> PixelBuffer {
    let offset = params.get_or("amount", 0.2) * 255.0;
    src.map_pixels(|px| map_rgb(px, |c| c + offset))
}

fn contrast(src: &PixelBuffer, params: &FilterParams) -> PixelBuffer {
    let factor = 1.0 + params.get_or("amount", 0.2);
    src.map_pixels(|px| map_rgb(px, |c| (c - 128.0).mul_add(factor, 128.0)))
}

fn saturate(src: &PixelBuffer, params: &FilterParams) -> PixelBuffer {
    let factor = 1.0 + params.get_or("amount", 0.3);
    src.map_pixels(|px| {
        let l = luma(px);
        map_rgb(px, |c| (c - l).mul_add(factor, l))
    })
}

fn invert(src: &PixelBuffer, _params: &FilterParams) -> PixelBuffer {
    src.map_pixels(|px| map_rgb(px, |c| 255.0 - c))
}

fn sepia(src: &PixelBuffer, _params: &FilterParams) -> PixelBuffer {
    src.map_pixels(|px| {
        let (r, g, b) = (f32::from(px.r()), f32::from(px.g()), f32::from(px.b()));
        Rgba::new(
            to_u8(0.393 * r + 0.769 * g + 0.189 * b),
            to_u8(0.349 * r + 0.686 * g + 0.168 * b),
            to_u8(0.272 * r + 0.534 * g + 0.131 * b),
            px.a(),
        )
    })
}

/// `level` in 0.0..=1.0; pixels at or above become white, the rest black.
fn threshold(src: &PixelBuffer, params: &FilterParams) -> PixelBuffer {
    let level = params.get_or("level", 0.5) * 255.0;
    src.map_pixels(|px| {
        let v = if luma(px) >= level { 255 } else { 0 };
        Rgba::new(v, v, v, px.a())
    })
}

/// 1-D Gaussian kernel truncated at ceil(3*sigma).
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    if radius == 0 {
        return vec![1.0];
    }
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=radius * 2)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// One separable pass. `horizontal` picks the axis; edges clamp.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn convolve_pass(src: &[f32], w: usize, h: usize, kernel: &[f32], horizontal: bool) -> Vec<f32> {
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0.0f32; src.len()];
    out.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (k, &weight) in kernel.iter().enumerate() {
                let offset = k as isize - radius;
                let (sx, sy) = if horizontal {
                    ((x as isize + offset).clamp(0, w as isize - 1) as usize, y)
                } else {
                    (x, (y as isize + offset).clamp(0, h as isize - 1) as usize)
                };
                let i = (sy * w + sx) * 4;
                for (c, slot) in acc.iter_mut().enumerate() {
                    *slot = src[i + c].mul_add(weight, *slot);
                }
            }
            row[x * 4..x * 4 + 4].copy_from_slice(&acc);
        }
    });
    out
}

/// Separable Gaussian blur; `radius` is the standard deviation in pixels.
fn blur(src: &PixelBuffer, params: &FilterParams) -> PixelBuffer {
    let sigma = params.get_or("radius", 2.0);
    let (w, h) = (src.width() as usize, src.height() as usize);
    if sigma <= 0.0 || w == 0 || h == 0 {
        return src.clone();
    }
    let kernel = gaussian_kernel(sigma);
    let input: Vec<f32> = src.data().iter().map(|&b| f32::from(b)).collect();
    let horizontal = convolve_pass(&input, w, h, &kernel, true);
    let vertical = convolve_pass(&horizontal, w, h, &kernel, false);
    let bytes = vertical.into_iter().map(to_u8).collect();
    PixelBuffer::from_raw(src.width(), src.height(), bytes).unwrap_or_else(|_| src.clone())
}

/// 3x3 Laplacian sharpen; `amount` scales the edge term.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn sharpen(src: &PixelBuffer, params: &FilterParams) -> PixelBuffer {
    let amount = params.get_or("amount", 0.5);
    let (w, h) = (src.width() as usize, src.height() as usize);
    if w == 0 || h == 0 {
        return src.clone();
    }
    let data = src.data();
    let sample = |x: isize, y: isize, c: usize| -> f32 {
        let sx = x.clamp(0, w as isize - 1) as usize;
        let sy = y.clamp(0, h as isize - 1) as usize;
        f32::from(data[(sy * w + sx) * 4 + c])
    };

    let mut out = vec![0u8; data.len()];
    out.par_chunks_mut(w * 4).enumerate().for_each(|(y, row)| {
        let yi = y as isize;
        for x in 0..w {
            let xi = x as isize;
            for c in 0..3 {
                let centre = sample(xi, yi, c);
                let neighbours = sample(xi - 1, yi, c)
                    + sample(xi + 1, yi, c)
                    + sample(xi, yi - 1, c)
                    + sample(xi, yi + 1, c);
                row[x * 4 + c] = to_u8(amount.mul_add(4.0f32.mul_add(centre, -neighbours), centre));
            }
            row[x * 4 + 3] = data[(y * w + x) * 4 + 3];
        }
    });
    PixelBuffer::from_raw(src.width(), src.height(), out).unwrap_or_else(|_| src.clone())
}
