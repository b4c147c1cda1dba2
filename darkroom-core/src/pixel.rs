//! Raster buffers and colour primitives.
//!
//! [`PixelBuffer`] is straight-alpha RGBA8 and is the currency every stage of
//! the pipeline (sources, filters, compositing, export) trades in.

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, EditorResult};

/// An RGBA colour with straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self([0, 0, 0, 0]);
    /// Opaque black.
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    /// Opaque white.
    pub const WHITE: Self = Self([255, 255, 255, 255]);

    /// Create a colour from components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    /// Red channel.
    #[must_use]
    pub const fn r(self) -> u8 {
        self.0[0]
    }

    /// Green channel.
    #[must_use]
    pub const fn g(self) -> u8 {
        self.0[1]
    }

    /// Blue channel.
    #[must_use]
    pub const fn b(self) -> u8 {
        self.0[2]
    }

    /// Alpha channel.
    #[must_use]
    pub const fn a(self) -> u8 {
        self.0[3]
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    #[must_use]
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 && hex.len() != 8 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
        Some(Self([channel(0)?, channel(2)?, channel(4)?, alpha]))
    }
}

/// A point in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate (pixels from left).
    pub x: f32,
    /// Y coordinate (pixels from top).
    pub y: f32,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// An owned RGBA8 raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Create a fully transparent buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Rgba::TRANSPARENT)
    }

    /// Create a buffer where every pixel is `color`.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Rgba) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            data.extend_from_slice(&color.0);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap raw RGBA8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidBuffer`] if `data` is not exactly
    /// `width * height * 4` bytes long.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> EditorResult<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(EditorError::InvalidBuffer(format!(
                "{width}x{height} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 bytes, row-major.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw RGBA8 bytes, row-major.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer and return its bytes.
    #[must_use]
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Number of pixels.
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Read a pixel, `None` outside the buffer.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some(Rgba([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]))
    }

    /// Write a pixel; writes outside the buffer are ignored.
    pub fn put(&mut self, x: u32, y: u32, color: Rgba) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&color.0);
    }

    /// Produce a new buffer by mapping every pixel.
    #[must_use]
    pub fn map_pixels(&self, f: impl Fn(Rgba) -> Rgba) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(4) {
            data.extend_from_slice(&f(Rgba([px[0], px[1], px[2], px[3]])).0);
        }
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Copy a sub-rectangle; areas outside the source become transparent.
    #[must_use]
    pub fn crop(&self, x: i64, y: i64, width: u32, height: u32) -> Self {
        let mut out = Self::new(width, height);
        for oy in 0..height {
            for ox in 0..width {
                let sx = x + i64::from(ox);
                let sy = y + i64::from(oy);
                if let (Ok(sx), Ok(sy)) = (u32::try_from(sx), u32::try_from(sy)) {
                    if let Some(px) = self.get(sx, sy) {
                        out.put(ox, oy, px);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 15]).is_err());
        assert!(PixelBuffer::from_raw(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_get_put_bounds() {
        let mut buf = PixelBuffer::new(2, 2);
        buf.put(1, 1, Rgba::WHITE);
        buf.put(5, 5, Rgba::WHITE);
        assert_eq!(buf.get(1, 1), Some(Rgba::WHITE));
        assert_eq!(buf.get(0, 0), Some(Rgba::TRANSPARENT));
        assert_eq!(buf.get(2, 0), None);
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!(Rgba::from_hex("#ff0000"), Some(Rgba::new(255, 0, 0, 255)));
        assert_eq!(Rgba::from_hex("00ff0080"), Some(Rgba::new(0, 255, 0, 128)));
        assert_eq!(Rgba::from_hex("#abc"), None);
        assert_eq!(Rgba::from_hex("#gg0000"), None);
    }

    #[test]
    fn test_crop_pads_outside() {
        let buf = PixelBuffer::filled(4, 4, Rgba::WHITE);
        let cropped = buf.crop(2, 2, 4, 4);
        assert_eq!(cropped.get(0, 0), Some(Rgba::WHITE));
        assert_eq!(cropped.get(3, 3), Some(Rgba::TRANSPARENT));
    }
}
