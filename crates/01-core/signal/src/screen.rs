//! Monochrome display buffers.
//!
//! The device exposes its screen as 8x8 pixel tiles; the harness composes
//! them into a [`ScreenBuffer`] and treats the result as one more output
//! value. `(0, 0)` is the top-left corner and coordinates are `(x, y)`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Width and height of a screen, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenShape {
    pub width: u16,
    pub height: u16,
}

/// One monochrome bitmap, one byte per pixel (0 = off, 1 = on).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenBuffer {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl ScreenBuffer {
    /// Creates a cleared buffer.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn shape(&self) -> ScreenShape {
        ScreenShape {
            width: self.width,
            height: self.height,
        }
    }

    pub fn get(&self, x: u16, y: u16) -> u8 {
        self.pixels[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u16, y: u16, on: bool) {
        self.pixels[y as usize * self.width as usize + x as usize] = on as u8;
    }

    /// Paints `rect` with its top-left corner at `(x, y)`, clipping at the
    /// buffer edges.
    pub fn paint(&mut self, rect: &ScreenBuffer, x: u16, y: u16) {
        for ry in 0..rect.height {
            let dy = y + ry;
            if dy >= self.height {
                break;
            }
            for rx in 0..rect.width {
                let dx = x + rx;
                if dx >= self.width {
                    break;
                }
                self.pixels[dy as usize * self.width as usize + dx as usize] = rect.get(rx, ry);
            }
        }
    }

    /// Copies out the `w` x `h` box with top-left corner `(x, y)`.
    pub fn region(&self, x: u16, y: u16, w: u16, h: u16) -> ScreenBuffer {
        let mut out = ScreenBuffer::new(w, h);
        for ry in 0..h {
            for rx in 0..w {
                if x + rx < self.width && y + ry < self.height {
                    out.set(rx, ry, self.get(x + rx, y + ry) != 0);
                }
            }
        }
        out
    }

    /// Number of pixels equal between two same-shaped buffers.
    pub fn matching_pixels(&self, other: &ScreenBuffer) -> Option<u32> {
        if self.shape() != other.shape() {
            return None;
        }
        Some(
            self.pixels
                .iter()
                .zip(&other.pixels)
                .filter(|(a, b)| a == b)
                .count() as u32,
        )
    }

    /// Number of pixels differing between two same-shaped buffers.
    pub fn differing_pixels(&self, other: &ScreenBuffer) -> Option<u32> {
        let matching = self.matching_pixels(other)?;
        Some(self.pixels.len() as u32 - matching)
    }

    /// Fraction of pixels equal between two same-shaped buffers.
    pub fn matching_fraction(&self, other: &ScreenBuffer) -> Option<f64> {
        let matching = self.matching_pixels(other)?;
        if self.pixels.is_empty() {
            return Some(1.0);
        }
        Some(matching as f64 / self.pixels.len() as f64)
    }
}

/// Fixed-cell bitmap font harvested from a recorded session.
///
/// Glyphs all share one `width` x `height` cell; the map is keyed by Unicode
/// codepoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub width: u16,
    pub height: u16,
    pub glyphs: BTreeMap<u32, ScreenBuffer>,
}
