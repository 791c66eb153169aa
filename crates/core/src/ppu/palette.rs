//! Colors and 4-entry palettes.
//!
//! A palette holds exactly four RGBA colors selected by a tile's 2-bit color
//! index. The PPU owns eight of them. Nothing at the storage level gives
//! index 0 a special meaning; consumers decide whether it is "background".

use serde::{Deserialize, Serialize};

/// Number of colors in one palette.
pub const PALETTE_SIZE: usize = 4;

/// Size of one palette record in the asset file (4 × RGBA).
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 4;

/// Generic indexed palette that maps color indices to ARGB values.
pub trait IndexedPalette {
    /// Get the color for a palette index as 32-bit ARGB (0xAARRGGBB).
    fn get_color(&self, index: usize) -> u32;

    /// Set the color for a palette index from 32-bit ARGB.
    fn set_color(&mut self, index: usize, color: u32);

    /// Get the number of colors in this palette.
    fn len(&self) -> usize;

    /// Check if the palette is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 8-bit-per-channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Canonical transparent color every "mostly transparent" pixel collapses to.
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_argb(argb: u32) -> Self {
        Self {
            a: (argb >> 24) as u8,
            r: (argb >> 16) as u8,
            g: (argb >> 8) as u8,
            b: argb as u8,
        }
    }

    pub fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self::rgba(bytes[0], bytes[1], bytes[2], bytes[3])
    }

    /// True when every channel differs by at most `tolerance`.
    pub fn approx_eq(self, other: Color, tolerance: u8) -> bool {
        self.r.abs_diff(other.r) <= tolerance
            && self.g.abs_diff(other.g) <= tolerance
            && self.b.abs_diff(other.b) <= tolerance
            && self.a.abs_diff(other.a) <= tolerance
    }
}

/// Four colors indexed by a tile's 2-bit pixel value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Palette {
    pub colors: [Color; PALETTE_SIZE],
}

impl Palette {
    /// All four entries transparent; the state of an unused palette slot.
    pub const EMPTY: Palette = Palette {
        colors: [Color::TRANSPARENT; PALETTE_SIZE],
    };

    pub const fn new(colors: [Color; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    pub fn to_bytes(&self) -> [u8; PALETTE_BYTES] {
        let mut out = [0u8; PALETTE_BYTES];
        for (i, c) in self.colors.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(&c.to_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8; PALETTE_BYTES]) -> Self {
        let mut colors = [Color::TRANSPARENT; PALETTE_SIZE];
        for (i, c) in colors.iter_mut().enumerate() {
            *c = Color::from_bytes([
                bytes[i * 4],
                bytes[i * 4 + 1],
                bytes[i * 4 + 2],
                bytes[i * 4 + 3],
            ]);
        }
        Self { colors }
    }

    /// Index-by-index comparison within a per-channel tolerance.
    pub fn approx_eq(&self, other: &Palette, tolerance: u8) -> bool {
        self.colors
            .iter()
            .zip(other.colors.iter())
            .all(|(a, b)| a.approx_eq(*b, tolerance))
    }
}

impl IndexedPalette for Palette {
    fn get_color(&self, index: usize) -> u32 {
        self.colors
            .get(index)
            .map(|c| c.to_argb())
            .unwrap_or(0)
    }

    fn set_color(&mut self, index: usize, color: u32) {
        if let Some(c) = self.colors.get_mut(index) {
            *c = Color::from_argb(color);
        }
    }

    fn len(&self) -> usize {
        PALETTE_SIZE
    }
}
