//! Color operations on packed framebuffer pixels.
//!
//! Framebuffer colors are ARGB8888 (0xAARRGGBB); see [`crate::ppu::Color`]
//! for the unpacked RGBA form stored in palettes.

use crate::ppu::Color;

/// Color operation utilities
pub struct ColorOps;

impl ColorOps {
    /// Linear interpolation between two ARGB colors
    ///
    /// # Arguments
    ///
    /// * `c0` - Start color (ARGB8888 format: 0xAARRGGBB)
    /// * `c1` - End color (ARGB8888 format: 0xAARRGGBB)
    /// * `t` - Interpolation factor (0.0 = c0, 1.0 = c1)
    ///
    /// # Example
    ///
    /// ```
    /// use ppu_core::graphics::ColorOps;
    ///
    /// let red = 0xFFFF0000;
    /// let blue = 0xFF0000FF;
    /// let purple = ColorOps::lerp(red, blue, 0.5);
    /// ```
    #[inline]
    pub fn lerp(c0: u32, c1: u32, t: f32) -> u32 {
        let a0 = ((c0 >> 24) & 0xFF) as f32;
        let r0 = ((c0 >> 16) & 0xFF) as f32;
        let g0 = ((c0 >> 8) & 0xFF) as f32;
        let b0 = (c0 & 0xFF) as f32;

        let a1 = ((c1 >> 24) & 0xFF) as f32;
        let r1 = ((c1 >> 16) & 0xFF) as f32;
        let g1 = ((c1 >> 8) & 0xFF) as f32;
        let b1 = (c1 & 0xFF) as f32;

        let a = (a0 + (a1 - a0) * t).round() as u32;
        let r = (r0 + (r1 - r0) * t).round() as u32;
        let g = (g0 + (g1 - g0) * t).round() as u32;
        let b = (b0 + (b1 - b0) * t).round() as u32;

        (a << 24) | (r << 16) | (g << 8) | b
    }

    /// Composite a palette color over an opaque framebuffer pixel.
    ///
    /// The source alpha is the blend factor; the result stays opaque.
    /// Alpha 0 returns `dst` untouched and alpha 255 returns the source.
    #[inline]
    pub fn blend_over(dst: u32, src: Color) -> u32 {
        match src.a {
            0 => dst,
            0xFF => src.to_argb(),
            a => {
                let opaque = Self::from_rgb(src.r, src.g, src.b);
                Self::lerp(dst, opaque, a as f32 / 255.0) | 0xFF00_0000
            }
        }
    }

    #[inline]
    pub fn red(color: u32) -> u8 {
        ((color >> 16) & 0xFF) as u8
    }

    #[inline]
    pub fn green(color: u32) -> u8 {
        ((color >> 8) & 0xFF) as u8
    }

    #[inline]
    pub fn blue(color: u32) -> u8 {
        (color & 0xFF) as u8
    }

    #[inline]
    pub fn alpha(color: u32) -> u8 {
        ((color >> 24) & 0xFF) as u8
    }

    /// Construct RGB color with full alpha
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }
}
