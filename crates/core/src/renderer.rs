//! Rasterizing PPU state into a framebuffer.
//!
//! ```text
//! Ppu (hardware state) -> PpuRenderer trait -> SoftwarePpuRenderer
//! ```
//!
//! The game owns the [`Ppu`] and rebuilds it every frame; a renderer only
//! reads it. Output frames are 256×240 ARGB8888 with the top row first, so
//! screen row `y` (counted from the bottom) lands on frame row `239 - y`.
//!
//! Layers are composited back to front:
//!
//! 1. backdrop (`background_color`)
//! 2. sprites flagged [`HwSprite::BEHIND_BACKGROUND`]
//! 3. the background tilemap, scrolled by `background_position` and wrapped
//! 4. all other sprites
//!
//! Within a sprite layer higher slots are drawn first, so slot 0 ends up on
//! top.

use crate::graphics::ColorOps;
use crate::logging::{log, LogCategory, LogLevel};
use crate::ppu::{
    unpack_background_cell, Color, HwSprite, Ppu, BACKGROUND_HEIGHT, BACKGROUND_WIDTH,
    SCREEN_HEIGHT, SCREEN_WIDTH, TILE_SIZE,
};
use crate::types::Frame;

const BACKGROUND_PIXEL_WIDTH: i32 = (BACKGROUND_WIDTH * TILE_SIZE) as i32;
const BACKGROUND_PIXEL_HEIGHT: i32 = (BACKGROUND_HEIGHT * TILE_SIZE) as i32;

/// Common renderer interface
pub trait Renderer: Send {
    /// Get the current framebuffer (read-only)
    fn get_frame(&self) -> &Frame;

    /// Clear the framebuffer with a solid ARGB color
    fn clear(&mut self, color: u32);

    /// Reset the renderer to its initial state
    fn reset(&mut self);

    /// Get the name of this renderer (for logs and the CLI)
    fn name(&self) -> &str;

    /// Check if this renderer uses hardware acceleration
    fn is_hardware_accelerated(&self) -> bool {
        false
    }

    /// Recreate the framebuffer at new dimensions
    fn resize(&mut self, width: u32, height: u32);
}

/// Renderer that can rasterize a [`Ppu`].
pub trait PpuRenderer: Renderer + std::fmt::Debug {
    /// Rasterize one frame from the current PPU state.
    fn render(&mut self, ppu: &Ppu);

    /// Take ownership of the current frame and replace it with a new empty frame.
    fn take_frame(&mut self) -> Frame;
}

/// CPU rasterizer.
#[derive(Debug)]
pub struct SoftwarePpuRenderer {
    framebuffer: Frame,
}

impl SoftwarePpuRenderer {
    pub fn new() -> Self {
        Self {
            framebuffer: Frame::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32),
        }
    }

    fn blend_at(&mut self, sx: usize, sy: usize, color: Color) {
        let row = SCREEN_HEIGHT - 1 - sy;
        let px = &mut self.framebuffer.pixels[row * SCREEN_WIDTH + sx];
        *px = ColorOps::blend_over(*px, color);
    }

    fn draw_sprite(&mut self, ppu: &Ppu, sprite: &HwSprite) {
        let tile = &ppu.tile_table[sprite.index as usize];
        let palette = &ppu.palette_table[sprite.palette()];
        for ty in 0..TILE_SIZE {
            let sy = sprite.y as usize + ty;
            if sy >= SCREEN_HEIGHT {
                break;
            }
            for tx in 0..TILE_SIZE {
                let sx = sprite.x as usize + tx;
                if sx >= SCREEN_WIDTH {
                    break;
                }
                let color = palette.colors[tile.pixel(tx, ty) as usize];
                self.blend_at(sx, sy, color);
            }
        }
    }

    fn draw_sprites(&mut self, ppu: &Ppu, behind: bool) -> usize {
        let mut drawn = 0;
        for sprite in ppu.sprites.iter().rev() {
            if sprite.is_visible() && sprite.is_behind_background() == behind {
                self.draw_sprite(ppu, sprite);
                drawn += 1;
            }
        }
        drawn
    }

    fn draw_background(&mut self, ppu: &Ppu) {
        let pos = ppu.background_position;
        for sy in 0..SCREEN_HEIGHT {
            let by = (sy as i32 - pos.y).rem_euclid(BACKGROUND_PIXEL_HEIGHT) as usize;
            for sx in 0..SCREEN_WIDTH {
                let bx = (sx as i32 - pos.x).rem_euclid(BACKGROUND_PIXEL_WIDTH) as usize;
                let cell = ppu.background[bx / TILE_SIZE + (by / TILE_SIZE) * BACKGROUND_WIDTH];
                let (tile, palette) = unpack_background_cell(cell);
                let index = ppu.tile_table[tile as usize].pixel(bx % TILE_SIZE, by % TILE_SIZE);
                let color = ppu.palette_table[palette as usize].colors[index as usize];
                self.blend_at(sx, sy, color);
            }
        }
    }
}

impl Default for SoftwarePpuRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for SoftwarePpuRenderer {
    fn get_frame(&self) -> &Frame {
        &self.framebuffer
    }

    fn clear(&mut self, color: u32) {
        self.framebuffer.pixels.fill(color);
    }

    fn reset(&mut self) {
        self.clear(0xFF000000);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer = Frame::new(width, height);
    }

    fn name(&self) -> &str {
        "PPU Software Renderer"
    }
}

impl PpuRenderer for SoftwarePpuRenderer {
    fn render(&mut self, ppu: &Ppu) {
        if self.framebuffer.width as usize != SCREEN_WIDTH
            || self.framebuffer.height as usize != SCREEN_HEIGHT
        {
            self.framebuffer = Frame::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32);
        }

        self.clear(ppu.background_color.to_argb() | 0xFF00_0000);
        let behind = self.draw_sprites(ppu, true);
        self.draw_background(ppu);
        let front = self.draw_sprites(ppu, false);

        log(LogCategory::Render, LogLevel::Trace, || {
            format!("frame rendered: {} sprites behind, {} in front", behind, front)
        });
    }

    fn take_frame(&mut self) -> Frame {
        std::mem::replace(
            &mut self.framebuffer,
            Frame::new(SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::{pack_background_cell, BackgroundPosition, Palette, Tile};

    const RED: Color = Color::rgb(255, 0, 0);
    const BLUE: Color = Color::rgb(0, 0, 255);

    /// PPU with a transparent background and palette 1 = [transparent, red, blue, white].
    fn test_ppu() -> Ppu {
        let mut ppu = Ppu::new();
        ppu.background_color = Color::rgb(0x10, 0x20, 0x30);
        ppu.palette_table[1] = Palette::new([
            Color::TRANSPARENT,
            RED,
            BLUE,
            Color::rgb(255, 255, 255),
        ]);
        ppu
    }

    fn solid_tile(index: u8) -> Tile {
        let mut t = Tile::EMPTY;
        for y in 0..8 {
            for x in 0..8 {
                t.set_pixel(x, y, index);
            }
        }
        t
    }

    #[test]
    fn test_backdrop_fill() {
        let ppu = test_ppu();
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        let frame = r.get_frame();
        assert_eq!((frame.width, frame.height), (256, 240));
        assert!(frame.pixels.iter().all(|&p| p == 0xFF102030));
    }

    #[test]
    fn test_sprite_lower_left_maps_to_bottom_rows() {
        let mut ppu = test_ppu();
        ppu.tile_table[3].set_pixel(0, 0, 1);
        ppu.sprites[0] = HwSprite {
            x: 10,
            y: 20,
            index: 3,
            attributes: 1,
        };
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        let frame = r.take_frame();
        assert_eq!(frame.pixel(10, 239 - 20), Some(RED.to_argb()));
        // Index 0 in palette 1 is transparent
        assert_eq!(frame.pixel(11, 239 - 20), Some(0xFF102030));
    }

    #[test]
    fn test_sprites_clip_at_edges() {
        let mut ppu = test_ppu();
        ppu.tile_table[1] = solid_tile(2);
        ppu.sprites[0] = HwSprite {
            x: 252,
            y: 236,
            index: 1,
            attributes: 1,
        };
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        let frame = r.get_frame();
        assert_eq!(frame.pixel(255, 0), Some(BLUE.to_argb()));
        assert_eq!(frame.pixel(252, 3), Some(BLUE.to_argb()));
        assert_eq!(frame.pixel(251, 3), Some(0xFF102030));
    }

    #[test]
    fn test_offscreen_sprite_skipped() {
        let mut ppu = test_ppu();
        ppu.tile_table[1] = solid_tile(1);
        ppu.sprites[0] = HwSprite {
            x: 0,
            y: 240,
            index: 1,
            attributes: 1,
        };
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        assert!(r.get_frame().pixels.iter().all(|&p| p == 0xFF102030));
    }

    #[test]
    fn test_lower_slot_on_top() {
        let mut ppu = test_ppu();
        ppu.tile_table[1] = solid_tile(1);
        ppu.tile_table[2] = solid_tile(2);
        ppu.sprites[0] = HwSprite {
            x: 0,
            y: 0,
            index: 1,
            attributes: 1,
        };
        ppu.sprites[5] = HwSprite {
            x: 4,
            y: 0,
            index: 2,
            attributes: 1,
        };
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        let frame = r.get_frame();
        assert_eq!(frame.pixel(5, 239), Some(RED.to_argb()));
        assert_eq!(frame.pixel(9, 239), Some(BLUE.to_argb()));
    }

    #[test]
    fn test_background_priority() {
        let mut ppu = test_ppu();
        ppu.tile_table[1] = solid_tile(1);
        ppu.tile_table[2] = solid_tile(2);
        // Opaque red background cell at the origin
        ppu.set_background_cell(0, 0, pack_background_cell(1, 1));
        ppu.sprites[0] = HwSprite {
            x: 0,
            y: 0,
            index: 2,
            attributes: 1 | HwSprite::BEHIND_BACKGROUND,
        };
        ppu.sprites[1] = HwSprite {
            x: 4,
            y: 0,
            index: 2,
            attributes: 1,
        };
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        let frame = r.get_frame();
        // Behind sprite hidden by the opaque background
        assert_eq!(frame.pixel(0, 239), Some(RED.to_argb()));
        // Front sprite drawn over it
        assert_eq!(frame.pixel(5, 239), Some(BLUE.to_argb()));
    }

    #[test]
    fn test_background_scroll_wraps() {
        let mut ppu = test_ppu();
        ppu.tile_table[1] = solid_tile(1);
        ppu.set_background_cell(63, 59, pack_background_cell(1, 1));
        ppu.background_position = BackgroundPosition { x: 8, y: 8 };
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        let frame = r.get_frame();
        // Screen (0,0) samples background pixel (504, 472): cell (63, 59)
        assert_eq!(frame.pixel(0, 239), Some(RED.to_argb()));
        assert_eq!(frame.pixel(8, 239), Some(0xFF102030));
    }

    #[test]
    fn test_partial_alpha_blends() {
        let mut ppu = test_ppu();
        ppu.background_color = Color::rgb(0, 0, 0);
        ppu.palette_table[2].colors[1] = Color::rgba(200, 0, 0, 128);
        ppu.tile_table[1] = solid_tile(1);
        ppu.sprites[0] = HwSprite {
            x: 0,
            y: 0,
            index: 1,
            attributes: 2,
        };
        let mut r = SoftwarePpuRenderer::new();
        r.render(&ppu);
        let px = r.get_frame().pixel(0, 239).unwrap();
        assert_eq!(ColorOps::alpha(px), 0xFF);
        assert!((99..=101).contains(&ColorOps::red(px)));
    }

    #[test]
    fn test_renderer_trait_basics() {
        let mut r = SoftwarePpuRenderer::new();
        assert_eq!(r.name(), "PPU Software Renderer");
        assert!(!r.is_hardware_accelerated());
        r.clear(0xFFFF0000);
        assert!(r.get_frame().pixels.iter().all(|&p| p == 0xFFFF0000));
        r.reset();
        assert!(r.get_frame().pixels.iter().all(|&p| p == 0xFF000000));

        r.resize(16, 16);
        assert_eq!(r.get_frame().pixels.len(), 256);
        // Rendering always produces a full screen
        r.render(&test_ppu());
        assert_eq!(r.get_frame().width, 256);
    }
}
