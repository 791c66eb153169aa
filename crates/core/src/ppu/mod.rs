//! The picture processor's hardware state.
//!
//! Everything the rasterizer consumes lives in [`Ppu`]: the tile and palette
//! tables, 64 hardware sprite slots, the 64×60 background tilemap and the
//! backdrop color. All coordinates use a lower-left origin with y pointing up.
//!
//! Capacities are fixed; they are the invariants the rest of the crate
//! degrades around (truncating loads, skipping sprites, reusing palette 0).

pub mod palette;
pub mod tile;

pub use palette::{Color, IndexedPalette, Palette, PALETTE_BYTES, PALETTE_SIZE};
pub use tile::{Tile, TILE_BYTES, TILE_SIZE};

use serde::{Deserialize, Serialize};

pub const SCREEN_WIDTH: usize = 256;
pub const SCREEN_HEIGHT: usize = 240;

pub const TILE_COUNT: usize = 256;
pub const PALETTE_COUNT: usize = 8;
pub const SPRITE_COUNT: usize = 64;

/// Tiles per row of the 16×16 tile grid.
pub const TILE_GRID_WIDTH: usize = 16;
pub const TILE_GRID_HEIGHT: usize = TILE_COUNT / TILE_GRID_WIDTH;

pub const BACKGROUND_WIDTH: usize = 64;
pub const BACKGROUND_HEIGHT: usize = 60;

/// Any sprite with `y` at or above this value is not drawn.
pub const OFFSCREEN_Y: u8 = 240;

pub type TileTable = [Tile; TILE_COUNT];
pub type PaletteTable = [Palette; PALETTE_COUNT];

/// One of the 64 hardware sprite slots: a single 8×8 tile on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HwSprite {
    /// Left edge in screen pixels.
    pub x: u8,
    /// Bottom edge in screen pixels; `>= 240` hides the sprite.
    pub y: u8,
    pub index: u8,
    pub attributes: u8,
}

impl HwSprite {
    /// Palette selection bits.
    pub const PALETTE_MASK: u8 = 0x07;
    /// Draw behind the background layer.
    pub const BEHIND_BACKGROUND: u8 = 0x80;

    pub const HIDDEN: HwSprite = HwSprite {
        x: 0,
        y: OFFSCREEN_Y,
        index: 0,
        attributes: 0,
    };

    pub fn palette(&self) -> usize {
        (self.attributes & Self::PALETTE_MASK) as usize
    }

    pub fn is_behind_background(&self) -> bool {
        self.attributes & Self::BEHIND_BACKGROUND != 0
    }

    pub fn is_visible(&self) -> bool {
        self.y < OFFSCREEN_Y
    }
}

/// Pack a tile index and palette index into a background cell.
pub fn pack_background_cell(tile: u8, palette: u8) -> u16 {
    tile as u16 | (((palette & HwSprite::PALETTE_MASK) as u16) << 8)
}

/// Split a background cell into `(tile, palette)`.
pub fn unpack_background_cell(cell: u16) -> (u8, u8) {
    ((cell & 0xFF) as u8, ((cell >> 8) & 0x07) as u8)
}

/// Linear index of the tile at `(tile_x, tile_y)` in the 16×16 tile grid.
pub fn grid_index(tile_x: usize, tile_y: usize) -> usize {
    tile_x + tile_y * TILE_GRID_WIDTH
}

/// Signed pixel offset of the background origin on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BackgroundPosition {
    pub x: i32,
    pub y: i32,
}

pub struct Ppu {
    pub tile_table: TileTable,
    pub palette_table: PaletteTable,
    /// Row-major, row 0 at the bottom.
    pub background: Box<[u16; BACKGROUND_WIDTH * BACKGROUND_HEIGHT]>,
    pub background_position: BackgroundPosition,
    pub background_color: Color,
    pub sprites: [HwSprite; SPRITE_COUNT],
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            tile_table: [Tile::EMPTY; TILE_COUNT],
            palette_table: [Palette::EMPTY; PALETTE_COUNT],
            background: Box::new([0; BACKGROUND_WIDTH * BACKGROUND_HEIGHT]),
            background_position: BackgroundPosition::default(),
            background_color: Color::rgb(0, 0, 0),
            sprites: [HwSprite::HIDDEN; SPRITE_COUNT],
        }
    }

    /// Move every hardware sprite off-screen.
    pub fn hide_all_sprites(&mut self) {
        for sprite in self.sprites.iter_mut() {
            sprite.y = OFFSCREEN_Y;
        }
    }

    pub fn clear_background(&mut self) {
        self.background.fill(0);
    }

    pub fn background_cell(&self, x: usize, y: usize) -> Option<u16> {
        if x >= BACKGROUND_WIDTH || y >= BACKGROUND_HEIGHT {
            return None;
        }
        Some(self.background[x + y * BACKGROUND_WIDTH])
    }

    /// Writes outside the tilemap are ignored.
    pub fn set_background_cell(&mut self, x: usize, y: usize, cell: u16) {
        if x < BACKGROUND_WIDTH && y < BACKGROUND_HEIGHT {
            self.background[x + y * BACKGROUND_WIDTH] = cell;
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
