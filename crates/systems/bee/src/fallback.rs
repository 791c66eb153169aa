//! Built-in tiles and palettes used when the asset file can't be loaded.
//!
//! Everything is painted procedurally into the same tile slots the real
//! tileset uses, so the built-in sprite set and the background code work
//! unchanged on top of it.

use ppu_core::ppu::{Color, Palette, Ppu, Tile, TILE_SIZE};

use crate::{GAME_OVER_LOWER_TILES, GAME_OVER_UPPER_TILES, WINDOW_PATTERN, WOOD_TILE};

pub(crate) const HEART_TILE: u8 = 8;
pub(crate) const ENEMY_TILE: u8 = 32;
pub(crate) const FLOWER_TILE: u8 = 40;
pub(crate) const POT_TILE: u8 = 56;

const UPPER_TEXT: &str = "GAME OVER";
const LOWER_TEXT: &str = " PRESS R ";

fn palettes() -> [(usize, Palette); 6] {
    [
        // Bee, heart, flower
        (
            0,
            Palette::new([
                Color::TRANSPARENT,
                Color::rgb(250, 200, 40),
                Color::rgb(30, 24, 20),
                Color::rgb(235, 90, 120),
            ]),
        ),
        // Window wall, fully opaque
        (
            1,
            Palette::new([
                Color::rgb(24, 40, 64),
                Color::rgb(40, 64, 100),
                Color::rgb(90, 130, 170),
                Color::rgb(60, 44, 32),
            ]),
        ),
        (
            4,
            Palette::new([
                Color::TRANSPARENT,
                Color::rgb(140, 90, 50),
                Color::rgb(100, 60, 30),
                Color::rgb(180, 130, 80),
            ]),
        ),
        (
            5,
            Palette::new([
                Color::TRANSPARENT,
                Color::rgb(120, 200, 60),
                Color::rgb(40, 90, 30),
                Color::rgb(230, 250, 200),
            ]),
        ),
        (
            6,
            Palette::new([
                Color::TRANSPARENT,
                Color::rgb(190, 100, 60),
                Color::rgb(120, 60, 40),
                Color::rgb(240, 180, 120),
            ]),
        ),
        (
            7,
            Palette::new([
                Color::TRANSPARENT,
                Color::rgb(255, 255, 255),
                Color::rgb(180, 180, 180),
                Color::rgb(80, 80, 80),
            ]),
        ),
    ]
}

/// Build a tile from a per-pixel color index function (lower-left origin).
fn paint(f: impl Fn(i32, i32) -> u8) -> Tile {
    let mut tile = Tile::EMPTY;
    for y in 0..TILE_SIZE {
        for x in 0..TILE_SIZE {
            tile.set_pixel(x, y, f(x as i32, y as i32));
        }
    }
    tile
}

/// 16×16 bee, two wing positions.
fn bee_pixel(x: i32, y: i32, frame: i32) -> u8 {
    let (dx, dy) = (x - 8, y - 6);
    if dx * dx * 4 + dy * dy * 9 <= 144 {
        if x == 13 && y == 7 {
            return 2;
        }
        return if (x / 2) % 2 == 0 { 2 } else { 1 };
    }
    if x == 1 && y == 6 {
        return 3;
    }
    let wing_y = if frame == 0 { 12 } else { 10 };
    let (wx, wy) = (x - 7, y - wing_y);
    if wx * wx + wy * wy * 2 <= 8 {
        return 3;
    }
    0
}

/// 8×8 one-color bitmap, top row first, bit 7 is x = 0.
fn bitmap(rows: [u8; 8], index: u8) -> impl Fn(i32, i32) -> u8 {
    move |x, y| {
        if rows[(7 - y) as usize] & (0x80 >> x) != 0 {
            index
        } else {
            0
        }
    }
}

const HEART: [u8; 8] = [0x6C, 0xFE, 0xFE, 0x7C, 0x38, 0x10, 0x00, 0x00];

fn enemy_pixel(x: i32, y: i32) -> u8 {
    let (dx, dy) = (2 * x - 7, 2 * y - 7);
    let d = dx * dx + dy * dy;
    if (x == 2 || x == 5) && y == 4 {
        3
    } else if d <= 25 {
        1
    } else if d <= 49 {
        2
    } else {
        0
    }
}

fn flower_pixel(x: i32, y: i32) -> u8 {
    if (3..=4).contains(&x) && (4..=5).contains(&y) {
        1
    } else if (2..=5).contains(&x) && (3..=6).contains(&y) {
        3
    } else if x == 3 && y < 3 {
        2
    } else {
        0
    }
}

fn pot_pixel(x: i32, y: i32) -> u8 {
    if y == 5 && (0..=7).contains(&x) {
        3
    } else if y < 5 && x >= 1 + (4 - y) / 3 && x <= 6 - (4 - y) / 3 {
        if x >= 5 {
            2
        } else {
            1
        }
    } else {
        0
    }
}

fn wood_pixel(x: i32, y: i32) -> u8 {
    match y {
        0 => 2,
        7 => 3,
        _ if x == (y * 3) % 8 => 2,
        _ => 1,
    }
}

/// Window frame over a 32×32 block: the pattern cell picks which quarter.
fn window_pixel(gx: i32, gy: i32) -> u8 {
    if gx % 16 == 0 || gy % 16 == 0 {
        3
    } else if (gx + gy) % 16 < 2 {
        2
    } else {
        1
    }
}

/// 5×7 glyph rows, top first.
fn glyph(c: char) -> [u8; 7] {
    match c {
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        _ => [0; 7],
    }
}

fn text_tile(c: char) -> Tile {
    let rows = glyph(c);
    paint(|x, y| {
        // Row 7 of the tile is glyph row 0; column 0 and row 0 stay blank
        let row = 7 - y;
        let col = x - 1;
        if !(0..7).contains(&row) || !(0..5).contains(&col) {
            return 0;
        }
        if rows[row as usize] & (0x10 >> col) != 0 {
            1
        } else {
            0
        }
    })
}

/// Overwrite the PPU's tile and palette tables with the built-in set.
pub fn install(ppu: &mut Ppu) {
    ppu.tile_table.fill(Tile::EMPTY);
    ppu.palette_table.fill(Palette::EMPTY);
    for (index, palette) in palettes() {
        ppu.palette_table[index] = palette;
    }

    let tiles = &mut ppu.tile_table;

    for frame in 0..2 {
        let base = frame as usize * 2;
        for (offset, ox, oy) in [(0, 0, 0), (1, 8, 0), (16, 0, 8), (17, 8, 8)] {
            tiles[base + offset] = paint(|x, y| bee_pixel(x + ox, y + oy, frame));
        }
    }

    tiles[HEART_TILE as usize] = paint(bitmap(HEART, 3));
    tiles[WOOD_TILE as usize] = paint(wood_pixel);
    tiles[ENEMY_TILE as usize] = paint(enemy_pixel);
    tiles[FLOWER_TILE as usize] = paint(flower_pixel);
    tiles[POT_TILE as usize] = paint(pot_pixel);

    for (row, pattern_row) in WINDOW_PATTERN.iter().enumerate() {
        for (col, &index) in pattern_row.iter().enumerate() {
            let (bx, by) = (col as i32 * 8, row as i32 * 8);
            tiles[index as usize] = paint(|x, y| window_pixel(bx + x, by + y));
        }
    }

    for (i, c) in UPPER_TEXT.chars().enumerate() {
        tiles[GAME_OVER_UPPER_TILES + i] = text_tile(c);
    }
    for (i, c) in LOWER_TEXT.chars().enumerate() {
        tiles[GAME_OVER_LOWER_TILES + i] = text_tile(c);
    }
}
