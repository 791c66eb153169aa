//! 8×8 two-bit-plane tiles.
//!
//! Each tile is stored in 16 bytes:
//! - Bytes 0-7: `bit0` plane, one byte per row
//! - Bytes 8-15: `bit1` plane, one byte per row
//!
//! Row 0 is the *bottom* row of the tile (lower-left origin, matching the
//! screen). Within a row byte, bit `x` is pixel `x`, so bit 0 is the leftmost
//! pixel. A pixel's color index is `bit0 | bit1 << 1`.

use serde::{Deserialize, Serialize};

/// Width and height of a tile in pixels.
pub const TILE_SIZE: usize = 8;

/// Size of one tile record in the asset file.
pub const TILE_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tile {
    pub bit0: [u8; TILE_SIZE],
    pub bit1: [u8; TILE_SIZE],
}

impl Tile {
    /// All pixels index 0.
    pub const EMPTY: Tile = Tile {
        bit0: [0; TILE_SIZE],
        bit1: [0; TILE_SIZE],
    };

    /// Color index (0-3) of pixel (x, y); out-of-range coordinates read as 0.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        if x >= TILE_SIZE || y >= TILE_SIZE {
            return 0;
        }
        let lo = (self.bit0[y] >> x) & 1;
        let hi = (self.bit1[y] >> x) & 1;
        (hi << 1) | lo
    }

    /// Write the low two bits of `index` into both planes at (x, y).
    pub fn set_pixel(&mut self, x: usize, y: usize, index: u8) {
        if x >= TILE_SIZE || y >= TILE_SIZE {
            return;
        }
        let mask = 1u8 << x;
        if index & 1 != 0 {
            self.bit0[y] |= mask;
        } else {
            self.bit0[y] &= !mask;
        }
        if index & 2 != 0 {
            self.bit1[y] |= mask;
        } else {
            self.bit1[y] &= !mask;
        }
    }

    /// Horizontally mirrored copy: every row of both planes bit-reversed.
    pub fn flipped_x(&self) -> Tile {
        let mut out = *self;
        for row in 0..TILE_SIZE {
            out.bit0[row] = self.bit0[row].reverse_bits();
            out.bit1[row] = self.bit1[row].reverse_bits();
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        *self == Tile::EMPTY
    }

    pub fn to_bytes(&self) -> [u8; TILE_BYTES] {
        let mut out = [0u8; TILE_BYTES];
        out[..TILE_SIZE].copy_from_slice(&self.bit0);
        out[TILE_SIZE..].copy_from_slice(&self.bit1);
        out
    }

    pub fn from_bytes(bytes: &[u8; TILE_BYTES]) -> Self {
        let mut tile = Tile::EMPTY;
        tile.bit0.copy_from_slice(&bytes[..TILE_SIZE]);
        tile.bit1.copy_from_slice(&bytes[TILE_SIZE..]);
        tile
    }
}
