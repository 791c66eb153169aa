//! Placing logical sprites onto the 64 hardware sprite slots.
//!
//! Every frame starts from a clean slate: [`SpriteLayer::begin_frame`] hides
//! all slots and rewinds both the slot cursor and the flip scratch region.
//! Sprites then claim contiguous slot ranges in draw order, so earlier draws
//! get lower slots and end up on top.

use thiserror::Error;

use super::{Sprite, SpriteId, Sprites, TileRef};
use crate::logging::{log, LogCategory, LogLevel};
use crate::ppu::{HwSprite, Ppu, SPRITE_COUNT, TILE_COUNT, TILE_SIZE};

/// First tile of the default flip scratch region.
pub const FLIP_SCRATCH_BASE: u8 = 248;
pub const FLIP_SCRATCH_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("not enough sprite slots for '{sprite}': needs {needed} from slot {start_slot}, capacity {capacity}")]
    NotEnoughSlots {
        sprite: String,
        start_slot: usize,
        needed: usize,
        capacity: usize,
    },
    #[error("flip scratch exhausted drawing '{sprite}'; {unflipped} tile(s) drawn unflipped")]
    ScratchExhausted { sprite: String, unflipped: usize },
    #[error("unknown sprite id {0:?}")]
    UnknownSprite(SpriteId),
}

/// Frame-scoped bump allocator over hardware sprite slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAllocator {
    capacity: usize,
    cursor: usize,
}

impl SlotAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            cursor: 0,
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Claim `count` consecutive slots and return the first. Nothing is
    /// claimed when the request does not fit.
    pub fn allocate(&mut self, count: usize) -> Option<usize> {
        if self.cursor + count > self.capacity {
            return None;
        }
        let start = self.cursor;
        self.cursor += count;
        Some(start)
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    pub fn used(&self) -> usize {
        self.cursor
    }
}

impl Default for SlotAllocator {
    fn default() -> Self {
        Self::new(SPRITE_COUNT)
    }
}

/// Frame-scoped allocator of tile slots holding mirrored tile copies.
///
/// A source tile flipped twice in one frame shares a single scratch tile.
#[derive(Debug, Clone)]
pub struct FlipScratch {
    base: u8,
    len: usize,
    /// (source tile, scratch tile) pairs handed out this frame
    assigned: Vec<(u8, u8)>,
    /// Scratch tiles written at least once, across frames
    high_water: usize,
    /// Scratch tiles that held non-empty tile data before their first use
    clobbered: Vec<u8>,
}

impl FlipScratch {
    /// Scratch region of `len` tiles starting at `base`, shortened to fit
    /// inside the tile table.
    pub fn new(base: u8, len: usize) -> Self {
        let len = len.min(TILE_COUNT - base as usize);
        Self {
            base,
            len,
            assigned: Vec::with_capacity(len),
            high_water: 0,
            clobbered: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.assigned.clear();
    }

    pub fn base(&self) -> u8 {
        self.base
    }

    pub fn capacity(&self) -> usize {
        self.len
    }

    pub fn remaining(&self) -> usize {
        self.len - self.assigned.len()
    }

    /// Tiles inside the region whose loaded content was replaced by a
    /// mirrored copy.
    pub fn clobbered(&self) -> &[u8] {
        &self.clobbered
    }

    /// Scratch tile holding `source` mirrored, writing it on first use.
    /// `None` when the region is full.
    pub fn flipped_tile(&mut self, ppu: &mut Ppu, source: u8) -> Option<u8> {
        if let Some(&(_, scratch)) = self.assigned.iter().find(|(src, _)| *src == source) {
            return Some(scratch);
        }
        if self.assigned.len() >= self.len {
            return None;
        }
        let scratch = self.base + self.assigned.len() as u8;
        if self.assigned.len() >= self.high_water {
            self.high_water = self.assigned.len() + 1;
            if !ppu.tile_table[scratch as usize].is_empty() {
                log(LogCategory::Sprites, LogLevel::Warn, || {
                    format!(
                        "tile {} is reserved for flipped sprites; its loaded content is overwritten",
                        scratch
                    )
                });
                self.clobbered.push(scratch);
            }
        }
        ppu.tile_table[scratch as usize] = ppu.tile_table[source as usize].flipped_x();
        self.assigned.push((source, scratch));
        Some(scratch)
    }
}

impl Default for FlipScratch {
    fn default() -> Self {
        Self::new(FLIP_SCRATCH_BASE, FLIP_SCRATCH_LEN)
    }
}

fn clamp_coord(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

impl Sprite {
    fn active_frame(&self, frame: u32) -> u32 {
        frame % self.frame_count.max(1)
    }

    /// Hardware tile for `tile_ref` in animation frame `frame`.
    pub fn frame_tile(&self, tile_ref: &TileRef, frame: u32) -> u8 {
        let offset = self.active_frame(frame) as usize * self.frame_stride();
        (tile_ref.tile_index as usize + offset) as u8
    }

    fn check_slots(&self, start_slot: usize) -> Result<(), DrawError> {
        if start_slot + self.tiles.len() > SPRITE_COUNT {
            return Err(DrawError::NotEnoughSlots {
                sprite: self.name.clone(),
                start_slot,
                needed: self.tiles.len(),
                capacity: SPRITE_COUNT,
            });
        }
        Ok(())
    }

    /// Frame 0 without flipping.
    pub fn draw(&self, ppu: &mut Ppu, x: i32, y: i32, start_slot: usize) -> Result<(), DrawError> {
        self.draw_frame(ppu, x, y, start_slot, 0)
    }

    /// Write this sprite's tiles for `frame` into slots starting at
    /// `start_slot`. Nothing is written when the slots do not fit.
    pub fn draw_frame(
        &self,
        ppu: &mut Ppu,
        x: i32,
        y: i32,
        start_slot: usize,
        frame: u32,
    ) -> Result<(), DrawError> {
        self.check_slots(start_slot)?;

        for (i, tile_ref) in self.tiles.iter().enumerate() {
            ppu.sprites[start_slot + i] = HwSprite {
                x: clamp_coord(x + tile_ref.offset_x as i32 + self.origin_offset.x),
                y: clamp_coord(y + tile_ref.offset_y as i32 + self.origin_offset.y),
                index: self.frame_tile(tile_ref, frame),
                attributes: tile_ref.palette_index | tile_ref.attributes,
            };
        }
        Ok(())
    }

    /// Mirror horizontally within the bounding box.
    ///
    /// Each tile is redirected to a mirrored copy in `scratch`. When scratch
    /// runs out the remaining tiles keep their mirrored position but use the
    /// original tile, and [`DrawError::ScratchExhausted`] is returned after
    /// all slots are written.
    pub fn draw_frame_flipped(
        &self,
        ppu: &mut Ppu,
        x: i32,
        y: i32,
        start_slot: usize,
        frame: u32,
        scratch: &mut FlipScratch,
    ) -> Result<(), DrawError> {
        self.check_slots(start_slot)?;

        let mut unflipped = 0;
        for (i, tile_ref) in self.tiles.iter().enumerate() {
            let source = self.frame_tile(tile_ref, frame);
            let index = match scratch.flipped_tile(ppu, source) {
                Some(t) => t,
                None => {
                    unflipped += 1;
                    source
                }
            };
            let mirrored_x = x + self.bounding_box.x - tile_ref.offset_x as i32 - TILE_SIZE as i32
                + self.origin_offset.x;

            ppu.sprites[start_slot + i] = HwSprite {
                x: clamp_coord(mirrored_x),
                y: clamp_coord(y + tile_ref.offset_y as i32 + self.origin_offset.y),
                index,
                attributes: tile_ref.palette_index | tile_ref.attributes,
            };
        }

        if unflipped > 0 {
            return Err(DrawError::ScratchExhausted {
                sprite: self.name.clone(),
                unflipped,
            });
        }
        Ok(())
    }
}

/// Per-frame arena tying slot allocation and flip scratch together.
#[derive(Debug, Clone, Default)]
pub struct SpriteLayer {
    slots: SlotAllocator,
    scratch: FlipScratch,
}

impl SpriteLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scratch(scratch: FlipScratch) -> Self {
        Self {
            slots: SlotAllocator::default(),
            scratch,
        }
    }

    /// Hide every hardware sprite and rewind slots and scratch.
    pub fn begin_frame(&mut self, ppu: &mut Ppu) {
        ppu.hide_all_sprites();
        self.slots.reset();
        self.scratch.reset();
    }

    pub fn slots(&self) -> &SlotAllocator {
        &self.slots
    }

    pub fn scratch(&self) -> &FlipScratch {
        &self.scratch
    }

    /// Allocate slots for sprite `id` and draw it.
    ///
    /// Returns the first slot used, or `None` when the sprite was skipped this
    /// frame. A flipped draw that ran out of scratch still counts as drawn.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        ppu: &mut Ppu,
        sprites: &Sprites,
        id: SpriteId,
        x: i32,
        y: i32,
        frame: u32,
        flip_x: bool,
    ) -> Option<usize> {
        let Some(sprite) = sprites.get(id) else {
            warn_skipped(&DrawError::UnknownSprite(id));
            return None;
        };

        let Some(start) = self.slots.allocate(sprite.slot_count()) else {
            warn_skipped(&DrawError::NotEnoughSlots {
                sprite: sprite.name.clone(),
                start_slot: self.slots.used(),
                needed: sprite.slot_count(),
                capacity: SPRITE_COUNT,
            });
            return None;
        };

        let result = if flip_x {
            sprite.draw_frame_flipped(ppu, x, y, start, frame, &mut self.scratch)
        } else {
            sprite.draw_frame(ppu, x, y, start, frame)
        };

        match result {
            Ok(()) => Some(start),
            Err(e @ DrawError::ScratchExhausted { .. }) => {
                log(LogCategory::Sprites, LogLevel::Warn, || e.to_string());
                Some(start)
            }
            Err(e) => {
                warn_skipped(&e);
                None
            }
        }
    }
}

fn warn_skipped(e: &DrawError) {
    log(LogCategory::Sprites, LogLevel::Warn, || {
        format!("{}; sprite skipped this frame", e)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::{Tile, OFFSCREEN_Y};
    use crate::sprites::IVec2;

    fn player_sprites() -> (Sprites, SpriteId) {
        let mut sprites = Sprites::new();
        let id = sprites.create_multi_tile_sprite("player", &[0, 1, 16, 17], 0, IVec2::new(2, 2));
        sprites.set_frame_count(id, 2).unwrap();
        (sprites, id)
    }

    #[test]
    fn test_slot_allocator_capacity() {
        let mut slots = SlotAllocator::new(64);
        assert_eq!(slots.allocate(60), Some(0));
        assert_eq!(slots.allocate(8), None);
        assert_eq!(slots.used(), 60, "failed request allocates nothing");
        assert_eq!(slots.remaining(), 4);
        assert_eq!(slots.allocate(4), Some(60));

        slots.reset();
        assert_eq!(slots.allocate(8), Some(0));
        assert_eq!(slots.allocate(8), Some(8));
    }

    #[test]
    fn test_draw_frame_positions_and_attributes() {
        let mut ppu = Ppu::new();
        let mut sprites = Sprites::new();
        let id = sprites.create_multi_tile_sprite("block", &[4, 5], 3, IVec2::new(2, 1));
        sprites.set_origin_offset(id, IVec2::new(-1, 2)).unwrap();
        let sprite = sprites.get(id).unwrap();

        sprite.draw_frame(&mut ppu, 100, 50, 10, 0).unwrap();
        assert_eq!(
            ppu.sprites[10],
            HwSprite {
                x: 99,
                y: 52,
                index: 4,
                attributes: 3
            }
        );
        assert_eq!(ppu.sprites[11].x, 107);
        assert_eq!(ppu.sprites[11].index, 5);
    }

    #[test]
    fn test_draw_frame_animation_stride() {
        let mut ppu = Ppu::new();
        let (sprites, id) = player_sprites();
        let sprite = sprites.get(id).unwrap();

        sprite.draw_frame(&mut ppu, 0, 0, 0, 1).unwrap();
        let indices: Vec<u8> = ppu.sprites[..4].iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![2, 3, 18, 19]);

        // Frame wraps modulo frame_count
        sprite.draw_frame(&mut ppu, 0, 0, 0, 2).unwrap();
        assert_eq!(ppu.sprites[0].index, 0);
    }

    #[test]
    fn test_draw_frame_clamps_position() {
        let mut ppu = Ppu::new();
        let mut sprites = Sprites::new();
        let id = sprites.create_simple_sprite("dot", 1, 0);
        let sprite = sprites.get(id).unwrap();

        sprite.draw(&mut ppu, -20, 400, 0).unwrap();
        assert_eq!((ppu.sprites[0].x, ppu.sprites[0].y), (0, 255));
    }

    #[test]
    fn test_draw_frame_rejects_overflow_without_writing() {
        let mut ppu = Ppu::new();
        let (sprites, id) = player_sprites();
        let err = sprites.get(id).unwrap().draw_frame(&mut ppu, 5, 5, 62, 0);
        assert!(matches!(err, Err(DrawError::NotEnoughSlots { needed: 4, .. })));
        assert!(ppu.sprites.iter().all(|s| s.y == OFFSCREEN_Y));
    }

    #[test]
    fn test_flip_mirrors_tile_bits() {
        let mut ppu = Ppu::new();
        ppu.tile_table[7].bit0[0] = 0b0110_0000;
        let mut sprites = Sprites::new();
        let id = sprites.create_simple_sprite("arrow", 7, 1);
        let mut scratch = FlipScratch::default();

        sprites
            .get(id)
            .unwrap()
            .draw_frame_flipped(&mut ppu, 30, 40, 0, 0, &mut scratch)
            .unwrap();

        let hw = ppu.sprites[0];
        assert_eq!(hw.index, FLIP_SCRATCH_BASE);
        assert_eq!(ppu.tile_table[hw.index as usize].bit0[0], 0b0000_0110);
        // Source tile is untouched
        assert_eq!(ppu.tile_table[7].bit0[0], 0b0110_0000);
        // A single 8-wide tile stays in place
        assert_eq!((hw.x, hw.y), (30, 40));
    }

    #[test]
    fn test_flip_position_math() {
        let mut ppu = Ppu::new();
        let (sprites, id) = player_sprites();
        let mut scratch = FlipScratch::default();
        sprites
            .get(id)
            .unwrap()
            .draw_frame_flipped(&mut ppu, 100, 20, 0, 0, &mut scratch)
            .unwrap();

        // Left column (offset 0) moves to the right half and vice versa
        assert_eq!(ppu.sprites[0].x, 108);
        assert_eq!(ppu.sprites[1].x, 100);
        // Right edge of the mirrored tile meets the original's left edge
        assert_eq!(ppu.sprites[1].x as i32 + 8, 100 + 16 - 8);
        assert_eq!(ppu.sprites[2].y, 28);
    }

    #[test]
    fn test_two_flipped_sprites_use_distinct_scratch() {
        let mut ppu = Ppu::new();
        ppu.tile_table[0] = Tile::from_bytes(&[0x01; 16]);
        ppu.tile_table[40] = Tile::from_bytes(&[0x03; 16]);
        let mut sprites = Sprites::new();
        let a = sprites.create_simple_sprite("a", 0, 0);
        let b = sprites.create_simple_sprite("b", 40, 0);

        let mut layer = SpriteLayer::new();
        layer.begin_frame(&mut ppu);
        let sa = layer.draw(&mut ppu, &sprites, a, 10, 10, 0, true).unwrap();
        let sb = layer.draw(&mut ppu, &sprites, b, 50, 10, 0, true).unwrap();

        let ta = ppu.sprites[sa].index as usize;
        let tb = ppu.sprites[sb].index as usize;
        assert_ne!(ta, tb);
        assert_eq!(ppu.tile_table[ta].bit0[0], 0x80);
        assert_eq!(ppu.tile_table[tb].bit0[0], 0xC0);
    }

    #[test]
    fn test_flip_scratch_reuses_same_source() {
        let mut ppu = Ppu::new();
        let mut scratch = FlipScratch::default();
        let first = scratch.flipped_tile(&mut ppu, 12).unwrap();
        let again = scratch.flipped_tile(&mut ppu, 12).unwrap();
        assert_eq!(first, again);
        assert_eq!(scratch.remaining(), FLIP_SCRATCH_LEN - 1);
    }

    #[test]
    fn test_flip_scratch_reports_replaced_sheet_tiles() {
        let mut ppu = Ppu::new();
        ppu.tile_table[3] = Tile::from_bytes(&[0x01; 16]);
        // Loaded sheet content sits in the second scratch tile only
        ppu.tile_table[FLIP_SCRATCH_BASE as usize + 1] = Tile::from_bytes(&[0xAA; 16]);

        let mut scratch = FlipScratch::default();
        scratch.flipped_tile(&mut ppu, 3).unwrap();
        scratch.flipped_tile(&mut ppu, 4).unwrap();
        assert_eq!(scratch.clobbered(), &[FLIP_SCRATCH_BASE + 1]);

        // Later frames rewrite their own mirrored copies without reporting
        scratch.reset();
        scratch.flipped_tile(&mut ppu, 4).unwrap();
        scratch.flipped_tile(&mut ppu, 3).unwrap();
        assert_eq!(scratch.clobbered(), &[FLIP_SCRATCH_BASE + 1]);
    }

    #[test]
    fn test_flip_scratch_exhaustion() {
        let mut ppu = Ppu::new();
        let (sprites, id) = player_sprites();
        let mut scratch = FlipScratch::new(254, 8);
        assert_eq!(scratch.capacity(), 2);

        let err = sprites
            .get(id)
            .unwrap()
            .draw_frame_flipped(&mut ppu, 0, 0, 0, 0, &mut scratch);
        assert_eq!(
            err,
            Err(DrawError::ScratchExhausted {
                sprite: "player".into(),
                unflipped: 2
            })
        );
        // Every slot is still written
        assert_eq!(ppu.sprites[0].index, 254);
        assert_eq!(ppu.sprites[1].index, 255);
        assert_eq!(ppu.sprites[2].index, 16);
        assert_eq!(ppu.sprites[3].index, 17);

        scratch.reset();
        assert_eq!(scratch.remaining(), 2);
    }

    #[test]
    fn test_layer_begin_frame_resets() {
        let mut ppu = Ppu::new();
        let (sprites, id) = player_sprites();
        let mut layer = SpriteLayer::new();

        layer.begin_frame(&mut ppu);
        for expected in (0..64).step_by(4) {
            assert_eq!(layer.draw(&mut ppu, &sprites, id, 0, 0, 0, false), Some(expected));
        }
        assert_eq!(layer.draw(&mut ppu, &sprites, id, 0, 0, 0, false), None);
        assert_eq!(layer.slots().remaining(), 0);

        layer.begin_frame(&mut ppu);
        assert!(ppu.sprites.iter().all(|s| !s.is_visible()));
        assert_eq!(layer.draw(&mut ppu, &sprites, id, 0, 0, 0, false), Some(0));
    }

    #[test]
    fn test_layer_unknown_sprite_skipped() {
        let mut ppu = Ppu::new();
        let sprites = Sprites::new();
        let mut layer = SpriteLayer::new();
        layer.begin_frame(&mut ppu);
        assert_eq!(layer.draw(&mut ppu, &sprites, SpriteId(3), 0, 0, 0, false), None);
        assert_eq!(layer.slots().used(), 0);
    }
}
