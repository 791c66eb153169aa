//! Logical sprites: named multi-tile visuals built over the tile table.
//!
//! A [`Sprite`] is a template (tile references, bounding box, frame layout).
//! [`Sprites`] owns every template for a session and hands out stable
//! [`SpriteId`]s so animators and game entities can refer to sprites without
//! holding references into the registry.
//!
//! Drawing onto the hardware slots lives in [`draw`].

pub mod draw;

pub use draw::{DrawError, FlipScratch, SlotAllocator, SpriteLayer};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::logging::{log, LogCategory, LogLevel};
use crate::ppu::{PALETTE_COUNT, TILE_SIZE};

#[derive(Debug, Error)]
pub enum SpriteError {
    #[error("Sprite '{name}': {tiles} tiles cannot be split into {frame_count} frames")]
    FrameLayout {
        name: String,
        tiles: usize,
        frame_count: u32,
    },
    #[error("Sprite '{name}': palette index {palette} out of range")]
    InvalidPalette { name: String, palette: u8 },
    #[error("Sprite with empty name")]
    EmptyName,
    #[error("Unknown sprite: {0}")]
    UnknownSprite(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid sprite sheet: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IVec2 {
    pub x: i32,
    pub y: i32,
}

impl IVec2 {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One tile of a logical sprite, placed relative to the sprite origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TileRef {
    /// Tile of frame 0; later frames are found by stride.
    pub tile_index: u8,
    pub palette_index: u8,
    #[serde(default)]
    pub offset_x: i8,
    #[serde(default)]
    pub offset_y: i8,
    /// Raw hardware attribute bits OR'd with the palette index.
    #[serde(default)]
    pub attributes: u8,
}

fn default_bounding_box() -> IVec2 {
    IVec2::new(TILE_SIZE as i32, TILE_SIZE as i32)
}

fn default_frame_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub name: String,
    pub tiles: Vec<TileRef>,
    #[serde(default)]
    pub origin_offset: IVec2,
    #[serde(default = "default_bounding_box")]
    pub bounding_box: IVec2,
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
}

impl Sprite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tiles: Vec::new(),
            origin_offset: IVec2::default(),
            bounding_box: default_bounding_box(),
            frame_count: 1,
        }
    }

    /// Number of hardware slots one draw of this sprite occupies.
    pub fn slot_count(&self) -> usize {
        self.tiles.len()
    }

    /// Tile-table distance between consecutive animation frames.
    pub fn frame_stride(&self) -> usize {
        self.tiles.len() / self.frame_count.max(1) as usize
    }

    pub fn validate(&self) -> Result<(), SpriteError> {
        if self.name.is_empty() {
            return Err(SpriteError::EmptyName);
        }
        if self.frame_count == 0 || self.tiles.len() % self.frame_count as usize != 0 {
            return Err(SpriteError::FrameLayout {
                name: self.name.clone(),
                tiles: self.tiles.len(),
                frame_count: self.frame_count,
            });
        }
        if let Some(bad) = self
            .tiles
            .iter()
            .find(|t| t.palette_index as usize >= PALETTE_COUNT)
        {
            return Err(SpriteError::InvalidPalette {
                name: self.name.clone(),
                palette: bad.palette_index,
            });
        }
        Ok(())
    }
}

/// Stable handle to a sprite in a [`Sprites`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpriteId(pub u32);

#[derive(Serialize, Deserialize)]
struct SpriteSheet {
    sprites: Vec<Sprite>,
}

/// Registry of every logical sprite in a session.
#[derive(Debug, Clone, Default)]
pub struct Sprites {
    sprites: Vec<Sprite>,
    by_name: HashMap<String, SpriteId>,
}

impl Sprites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Register `sprite`. Re-using a name replaces the old definition and
    /// keeps its id.
    pub fn add_sprite(&mut self, sprite: Sprite) -> SpriteId {
        if let Some(&id) = self.by_name.get(&sprite.name) {
            self.sprites[id.0 as usize] = sprite;
            return id;
        }
        let id = SpriteId(self.sprites.len() as u32);
        self.by_name.insert(sprite.name.clone(), id);
        self.sprites.push(sprite);
        id
    }

    /// One tile, one frame, 8×8.
    pub fn create_simple_sprite(
        &mut self,
        name: &str,
        tile_index: u8,
        palette_index: u8,
    ) -> SpriteId {
        let mut sprite = Sprite::new(name);
        sprite.tiles.push(TileRef {
            tile_index,
            palette_index,
            ..Default::default()
        });
        self.add_sprite(sprite)
    }

    /// Lay `tile_indices` row-major into a `grid.x` × `grid.y` arrangement.
    /// Grid cells past the end of `tile_indices` stay empty. Cells whose
    /// offset does not fit an `i8` (column or row 16 and beyond) are skipped.
    pub fn create_multi_tile_sprite(
        &mut self,
        name: &str,
        tile_indices: &[u8],
        palette_index: u8,
        grid: IVec2,
    ) -> SpriteId {
        let mut sprite = Sprite::new(name);
        sprite.bounding_box = IVec2::new(grid.x * 8, grid.y * 8);

        for row in 0..grid.y.max(0) {
            for col in 0..grid.x.max(0) {
                let i = (col + row * grid.x) as usize;
                let Some(&tile_index) = tile_indices.get(i) else {
                    continue;
                };
                let (Ok(offset_x), Ok(offset_y)) = (i8::try_from(col * 8), i8::try_from(row * 8))
                else {
                    log(LogCategory::Sprites, LogLevel::Warn, || {
                        format!(
                            "sprite '{}': cell ({}, {}) is out of offset range; skipped",
                            name, col, row
                        )
                    });
                    continue;
                };
                sprite.tiles.push(TileRef {
                    tile_index,
                    palette_index,
                    offset_x,
                    offset_y,
                    attributes: 0,
                });
            }
        }

        self.add_sprite(sprite)
    }

    pub fn set_frame_count(&mut self, id: SpriteId, frame_count: u32) -> Result<(), SpriteError> {
        let sprite = self.get_mut(id)?;
        if frame_count == 0 || sprite.tiles.len() % frame_count as usize != 0 {
            return Err(SpriteError::FrameLayout {
                name: sprite.name.clone(),
                tiles: sprite.tiles.len(),
                frame_count,
            });
        }
        sprite.frame_count = frame_count;
        Ok(())
    }

    pub fn set_bounding_box(&mut self, id: SpriteId, bounding_box: IVec2) -> Result<(), SpriteError> {
        self.get_mut(id)?.bounding_box = bounding_box;
        Ok(())
    }

    pub fn set_origin_offset(&mut self, id: SpriteId, offset: IVec2) -> Result<(), SpriteError> {
        self.get_mut(id)?.origin_offset = offset;
        Ok(())
    }

    fn get_mut(&mut self, id: SpriteId) -> Result<&mut Sprite, SpriteError> {
        self.sprites
            .get_mut(id.0 as usize)
            .ok_or_else(|| SpriteError::UnknownSprite(format!("#{}", id.0)))
    }

    pub fn lookup(&self, name: &str) -> Option<SpriteId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: SpriteId) -> Option<&Sprite> {
        self.sprites.get(id.0 as usize)
    }

    pub fn by_name(&self, name: &str) -> Option<&Sprite> {
        self.lookup(name).and_then(|id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (SpriteId, &Sprite)> {
        self.sprites
            .iter()
            .enumerate()
            .map(|(i, s)| (SpriteId(i as u32), s))
    }

    pub fn to_json(&self) -> Result<String, SpriteError> {
        let sheet = SpriteSheet {
            sprites: self.sprites.clone(),
        };
        Ok(serde_json::to_string_pretty(&sheet)?)
    }

    /// Parse and validate a sprite sheet. Ids follow sheet order.
    pub fn from_json(json: &str) -> Result<Self, SpriteError> {
        let sheet: SpriteSheet = serde_json::from_str(json)?;
        let mut sprites = Sprites::new();
        for sprite in sheet.sprites {
            sprite.validate()?;
            sprites.add_sprite(sprite);
        }
        Ok(sprites)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SpriteError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SpriteError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_sprite() {
        let mut sprites = Sprites::new();
        let id = sprites.create_simple_sprite("heart", 8, 0);
        let heart = sprites.get(id).unwrap();
        assert_eq!(heart.tiles.len(), 1);
        assert_eq!(heart.tiles[0].tile_index, 8);
        assert_eq!(heart.bounding_box, IVec2::new(8, 8));
        assert_eq!(heart.frame_count, 1);
        assert_eq!(sprites.lookup("heart"), Some(id));
    }

    #[test]
    fn test_multi_tile_grid_layout() {
        let mut sprites = Sprites::new();
        let id = sprites.create_multi_tile_sprite("player", &[0, 1, 16, 17], 0, IVec2::new(2, 2));
        let player = sprites.get(id).unwrap();
        assert_eq!(player.bounding_box, IVec2::new(16, 16));
        let offsets: Vec<(u8, i8, i8)> = player
            .tiles
            .iter()
            .map(|t| (t.tile_index, t.offset_x, t.offset_y))
            .collect();
        assert_eq!(offsets, vec![(0, 0, 0), (1, 8, 0), (16, 0, 8), (17, 8, 8)]);
    }

    #[test]
    fn test_multi_tile_short_index_list() {
        let mut sprites = Sprites::new();
        let id = sprites.create_multi_tile_sprite("partial", &[5, 6, 7], 2, IVec2::new(2, 2));
        assert_eq!(sprites.get(id).unwrap().tiles.len(), 3);
    }

    #[test]
    fn test_multi_tile_wide_grid_skips_unreachable_columns() {
        let mut sprites = Sprites::new();
        let indices: Vec<u8> = (0..17).collect();
        let id = sprites.create_multi_tile_sprite("banner", &indices, 0, IVec2::new(17, 1));
        let banner = sprites.get(id).unwrap();
        assert_eq!(banner.tiles.len(), 16);
        assert_eq!(banner.tiles.last().map(|t| t.offset_x), Some(120));
        assert!(banner.tiles.iter().all(|t| t.offset_x >= 0));
    }

    #[test]
    fn test_re_register_keeps_id() {
        let mut sprites = Sprites::new();
        let a = sprites.create_simple_sprite("enemy", 32, 5);
        let b = sprites.create_simple_sprite("wood", 24, 4);
        let a2 = sprites.create_simple_sprite("enemy", 33, 5);
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(sprites.len(), 2);
        assert_eq!(sprites.by_name("enemy").unwrap().tiles[0].tile_index, 33);
    }

    #[test]
    fn test_frame_count_divisibility() {
        let mut sprites = Sprites::new();
        let id = sprites.create_multi_tile_sprite("player", &[0, 1, 16, 17], 0, IVec2::new(2, 2));
        assert!(sprites.set_frame_count(id, 2).is_ok());
        assert_eq!(sprites.get(id).unwrap().frame_stride(), 2);
        assert!(matches!(
            sprites.set_frame_count(id, 3),
            Err(SpriteError::FrameLayout { tiles: 4, frame_count: 3, .. })
        ));
        assert!(sprites.set_frame_count(id, 0).is_err());
        // Failed updates leave the old value
        assert_eq!(sprites.get(id).unwrap().frame_count, 2);
    }

    #[test]
    fn test_lookup_missing_never_panics() {
        let mut sprites = Sprites::new();
        assert_eq!(sprites.lookup("ghost"), None);
        assert!(sprites.by_name("ghost").is_none());
        assert!(sprites.get(SpriteId(42)).is_none());
        assert!(matches!(
            sprites.set_bounding_box(SpriteId(42), IVec2::new(1, 1)),
            Err(SpriteError::UnknownSprite(_))
        ));
    }

    #[test]
    fn test_json_roundtrip() {
        let mut sprites = Sprites::new();
        let player = sprites.create_multi_tile_sprite("player", &[0, 1, 16, 17], 0, IVec2::new(2, 2));
        sprites.set_frame_count(player, 2).unwrap();
        sprites.set_origin_offset(player, IVec2::new(-8, -8)).unwrap();
        sprites.create_simple_sprite("pot", 56, 6);

        let loaded = Sprites::from_json(&sprites.to_json().unwrap()).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.lookup("player"), Some(player));
        assert_eq!(loaded.by_name("player"), sprites.by_name("player"));
        assert_eq!(loaded.by_name("pot"), sprites.by_name("pot"));
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{ "sprites": [ { "name": "coin", "tiles": [ { "tile_index": 9, "palette_index": 3 } ] } ] }"#;
        let sprites = Sprites::from_json(json).unwrap();
        let coin = sprites.by_name("coin").unwrap();
        assert_eq!(coin.frame_count, 1);
        assert_eq!(coin.bounding_box, IVec2::new(8, 8));
        assert_eq!(coin.tiles[0].offset_x, 0);
    }

    #[test]
    fn test_json_rejects_bad_sheets() {
        let bad_frames = r#"{ "sprites": [ { "name": "x", "frame_count": 2,
            "tiles": [ { "tile_index": 1, "palette_index": 0 } ] } ] }"#;
        assert!(matches!(
            Sprites::from_json(bad_frames),
            Err(SpriteError::FrameLayout { .. })
        ));

        let bad_palette = r#"{ "sprites": [ { "name": "x",
            "tiles": [ { "tile_index": 1, "palette_index": 8 } ] } ] }"#;
        assert!(matches!(
            Sprites::from_json(bad_palette),
            Err(SpriteError::InvalidPalette { palette: 8, .. })
        ));

        let no_name = r#"{ "sprites": [ { "name": "", "tiles": [] } ] }"#;
        assert!(matches!(Sprites::from_json(no_name), Err(SpriteError::EmptyName)));

        assert!(matches!(Sprites::from_json("not json"), Err(SpriteError::Json(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("ppu_core_sprites_{}.json", std::process::id()));
        let mut sprites = Sprites::new();
        sprites.create_simple_sprite("flower", 40, 0);
        sprites.save(&path).unwrap();

        let loaded = Sprites::load(&path).unwrap();
        assert_eq!(loaded.by_name("flower").unwrap().tiles[0].tile_index, 40);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(Sprites::load(&path), Err(SpriteError::Io(_))));
    }
}
