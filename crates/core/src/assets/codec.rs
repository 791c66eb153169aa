//! The asset file: a `TILE` chunk followed by a `PALT` chunk.
//!
//! Loading is split in two. [`load`] parses bytes into owned record lists and
//! fails with [`AssetError`] on any structural problem. [`install`] then
//! copies those records into the PPU's fixed-size tables, truncating
//! anything that does not fit. [`load_assets`] is the runtime entry point
//! that does both and reports a plain success flag so the caller can fall
//! back to built-in visuals.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use super::chunk::{write_chunk, ChunkReader, CorruptAsset, Magic};
use crate::logging::{log, LogCategory, LogLevel};
use crate::ppu::{Palette, PaletteTable, Tile, TileTable};

pub const TILE_MAGIC: Magic = *b"TILE";
pub const PALETTE_MAGIC: Magic = *b"PALT";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Corrupt asset file: {0}")]
    Corrupt(#[from] CorruptAsset),
}

/// Records parsed from an asset file, not yet bound to any table size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedAssets {
    pub tiles: Vec<Tile>,
    pub palettes: Vec<Palette>,
}

/// Outcome of [`install`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub tiles_loaded: usize,
    pub palettes_loaded: usize,
    pub tiles_dropped: usize,
    pub palettes_dropped: usize,
}

impl LoadReport {
    pub fn is_truncated(&self) -> bool {
        self.tiles_dropped > 0 || self.palettes_dropped > 0
    }
}

/// Serialize both tables into the asset file format.
pub fn save(tiles: &[Tile], palettes: &[Palette]) -> Vec<u8> {
    let mut out = Vec::with_capacity(16 + (tiles.len() + palettes.len()) * 16);
    // Writing into a Vec cannot fail
    let _ = write_assets(&mut out, tiles, palettes);
    out
}

pub fn write_assets<W: Write>(
    writer: &mut W,
    tiles: &[Tile],
    palettes: &[Palette],
) -> io::Result<()> {
    write_chunk(&TILE_MAGIC, tiles, writer)?;
    write_chunk(&PALETTE_MAGIC, palettes, writer)?;
    writer.flush()
}

/// Create (or replace) `path` with an asset file.
pub fn save_to_file<P: AsRef<Path>>(
    path: P,
    tiles: &[Tile],
    palettes: &[Palette],
) -> Result<(), AssetError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_assets(&mut writer, tiles, palettes)?;
    Ok(())
}

/// Parse an asset file. Bytes after the `PALT` chunk are ignored.
pub fn load(bytes: &[u8]) -> Result<LoadedAssets, AssetError> {
    let mut reader = ChunkReader::new(bytes);
    let tiles = reader.read_chunk::<Tile>(&TILE_MAGIC)?;
    let palettes = reader.read_chunk::<Palette>(&PALETTE_MAGIC)?;
    if reader.remaining() > 0 {
        log(LogCategory::Assets, LogLevel::Debug, || {
            format!("ignoring {} trailing bytes", reader.remaining())
        });
    }
    Ok(LoadedAssets { tiles, palettes })
}

pub fn load_file<P: AsRef<Path>>(path: P) -> Result<LoadedAssets, AssetError> {
    let bytes = std::fs::read(path)?;
    load(&bytes)
}

/// Copy loaded records into the fixed tables.
///
/// Records beyond table capacity are dropped with a warning. Table slots
/// past the loaded count keep their previous contents.
pub fn install(
    loaded: &LoadedAssets,
    tiles: &mut TileTable,
    palettes: &mut PaletteTable,
) -> LoadReport {
    let tiles_loaded = loaded.tiles.len().min(tiles.len());
    tiles[..tiles_loaded].copy_from_slice(&loaded.tiles[..tiles_loaded]);

    let palettes_loaded = loaded.palettes.len().min(palettes.len());
    palettes[..palettes_loaded].copy_from_slice(&loaded.palettes[..palettes_loaded]);

    let report = LoadReport {
        tiles_loaded,
        palettes_loaded,
        tiles_dropped: loaded.tiles.len() - tiles_loaded,
        palettes_dropped: loaded.palettes.len() - palettes_loaded,
    };

    if report.tiles_dropped > 0 {
        log(LogCategory::Assets, LogLevel::Warn, || {
            format!(
                "asset file has {} tiles, only {} fit; truncating",
                loaded.tiles.len(),
                tiles.len()
            )
        });
    }
    if report.palettes_dropped > 0 {
        log(LogCategory::Assets, LogLevel::Warn, || {
            format!(
                "asset file has {} palettes, only {} fit; truncating",
                loaded.palettes.len(),
                palettes.len()
            )
        });
    }

    report
}

/// Load `path` straight into the PPU tables.
///
/// Returns `false` on any failure, after logging it; the tables are only
/// touched when the whole file parsed.
pub fn load_assets<P: AsRef<Path>>(
    path: P,
    tiles: &mut TileTable,
    palettes: &mut PaletteTable,
) -> bool {
    let path = path.as_ref();
    match load_file(path) {
        Ok(loaded) => {
            let report = install(&loaded, tiles, palettes);
            log(LogCategory::Assets, LogLevel::Info, || {
                format!(
                    "loaded {} tiles and {} palettes from {}",
                    report.tiles_loaded,
                    report.palettes_loaded,
                    path.display()
                )
            });
            true
        }
        Err(e) => {
            log(LogCategory::Assets, LogLevel::Error, || {
                format!("failed to load {}: {}", path.display(), e)
            });
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::{Color, PALETTE_COUNT, TILE_COUNT};

    fn patterned_tiles(n: usize) -> Vec<Tile> {
        (0..n)
            .map(|i| {
                let mut t = Tile::EMPTY;
                t.bit0[0] = i as u8;
                t.bit1[7] = !(i as u8);
                t
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_extreme_tables() {
        let zero_tiles = [Tile::EMPTY; TILE_COUNT];
        let zero_palettes = [Palette::EMPTY; PALETTE_COUNT];
        let loaded = load(&save(&zero_tiles, &zero_palettes)).unwrap();
        assert_eq!(loaded.tiles, zero_tiles.to_vec());
        assert_eq!(loaded.palettes, zero_palettes.to_vec());

        let full_tile = Tile::from_bytes(&[0xFF; 16]);
        let full_palette = Palette::from_bytes(&[0xFF; 16]);
        let bytes = save(&[full_tile; TILE_COUNT], &[full_palette; PALETTE_COUNT]);
        assert_eq!(bytes.len(), 8 + 256 * 16 + 8 + 8 * 16);
        let loaded = load(&bytes).unwrap();
        assert!(loaded.tiles.iter().all(|t| *t == full_tile));
        assert!(loaded.palettes.iter().all(|p| *p == full_palette));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = save(&patterned_tiles(2), &[Palette::EMPTY]);
        bytes.extend_from_slice(b"junk");
        let loaded = load(&bytes).unwrap();
        assert_eq!(loaded.tiles.len(), 2);
        assert_eq!(loaded.palettes.len(), 1);
    }

    #[test]
    fn test_palette_chunk_missing() {
        let mut bytes = Vec::new();
        write_chunk(&TILE_MAGIC, &patterned_tiles(1), &mut bytes).unwrap();
        let err = load(&bytes).unwrap_err();
        assert!(matches!(
            err,
            AssetError::Corrupt(CorruptAsset::Truncated { needed: 8, available: 0, .. })
        ));
    }

    #[test]
    fn test_chunks_out_of_order() {
        let mut bytes = Vec::new();
        write_chunk(&PALETTE_MAGIC, &[Palette::EMPTY], &mut bytes).unwrap();
        write_chunk(&TILE_MAGIC, &patterned_tiles(1), &mut bytes).unwrap();
        assert!(matches!(
            load(&bytes),
            Err(AssetError::Corrupt(CorruptAsset::MagicMismatch { .. }))
        ));
    }

    #[test]
    fn test_install_truncates_oversized_loads() {
        let loaded = LoadedAssets {
            tiles: patterned_tiles(300),
            palettes: vec![Palette::new([Color::rgb(1, 2, 3); 4]); 10],
        };
        let mut tiles = [Tile::EMPTY; TILE_COUNT];
        let mut palettes = [Palette::EMPTY; PALETTE_COUNT];
        let report = install(&loaded, &mut tiles, &mut palettes);

        assert_eq!(report.tiles_loaded, 256);
        assert_eq!(report.tiles_dropped, 44);
        assert_eq!(report.palettes_loaded, 8);
        assert_eq!(report.palettes_dropped, 2);
        assert!(report.is_truncated());
        assert_eq!(tiles[255], loaded.tiles[255]);
    }

    #[test]
    fn test_install_leaves_unloaded_slots_untouched() {
        let sentinel = Tile::from_bytes(&[0xAB; 16]);
        let mut tiles = [sentinel; TILE_COUNT];
        let mut palettes = [Palette::EMPTY; PALETTE_COUNT];
        let loaded = LoadedAssets {
            tiles: patterned_tiles(4),
            palettes: Vec::new(),
        };
        let report = install(&loaded, &mut tiles, &mut palettes);
        assert!(!report.is_truncated());
        assert_eq!(&tiles[..4], &loaded.tiles[..]);
        assert!(tiles[4..].iter().all(|t| *t == sentinel));
    }

    #[test]
    fn test_load_assets_missing_file() {
        let mut tiles = [Tile::EMPTY; TILE_COUNT];
        let mut palettes = [Palette::EMPTY; PALETTE_COUNT];
        assert!(!load_assets(
            "/nonexistent/dir/assets.dat",
            &mut tiles,
            &mut palettes
        ));
        assert!(tiles.iter().all(Tile::is_empty));
    }

    #[test]
    fn test_load_assets_from_disk() {
        let path = std::env::temp_dir().join(format!("ppu_core_codec_{}.dat", std::process::id()));
        let written = patterned_tiles(5);
        save_to_file(&path, &written, &[Palette::new([Color::rgb(9, 9, 9); 4])]).unwrap();

        let mut tiles = [Tile::EMPTY; TILE_COUNT];
        let mut palettes = [Palette::EMPTY; PALETTE_COUNT];
        assert!(load_assets(&path, &mut tiles, &mut palettes));
        assert_eq!(&tiles[..5], &written[..]);
        assert_eq!(palettes[0].colors[0], Color::rgb(9, 9, 9));
        let _ = std::fs::remove_file(&path);
    }
}
