//! RGBA image to tile/palette conversion.
//!
//! The image is cut into 8×8 regions. Each region with at most four distinct
//! colors becomes one tile plus a palette assignment; identical palettes
//! (within a small per-channel tolerance) are shared between tiles.
//!
//! Region `(tile_x, tile_y)` lands in tile slot `tile_x + tile_y * 16`, with
//! tile row 0 at the bottom of the image.

use std::collections::HashMap;

use thiserror::Error;

use crate::logging::{log, LogCategory, LogLevel};
use crate::ppu::{
    grid_index, Color, Palette, PaletteTable, Tile, TileTable, PALETTE_COUNT, PALETTE_SIZE,
    TILE_COUNT, TILE_GRID_HEIGHT, TILE_GRID_WIDTH, TILE_SIZE,
};

/// Pixels with alpha below this collapse to [`Color::TRANSPARENT`].
pub const ALPHA_THRESHOLD: u8 = 128;

/// Maximum per-channel difference for two palettes to be considered equal.
pub const PALETTE_TOLERANCE: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("Invalid image dimensions {width}x{height}: must be non-zero multiples of 8, at most 128x128")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Pixel buffer holds {actual} pixels, expected {expected}")]
    PixelCount { expected: usize, actual: usize },
}

/// Decoded image with a lower-left origin: `pixels[0]` is the bottom-left
/// pixel and rows run upwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl RgbaImage {
    pub fn new(width: u32, height: u32, pixels: Vec<Color>) -> Result<Self, ConvertError> {
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(ConvertError::PixelCount {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Build from packed RGBA8 bytes, bottom row first.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> Result<Self, ConvertError> {
        let pixels = bytes
            .chunks_exact(4)
            .map(|p| Color::rgba(p[0], p[1], p[2], p[3]))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((x + y * self.width) as usize).copied()
    }
}

/// Color census of one 8×8 region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileColorAnalysis {
    /// Distinct normalized colors in first-encountered order
    /// (bottom row first, left to right).
    pub colors: Vec<Color>,
    /// At most four distinct colors.
    pub valid: bool,
    pub index_of: HashMap<Color, u8>,
    pub palette_slot: Option<usize>,
}

impl TileColorAnalysis {
    /// The colors padded with transparent to a full palette.
    pub fn canonical_palette(&self) -> Palette {
        let mut palette = Palette::EMPTY;
        for (slot, color) in palette.colors.iter_mut().zip(self.colors.iter()) {
            *slot = *color;
        }
        palette
    }
}

fn normalize(pixel: Color) -> Color {
    if pixel.a < ALPHA_THRESHOLD {
        Color::TRANSPARENT
    } else {
        pixel
    }
}

pub fn analyze_tile_colors(image: &RgbaImage, tile_x: u32, tile_y: u32) -> TileColorAnalysis {
    let mut analysis = TileColorAnalysis::default();

    for y in 0..TILE_SIZE as u32 {
        for x in 0..TILE_SIZE as u32 {
            let Some(pixel) = image.pixel(tile_x * 8 + x, tile_y * 8 + y) else {
                continue;
            };
            let color = normalize(pixel);
            if !analysis.index_of.contains_key(&color) {
                analysis
                    .index_of
                    .insert(color, analysis.colors.len().min(u8::MAX as usize) as u8);
                analysis.colors.push(color);
            }
        }
    }

    analysis.valid = analysis.colors.len() <= PALETTE_SIZE;
    analysis
}

/// 2-bit index of `pixel` under `analysis`; colors outside the census map to 0.
pub fn rgba_to_color_index(pixel: Color, analysis: &TileColorAnalysis) -> u8 {
    analysis
        .index_of
        .get(&normalize(pixel))
        .copied()
        .filter(|&i| (i as usize) < PALETTE_SIZE)
        .unwrap_or(0)
}

/// How a tile's palette was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteMatch {
    Reused(usize),
    Created(usize),
    /// Every slot was taken and none matched; palette 0 is used.
    Fallback,
}

impl PaletteMatch {
    pub fn index(self) -> usize {
        match self {
            PaletteMatch::Reused(i) | PaletteMatch::Created(i) => i,
            PaletteMatch::Fallback => 0,
        }
    }
}

/// Find a palette within tolerance of `colors` among slots `0..next_slot`,
/// or claim slot `next_slot`.
pub fn find_or_create_palette(
    colors: &[Color],
    table: &mut PaletteTable,
    next_slot: &mut usize,
) -> PaletteMatch {
    let mut wanted = Palette::EMPTY;
    for (slot, color) in wanted.colors.iter_mut().zip(colors.iter()) {
        *slot = *color;
    }

    let used = (*next_slot).min(PALETTE_COUNT);
    if let Some(i) = table[..used]
        .iter()
        .position(|p| p.approx_eq(&wanted, PALETTE_TOLERANCE))
    {
        return PaletteMatch::Reused(i);
    }

    if used >= PALETTE_COUNT {
        return PaletteMatch::Fallback;
    }

    table[used] = wanted;
    *next_slot = used + 1;
    PaletteMatch::Created(used)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAssignment {
    pub tile_index: usize,
    pub palette: PaletteMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTile {
    pub tile_index: usize,
    pub distinct_colors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionReport {
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub tiles_converted: usize,
    pub palettes_used: usize,
    pub invalid_tiles: Vec<InvalidTile>,
    /// Tile indices forced onto palette 0.
    pub palette_fallbacks: Vec<usize>,
}

impl ConversionReport {
    pub fn total_tiles(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }
}

pub struct Conversion {
    pub tiles: TileTable,
    pub palettes: PaletteTable,
    pub assignments: Vec<TileAssignment>,
    pub report: ConversionReport,
}

fn check_dimensions(image: &RgbaImage) -> Result<(u32, u32), ConvertError> {
    let (w, h) = (image.width(), image.height());
    let tile = TILE_SIZE as u32;
    let (tiles_x, tiles_y) = (w / tile, h / tile);
    if w == 0
        || h == 0
        || w % tile != 0
        || h % tile != 0
        || tiles_x > TILE_GRID_WIDTH as u32
        || tiles_y > TILE_GRID_HEIGHT as u32
    {
        return Err(ConvertError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    Ok((tiles_x, tiles_y))
}

/// Convert a whole image into fresh tile and palette tables.
pub fn convert(image: &RgbaImage) -> Result<Conversion, ConvertError> {
    let (tiles_x, tiles_y) = check_dimensions(image)?;

    let mut tiles = [Tile::EMPTY; TILE_COUNT];
    let mut palettes = [Palette::EMPTY; PALETTE_COUNT];
    let mut next_slot = 0usize;
    let mut assignments = Vec::new();
    let mut report = ConversionReport {
        tiles_x,
        tiles_y,
        ..Default::default()
    };

    for tile_y in 0..tiles_y {
        for tile_x in 0..tiles_x {
            let tile_index = grid_index(tile_x as usize, tile_y as usize);
            let mut analysis = analyze_tile_colors(image, tile_x, tile_y);

            if !analysis.valid {
                log(LogCategory::Convert, LogLevel::Warn, || {
                    format!(
                        "tile {} ({}, {}) has {} colors, maximum is {}; skipped",
                        tile_index,
                        tile_x,
                        tile_y,
                        analysis.colors.len(),
                        PALETTE_SIZE
                    )
                });
                report.invalid_tiles.push(InvalidTile {
                    tile_index,
                    distinct_colors: analysis.colors.len(),
                });
                continue;
            }

            let palette = find_or_create_palette(&analysis.colors, &mut palettes, &mut next_slot);
            analysis.palette_slot = Some(palette.index());
            match palette {
                PaletteMatch::Fallback => {
                    log(LogCategory::Convert, LogLevel::Warn, || {
                        format!("out of palette slots for tile {}; using palette 0", tile_index)
                    });
                    report.palette_fallbacks.push(tile_index);
                }
                PaletteMatch::Reused(i) => log(LogCategory::Convert, LogLevel::Debug, || {
                    format!("tile {} reuses palette {}", tile_index, i)
                }),
                PaletteMatch::Created(i) => log(LogCategory::Convert, LogLevel::Debug, || {
                    format!("tile {} creates palette {}", tile_index, i)
                }),
            }

            let tile = &mut tiles[tile_index];
            for y in 0..TILE_SIZE {
                for x in 0..TILE_SIZE {
                    let Some(pixel) = image.pixel(tile_x * 8 + x as u32, tile_y * 8 + y as u32)
                    else {
                        continue;
                    };
                    tile.set_pixel(x, y, rgba_to_color_index(pixel, &analysis));
                }
            }

            assignments.push(TileAssignment {
                tile_index,
                palette,
            });
            report.tiles_converted += 1;
        }
    }

    report.palettes_used = next_slot;
    log(LogCategory::Convert, LogLevel::Info, || {
        format!(
            "converted {} of {} tiles using {} palettes",
            report.tiles_converted,
            report.total_tiles(),
            report.palettes_used
        )
    });

    Ok(Conversion {
        tiles,
        palettes,
        assignments,
        report,
    })
}
