use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use ppu_cli::png_io;
use ppu_core::assets::{self, convert};
use ppu_core::ppu::{PALETTE_BYTES, PALETTE_COUNT, TILE_BYTES, TILE_COUNT};
use ppu_core::sprites::draw::{FLIP_SCRATCH_BASE, FLIP_SCRATCH_LEN};

/// Convert a PNG tile sheet into a PPU tile/palette asset file.
#[derive(Parser)]
#[command(name = "asset_builder")]
struct Args {
    /// Source tile sheet: multiples of 8 pixels, at most 16 tiles wide
    input: PathBuf,

    /// Asset file to write
    output: PathBuf,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Send core log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    ppu_cli::init_logging(&args.log_level, args.log_file.as_deref())?;

    let image = png_io::read_png(&args.input)?;
    info!(
        "Loaded {} ({}x{})",
        args.input.display(),
        image.width(),
        image.height()
    );

    let conversion = convert(&image)
        .with_context(|| format!("Cannot convert {}", args.input.display()))?;
    let report = &conversion.report;

    let bytes = assets::save(&conversion.tiles, &conversion.palettes);
    fs::write(&args.output, &bytes)
        .with_context(|| format!("Cannot write {}", args.output.display()))?;

    println!(
        "Converted {} tiles ({}x{} grid) from {}",
        report.tiles_converted,
        report.tiles_x,
        report.tiles_y,
        args.input.display()
    );
    println!(
        "Tiles:    {} entries, {} bytes",
        TILE_COUNT,
        TILE_COUNT * TILE_BYTES
    );
    println!(
        "Palettes: {} of {} used, {} bytes",
        report.palettes_used,
        PALETTE_COUNT,
        PALETTE_COUNT * PALETTE_BYTES
    );
    println!("Wrote {} ({} bytes)", args.output.display(), bytes.len());

    for invalid in &report.invalid_tiles {
        println!(
            "Tile {} has {} colors (max 4) and was left blank",
            invalid.tile_index, invalid.distinct_colors
        );
    }
    let scratch = FLIP_SCRATCH_BASE as usize..FLIP_SCRATCH_BASE as usize + FLIP_SCRATCH_LEN;
    let reserved: Vec<usize> = conversion
        .assignments
        .iter()
        .map(|a| a.tile_index)
        .filter(|i| scratch.contains(i) && !conversion.tiles[*i].is_empty())
        .collect();
    if !reserved.is_empty() {
        println!(
            "Tiles {}..={} are reserved for flipped sprites; {:?} will be overwritten at runtime",
            scratch.start,
            scratch.end - 1,
            reserved
        );
    }
    if !report.palette_fallbacks.is_empty() {
        println!(
            "{} tile(s) fell back to palette 0: {:?}",
            report.palette_fallbacks.len(),
            report.palette_fallbacks
        );
    }

    Ok(())
}
