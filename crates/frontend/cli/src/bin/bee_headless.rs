use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use ppu_bee::{
    BeeGame, GameConfig, BUTTON_ACTION, BUTTON_DOWN, BUTTON_LEFT, BUTTON_RESTART, BUTTON_RIGHT,
    BUTTON_UP,
};
use ppu_cli::png_io;
use ppu_core::System;

/// Run the bee game without a window, driven by a scripted input pattern.
#[derive(Parser)]
#[command(name = "bee_headless")]
struct Args {
    /// Tile/palette asset file (overrides the config)
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Sprite sheet JSON (overrides the config)
    #[arg(long)]
    sprites: Option<PathBuf>,

    /// Game config JSON; defaults are used when missing or invalid
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of frames to run
    #[arg(long, default_value_t = 300)]
    frames: u32,

    /// Write the last frame to this PNG
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Dump save-state to this file as JSON
    #[arg(long)]
    save: Option<PathBuf>,

    /// Suppress all per-frame output
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Print per-frame player state and the first pixels of each frame
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Send core log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Buttons held on frame `n`: fly right, then up, then left and down,
/// tapping action every second and restart every five.
fn scripted_input(n: u32) -> u8 {
    let mut buttons = match (n / 120) % 4 {
        0 => BUTTON_RIGHT,
        1 => BUTTON_UP,
        2 => BUTTON_LEFT | BUTTON_UP,
        _ => BUTTON_DOWN,
    };
    if n % 60 == 30 {
        buttons |= BUTTON_ACTION;
    }
    if n % 300 == 299 {
        buttons |= BUTTON_RESTART;
    }
    buttons
}

fn main() -> Result<()> {
    let args = Args::parse();
    ppu_cli::init_logging(&args.log_level, args.log_file.as_deref())?;

    let mut config = match &args.config {
        Some(path) => GameConfig::load(path),
        None => GameConfig::default(),
    };
    if let Some(assets) = &args.assets {
        config.asset_path = assets.clone();
    }
    if let Some(sprites) = &args.sprites {
        config.sprite_sheet = Some(sprites.clone());
    }

    let mut game = BeeGame::new(config).context("Failed to start game")?;
    if game.using_fallback_assets() {
        info!("Running with built-in tiles");
    }

    let mut last_frame = None;
    for fnum in 1..=args.frames {
        game.set_buttons(scripted_input(fnum));
        let frame = game.step_frame()?;

        if !args.quiet && args.debug {
            let player = game.player();
            println!(
                "Frame {}: player ({:.1}, {:.1}) health {}{}",
                fnum,
                player.position.x,
                player.position.y,
                game.health(),
                if game.is_game_over() { " GAME OVER" } else { "" }
            );
            let dump_len = std::cmp::min(8, frame.pixels.len());
            let out: Vec<String> = frame.pixels[..dump_len]
                .iter()
                .map(|p| format!("{:08X}", p))
                .collect();
            debug!("First {} pixels: {}", dump_len, out.join(" "));
        }
        last_frame = Some(frame);
    }

    if !args.quiet {
        println!(
            "Ran {} frames: health {}, {} enemies, {} collectibles{}",
            args.frames,
            game.health(),
            game.enemies().len(),
            game.collectibles().len(),
            if game.is_game_over() { ", game over" } else { "" }
        );
    }

    if let (Some(path), Some(frame)) = (&args.screenshot, &last_frame) {
        png_io::write_frame_png(path, frame)?;
        if !args.quiet {
            println!("Screenshot written to {}", path.display());
        }
    }

    if let Some(path) = &args.save {
        let state = game.save_state();
        let mut f = File::create(path).with_context(|| format!("Cannot create {}", path.display()))?;
        write!(f, "{}", serde_json::to_string_pretty(&state)?)?;
    }

    Ok(())
}
