//! Game settings, stored as JSON. Missing fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use ppu_core::logging::{log, LogCategory, LogLevel};
use ppu_core::sprites::draw::FLIP_SCRATCH_BASE;
use serde::{Deserialize, Serialize};

use crate::BeeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Tile/palette asset file produced by `asset_builder`
    pub asset_path: PathBuf,
    /// Optional sprite sheet JSON replacing the built-in sprite set
    pub sprite_sheet: Option<PathBuf>,
    pub player_frame_time: f32,
    pub enemy_frame_time: f32,
    /// Pixels per second
    pub player_speed: f32,
    pub enemy_speed: f32,
    pub starting_health: i32,
    /// Seconds of immunity after taking a hit
    pub invulnerability_time: f32,
    /// First tile of the horizontal-flip scratch region
    pub flip_scratch_base: u8,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            asset_path: PathBuf::from("assets/tileset.dat"),
            sprite_sheet: None,
            player_frame_time: 0.2,
            enemy_frame_time: 0.3,
            player_speed: 60.0,
            enemy_speed: 30.0,
            starting_health: 3,
            invulnerability_time: 1.0,
            flip_scratch_base: FLIP_SCRATCH_BASE,
        }
    }
}

impl GameConfig {
    /// Load from `path`, falling back to defaults when the file is missing or
    /// does not parse.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log(LogCategory::Game, LogLevel::Warn, || {
                    format!("Could not read config {}: {}. Using defaults.", path.display(), e)
                });
                return Self::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                log(LogCategory::Game, LogLevel::Warn, || {
                    format!("Failed to parse config {}: {}. Using defaults.", path.display(), e)
                });
                Self::default()
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), BeeError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
