//! Core primitives for a fixed-function tile/sprite picture processor.
//!
//! The crate covers the whole graphics path: the hardware data model
//! ([`ppu`]), build-time asset conversion and the chunked asset file format
//! ([`assets`]), logical multi-tile sprites layered on the hardware sprite
//! slots ([`sprites`], [`animation`]) and the software rasterizer
//! ([`renderer`]).

pub mod animation;
pub mod assets;
pub mod graphics;
pub mod logging;
pub mod ppu;
pub mod renderer;
pub mod sprites;
pub mod types {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; (width * height) as usize],
            }
        }

        /// Pixel at (x, y) with y = 0 on the top row, or `None` outside the frame.
        pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
            if x >= self.width || y >= self.height {
                return None;
            }
            self.pixels.get((y * self.width + x) as usize).copied()
        }
    }
}

use serde_json::Value;

/// A frame-stepped system driven by the PPU: one update pass followed by one
/// draw pass per call to [`System::step_frame`].
pub trait System {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reset to the initial state
    fn reset(&mut self);

    /// Advance one tick and return the rasterized frame.
    fn step_frame(&mut self) -> Result<types::Frame, Self::Error>;

    /// Return a JSON-serializable snapshot of the mutable game state.
    /// Tile and palette tables are not included; they come from the asset file.
    fn save_state(&self) -> Value;

    /// Restore a snapshot produced by [`System::save_state`].
    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error>;

    /// Check if this system supports save/load state functionality
    fn supports_save_states(&self) -> bool {
        false
    }
}
