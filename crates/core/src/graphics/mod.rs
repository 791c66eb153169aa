//! Pixel-level graphics helpers shared by the renderer and the game.

pub mod color;

pub use color::ColorOps;
