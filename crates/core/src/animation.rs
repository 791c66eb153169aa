//! Per-entity animation state.
//!
//! A [`SpriteAnimator`] only stores a [`SpriteId`]; the frame count is looked
//! up in the registry on every update, so rebinding or re-registering a
//! sprite never leaves an animator pointing at stale data.

use serde::{Deserialize, Serialize};

use crate::sprites::{SpriteId, Sprites};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpriteAnimator {
    sprite: Option<SpriteId>,
    /// Seconds per frame
    pub frame_time: f32,
    current_time: f32,
    current_frame: u32,
    pub looping: bool,
    playing: bool,
}

impl Default for SpriteAnimator {
    fn default() -> Self {
        Self {
            sprite: None,
            frame_time: 0.1,
            current_time: 0.0,
            current_frame: 0,
            looping: true,
            playing: true,
        }
    }
}

impl SpriteAnimator {
    pub fn new(sprite: SpriteId, frame_time: f32) -> Self {
        Self {
            sprite: Some(sprite),
            frame_time,
            ..Default::default()
        }
    }

    /// Advance by `elapsed` seconds, at most one frame per call.
    pub fn update(&mut self, elapsed: f32, sprites: &Sprites) {
        if !self.playing {
            return;
        }
        let Some(frame_count) = self
            .sprite
            .and_then(|id| sprites.get(id))
            .map(|s| s.frame_count)
        else {
            return;
        };
        if frame_count <= 1 {
            return;
        }

        self.current_time += elapsed;
        if self.current_time >= self.frame_time {
            self.current_time -= self.frame_time;
            if self.current_frame + 1 >= frame_count {
                if self.looping {
                    self.current_frame = 0;
                }
            } else {
                self.current_frame += 1;
            }
        }
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn reset(&mut self) {
        self.current_time = 0.0;
        self.current_frame = 0;
    }

    /// Bind to another sprite, restarting from frame 0.
    pub fn set_sprite(&mut self, sprite: Option<SpriteId>) {
        self.sprite = sprite;
        self.reset();
    }

    pub fn sprite(&self) -> Option<SpriteId> {
        self.sprite
    }

    /// Current frame, kept within the bound sprite's frame count.
    pub fn current_frame(&self, sprites: &Sprites) -> u32 {
        match self.sprite.and_then(|id| sprites.get(id)) {
            Some(s) if s.frame_count > 0 => self.current_frame % s.frame_count,
            _ => 0,
        }
    }
}
