//! Button state with press-edge counting.

use serde::{Deserialize, Serialize};

pub const BUTTON_LEFT: u8 = 0x01;
pub const BUTTON_RIGHT: u8 = 0x02;
pub const BUTTON_UP: u8 = 0x04;
pub const BUTTON_DOWN: u8 = 0x08;
pub const BUTTON_ACTION: u8 = 0x10;
pub const BUTTON_RESTART: u8 = 0x20;

/// `pressed` is the held state; `downs` counts press edges since the last
/// update consumed them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub pressed: bool,
    pub downs: u8,
}

impl Button {
    pub fn set(&mut self, pressed: bool) {
        if pressed && !self.pressed {
            self.downs = self.downs.saturating_add(1);
        }
        self.pressed = pressed;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons {
    pub left: Button,
    pub right: Button,
    pub up: Button,
    pub down: Button,
    pub action: Button,
    pub restart: Button,
}

impl Buttons {
    /// Apply a full button bitmask (`BUTTON_*`), counting new presses.
    pub fn set_state(&mut self, state: u8) {
        self.left.set(state & BUTTON_LEFT != 0);
        self.right.set(state & BUTTON_RIGHT != 0);
        self.up.set(state & BUTTON_UP != 0);
        self.down.set(state & BUTTON_DOWN != 0);
        self.action.set(state & BUTTON_ACTION != 0);
        self.restart.set(state & BUTTON_RESTART != 0);
    }

    pub fn state(&self) -> u8 {
        let mut state = 0;
        for (button, bit) in [
            (self.left, BUTTON_LEFT),
            (self.right, BUTTON_RIGHT),
            (self.up, BUTTON_UP),
            (self.down, BUTTON_DOWN),
            (self.action, BUTTON_ACTION),
            (self.restart, BUTTON_RESTART),
        ] {
            if button.pressed {
                state |= bit;
            }
        }
        state
    }

    pub fn clear_downs(&mut self) {
        for button in [
            &mut self.left,
            &mut self.right,
            &mut self.up,
            &mut self.down,
            &mut self.action,
            &mut self.restart,
        ] {
            button.downs = 0;
        }
    }

    /// Unnormalized movement direction, +y up.
    pub fn direction(&self) -> (f32, f32) {
        let mut x = 0.0;
        let mut y = 0.0;
        if self.left.pressed {
            x -= 1.0;
        }
        if self.right.pressed {
            x += 1.0;
        }
        if self.down.pressed {
            y -= 1.0;
        }
        if self.up.pressed {
            y += 1.0;
        }
        (x, y)
    }
}
