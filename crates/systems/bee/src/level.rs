//! Level layout and the entities it spawns.
//!
//! Maps are ASCII, top row first. Map cells are 8×8 pixels and are flipped
//! into the PPU's lower-left coordinate system while parsing.

use std::collections::HashSet;
use std::ops::{Add, Mul, Sub};

use ppu_core::animation::SpriteAnimator;
use serde::{Deserialize, Serialize};

pub const LEVEL_MAP: [&str; 30] = [
    "................................",
    "................................",
    ".................................",
    "................U...............",
    "................................",
    "...L.....................P......",
    "................U...############",
    "................................",
    ".....L..........................",
    "###......###....................",
    "................................",
    "................................",
    ".P..........U...................",
    "############....................",
    "................................",
    "................................",
    "................................",
    "..U....L.L.L..L.................",
    "................................",
    "...........................P....",
    ".................###############",
    "................................",
    "................................",
    "................................",
    ".......................L........",
    ".P..............................",
    "###############.................",
    "................................",
    "........................P.......",
    ".................###############",
];

const CELL: f32 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction; zero stays zero.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            Self::new(self.x / len, self.y / len)
        } else {
            self
        }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatrolPath {
    Stationary,
    Horizontal,
    Vertical,
}

impl PatrolPath {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'E' => Some(PatrolPath::Stationary),
            'L' => Some(PatrolPath::Horizontal),
            'U' => Some(PatrolPath::Vertical),
            _ => None,
        }
    }

    pub fn direction(self) -> Vec2 {
        match self {
            PatrolPath::Stationary => Vec2::ZERO,
            PatrolPath::Horizontal => Vec2::new(1.0, 0.0),
            PatrolPath::Vertical => Vec2::new(0.0, 1.0),
        }
    }

    /// Length of one leg of the patrol in pixels.
    pub fn distance(self) -> f32 {
        match self {
            PatrolPath::Stationary => 0.0,
            PatrolPath::Horizontal => 32.0,
            PatrolPath::Vertical => 24.0,
        }
    }
}

/// An enemy ping-ponging along its patrol path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    pub position: Vec2,
    pub start: Vec2,
    pub path: PatrolPath,
    pub travelled: f32,
    pub forward: bool,
    pub active: bool,
    pub animator: SpriteAnimator,
}

impl Enemy {
    pub fn new(start: Vec2, path: PatrolPath, animator: SpriteAnimator) -> Self {
        Self {
            position: start,
            start,
            path,
            travelled: 0.0,
            forward: true,
            active: true,
            animator,
        }
    }

    pub fn patrol(&mut self, elapsed: f32, speed: f32) {
        let leg = self.path.distance();
        if leg <= 0.0 {
            return;
        }

        let step = speed * elapsed;
        if self.forward {
            self.travelled += step;
            if self.travelled >= leg {
                self.travelled = leg;
                self.forward = false;
            }
        } else {
            self.travelled -= step;
            if self.travelled <= 0.0 {
                self.travelled = 0.0;
                self.forward = true;
            }
        }
        self.position = self.start + self.path.direction() * self.travelled;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectibleKind {
    Heart,
    Pot,
    Flower,
}

const COLLECTIBLE_SPRITES: [&str; 3] = ["heart", "pot", "flower"];

impl CollectibleKind {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'H' => Some(CollectibleKind::Heart),
            'P' => Some(CollectibleKind::Pot),
            'F' => Some(CollectibleKind::Flower),
            _ => None,
        }
    }

    /// Name of the registered sprite that draws this kind.
    pub fn sprite_name(self) -> &'static str {
        COLLECTIBLE_SPRITES[self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Collectible {
    pub kind: CollectibleKind,
    pub position: Vec2,
    pub collected: bool,
}

impl Collectible {
    pub fn new(kind: CollectibleKind, position: Vec2) -> Self {
        Self {
            kind,
            position,
            collected: false,
        }
    }
}

/// Static layout parsed from a map. Enemies carry no animator binding yet.
#[derive(Debug, Clone, Default)]
pub struct Level {
    /// Wood cells in background tile coordinates
    pub wood: Vec<(i32, i32)>,
    wood_lookup: HashSet<(i32, i32)>,
    pub enemy_spawns: Vec<(Vec2, PatrolPath)>,
    pub collectibles: Vec<Collectible>,
}

impl Level {
    pub fn parse(map: &[&str]) -> Self {
        let mut level = Level::default();
        let rows = map.len() as i32;

        for (row, line) in map.iter().enumerate() {
            let tile_y = rows - 1 - row as i32;
            for (col, c) in line.chars().enumerate() {
                let tile_x = col as i32;
                let pixel = Vec2::new(tile_x as f32 * CELL, tile_y as f32 * CELL);

                if c == '#' {
                    level.wood.push((tile_x, tile_y));
                    level.wood_lookup.insert((tile_x, tile_y));
                } else if let Some(path) = PatrolPath::from_char(c) {
                    level.enemy_spawns.push((pixel, path));
                } else if let Some(kind) = CollectibleKind::from_char(c) {
                    level.collectibles.push(Collectible::new(kind, pixel));
                }
            }
        }
        level
    }

    pub fn is_wood(&self, tile_x: i32, tile_y: i32) -> bool {
        self.wood_lookup.contains(&(tile_x, tile_y))
    }

    /// True when a `size` box at `position` overlaps any wood cell.
    pub fn collides(&self, position: Vec2, size: Vec2) -> bool {
        let left = (position.x / CELL) as i32;
        let right = ((position.x + size.x - 1.0) / CELL) as i32;
        let bottom = (position.y / CELL) as i32;
        let top = ((position.y + size.y - 1.0) / CELL) as i32;

        (bottom..=top).any(|y| (left..=right).any(|x| self.is_wood(x, y)))
    }
}
