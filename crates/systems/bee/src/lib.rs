//! Bee platformer running on the tile/sprite PPU.
//!
//! The game rebuilds the whole PPU state on every frame: background pattern,
//! wood cells and every hardware sprite. Assets come from the tile/palette
//! file named in [`GameConfig`], with procedurally painted tiles as the
//! fallback when that file can't be loaded.

mod config;
mod fallback;
mod input;
mod level;

pub use config::GameConfig;
pub use input::{
    Button, Buttons, BUTTON_ACTION, BUTTON_DOWN, BUTTON_LEFT, BUTTON_RESTART, BUTTON_RIGHT,
    BUTTON_UP,
};
pub use level::{Collectible, CollectibleKind, Enemy, Level, PatrolPath, Vec2, LEVEL_MAP};

use ppu_core::animation::SpriteAnimator;
use ppu_core::assets;
use ppu_core::logging::{log, LogCategory, LogLevel};
use ppu_core::ppu::{
    pack_background_cell, BackgroundPosition, Color, Ppu, BACKGROUND_HEIGHT, BACKGROUND_WIDTH,
};
use ppu_core::renderer::{PpuRenderer, SoftwarePpuRenderer};
use ppu_core::sprites::draw::FLIP_SCRATCH_LEN;
use ppu_core::sprites::{FlipScratch, IVec2, SpriteError, SpriteId, SpriteLayer, Sprites};
use ppu_core::types::Frame;
use ppu_core::System;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Fixed simulation step used by [`System::step_frame`].
pub const TICK: f32 = 1.0 / 60.0;

const BACKDROP: Color = Color::rgb(0x10, 0x20, 0x30);

/// Background wall tiles, indexed `[y % 4][x % 4]`.
pub(crate) const WINDOW_PATTERN: [[u8; 4]; 4] = [
    [4, 5, 6, 7],
    [20, 21, 22, 23],
    [36, 37, 38, 39],
    [52, 53, 54, 55],
];
const WINDOW_PALETTE: u8 = 1;
pub(crate) const WOOD_TILE: u8 = 24;
const WOOD_PALETTE: u8 = 4;

/// First tile of each 9-tile game over text row.
pub(crate) const GAME_OVER_LOWER_TILES: usize = 64;
pub(crate) const GAME_OVER_UPPER_TILES: usize = 80;
const GAME_OVER_TEXT_LEN: usize = 9;
const GAME_OVER_COL: usize = 12;
const GAME_OVER_ROW: usize = 15;
const GAME_OVER_LOWER_PALETTE: u8 = 7;
const GAME_OVER_UPPER_PALETTE: u8 = 5;

const PLAYER_SIZE: Vec2 = Vec2::new(16.0, 16.0);
const PLAYER_MIN: Vec2 = Vec2::new(4.0, 4.0);
const PLAYER_MAX: Vec2 = Vec2::new(252.0, 236.0);
const CONTACT_DISTANCE: f32 = 8.0;
const POT_REACH: f32 = 16.0;
const FLOWER_OFFSET: Vec2 = Vec2::new(0.0, 7.0);
const FLOWER_SPACING: f32 = 4.0;

const HEALTH_X: i32 = 240;
const HEALTH_Y: i32 = 232;
const HEALTH_SPACING: i32 = 12;

/// Sprites a custom sheet has to provide.
pub const REQUIRED_SPRITES: [&str; 5] = ["player", "enemy", "heart", "pot", "flower"];

#[derive(Debug, Error)]
pub enum BeeError {
    #[error("Sprite error: {0}")]
    Sprites(#[from] SpriteError),
    #[error("Sprite sheet has no '{0}' sprite")]
    MissingSprite(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// The built-in sprite set, laid out for the standard tileset.
pub fn builtin_sprites() -> Result<Sprites, BeeError> {
    let mut sprites = Sprites::new();
    let player = sprites.create_multi_tile_sprite("player", &[0, 1, 16, 17], 0, IVec2::new(2, 2));
    sprites.set_frame_count(player, 2)?;
    sprites.create_simple_sprite("enemy", fallback::ENEMY_TILE, 5);
    sprites.create_simple_sprite("heart", fallback::HEART_TILE, 0);
    sprites.create_simple_sprite("wood", WOOD_TILE, WOOD_PALETTE);
    sprites.create_simple_sprite("pot", fallback::POT_TILE, 6);
    sprites.create_simple_sprite("flower", fallback::FLOWER_TILE, 0);
    Ok(sprites)
}

/// Ids the draw pass needs every frame.
#[derive(Debug, Clone, Copy)]
struct SpriteIds {
    player: SpriteId,
    enemy: SpriteId,
    heart: SpriteId,
}

impl SpriteIds {
    fn resolve(sprites: &Sprites) -> Result<Self, BeeError> {
        let id = |name: &str| {
            sprites
                .lookup(name)
                .ok_or_else(|| BeeError::MissingSprite(name.to_string()))
        };
        for name in REQUIRED_SPRITES {
            id(name)?;
        }
        Ok(Self {
            player: id("player")?,
            enemy: id("enemy")?,
            heart: id("heart")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub position: Vec2,
    pub facing_right: bool,
    pub animator: SpriteAnimator,
}

/// Everything that changes during play. This is what save states hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GameState {
    player: Player,
    enemies: Vec<Enemy>,
    collectibles: Vec<Collectible>,
    health: i32,
    invulnerability: f32,
    game_over: bool,
    ticks: u64,
}

impl GameState {
    fn start(config: &GameConfig, level: &Level, ids: SpriteIds) -> Self {
        let player_animator = SpriteAnimator::new(ids.player, config.player_frame_time);
        let enemies = level
            .enemy_spawns
            .iter()
            .map(|&(position, path)| {
                Enemy::new(
                    position,
                    path,
                    SpriteAnimator::new(ids.enemy, config.enemy_frame_time),
                )
            })
            .collect();

        Self {
            player: Player {
                position: Vec2::ZERO,
                facing_right: false,
                animator: player_animator,
            },
            enemies,
            collectibles: level.collectibles.clone(),
            health: config.starting_health,
            invulnerability: 0.0,
            game_over: false,
            ticks: 0,
        }
    }

    fn move_player(&mut self, elapsed: f32, buttons: &Buttons, level: &Level, speed: f32) {
        let (dx, dy) = buttons.direction();
        let direction = Vec2::new(dx, dy);
        if direction.length() > 0.0 {
            let direction = direction.normalized();
            let next = self.player.position + direction * (speed * elapsed);

            if direction.x > 0.0 {
                self.player.facing_right = true;
            } else if direction.x < 0.0 {
                self.player.facing_right = false;
            }

            if !level.collides(next, PLAYER_SIZE) {
                self.player.position = next;
            }
        }

        let p = &mut self.player.position;
        p.x = p.x.clamp(PLAYER_MIN.x, PLAYER_MAX.x);
        p.y = p.y.clamp(PLAYER_MIN.y, PLAYER_MAX.y);
    }

    fn check_enemy_contact(&mut self, config: &GameConfig) {
        if self.invulnerability > 0.0 {
            return;
        }
        let player = self.player.position;
        let hit = self
            .enemies
            .iter()
            .any(|e| e.active && player.distance(e.position) <= CONTACT_DISTANCE);
        if !hit {
            return;
        }

        self.health -= 1;
        self.invulnerability = config.invulnerability_time;
        log(LogCategory::Game, LogLevel::Info, || {
            format!("Player hit, health {}", self.health.max(0))
        });
        if self.health <= 0 {
            self.health = 0;
            self.game_over = true;
            log(LogCategory::Game, LogLevel::Info, || {
                format!("Game over after {} ticks", self.ticks)
            });
        }
    }

    /// Grow a flower above the first pot in reach, unless one is already there.
    fn interact_with_pot(&mut self) {
        let player = self.player.position;
        let Some(pot) = self.collectibles.iter().find(|c| {
            c.kind == CollectibleKind::Pot
                && !c.collected
                && player.distance(c.position) <= POT_REACH
        }) else {
            return;
        };

        let spot = pot.position + FLOWER_OFFSET;
        let occupied = self
            .collectibles
            .iter()
            .any(|c| c.kind == CollectibleKind::Flower && c.position.distance(spot) < FLOWER_SPACING);
        if !occupied {
            log(LogCategory::Game, LogLevel::Debug, || {
                format!("Flower grown at ({}, {})", spot.x, spot.y)
            });
            self.collectibles
                .push(Collectible::new(CollectibleKind::Flower, spot));
        }
    }

    /// Hearts placed in the level restore health up to the starting amount.
    fn collect_hearts(&mut self, max_health: i32) {
        let player = self.player.position;
        for heart in self.collectibles.iter_mut().filter(|c| {
            c.kind == CollectibleKind::Heart && !c.collected
        }) {
            if self.health >= max_health {
                break;
            }
            if player.distance(heart.position) <= CONTACT_DISTANCE {
                heart.collected = true;
                self.health += 1;
            }
        }
    }
}

pub struct BeeGame {
    config: GameConfig,
    ppu: Ppu,
    sprites: Sprites,
    ids: SpriteIds,
    layer: SpriteLayer,
    renderer: SoftwarePpuRenderer,
    level: Level,
    state: GameState,
    buttons: Buttons,
    fallback_assets: bool,
}

impl BeeGame {
    pub fn new(config: GameConfig) -> Result<Self, BeeError> {
        Self::with_level(config, &LEVEL_MAP)
    }

    /// Start on a custom ASCII map (top row first).
    pub fn with_level(config: GameConfig, map: &[&str]) -> Result<Self, BeeError> {
        let mut ppu = Ppu::new();
        let loaded = assets::load_assets(
            &config.asset_path,
            &mut ppu.tile_table,
            &mut ppu.palette_table,
        );
        if !loaded {
            log(LogCategory::Game, LogLevel::Warn, || {
                format!(
                    "Using built-in tiles; {} could not be loaded",
                    config.asset_path.display()
                )
            });
            fallback::install(&mut ppu);
        }

        let sprites = match &config.sprite_sheet {
            Some(path) => match Sprites::load(path) {
                Ok(sprites) => sprites,
                Err(e) => {
                    log(LogCategory::Game, LogLevel::Warn, || {
                        format!(
                            "Using built-in sprites; {} could not be loaded: {}",
                            path.display(),
                            e
                        )
                    });
                    builtin_sprites()?
                }
            },
            None => builtin_sprites()?,
        };
        let ids = SpriteIds::resolve(&sprites)?;

        let layer = SpriteLayer::with_scratch(FlipScratch::new(
            config.flip_scratch_base,
            FLIP_SCRATCH_LEN,
        ));
        let level = Level::parse(map);
        let state = GameState::start(&config, &level, ids);
        log(LogCategory::Game, LogLevel::Info, || {
            format!(
                "Level loaded: {} wood cells, {} enemies, {} collectibles",
                level.wood.len(),
                state.enemies.len(),
                state.collectibles.len()
            )
        });

        Ok(Self {
            config,
            ppu,
            sprites,
            ids,
            layer,
            renderer: SoftwarePpuRenderer::new(),
            level,
            state,
            buttons: Buttons::default(),
            fallback_assets: !loaded,
        })
    }

    /// Set the held buttons as a `BUTTON_*` bitmask.
    pub fn set_buttons(&mut self, state: u8) {
        self.buttons.set_state(state);
    }

    pub fn restart(&mut self) {
        self.state = GameState::start(&self.config, &self.level, self.ids);
        log(LogCategory::Game, LogLevel::Info, || "Game restarted".to_string());
    }

    pub fn update(&mut self, elapsed: f32) {
        if self.state.game_over {
            if self.buttons.restart.downs > 0 {
                self.restart();
            }
            self.buttons.clear_downs();
            return;
        }

        let state = &mut self.state;
        state.move_player(elapsed, &self.buttons, &self.level, self.config.player_speed);
        state.player.animator.play();
        state.player.animator.update(elapsed, &self.sprites);

        for enemy in state.enemies.iter_mut().filter(|e| e.active) {
            enemy.patrol(elapsed, self.config.enemy_speed);
            enemy.animator.update(elapsed, &self.sprites);
        }

        if state.invulnerability > 0.0 {
            state.invulnerability -= elapsed;
        }
        state.check_enemy_contact(&self.config);

        if self.buttons.action.downs > 0 {
            state.interact_with_pot();
        }
        state.collect_hearts(self.config.starting_health);

        self.buttons.clear_downs();
    }

    /// Rebuild PPU state for the current game state and rasterize it.
    pub fn draw(&mut self) -> Frame {
        self.build_background();
        self.build_sprites();
        if self.state.game_over {
            self.draw_game_over();
        }
        self.renderer.render(&self.ppu);
        self.renderer.take_frame()
    }

    fn build_background(&mut self) {
        let ppu = &mut self.ppu;
        ppu.background_color = BACKDROP;
        ppu.background_position = BackgroundPosition::default();

        for y in 0..BACKGROUND_HEIGHT {
            for x in 0..BACKGROUND_WIDTH {
                let tile = WINDOW_PATTERN[y % 4][x % 4];
                ppu.set_background_cell(x, y, pack_background_cell(tile, WINDOW_PALETTE));
            }
        }

        let wood = pack_background_cell(WOOD_TILE, WOOD_PALETTE);
        for &(x, y) in &self.level.wood {
            if x >= 0 && y >= 0 {
                ppu.set_background_cell(x as usize, y as usize, wood);
            }
        }
    }

    fn build_sprites(&mut self) {
        let ppu = &mut self.ppu;
        let sprites = &self.sprites;
        let layer = &mut self.layer;
        let state = &self.state;
        layer.begin_frame(ppu);

        let player = &state.player;
        layer.draw(
            ppu,
            sprites,
            self.ids.player,
            player.position.x as i32,
            player.position.y as i32,
            player.animator.current_frame(sprites),
            player.facing_right,
        );

        for enemy in state.enemies.iter().filter(|e| e.active) {
            layer.draw(
                ppu,
                sprites,
                self.ids.enemy,
                enemy.position.x as i32,
                enemy.position.y as i32,
                enemy.animator.current_frame(sprites),
                false,
            );
        }

        for item in state.collectibles.iter().filter(|c| !c.collected) {
            let Some(id) = sprites.lookup(item.kind.sprite_name()) else {
                continue;
            };
            layer.draw(
                ppu,
                sprites,
                id,
                item.position.x as i32,
                item.position.y as i32,
                0,
                false,
            );
        }

        for i in 0..state.health.max(0) {
            let x = HEALTH_X - i * HEALTH_SPACING;
            layer.draw(ppu, sprites, self.ids.heart, x, HEALTH_Y, 0, false);
        }
    }

    fn draw_game_over(&mut self) {
        for i in 0..GAME_OVER_TEXT_LEN {
            let x = GAME_OVER_COL + i;
            self.ppu.set_background_cell(
                x,
                GAME_OVER_ROW,
                pack_background_cell((GAME_OVER_LOWER_TILES + i) as u8, GAME_OVER_LOWER_PALETTE),
            );
            self.ppu.set_background_cell(
                x,
                GAME_OVER_ROW + 1,
                pack_background_cell((GAME_OVER_UPPER_TILES + i) as u8, GAME_OVER_UPPER_PALETTE),
            );
        }
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn sprites(&self) -> &Sprites {
        &self.sprites
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn player(&self) -> &Player {
        &self.state.player
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.state.enemies
    }

    pub fn collectibles(&self) -> &[Collectible] {
        &self.state.collectibles
    }

    pub fn health(&self) -> i32 {
        self.state.health
    }

    pub fn is_game_over(&self) -> bool {
        self.state.game_over
    }

    pub fn ticks(&self) -> u64 {
        self.state.ticks
    }

    /// True when the asset file failed to load and built-in tiles are in use.
    pub fn using_fallback_assets(&self) -> bool {
        self.fallback_assets
    }
}

impl System for BeeGame {
    type Error = BeeError;

    fn reset(&mut self) {
        self.buttons = Buttons::default();
        self.restart();
    }

    fn step_frame(&mut self) -> Result<Frame, Self::Error> {
        self.update(TICK);
        self.state.ticks += 1;
        Ok(self.draw())
    }

    fn save_state(&self) -> Value {
        let state = serde_json::to_value(&self.state).unwrap_or_else(|e| {
            log(LogCategory::Game, LogLevel::Error, || {
                format!("Failed to serialize game state: {}", e)
            });
            Value::Null
        });
        serde_json::json!({ "system": "bee", "version": 1, "state": state })
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        use serde::de::Error as _;

        if v["system"] != "bee" {
            return Err(serde_json::Error::custom("save state is not from this game"));
        }
        self.state = serde_json::from_value(v["state"].clone())?;
        self.buttons = Buttons::default();
        Ok(())
    }

    fn supports_save_states(&self) -> bool {
        true
    }
}
