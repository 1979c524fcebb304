//! # Game Configuration
//!
//! One TOML document configures the whole simulation:
//!
//! ```toml
//! recipes = "recipes.toml"      # optional, replaces the built-in table
//!
//! [generator]
//! seed = 1234
//!
//! [world]
//! save_dir = "saves/slot1"
//! background_persistence = true
//!
//! [economy]
//! chest_distinct_limit = 12
//!
//! [items]
//! pickup_radius = 0.75
//!
//! [player]
//! max_mana = 250
//!
//! [mining]
//! copper_drop_chance = 0.9
//! ```
//!
//! Every table and field is optional. Distances are in blocks, times in
//! seconds, speeds in blocks per second.

use std::path::{Path, PathBuf};

use quarry_economy::EconomyConfig;
use quarry_procedural::{GeneratorConfig, WorldConfig};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Dropped-item motion and pickup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemFlowConfig {
    /// Downward acceleration.
    pub gravity: f32,
    /// Horizontal velocity kept per 1/60 s.
    pub horizontal_damping: f32,
    /// Horizontal speed of a thrown item.
    pub throw_speed: f32,
    /// Upward speed of a thrown item.
    pub throw_lift: f32,
    /// Upward speed range of a spawned item.
    pub spawn_lift: (f32, f32),
    /// Maximum sideways speed of a spawned item.
    pub spawn_spread: f32,
    /// Age before an item may be attracted or picked up.
    pub grace_period: f32,
    /// Items closer than this drift toward the player.
    pub attraction_radius: f32,
    /// Acceleration toward the player inside the attraction radius.
    pub attraction_accel: f32,
    /// Items closer than this are picked up.
    pub pickup_radius: f32,
    /// A thrown item slower than this on both axes counts as at rest.
    pub rest_speed: f32,
    /// Side length of an item's collision box.
    pub item_size: f32,
    /// Items alive at once; the oldest are discarded beyond this.
    pub max_items: usize,
}

impl Default for ItemFlowConfig {
    fn default() -> Self {
        Self {
            gravity: 28.0,
            horizontal_damping: 0.95,
            throw_speed: 11.25,
            throw_lift: 4.7,
            spawn_lift: (1.9, 4.7),
            spawn_spread: 1.9,
            grace_period: 0.5,
            attraction_radius: 2.35,
            attraction_accel: 84.0,
            pickup_radius: 0.625,
            rest_speed: 0.47,
            item_size: 0.375,
            max_items: 2048,
        }
    }
}

/// Player vitals and spawn point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Spawn position.
    pub spawn: (f32, f32),
    /// Mana cap.
    pub max_mana: u32,
    /// Health cap.
    pub max_hp: u32,
    /// Mana restored by drinking an acid flask.
    pub acid_flask_mana: u32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            spawn: (0.5, 4.5),
            max_mana: 200,
            max_hp: 100,
            acid_flask_mana: 100,
        }
    }
}

/// Drop chances when breaking terrain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Copper ore yields copper.
    pub copper_drop_chance: f64,
    /// Fragile crystal yields a shard.
    pub shard_drop_chance: f64,
    /// Metal yields scrap.
    pub scrap_drop_chance: f64,
    /// Other rock yields dust.
    pub dust_drop_chance: f64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            copper_drop_chance: 0.7,
            shard_drop_chance: 0.5,
            scrap_drop_chance: 0.8,
            dust_drop_chance: 0.3,
        }
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Terrain constants.
    pub generator: GeneratorConfig,
    /// Streaming and storage.
    pub world: WorldConfig,
    /// Machine balance.
    pub economy: EconomyConfig,
    /// Dropped items.
    pub items: ItemFlowConfig,
    /// Player vitals.
    pub player: PlayerConfig,
    /// Mining drops.
    pub mining: MiningConfig,
    /// Recipe table replacing the built-in one.
    pub recipes: Option<PathBuf>,
    /// Capacity of the effect/event channel.
    pub event_capacity: usize,
}

impl GameConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file. A relative `recipes` path is resolved against the
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if the file cannot be read, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn load(path: &Path) -> SimResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&source)?;
        if let (Some(recipes), Some(dir)) = (&config.recipes, path.parent()) {
            if recipes.is_relative() {
                config.recipes = Some(dir.join(recipes));
            }
        }
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> SimResult<()> {
        self.economy.validate()?;
        self.world.validate()?;
        let items = &self.items;
        if items.pickup_radius > items.attraction_radius {
            return Err(SimError::Config(
                "items.pickup_radius must not exceed items.attraction_radius".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&items.horizontal_damping) {
            return Err(SimError::Config("items.horizontal_damping must be within 0..=1".to_string()));
        }
        if items.spawn_lift.0 > items.spawn_lift.1 {
            return Err(SimError::Config("items.spawn_lift must be (low, high)".to_string()));
        }
        if self.event_capacity == 0 {
            return Err(SimError::Config("event_capacity must be positive".to_string()));
        }
        Ok(())
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            world: WorldConfig::default(),
            economy: EconomyConfig::default(),
            items: ItemFlowConfig::default(),
            player: PlayerConfig::default(),
            mining: MiningConfig::default(),
            recipes: None,
            event_capacity: 1024,
        }
    }
}
