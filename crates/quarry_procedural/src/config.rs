//! # Generation and Streaming Configuration
//!
//! Terrain constants and world streaming settings, loadable from TOML.
//! Every field defaults to the shipped world, so partial documents are
//! fine.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Terrain generator constants.
///
/// Changing any of these changes what un-persisted cells regenerate as.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// World seed for coordinate rolls. TOML integers are signed, keep it below `i64::MAX`.
    pub seed: u64,
    /// First row of the Core band separating the two biomes.
    pub level2_start_y: i32,
    /// Rows above this are open sky.
    pub surface_ceiling_y: i32,
    /// This row is always dust.
    pub dust_row_y: i32,
    /// Pocket frequency of the band field.
    pub noise_a: f64,
    /// Diagonal frequency of the band field.
    pub noise_b: f64,
    /// Noise above this carves caves.
    pub cave_threshold: f64,
    /// Noise above this may pool acid (deep biome).
    pub acid_threshold: f64,
    /// Roll below this turns an acid candidate into acid.
    pub acid_roll: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_0000_CAFE,
            level2_start_y: -64,
            surface_ceiling_y: 5,
            dust_row_y: 5,
            noise_a: 0.2,
            noise_b: 0.05,
            cave_threshold: 0.4,
            acid_threshold: 0.35,
            acid_roll: 0.5,
        }
    }
}

/// Chunk streaming and storage settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunks kept active on each side of the player's chunk.
    pub view_radius: i32,
    /// Directory holding chunk files and blobs.
    pub save_dir: PathBuf,
    /// Write chunk files from a background thread.
    pub background_persistence: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            view_radius: 1,
            save_dir: PathBuf::from("saves"),
            background_persistence: false,
        }
    }
}

/// Largest accepted `view_radius`. A radius of 8 keeps 289 chunks active.
pub const MAX_VIEW_RADIUS: i32 = 8;

impl WorldConfig {
    /// Checks the streaming settings.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidConfig` if `view_radius` is negative or
    /// above [`MAX_VIEW_RADIUS`].
    pub fn validate(&self) -> StoreResult<()> {
        if !(0..=MAX_VIEW_RADIUS).contains(&self.view_radius) {
            return Err(StoreError::InvalidConfig(format!(
                "view_radius must be within 0..={MAX_VIEW_RADIUS}, got {}",
                self.view_radius
            )));
        }
        Ok(())
    }

    /// Side length of the active neighbourhood, in chunks.
    #[must_use]
    pub const fn window(&self) -> i32 {
        self.view_radius * 2 + 1
    }
}

/// Parses a TOML document into any of the config structs.
///
/// # Errors
///
/// Returns `StoreError::InvalidConfig` on malformed TOML.
pub fn from_toml_str<T: for<'de> Deserialize<'de>>(source: &str) -> StoreResult<T> {
    toml::from_str(source).map_err(|e| StoreError::InvalidConfig(e.to_string()))
}

/// Loads a TOML file into any of the config structs.
///
/// # Errors
///
/// Returns `StoreError::Io` if the file cannot be read, otherwise as
/// [`from_toml_str`].
pub fn load<T: for<'de> Deserialize<'de>>(path: &Path) -> StoreResult<T> {
    let source = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    from_toml_str(&source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_partial_override() {
        let config: GeneratorConfig = from_toml_str("level2_start_y = -32\nseed = 7").unwrap();
        assert_eq!(config.level2_start_y, -32);
        assert_eq!(config.seed, 7);
        assert!((config.noise_a - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_world_defaults() {
        let config: WorldConfig = from_toml_str("").unwrap();
        assert_eq!(config, WorldConfig::default());
        assert_eq!(config.window(), 3);
    }

    #[test]
    fn test_malformed_toml() {
        let result: StoreResult<WorldConfig> = from_toml_str("view_radius = \"far\"");
        assert!(matches!(result, Err(StoreError::InvalidConfig(_))));
    }

    #[test]
    fn test_view_radius_bounds() {
        assert!(WorldConfig::default().validate().is_ok());
        for view_radius in [-1, MAX_VIEW_RADIUS + 1, i32::MAX] {
            let config = WorldConfig {
                view_radius,
                ..WorldConfig::default()
            };
            assert!(matches!(config.validate(), Err(StoreError::InvalidConfig(_))));
        }
    }
}
