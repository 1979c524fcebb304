//! # Terrain Generator
//!
//! Pure function from world coordinate to block type.
//!
//! ## Layout
//!
//! ```text
//!   y > surface ceiling        sky (empty)
//!   y == dust row              dust
//!   ... surface biome ...      fragile / bouncy / hazard / copper / metal / dust / quantum
//!   level2 .. level2+2         Core band
//!   ... deep biome ...         acid / monolith / uranium / shroom / biomass / geyser / spikes / titanium / slate
//! ```
//!
//! A hand-built sanctuary around the origin overrides everything.
//!
//! ## Priority
//!
//! Checks run in a fixed order and the first hit wins. The probability
//! bands are cumulative, so reordering them changes the world.

use crate::block::BlockType;
use crate::config::GeneratorConfig;
use crate::noise::{band_noise, coordinate_roll, WorldSeed};

/// Identifies the generation algorithm. Bump when output changes for any
/// coordinate, so old saves can be recognized.
pub const GENERATOR_VERSION: u32 = 1;

/// Spawn sanctuary bounds (inclusive).
const SANCTUARY_X: (i32, i32) = (-7, 7);
const SANCTUARY_Y: (i32, i32) = (1, 9);
/// Core floor inside the sanctuary (inclusive).
const SANCTUARY_FLOOR_X: (i32, i32) = (-5, 5);
const SANCTUARY_FLOOR_Y: (i32, i32) = (1, 2);
/// Row holding the starter machines.
const SANCTUARY_DEVICE_ROW: i32 = 3;
const SANCTUARY_DEVICES: [(i32, BlockType); 4] = [
    (0, BlockType::Extractor),
    (-2, BlockType::Teleporter),
    (2, BlockType::Press),
    (4, BlockType::Assembler),
];

/// Deep biome cumulative roll bands, in priority order.
const DEEP_BANDS: [(f64, BlockType); 7] = [
    (0.02, BlockType::Monolith),
    (0.04, BlockType::UraniumOre),
    (0.06, BlockType::Shroom),
    (0.10, BlockType::Biomass),
    (0.14, BlockType::Geyser),
    (0.18, BlockType::Spikes),
    (0.25, BlockType::TitaniumOre),
];

/// Surface biome cumulative roll bands, in priority order.
const SURFACE_BANDS: [(f64, BlockType); 6] = [
    (0.05, BlockType::Fragile),
    (0.08, BlockType::Bouncy),
    (0.12, BlockType::Hazard),
    (0.17, BlockType::CopperOre),
    (0.25, BlockType::Metal),
    (0.40, BlockType::Dust),
];

/// Region of the world a coordinate falls in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Biome {
    /// Hand-built spawn area.
    Sanctuary,
    /// Open air above the surface.
    Sky,
    /// Shallow biome, between the Core band and the sky.
    Surface,
    /// The Core band itself.
    Boundary,
    /// Level-2 biome below the Core band.
    Deep,
}

impl Biome {
    /// Classifies a coordinate.
    #[must_use]
    pub fn at(config: &GeneratorConfig, x: i32, y: i32) -> Self {
        if in_range(x, SANCTUARY_X) && in_range(y, SANCTUARY_Y) {
            Self::Sanctuary
        } else if in_range(y, (config.level2_start_y, config.level2_start_y + 2)) {
            Self::Boundary
        } else if y < config.level2_start_y {
            Self::Deep
        } else if y > config.surface_ceiling_y {
            Self::Sky
        } else {
            Self::Surface
        }
    }
}

#[inline]
const fn in_range(v: i32, (lo, hi): (i32, i32)) -> bool {
    lo <= v && v <= hi
}

fn pick(roll: f64, bands: &[(f64, BlockType)], fallback: BlockType) -> BlockType {
    bands
        .iter()
        .find(|&&(limit, _)| roll < limit)
        .map_or(fallback, |&(_, block)| block)
}

/// Deterministic terrain generator.
#[derive(Clone, Debug)]
pub struct TerrainGenerator {
    config: GeneratorConfig,
    seed: WorldSeed,
}

impl TerrainGenerator {
    /// Creates a generator from its constants.
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let seed = WorldSeed::new(config.seed);
        Self { config, seed }
    }

    /// The constants in use.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The world seed.
    #[must_use]
    pub const fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Block type at a world coordinate.
    #[must_use]
    pub fn generate(&self, x: i32, y: i32) -> BlockType {
        let c = &self.config;
        match Biome::at(c, x, y) {
            Biome::Sanctuary => Self::sanctuary(x, y),
            Biome::Boundary => BlockType::Core,
            Biome::Deep => {
                let noise = band_noise(x, y, c.noise_a, c.noise_b);
                if noise > c.cave_threshold {
                    return BlockType::Empty;
                }
                let roll = coordinate_roll(self.seed, x, y);
                if noise > c.acid_threshold && roll < c.acid_roll {
                    return BlockType::Acid;
                }
                pick(roll, &DEEP_BANDS, BlockType::DeepSlate)
            }
            Biome::Sky => BlockType::Empty,
            Biome::Surface => {
                if y == c.dust_row_y {
                    return BlockType::Dust;
                }
                if band_noise(x, y, c.noise_a, c.noise_b) > c.cave_threshold {
                    return BlockType::Empty;
                }
                pick(coordinate_roll(self.seed, x, y), &SURFACE_BANDS, BlockType::Quantum)
            }
        }
    }

    fn sanctuary(x: i32, y: i32) -> BlockType {
        if in_range(x, SANCTUARY_FLOOR_X) && in_range(y, SANCTUARY_FLOOR_Y) {
            return BlockType::Core;
        }
        if y == SANCTUARY_DEVICE_ROW {
            if let Some(&(_, device)) = SANCTUARY_DEVICES.iter().find(|(dx, _)| *dx == x) {
                return device;
            }
        }
        BlockType::Empty
    }
}

impl Default for TerrainGenerator {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}
