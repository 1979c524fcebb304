//! # Coordinate Noise
//!
//! The two pure sources of variation the terrain generator draws on: a
//! smooth trigonometric band field and a per-coordinate uniform roll.
//!
//! ## Determinism Guarantee
//!
//! Neither function holds state. A roll is derived from the world seed and
//! the coordinate alone: SipHash-1-3 keyed by the seed condenses `(x, y)`
//! into 64 bits, which seed a fresh `ChaCha8Rng` whose first draw is the
//! roll. Querying `(x, y)` twice, in any order, in any process, gives the
//! same value.

use std::hash::Hasher;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use siphasher::sip::SipHasher13;

/// World seed for deterministic generation.
///
/// All procedural generation derives from this seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new world seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Derives a sub-seed for a specific purpose (e.g., terrain rolls).
    ///
    /// Uses a hash function to create independent streams from one seed.
    #[inline]
    #[must_use]
    pub const fn derive(self, purpose: u64) -> Self {
        let mut hash = self.0;
        hash ^= purpose;
        hash = hash.wrapping_mul(0x517c_c1b7_2722_0a95);
        hash ^= hash >> 32;
        Self(hash)
    }
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self(0xDEAD_BEEF_CAFE_BABE)
    }
}

/// Stream id for terrain rolls.
const TERRAIN_STREAM: u64 = 0x7465_7272;

/// Uniform draw in `[0, 1)` owned by a single coordinate.
#[must_use]
pub fn coordinate_roll(seed: WorldSeed, x: i32, y: i32) -> f64 {
    let mut hasher = SipHasher13::new_with_keys(seed.value(), seed.derive(TERRAIN_STREAM).value());
    hasher.write_i32(x);
    hasher.write_i32(y);
    let mut rng = ChaCha8Rng::seed_from_u64(hasher.finish());
    rng.gen::<f64>()
}

/// Smooth band field: `sin(x·a)·cos(y·a) + sin(x·b + y·b)`.
///
/// Ranges over `[-2, 2]`. `a` controls pocket size, `b` the long diagonal
/// bands.
#[inline]
#[must_use]
pub fn band_noise(x: i32, y: i32, a: f64, b: f64) -> f64 {
    let (x, y) = (f64::from(x), f64::from(y));
    (x * a).sin() * (y * a).cos() + (x * b + y * b).sin()
}
