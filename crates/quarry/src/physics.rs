//! # QUARRY Physics Seam
//!
//! The simulation does not integrate the player or resolve contacts
//! itself; it asks a collision query which grid cells a box overlaps and
//! acts on the blocks found there.
//!
//! All coordinates are in blocks. Cell `(x, y)` covers
//! `[x, x+1) × [y, y+1)`.

// ============================================================================
// AABB (Axis-Aligned Bounding Box)
// ============================================================================

/// Axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y).
    pub min: [f32; 2],
    /// Maximum corner (x, y).
    pub max: [f32; 2],
}

impl Aabb {
    /// Creates a new box.
    #[must_use]
    pub const fn new(min: [f32; 2], max: [f32; 2]) -> Self {
        Self { min, max }
    }

    /// Creates a box centred at `center`.
    #[must_use]
    pub fn from_center(center: [f32; 2], width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        Self {
            min: [center[0] - hw, center[1] - hh],
            max: [center[0] + hw, center[1] + hh],
        }
    }

    /// The box covering one grid cell.
    #[must_use]
    pub fn from_cell(x: i32, y: i32) -> Self {
        Self {
            min: [x as f32, y as f32],
            max: [(x + 1) as f32, (y + 1) as f32],
        }
    }

    /// Checks if this box intersects another. Touching edges do not count.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min[0] < other.max[0]
            && self.max[0] > other.min[0]
            && self.min[1] < other.max[1]
            && self.max[1] > other.min[1]
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> [f32; 2] {
        [(self.min[0] + self.max[0]) / 2.0, (self.min[1] + self.max[1]) / 2.0]
    }

    /// Moves the box by delta.
    #[must_use]
    pub fn translate(&self, delta: [f32; 2]) -> Self {
        Self {
            min: [self.min[0] + delta[0], self.min[1] + delta[1]],
            max: [self.max[0] + delta[0], self.max[1] + delta[1]],
        }
    }
}

// ============================================================================
// COLLISION QUERY
// ============================================================================

/// Collision capability provided by the physics layer.
pub trait CollisionQuery {
    /// Grid cells the box overlaps, row by row from the bottom.
    fn cells_overlapping(&self, aabb: &Aabb) -> Vec<(i32, i32)>;
}

/// Unit-grid collision: every cell whose square intersects the box.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridCollision;

impl CollisionQuery for GridCollision {
    fn cells_overlapping(&self, aabb: &Aabb) -> Vec<(i32, i32)> {
        let x0 = aabb.min[0].floor() as i32;
        let y0 = aabb.min[1].floor() as i32;
        // A max edge exactly on a grid line does not enter the next cell.
        let x1 = aabb.max[0].ceil() as i32 - 1;
        let y1 = aabb.max[1].ceil() as i32 - 1;
        (y0..=y1)
            .flat_map(|y| (x0..=x1).map(move |x| (x, y)))
            .collect()
    }
}

/// Euclidean distance between two points.
#[inline]
#[must_use]
pub fn distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - b[0]).hypot(a[1] - b[1])
}
