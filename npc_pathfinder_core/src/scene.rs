// Static axis-aligned box scene.
//
// A minimal `CollisionOracle` for headless use: the world is a list of
// solid axis-aligned boxes, and an overlap query is a box/box separating
// axis test. Orientation is ignored (every probe the pathfinder issues is
// axis-aligned). Boxes that merely touch do not overlap, so a probe resting
// exactly on a floor's top face reads as clear.
//
// Used by the demo binary, the integration scenarios and the bench. Hosts
// with a real physics engine implement `CollisionOracle` themselves.
//
// See also: `probe.rs` for the trait, `builder.rs` for the rise scan that
// issues the queries.

use crate::error::OracleError;
use crate::probe::CollisionOracle;
use crate::types::WorldPos;
use serde::{Deserialize, Serialize};

/// A solid axis-aligned box given by its min and max corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolidBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl SolidBox {
    /// Build from two opposite corners in any order.
    pub fn new(a: [f32; 3], b: [f32; 3]) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1]), a[2].min(b[2])],
            max: [a[0].max(b[0]), a[1].max(b[1]), a[2].max(b[2])],
        }
    }

    /// Build from a center and half extents.
    pub fn centered(center: WorldPos, half_extents: [f32; 3]) -> Self {
        Self {
            min: [
                center[0] - half_extents[0],
                center[1] - half_extents[1],
                center[2] - half_extents[2],
            ],
            max: [
                center[0] + half_extents[0],
                center[1] + half_extents[1],
                center[2] + half_extents[2],
            ],
        }
    }

    /// Strict overlap: shared faces do not count.
    pub fn overlaps(&self, other: &SolidBox) -> bool {
        (0..3).all(|axis| self.min[axis] < other.max[axis] && other.min[axis] < self.max[axis])
    }
}

/// A collection of solid boxes answering overlap queries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticScene {
    pub solids: Vec<SolidBox>,
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a floor slab whose top face is at `top`, spanning
    /// `[-extent, extent]` in X and Z and one unit thick.
    pub fn with_floor(mut self, top: f32, extent: f32) -> Self {
        self.solids.push(SolidBox::new(
            [-extent, top - 1.0, -extent],
            [extent, top, extent],
        ));
        self
    }

    /// Add a solid box spanning the two corners.
    pub fn with_box(mut self, a: [f32; 3], b: [f32; 3]) -> Self {
        self.solids.push(SolidBox::new(a, b));
        self
    }

    /// Highest top face among solids overlapping the vertical line at
    /// `(x, z)`, or `None` if nothing is there.
    pub fn top_at(&self, x: f32, z: f32) -> Option<f32> {
        self.solids
            .iter()
            .filter(|s| s.min[0] < x && x < s.max[0] && s.min[2] < z && z < s.max[2])
            .map(|s| s.max[1])
            .max_by(|a, b| a.total_cmp(b))
    }
}

impl CollisionOracle for StaticScene {
    fn overlap_box(
        &self,
        half_extents: [f32; 3],
        position: WorldPos,
        _orientation: [f32; 4],
    ) -> Result<bool, OracleError> {
        let probe = SolidBox::centered(position, half_extents);
        Ok(self.solids.iter().any(|s| s.overlaps(&probe)))
    }
}
