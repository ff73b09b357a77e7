// Collision oracle boundary and the per-column box probe.
//
// The pathfinder never talks to a physics engine directly. Everything it
// needs is one question: "does a box of these half extents at this pose
// overlap solid geometry?" That question is the `CollisionOracle` trait.
// Hosts implement it over their physics scene; tests and the demo use
// `StaticScene` (see `scene.rs`).
//
// `VoxelProbe` fixes the box shape from the config (half width in X/Z, half
// the voxel height in Y, identity orientation) and counts queries, so a
// frame's probing cost is observable.
//
// Oracle failures are hard failures: they propagate to the caller of
// `tick()` and are never retried here.

use crate::config::PathFinderConfig;
use crate::error::OracleError;
use crate::types::WorldPos;
use std::cell::Cell;

/// Identity rotation as an `[x, y, z, w]` quaternion.
pub const IDENTITY_ORIENTATION: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// External overlap query against the world simulation.
pub trait CollisionOracle {
    /// `true` if a box with the given half extents, centered at `position`
    /// and rotated by `orientation` (`[x, y, z, w]`), intersects any solid
    /// static or dynamic geometry.
    fn overlap_box(
        &self,
        half_extents: [f32; 3],
        position: WorldPos,
        orientation: [f32; 4],
    ) -> Result<bool, OracleError>;
}

impl<O: CollisionOracle + ?Sized> CollisionOracle for &O {
    fn overlap_box(
        &self,
        half_extents: [f32; 3],
        position: WorldPos,
        orientation: [f32; 4],
    ) -> Result<bool, OracleError> {
        (**self).overlap_box(half_extents, position, orientation)
    }
}

impl<O: CollisionOracle + ?Sized> CollisionOracle for Box<O> {
    fn overlap_box(
        &self,
        half_extents: [f32; 3],
        position: WorldPos,
        orientation: [f32; 4],
    ) -> Result<bool, OracleError> {
        (**self).overlap_box(half_extents, position, orientation)
    }
}

/// Fixed-shape box probe used for every column test.
#[derive(Debug)]
pub struct VoxelProbe {
    half_extents: [f32; 3],
    queries: Cell<u64>,
}

impl VoxelProbe {
    pub fn new(config: &PathFinderConfig) -> Self {
        Self {
            half_extents: config.probe_half_extents(),
            queries: Cell::new(0),
        }
    }

    pub fn half_extents(&self) -> [f32; 3] {
        self.half_extents
    }

    /// Test whether the probe box centered on column `(x, z)` at height `y`
    /// overlaps solid geometry. Issues exactly one oracle query.
    pub fn overlaps<O: CollisionOracle + ?Sized>(
        &self,
        oracle: &O,
        x: i32,
        y: f32,
        z: i32,
    ) -> Result<bool, OracleError> {
        self.queries.set(self.queries.get() + 1);
        oracle.overlap_box(
            self.half_extents,
            [x as f32, y, z as f32],
            IDENTITY_ORIENTATION,
        )
    }

    /// Total oracle queries issued through this probe.
    pub fn query_count(&self) -> u64 {
        self.queries.get()
    }
}
