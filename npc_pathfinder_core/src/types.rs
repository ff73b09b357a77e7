// Core types shared across the pathfinder.
//
// Defines column addressing (`Layer`, `ColumnCoord`, `ColumnId`), the four
// planar `Direction`s in their fixed expansion order, and the per-column
// state enums used by the rise scan (`RisingState`) and the debug
// visualization (`VisualState`). All types derive `Serialize` and
// `Deserialize` so configs and debug snapshots can be dumped as JSON.
//
// The coordinate system matches the host engine:
// - X: right (positive) / left (negative)
// - Y: up    (positive) / down (negative)
// - Z: front (positive) / back (negative)
// Columns sit on integer (x, z) positions centered on the footprint origin.
//
// See also: `grid.rs` for the column storage these types index into,
// `search.rs` for the frontier search that walks `Direction`s in order.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A continuous world-space position `[x, y, z]`.
pub type WorldPos = [f32; 3];

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// One of the two stacked height bands.
///
/// The ground layer follows the lowest walkable surface; the elevated layer
/// follows a second surface above it (platforms, bridges, upper floors).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layer {
    Ground,
    Elevated,
}

impl Layer {
    pub const ALL: [Layer; 2] = [Layer::Ground, Layer::Elevated];

    /// Storage index: ground = 0, elevated = 1.
    pub fn index(self) -> usize {
        match self {
            Layer::Ground => 0,
            Layer::Elevated => 1,
        }
    }

    /// Host-facing layer number: ground = 1, elevated = 2.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Inverse of `number()`. Returns `None` for anything but 1 or 2.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Layer::Ground),
            2 => Some(Layer::Elevated),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Ground => write!(f, "ground"),
            Layer::Elevated => write!(f, "elevated"),
        }
    }
}

/// Address of a single column: layer plus centered integer grid position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnCoord {
    pub layer: Layer,
    pub x: i32,
    pub z: i32,
}

impl ColumnCoord {
    pub const fn new(layer: Layer, x: i32, z: i32) -> Self {
        Self { layer, x, z }
    }

    /// Straight-line distance in the x/z plane. Layers are ignored.
    pub fn planar_distance(self, other: Self) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dz = (self.z - other.z) as f32;
        (dx * dx + dz * dz).sqrt()
    }

    /// Manhattan distance in the x/z plane. Layers are ignored.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.z - other.z).unsigned_abs()
    }

    /// The planar neighbor position in `dir`, keeping this layer.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dz) = dir.offset();
        Self::new(self.layer, self.x + dx, self.z + dz)
    }
}

impl fmt::Display for ColumnCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}, {})", self.layer, self.x, self.z)
    }
}

/// Dense index of a column inside `VoxelGrid`. Only meaningful for the grid
/// that produced it; a reconfigured grid invalidates all ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnId(pub u32);

impl ColumnId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The four planar neighbor directions.
///
/// `ALL` is also the order in which the search visits a column's links, so
/// it decides tie-breaks between equally good neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// -X
    Left,
    /// +X
    Right,
    /// -Z
    Back,
    /// +Z
    Front,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Left,
        Direction::Right,
        Direction::Back,
        Direction::Front,
    ];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
            Direction::Back => (0, -1),
            Direction::Front => (0, 1),
        }
    }

    /// Slot in a column's `links` array.
    pub fn index(self) -> usize {
        match self {
            Direction::Left => 0,
            Direction::Right => 1,
            Direction::Back => 2,
            Direction::Front => 3,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Back => Direction::Front,
            Direction::Front => Direction::Back,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-column state
// ---------------------------------------------------------------------------

/// Progress of a column through the rise scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RisingState {
    /// Has not touched solid geometry yet; keeps rising.
    #[default]
    Initial,
    /// Currently overlapping solid geometry; keeps rising.
    Colliding,
    /// Left solid geometry after colliding. Height is frozen on the surface.
    Stopped,
}

impl RisingState {
    /// Whether the builder still advances this column.
    pub fn is_rising(self) -> bool {
        !matches!(self, RisingState::Stopped)
    }
}

/// Named debug-visualization state of a column. This is the only externally
/// visible "format" of the pathfinder; renderers map it to materials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualState {
    #[default]
    Idle,
    Frontier,
    Reached,
    Path,
    Obstacle,
    Start,
    Dest,
}

impl VisualState {
    /// One-character rendering used by text dumps.
    pub fn glyph(self) -> char {
        match self {
            VisualState::Idle => '.',
            VisualState::Frontier => 'o',
            VisualState::Reached => ',',
            VisualState::Path => '*',
            VisualState::Obstacle => '#',
            VisualState::Start => 'S',
            VisualState::Dest => 'D',
        }
    }
}
