// Two-layer voxel column grid and its neighbor graph.
//
// The grid owns exactly `width * height` columns per layer, two layers, in a
// single flat `Vec<Column>` indexed by `ColumnId`:
//
//   id = layer_index * width * height + (z + half_height) * width + (x + half_width)
//
// so each layer is a contiguous slice and lookups are O(1). Coordinates are
// centered: x in [-(width-1)/2, (width-1)/2], same for z. Out-of-range
// lookups return `None` rather than panicking.
//
// Columns carry three groups of state with different writers:
// - build state (`y`, `rising_state`): written by `VoxelMapBuilder` only;
// - graph state (`links`, `is_obstacle`): written once by `link_neighbors()`
//   and `mark_obstacles_above()` when the map is finalized;
// - search state (`is_start` .. `prev`, `visual`): cleared by
//   `clear_search_state()` and written by `PathSearch` only.
//
// Links are directed edges, up to one per `Direction`. Each side is chosen
// independently from height comparisons, so A -> B does not imply B -> A.
//
// See also: `builder.rs` which fills in heights, `search.rs` which walks the
// links, `types.rs` for the coordinate and id types.

use crate::types::{ColumnCoord, ColumnId, Direction, Layer, RisingState, VisualState};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A single grid cell's walkable-height record within one layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Column {
    pub coord: ColumnCoord,
    /// Probe-box center height. Rises during the build scan and freezes once
    /// the column is `Stopped`.
    pub y: f32,
    pub rising_state: RisingState,
    pub is_obstacle: bool,
    /// Directed neighbor links, indexed by `Direction::index()`. A link may
    /// point into the other layer.
    pub links: [Option<ColumnId>; 4],

    pub is_start: bool,
    pub is_dest: bool,
    pub is_reached: bool,
    /// Hops from the start. Only meaningful while `is_reached`.
    pub cost_so_far: u32,
    /// `cost_so_far` plus the heuristic to the destination.
    pub priority: f32,
    /// Back-pointer toward the start, set when first reached.
    pub prev: Option<ColumnId>,
    pub visual: VisualState,
}

impl Column {
    fn new(coord: ColumnCoord, y: f32) -> Self {
        Self {
            coord,
            y,
            rising_state: RisingState::Initial,
            is_obstacle: false,
            links: [None; 4],
            is_start: false,
            is_dest: false,
            is_reached: false,
            cost_so_far: 0,
            priority: 0.0,
            prev: None,
            visual: VisualState::Idle,
        }
    }

    /// A column whose surface was found by the scan (or loaded from a
    /// heightmap). Unresolved columns never link and are never linked to.
    pub fn is_resolved(&self) -> bool {
        self.rising_state == RisingState::Stopped
    }

    pub fn link(&self, dir: Direction) -> Option<ColumnId> {
        self.links[dir.index()]
    }

    /// Present links in expansion order.
    pub fn linked_neighbors(&self) -> SmallVec<[(Direction, ColumnId); 4]> {
        Direction::ALL
            .iter()
            .filter_map(|&dir| self.link(dir).map(|id| (dir, id)))
            .collect()
    }

    fn clear_search_state(&mut self) {
        self.is_start = false;
        self.is_dest = false;
        self.is_reached = false;
        self.cost_so_far = 0;
        self.priority = 0.0;
        self.prev = None;
        self.visual = if self.is_obstacle {
            VisualState::Obstacle
        } else {
            VisualState::Idle
        };
    }
}

/// The dense two-layer column container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VoxelGrid {
    columns: Vec<Column>,
    width: u32,
    height: u32,
}

impl VoxelGrid {
    /// Create a grid with every column of both layers at `initial_y`, in the
    /// `Initial` rising state. Even dimensions are bumped to the next odd
    /// number so a center column exists.
    pub fn new(width: u32, height: u32, initial_y: f32) -> Self {
        let width = width | 1;
        let height = height | 1;
        let hw = (width as i32 - 1) / 2;
        let hh = (height as i32 - 1) / 2;
        let mut columns = Vec::with_capacity(2 * (width as usize) * (height as usize));
        for layer in Layer::ALL {
            for z in -hh..=hh {
                for x in -hw..=hw {
                    columns.push(Column::new(ColumnCoord::new(layer, x, z), initial_y));
                }
            }
        }
        Self {
            columns,
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn per_layer(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Total columns across both layers.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Whether `(x, z)` lies inside the footprint.
    pub fn in_bounds(&self, x: i32, z: i32) -> bool {
        let hw = (self.width as i32 - 1) / 2;
        let hh = (self.height as i32 - 1) / 2;
        (-hw..=hw).contains(&x) && (-hh..=hh).contains(&z)
    }

    /// Dense id of a column. Returns `None` outside the footprint.
    pub fn column_id(&self, layer: Layer, x: i32, z: i32) -> Option<ColumnId> {
        if !self.in_bounds(x, z) {
            return None;
        }
        let hw = (self.width as i32 - 1) / 2;
        let hh = (self.height as i32 - 1) / 2;
        let col = (x + hw) as usize;
        let row = (z + hh) as usize;
        let idx = layer.index() * self.per_layer() + row * self.width as usize + col;
        Some(ColumnId(idx as u32))
    }

    pub fn column_id_at(&self, coord: ColumnCoord) -> Option<ColumnId> {
        self.column_id(coord.layer, coord.x, coord.z)
    }

    pub fn get_column(&self, layer: Layer, x: i32, z: i32) -> Option<&Column> {
        self.column_id(layer, x, z).map(|id| self.column(id))
    }

    pub fn get_column_mut(&mut self, layer: Layer, x: i32, z: i32) -> Option<&mut Column> {
        self.column_id(layer, x, z).map(|id| self.column_mut(id))
    }

    /// Get a column by id. Ids come from this grid; a foreign id panics.
    pub fn column(&self, id: ColumnId) -> &Column {
        &self.columns[id.index()]
    }

    pub fn column_mut(&mut self, id: ColumnId) -> &mut Column {
        &mut self.columns[id.index()]
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn layer_columns(&self, layer: Layer) -> &[Column] {
        let n = self.per_layer();
        &self.columns[layer.index() * n..(layer.index() + 1) * n]
    }

    pub fn layer_columns_mut(&mut self, layer: Layer) -> &mut [Column] {
        let n = self.per_layer();
        &mut self.columns[layer.index() * n..(layer.index() + 1) * n]
    }

    /// Overwrite a column's discovered height. Build phase only. Returns
    /// `false` (and does nothing) outside the footprint.
    pub fn set_column_height(&mut self, layer: Layer, x: i32, z: i32, y: f32) -> bool {
        match self.get_column_mut(layer, x, z) {
            Some(column) => {
                column.y = y;
                true
            }
            None => false,
        }
    }

    /// Set a column's height and mark its surface as found.
    pub fn resolve_column(&mut self, layer: Layer, x: i32, z: i32, y: f32) -> bool {
        match self.get_column_mut(layer, x, z) {
            Some(column) => {
                column.y = y;
                column.rising_state = RisingState::Stopped;
                true
            }
            None => false,
        }
    }

    /// Resolve every column of `layer` from a precomputed height function.
    /// Positions where `heights` returns `None` are left untouched.
    pub fn apply_heightmap(&mut self, layer: Layer, heights: impl Fn(i32, i32) -> Option<f32>) {
        for column in self.layer_columns_mut(layer) {
            if let Some(y) = heights(column.coord.x, column.coord.z) {
                column.y = y;
                column.rising_state = RisingState::Stopped;
            }
        }
    }

    /// Flag or unflag a column as impassable. Returns `false` outside the
    /// footprint.
    pub fn set_obstacle(&mut self, layer: Layer, x: i32, z: i32, obstacle: bool) -> bool {
        match self.get_column_mut(layer, x, z) {
            Some(column) => {
                column.is_obstacle = obstacle;
                if !column.is_start && !column.is_dest {
                    column.visual = if obstacle {
                        VisualState::Obstacle
                    } else {
                        VisualState::Idle
                    };
                }
                true
            }
            None => false,
        }
    }

    /// Return every column to `y` and the `Initial` rising state, dropping
    /// links, obstacle flags and search state. Used before a fresh scan.
    pub fn reset_scan(&mut self, y: f32) {
        for column in &mut self.columns {
            *column = Column::new(column.coord, y);
        }
    }

    /// Build the directed neighbor links for every resolved column.
    ///
    /// For each direction the candidates are the elevated and the ground
    /// column at the adjacent position:
    /// 1. A resolved elevated neighbor within `tolerance` is linked, unless a
    ///    resolved ground neighbor is strictly closer in height.
    /// 2. A resolved elevated neighbor further than `tolerance` but within
    ///    `layer_spacing` occupies the head room at that position; nothing
    ///    is linked.
    /// 3. Otherwise the ground neighbor is linked if resolved and within
    ///    `tolerance`.
    ///
    /// Height offsets are absolute, so a pair rejected for exceeding the
    /// tolerance is rejected from both sides.
    pub fn link_neighbors(&mut self, tolerance: f32, layer_spacing: f32) {
        let links: Vec<[Option<ColumnId>; 4]> = self
            .columns
            .iter()
            .map(|column| self.choose_links(column, tolerance, layer_spacing))
            .collect();
        for (column, links) in self.columns.iter_mut().zip(links) {
            column.links = links;
        }
    }

    fn choose_links(
        &self,
        column: &Column,
        tolerance: f32,
        layer_spacing: f32,
    ) -> [Option<ColumnId>; 4] {
        let mut links = [None; 4];
        if !column.is_resolved() {
            return links;
        }
        for dir in Direction::ALL {
            let next = column.coord.step(dir);
            links[dir.index()] = self.choose_link(column.y, next.x, next.z, tolerance, layer_spacing);
        }
        links
    }

    fn choose_link(
        &self,
        y: f32,
        x: i32,
        z: i32,
        tolerance: f32,
        layer_spacing: f32,
    ) -> Option<ColumnId> {
        let ground_id = self.column_id(Layer::Ground, x, z)?;
        let ground = self.column(ground_id);
        let ground_delta = ground
            .is_resolved()
            .then_some((ground.y - y).abs())
            .filter(|&d| d < tolerance);

        if let Some(up_id) = self.column_id(Layer::Elevated, x, z) {
            let up = self.column(up_id);
            if up.is_resolved() {
                let up_delta = (up.y - y).abs();
                if up_delta < tolerance {
                    return match ground_delta {
                        Some(d) if d < up_delta => Some(ground_id),
                        _ => Some(up_id),
                    };
                }
                if up_delta <= layer_spacing {
                    return None;
                }
            }
        }

        ground_delta.map(|_| ground_id)
    }

    /// Mark every resolved column above `threshold` as an obstacle.
    pub fn mark_obstacles_above(&mut self, threshold: f32) {
        for column in &mut self.columns {
            if column.is_resolved() && column.y > threshold {
                column.is_obstacle = true;
                column.visual = VisualState::Obstacle;
            }
        }
    }

    /// Clear all transient search fields on every column.
    pub fn clear_search_state(&mut self) {
        for column in &mut self.columns {
            column.clear_search_state();
        }
    }

    /// Highest current height in a layer, resolved or not. `None` only for
    /// an empty grid.
    pub fn highest_y(&self, layer: Layer) -> Option<f32> {
        self.layer_columns(layer)
            .iter()
            .map(|c| c.y)
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Number of resolved columns in a layer.
    pub fn resolved_count(&self, layer: Layer) -> usize {
        self.layer_columns(layer)
            .iter()
            .filter(|c| c.is_resolved())
            .count()
    }

    /// Number of directed links across the whole grid.
    pub fn link_count(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.links.iter().flatten().count())
            .sum()
    }
}
