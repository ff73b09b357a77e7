// Host-facing pathfinder façade.
//
// `PathFinderController` owns everything one pathfinder instance needs: the
// normalized config, the collision oracle, the voxel grid, the map builder
// and the search. There is no global state; a host may run as many
// controllers as it likes, each over its own footprint.
//
// ## Frame loop
//
// The host calls `tick()` once per frame. A tick:
//   1. advances the rise scan by one step while the map is being built;
//   2. once the map is generated, spends up to `steps_per_tick` search steps
//      on queued path requests (`request_path()`), oldest first.
// `generate_blocking()` runs the whole scan at once instead.
//
// ## Guarded search operations
//
// `step()`, `ten_step()` and `until_found()` log "voxel map not generated"
// and do nothing until the map exists. `reset_start_dest()` and
// `get_path()` return `PathFinderError::NotGenerated` in the same situation.
//
// ## Shared search state
//
// There is a single `PathSearch` and the per-column search fields live on
// the grid, so the interactive operations and the request queue share one
// search. Servicing a queued request overwrites whatever the interactive
// search left behind, and vice versa.
//
// ## World positions
//
// Entity positions are converted to columns by rounding x and z and taking
// the foot height `y - pivot - ground_bias`. The layer whose resolved
// standing surface (`column.y - voxel_height / 2`) is closest to the foot
// height wins; with neither layer resolved the ground layer is used, and the
// search simply finds nothing there.
//
// See also: `builder.rs`, `search.rs`, `grid.rs` for the parts being driven,
// `config.rs` for every tunable used here.

use crate::builder::{BuildPhase, VoxelMapBuilder};
use crate::config::PathFinderConfig;
use crate::error::PathFinderError;
use crate::grid::VoxelGrid;
use crate::probe::CollisionOracle;
use crate::search::{PathSearch, SearchStatus};
use crate::types::{ColumnCoord, Layer, VisualState, WorldPos};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Handle for an asynchronous path request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathRequestId(pub u64);

/// A found path, as grid columns and as world-space standing positions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Start to destination, inclusive.
    pub columns: Vec<ColumnCoord>,
    /// One point per column: column center in x/z, standing surface in y.
    pub waypoints: Vec<WorldPos>,
}

impl Path {
    /// Number of moves, i.e. `columns.len() - 1`.
    pub fn hop_count(&self) -> usize {
        self.columns.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Result of polling a queued request.
#[derive(Clone, Debug, PartialEq)]
pub enum PathPoll {
    /// Still queued or being searched.
    Pending,
    /// Finished. `None` means no path exists (or an endpoint was off the
    /// footprint).
    Ready(Option<Path>),
}

/// One column as shown by the debug visualization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnVisual {
    pub coord: ColumnCoord,
    pub y: f32,
    /// Unresolved columns have no surface and are usually not drawn.
    pub resolved: bool,
    pub state: VisualState,
}

#[derive(Clone, Debug)]
struct PendingRequest {
    id: PathRequestId,
    start: WorldPos,
    dest: WorldPos,
    started: bool,
}

pub struct PathFinderController<O: CollisionOracle> {
    config: PathFinderConfig,
    oracle: O,
    grid: VoxelGrid,
    builder: VoxelMapBuilder,
    search: PathSearch,
    debug_render: bool,
    layer_visible: [bool; 2],
    last_start: Option<ColumnCoord>,
    last_dest: Option<ColumnCoord>,
    pending: VecDeque<PendingRequest>,
    completed: BTreeMap<PathRequestId, Option<Path>>,
    next_request: u64,
}

impl<O: CollisionOracle> PathFinderController<O> {
    /// Create a controller over `oracle`. The map is not built until
    /// `rise()`/`tick()` or `generate_blocking()`.
    pub fn new(config: PathFinderConfig, oracle: O) -> Result<Self, PathFinderError> {
        let config = config.normalized()?;
        Ok(Self {
            grid: VoxelGrid::new(config.width, config.height, config.lowest_y),
            builder: VoxelMapBuilder::new(&config),
            search: PathSearch::new(),
            debug_render: config.debug_render,
            layer_visible: [true; 2],
            last_start: None,
            last_dest: None,
            pending: VecDeque::new(),
            completed: BTreeMap::new(),
            next_request: 0,
            config,
            oracle,
        })
    }

    /// Replace the config and rebuild an empty grid. The map must be
    /// generated again; queued requests wait for it.
    pub fn configure(&mut self, config: PathFinderConfig) -> Result<(), PathFinderError> {
        let config = config.normalized()?;
        self.grid = VoxelGrid::new(config.width, config.height, config.lowest_y);
        self.builder = VoxelMapBuilder::new(&config);
        self.invalidate_search();
        self.debug_render = config.debug_render;
        self.config = config;
        Ok(())
    }

    pub fn config(&self) -> &PathFinderConfig {
        &self.config
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn search(&self) -> &PathSearch {
        &self.search
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn build_phase(&self) -> BuildPhase {
        self.builder.phase()
    }

    pub fn is_generated(&self) -> bool {
        self.builder.is_generated()
    }

    /// Begin (or restart) the rise scan.
    pub fn rise(&mut self) {
        self.builder.rise(&mut self.grid);
        self.invalidate_search();
    }

    /// One frame of work. See the module header for what a tick does.
    pub fn tick(&mut self) -> Result<(), PathFinderError> {
        if self.builder.phase().is_rising() {
            self.builder.tick(&mut self.grid, &self.oracle)?;
        }
        if self.builder.is_generated() {
            self.service_requests();
        }
        Ok(())
    }

    /// Build the whole map now. Returns the number of scan ticks spent.
    pub fn generate_blocking(&mut self) -> Result<u64, PathFinderError> {
        if !self.builder.phase().is_rising() {
            self.rise();
        }
        Ok(self
            .builder
            .run_to_completion(&mut self.grid, &self.oracle)?)
    }

    /// Skip the scan and generate the map from known surface heights (probe
    /// box center heights, as the scan would have found them).
    pub fn load_heightmap(
        &mut self,
        ground: impl Fn(i32, i32) -> Option<f32>,
        elevated: impl Fn(i32, i32) -> Option<f32>,
    ) {
        self.grid.reset_scan(self.config.lowest_y);
        self.grid.apply_heightmap(Layer::Ground, ground);
        self.grid.apply_heightmap(Layer::Elevated, elevated);
        self.invalidate_search();
        self.builder.finalize(&mut self.grid);
    }

    /// Flag or clear a column as impassable after generation.
    pub fn set_obstacle(
        &mut self,
        coord: ColumnCoord,
        obstacle: bool,
    ) -> Result<(), PathFinderError> {
        if self.grid.set_obstacle(coord.layer, coord.x, coord.z, obstacle) {
            Ok(())
        } else {
            Err(out_of_bounds(coord))
        }
    }

    /// Drop the current search and restart any request that was mid-search.
    fn invalidate_search(&mut self) {
        self.search.clear();
        self.last_start = None;
        self.last_dest = None;
        for request in &mut self.pending {
            request.started = false;
        }
    }

    fn require_generated(&self) -> Result<(), PathFinderError> {
        if self.builder.is_generated() {
            Ok(())
        } else {
            log::warn!("voxel map not generated.");
            Err(PathFinderError::NotGenerated)
        }
    }

    // -----------------------------------------------------------------------
    // Interactive search
    // -----------------------------------------------------------------------

    /// Seed a new search between two columns. A queued request that was
    /// being searched starts over on the next tick.
    pub fn reset_start_dest(
        &mut self,
        start: ColumnCoord,
        dest: ColumnCoord,
    ) -> Result<(), PathFinderError> {
        self.seed(start, dest)?;
        if let Some(request) = self.pending.front_mut() {
            request.started = false;
        }
        Ok(())
    }

    fn seed(&mut self, start: ColumnCoord, dest: ColumnCoord) -> Result<(), PathFinderError> {
        self.require_generated()?;
        self.search.reset_start_dest(&mut self.grid, start, dest)?;
        self.last_start = Some(start);
        self.last_dest = Some(dest);
        Ok(())
    }

    /// Re-seed with start and destination exchanged. Does nothing when no
    /// search has been seeded yet.
    pub fn swap_start_dest(&mut self) -> Result<(), PathFinderError> {
        match (self.last_start, self.last_dest) {
            (Some(start), Some(dest)) => self.reset_start_dest(dest, start),
            _ => Ok(()),
        }
    }

    pub fn step(&mut self) -> SearchStatus {
        if self.require_generated().is_err() {
            return self.search.status();
        }
        self.search.step(&mut self.grid)
    }

    pub fn ten_step(&mut self) -> SearchStatus {
        if self.require_generated().is_err() {
            return self.search.status();
        }
        self.search.ten_step(&mut self.grid)
    }

    pub fn until_found(&mut self) -> SearchStatus {
        if self.require_generated().is_err() {
            return self.search.status();
        }
        self.search.until_found(&mut self.grid)
    }

    pub fn status(&self) -> SearchStatus {
        self.search.status()
    }

    /// The current search's path, if it has been found.
    pub fn current_path(&self) -> Option<Path> {
        self.search.is_found().then(|| self.build_path())
    }

    /// Snap both positions to columns and search to completion.
    /// `Ok(None)` means there is no path.
    pub fn get_path(
        &mut self,
        start: WorldPos,
        dest: WorldPos,
    ) -> Result<Option<Path>, PathFinderError> {
        self.require_generated()?;
        let start = self.snap(start, self.config.start_pivot_height)?;
        let dest = self.snap(dest, self.config.dest_pivot_height)?;
        self.reset_start_dest(start, dest)?;
        self.search.until_found(&mut self.grid);
        Ok(self.current_path())
    }

    // -----------------------------------------------------------------------
    // Queued requests
    // -----------------------------------------------------------------------

    /// Queue a path search to be worked on by subsequent `tick()`s. May be
    /// called before the map is generated.
    pub fn request_path(&mut self, start: WorldPos, dest: WorldPos) -> PathRequestId {
        let id = PathRequestId(self.next_request);
        self.next_request += 1;
        self.pending.push_back(PendingRequest {
            id,
            start,
            dest,
            started: false,
        });
        id
    }

    /// Check on a queued request. A `Ready` result is handed out once; the
    /// id is unknown afterwards.
    pub fn poll_path(&mut self, id: PathRequestId) -> Result<PathPoll, PathFinderError> {
        if let Some(path) = self.completed.remove(&id) {
            return Ok(PathPoll::Ready(path));
        }
        if self.pending.iter().any(|r| r.id == id) {
            return Ok(PathPoll::Pending);
        }
        Err(PathFinderError::UnknownRequest(id))
    }

    pub fn pending_requests(&self) -> usize {
        self.pending.len()
    }

    fn service_requests(&mut self) {
        let mut budget = self.config.steps_per_tick;
        while budget > 0 {
            let Some(request) = self.pending.front_mut() else {
                break;
            };
            let id = request.id;
            if !request.started {
                request.started = true;
                let (start, dest) = (request.start, request.dest);
                if let Err(err) = self.start_request(start, dest) {
                    log::warn!("path request {id:?} dropped: {err}");
                    self.finish_request(None);
                    continue;
                }
            }

            let before = self.search.steps_taken();
            let status = self.search.run_steps(&mut self.grid, budget);
            let spent = (self.search.steps_taken() - before) as u32;
            budget = budget.saturating_sub(spent.max(1));

            if status.is_terminal() {
                let path = self.current_path();
                match &path {
                    Some(p) => log::info!("path request {id:?} resolved: {} hops", p.hop_count()),
                    None => log::info!("path request {id:?} resolved: no path"),
                }
                self.finish_request(path);
            }
        }
    }

    fn start_request(&mut self, start: WorldPos, dest: WorldPos) -> Result<(), PathFinderError> {
        let start = self.snap(start, self.config.start_pivot_height)?;
        let dest = self.snap(dest, self.config.dest_pivot_height)?;
        self.seed(start, dest)
    }

    fn finish_request(&mut self, path: Option<Path>) {
        if let Some(request) = self.pending.pop_front() {
            self.completed.insert(request.id, path);
        }
    }

    // -----------------------------------------------------------------------
    // World <-> grid
    // -----------------------------------------------------------------------

    /// The column an entity at `pos` is standing on, given the distance from
    /// its origin to its feet. `None` outside the footprint or when the
    /// planar position is not finite.
    pub fn world_to_column(&self, pos: WorldPos, pivot_height: f32) -> Option<ColumnCoord> {
        if !(pos[0].is_finite() && pos[2].is_finite()) {
            return None;
        }
        let x = pos[0].round() as i32;
        let z = pos[2].round() as i32;
        if !self.grid.in_bounds(x, z) {
            return None;
        }
        let foot_y = pos[1] - pivot_height - self.config.ground_bias;
        let half = self.config.voxel_height / 2.0;
        let best = Layer::ALL
            .iter()
            .filter_map(|&layer| self.grid.get_column(layer, x, z))
            .filter(|c| c.is_resolved())
            .min_by(|a, b| {
                let da = (a.y - half - foot_y).abs();
                let db = (b.y - half - foot_y).abs();
                da.total_cmp(&db)
            })
            .map(|c| c.coord);
        Some(best.unwrap_or(ColumnCoord::new(Layer::Ground, x, z)))
    }

    /// World-space standing point of a column.
    pub fn column_to_world(&self, coord: ColumnCoord) -> Option<WorldPos> {
        let column = self.grid.get_column(coord.layer, coord.x, coord.z)?;
        Some([
            coord.x as f32,
            column.y - self.config.voxel_height / 2.0,
            coord.z as f32,
        ])
    }

    fn snap(&self, pos: WorldPos, pivot_height: f32) -> Result<ColumnCoord, PathFinderError> {
        self.world_to_column(pos, pivot_height).ok_or_else(|| {
            out_of_bounds(ColumnCoord::new(
                Layer::Ground,
                pos[0].round() as i32,
                pos[2].round() as i32,
            ))
        })
    }

    fn build_path(&self) -> Path {
        let columns: Vec<ColumnCoord> = self
            .search
            .path()
            .iter()
            .map(|&id| self.grid.column(id).coord)
            .collect();
        let half = self.config.voxel_height / 2.0;
        let waypoints = self
            .search
            .path()
            .iter()
            .map(|&id| {
                let column = self.grid.column(id);
                [column.coord.x as f32, column.y - half, column.coord.z as f32]
            })
            .collect();
        Path { columns, waypoints }
    }

    // -----------------------------------------------------------------------
    // Debug visualization
    // -----------------------------------------------------------------------

    /// Flip the debug visualization. Returns the new setting.
    pub fn toggle_debug_visualization(&mut self) -> bool {
        self.debug_render = !self.debug_render;
        self.debug_render
    }

    pub fn is_debug_visualization(&self) -> bool {
        self.debug_render
    }

    /// Flip one layer's visibility. Returns the new setting.
    pub fn toggle_layer_visible(&mut self, layer: Layer) -> bool {
        let visible = &mut self.layer_visible[layer.index()];
        *visible = !*visible;
        *visible
    }

    pub fn is_layer_visible(&self, layer: Layer) -> bool {
        self.layer_visible[layer.index()]
    }

    /// Visual state of every column on visible layers. Empty while the
    /// debug visualization is off.
    pub fn debug_view(&self) -> Vec<ColumnVisual> {
        if !self.debug_render {
            return Vec::new();
        }
        Layer::ALL
            .iter()
            .filter(|&&layer| self.is_layer_visible(layer))
            .flat_map(|&layer| self.grid.layer_columns(layer))
            .map(|c| ColumnVisual {
                coord: c.coord,
                y: c.y,
                resolved: c.is_resolved(),
                state: c.visual,
            })
            .collect()
    }

    /// Highest column height on a layer.
    pub fn highest_y(&self, layer: Layer) -> Option<f32> {
        self.grid.highest_y(layer)
    }
}

fn out_of_bounds(coord: ColumnCoord) -> PathFinderError {
    PathFinderError::OutOfBounds {
        layer: coord.layer,
        x: coord.x,
        z: coord.z,
    }
}
