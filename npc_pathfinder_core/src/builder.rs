// Incremental voxel map construction (the rise scan).
//
// The builder discovers walkable surfaces by pushing a probe box upward
// through each column until it has entered and then left solid geometry.
// Work is spread over frames: one `tick()` advances every still-rising
// column of the active layer by one `rise_step` and probes it once.
//
// Phases:
//   Idle -> RisingGround -> RisingElevated -> Generated
//
// - `rise()` resets the grid and enters `RisingGround`. A scan counter starts
//   at `lowest_y` and advances by `rise_step` per tick.
// - Once the counter passes `highest_y`, every elevated column is seeded at
//   its ground column's height and the elevated scan starts its own counter,
//   again from `lowest_y`.
// - Once that counter passes `highest_y2`, `finalize()` links neighbors,
//   applies the obstacle cutoff, and the map is generated.
//
// Per column and tick: probe at `y + rise_step` and keep that height. A hit moves the column
// to `Colliding`. A clear probe on a `Colliding` column freezes it as
// `Stopped`. A clear probe on an `Initial` column changes nothing, so
// columns over empty space keep rising and stay unresolved.
//
// Oracle errors abort the tick and propagate. Columns probed before the
// failure keep their new height, the failing column keeps its old one, and
// the next `tick()` carries on from there.
//
// See also: `grid.rs` for the columns being raised, `probe.rs` for the probe
// box, `controller.rs` which drives `tick()` once per frame.

use crate::config::PathFinderConfig;
use crate::error::OracleError;
use crate::grid::VoxelGrid;
use crate::probe::{CollisionOracle, VoxelProbe};
use crate::types::{Layer, RisingState};
use serde::{Deserialize, Serialize};

/// Where the builder is in the scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildPhase {
    #[default]
    Idle,
    RisingGround,
    RisingElevated,
    Generated,
}

impl BuildPhase {
    pub fn is_rising(self) -> bool {
        matches!(self, BuildPhase::RisingGround | BuildPhase::RisingElevated)
    }
}

#[derive(Debug)]
pub struct VoxelMapBuilder {
    phase: BuildPhase,
    probe: VoxelProbe,
    scan_y: f32,
    scan_y2: f32,
    ticks: u64,
    lowest_y: f32,
    highest_y: f32,
    highest_y2: f32,
    rise_step: f32,
    height_tolerance: f32,
    voxel_height: f32,
    obstacle_height: Option<f32>,
}

impl VoxelMapBuilder {
    pub fn new(config: &PathFinderConfig) -> Self {
        Self {
            phase: BuildPhase::Idle,
            probe: VoxelProbe::new(config),
            scan_y: config.lowest_y,
            scan_y2: config.lowest_y,
            ticks: 0,
            lowest_y: config.lowest_y,
            highest_y: config.highest_y,
            highest_y2: config.highest_y2,
            rise_step: config.rise_step,
            height_tolerance: config.height_tolerance,
            voxel_height: config.voxel_height,
            obstacle_height: config.obstacle_height,
        }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn is_generated(&self) -> bool {
        self.phase == BuildPhase::Generated
    }

    pub fn probe(&self) -> &VoxelProbe {
        &self.probe
    }

    /// Ticks that did scan work since the last `rise()`.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Start (or restart) the scan from `lowest_y`. Any previous map is
    /// discarded.
    pub fn rise(&mut self, grid: &mut VoxelGrid) {
        grid.reset_scan(self.lowest_y);
        self.scan_y = self.lowest_y;
        self.scan_y2 = self.lowest_y;
        self.ticks = 0;
        self.phase = BuildPhase::RisingGround;
    }

    /// Advance the scan by one frame. A no-op when idle or generated.
    /// Returns the phase after the tick.
    pub fn tick<O: CollisionOracle + ?Sized>(
        &mut self,
        grid: &mut VoxelGrid,
        oracle: &O,
    ) -> Result<BuildPhase, OracleError> {
        match self.phase {
            BuildPhase::Idle | BuildPhase::Generated => return Ok(self.phase),
            BuildPhase::RisingGround => {
                self.rise_layer(grid, Layer::Ground, oracle)?;
                self.scan_y += self.rise_step;
                if self.scan_y > self.highest_y {
                    self.begin_elevated(grid);
                }
            }
            BuildPhase::RisingElevated => {
                self.rise_layer(grid, Layer::Elevated, oracle)?;
                self.scan_y2 += self.rise_step;
                if self.scan_y2 > self.highest_y2 {
                    self.finalize(grid);
                }
            }
        }
        self.ticks += 1;
        Ok(self.phase)
    }

    /// Tick until the map is generated, starting the scan first if idle.
    /// Returns the number of ticks spent.
    pub fn run_to_completion<O: CollisionOracle + ?Sized>(
        &mut self,
        grid: &mut VoxelGrid,
        oracle: &O,
    ) -> Result<u64, OracleError> {
        if self.phase == BuildPhase::Idle {
            self.rise(grid);
        }
        let mut spent = 0;
        while self.phase.is_rising() {
            self.tick(grid, oracle)?;
            spent += 1;
        }
        Ok(spent)
    }

    /// Link neighbors, apply the obstacle cutoff and mark the map generated.
    /// Called by the scan itself; hosts that load heights directly (see
    /// `VoxelGrid::apply_heightmap`) call it instead of scanning.
    pub fn finalize(&mut self, grid: &mut VoxelGrid) {
        grid.link_neighbors(self.height_tolerance, self.voxel_height);
        if let Some(threshold) = self.obstacle_height {
            grid.mark_obstacles_above(threshold);
        }
        self.phase = BuildPhase::Generated;
        log::info!(
            "generated voxel map: {} ground / {} elevated columns resolved, {} links",
            grid.resolved_count(Layer::Ground),
            grid.resolved_count(Layer::Elevated),
            grid.link_count()
        );
    }

    fn begin_elevated(&mut self, grid: &mut VoxelGrid) {
        let ground_heights: Vec<f32> = grid
            .layer_columns(Layer::Ground)
            .iter()
            .map(|c| c.y)
            .collect();
        for (column, y) in grid
            .layer_columns_mut(Layer::Elevated)
            .iter_mut()
            .zip(ground_heights)
        {
            column.y = y;
            column.rising_state = RisingState::Initial;
        }
        self.scan_y2 = self.lowest_y;
        self.phase = BuildPhase::RisingElevated;
        log::debug!("ground scan done, seeding elevated layer");
    }

    fn rise_layer<O: CollisionOracle + ?Sized>(
        &self,
        grid: &mut VoxelGrid,
        layer: Layer,
        oracle: &O,
    ) -> Result<(), OracleError> {
        for column in grid.layer_columns_mut(layer) {
            if !column.rising_state.is_rising() {
                continue;
            }
            let y = column.y + self.rise_step;
            let hit = self.probe.overlaps(oracle, column.coord.x, y, column.coord.z)?;
            column.y = y;
            if hit {
                column.rising_state = RisingState::Colliding;
            } else if column.rising_state == RisingState::Colliding {
                column.rising_state = RisingState::Stopped;
            }
        }
        Ok(())
    }
}
