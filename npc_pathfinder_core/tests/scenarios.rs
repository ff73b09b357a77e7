// End-to-end pathfinding scenarios.
//
// Each test builds a map the way a host would (either by scanning a
// `StaticScene` through the controller, or by loading heights directly into
// a grid) and checks search results and graph invariants on it. The scanned
// scene is a floor with a one-column-wide ramp climbing in +X onto a raised
// platform, which exercises the ground-to-elevated stitching.

use std::cell::Cell;

use npc_pathfinder_core::config::PathFinderConfig;
use npc_pathfinder_core::controller::{PathFinderController, PathPoll};
use npc_pathfinder_core::error::{OracleError, PathFinderError};
use npc_pathfinder_core::grid::VoxelGrid;
use npc_pathfinder_core::probe::CollisionOracle;
use npc_pathfinder_core::scene::StaticScene;
use npc_pathfinder_core::search::{PathSearch, SearchStatus};
use npc_pathfinder_core::types::{ColumnCoord, Direction, Layer, VisualState, WorldPos};

fn ground(x: i32, z: i32) -> ColumnCoord {
    ColumnCoord::new(Layer::Ground, x, z)
}

fn elevated(x: i32, z: i32) -> ColumnCoord {
    ColumnCoord::new(Layer::Elevated, x, z)
}

/// Open ground map loaded from a flat heightmap and linked with the default
/// tolerances.
fn open_grid(size: u32) -> VoxelGrid {
    let config = PathFinderConfig::default();
    let mut grid = VoxelGrid::new(size, size, config.lowest_y);
    grid.apply_heightmap(Layer::Ground, |_, _| Some(1.0));
    grid.link_neighbors(config.height_tolerance, config.voxel_height);
    grid
}

/// Floor at y = 0, a ramp along z = 0 from x = -2 (top 0.3) to x = 5
/// (top 2.4), and a platform over x in [5.5, 7.5], z in [-1.5, 1.5] with its
/// top at 2.7 and enough clearance underneath to walk below it.
fn ramp_scene() -> StaticScene {
    let mut scene = StaticScene::new().with_floor(0.0, 10.0);
    for (i, x) in (-2..=5).enumerate() {
        let top = 0.3 * (i as f32 + 1.0);
        let x = x as f32;
        scene = scene.with_box([x - 0.5, 0.0, -0.5], [x + 0.5, top, 0.5]);
    }
    scene.with_box([5.5, 2.3, -1.5], [7.5, 2.7, 1.5])
}

fn generated(scene: StaticScene) -> PathFinderController<StaticScene> {
    let mut controller = PathFinderController::new(PathFinderConfig::default(), scene).unwrap();
    controller.generate_blocking().unwrap();
    controller
}

/// World position of an entity standing on a surface at `surface_y`.
fn standing(x: f32, surface_y: f32, z: f32, pivot: f32) -> WorldPos {
    [x, surface_y + pivot, z]
}

// ---------------------------------------------------------------------------
// Search on loaded heightmaps
// ---------------------------------------------------------------------------

#[test]
fn destination_outside_15_wide_footprint_is_rejected() {
    let mut grid = open_grid(15);
    let mut search = PathSearch::new();
    let err = search
        .reset_start_dest(&mut grid, ground(0, 0), ground(13, 3))
        .unwrap_err();
    assert!(matches!(err, PathFinderError::OutOfBounds { x: 13, z: 3, .. }));
    assert_eq!(search.status(), SearchStatus::Idle);
}

#[test]
fn open_ground_path_has_manhattan_length() {
    let mut grid = open_grid(27);
    let mut search = PathSearch::new();
    search
        .reset_start_dest(&mut grid, ground(0, 0), ground(13, 3))
        .unwrap();
    assert_eq!(search.until_found(&mut grid), SearchStatus::Found);

    let path: Vec<ColumnCoord> = search
        .path()
        .iter()
        .map(|&id| grid.column(id).coord)
        .collect();
    assert_eq!(path.len() - 1, 16);
    assert_eq!(path[0], ground(0, 0));
    assert_eq!(path[16], ground(13, 3));
    let dest = grid.get_column(Layer::Ground, 13, 3).unwrap();
    assert_eq!(dest.cost_so_far, 16);
    assert!(dest.is_reached);
}

#[test]
fn obstacle_band_exhausts_the_frontier() {
    let mut grid = open_grid(15);
    for z in -7..=7 {
        grid.set_obstacle(Layer::Ground, 2, z, true);
    }
    let mut search = PathSearch::new();
    search
        .reset_start_dest(&mut grid, ground(-5, 0), ground(5, 0))
        .unwrap();
    assert_eq!(search.until_found(&mut grid), SearchStatus::Exhausted);
    assert!(!search.is_found());
    assert_eq!(search.frontier_len(), 0);
    assert!(search.path().is_empty());
    // Everything left of the band was reached, nothing right of it.
    for column in grid.layer_columns(Layer::Ground) {
        assert_eq!(column.is_reached, column.coord.x < 2, "{}", column.coord);
    }
}

#[test]
fn cross_layer_step_is_walkable() {
    // A strip of elevated surface 0.3 above the ground at x = 1, with the
    // ground below it far out of reach.
    let config = PathFinderConfig::default();
    let mut grid = VoxelGrid::new(7, 7, config.lowest_y);
    grid.apply_heightmap(Layer::Ground, |x, _| Some(if x == 1 { 9.0 } else { 1.0 }));
    grid.apply_heightmap(Layer::Elevated, |x, _| (x == 1).then_some(1.3));
    grid.link_neighbors(config.height_tolerance, config.voxel_height);

    let from = grid.get_column(Layer::Ground, 0, 0).unwrap();
    let right = from.links[1].map(|id| grid.column(id).coord);
    assert_eq!(right, Some(elevated(1, 0)));

    let mut search = PathSearch::new();
    search
        .reset_start_dest(&mut grid, ground(-2, 0), ground(3, 0))
        .unwrap();
    assert_eq!(search.until_found(&mut grid), SearchStatus::Found);
    let path: Vec<ColumnCoord> = search
        .path()
        .iter()
        .map(|&id| grid.column(id).coord)
        .collect();
    assert!(path.contains(&elevated(1, 0)));
    assert!(!path.contains(&ground(1, 0)));
    assert_eq!(path.len() - 1, 5);
}

#[test]
fn frontier_expands_in_priority_order_around_a_wall() {
    let mut grid = open_grid(21);
    for z in -10..=6 {
        grid.set_obstacle(Layer::Ground, 0, z, true);
    }
    let mut search = PathSearch::new();
    search
        .reset_start_dest(&mut grid, ground(-6, 0), ground(6, 0))
        .unwrap();

    let mut popped = Vec::new();
    loop {
        let status = search.step(&mut grid);
        if let Some((_, priority)) = search.last_expanded() {
            popped.push(priority);
        }
        if !status.is_active() {
            break;
        }
    }
    assert_eq!(search.status(), SearchStatus::Found);
    for pair in popped.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-4, "{} popped after {}", pair[1], pair[0]);
    }
}

// ---------------------------------------------------------------------------
// Scanned scenes through the controller
// ---------------------------------------------------------------------------

#[test]
fn ramp_scene_builds_two_layers() {
    let controller = generated(ramp_scene());
    let grid = controller.grid();
    assert!(controller.is_generated());
    assert_eq!(grid.resolved_count(Layer::Ground), 15 * 15);
    // Only the six platform columns have a second surface.
    assert_eq!(grid.resolved_count(Layer::Elevated), 6);

    let under = grid.get_column(Layer::Ground, 6, 0).unwrap();
    let over = grid.get_column(Layer::Elevated, 6, 0).unwrap();
    assert!(under.y < 1.2);
    assert!(over.y > 3.7 - 1e-4 && over.y < 3.8 + 1e-4, "y = {}", over.y);

    let top = controller.highest_y(Layer::Ground).unwrap();
    let ramp_top = grid.get_column(Layer::Ground, 5, 0).unwrap().y;
    assert_eq!(top, ramp_top);
}

#[test]
fn links_stay_within_tolerance_and_are_rejected_both_ways() {
    let controller = generated(ramp_scene());
    let grid = controller.grid();
    let tolerance = controller.config().height_tolerance;

    for column in grid.columns() {
        for (dir, id) in column.linked_neighbors() {
            let other = grid.column(id);
            assert!((other.y - column.y).abs() < tolerance, "{} -> {}", column.coord, other.coord);
            let step = column.coord.step(dir);
            assert_eq!((other.coord.x, other.coord.z), (step.x, step.z));
        }
    }

    // Any adjacent resolved pair too far apart is linked in neither direction.
    for a in grid.columns().iter().filter(|c| c.is_resolved()) {
        for layer in Layer::ALL {
            for dir in Direction::ALL {
                let next = a.coord.step(dir);
                let Some(b) = grid.get_column(layer, next.x, next.z) else {
                    continue;
                };
                if b.is_resolved() && (b.y - a.y).abs() >= tolerance {
                    let a_id = grid.column_id_at(a.coord).unwrap();
                    let b_id = grid.column_id_at(b.coord).unwrap();
                    assert_ne!(a.link(dir), Some(b_id));
                    assert_ne!(b.link(dir.opposite()), Some(a_id));
                }
            }
        }
    }
}

#[test]
fn npc_walks_up_the_ramp_onto_the_platform() {
    let mut controller = generated(ramp_scene());
    let config = controller.config().clone();
    let start = standing(-6.0, 0.0, 0.0, config.start_pivot_height);
    let dest = standing(7.0, 2.7, 0.0, config.dest_pivot_height);

    let path = controller.get_path(start, dest).unwrap().expect("ramp leads up");
    assert_eq!(path.columns.first(), Some(&ground(-6, 0)));
    assert_eq!(path.columns.last(), Some(&elevated(7, 0)));
    assert!(path.hop_count() >= 13);
    assert!(
        path.columns
            .windows(2)
            .any(|w| w[0] == ground(5, 0) && w[1] == elevated(6, 0)),
        "path must step from the ramp top onto the platform: {:?}",
        path.columns
    );

    let last = path.waypoints[path.waypoints.len() - 1];
    assert_eq!((last[0], last[2]), (7.0, 0.0));
    assert!(last[1] > 2.7 - 1e-4 && last[1] < 2.8 + 1e-4, "surface {}", last[1]);

    // Visual states along the found path.
    let grid = controller.grid();
    let start_col = grid.get_column(Layer::Ground, -6, 0).unwrap();
    assert_eq!(start_col.visual, VisualState::Start);
    let dest_col = grid.get_column(Layer::Elevated, 7, 0).unwrap();
    assert_eq!(dest_col.visual, VisualState::Dest);
    let mid = grid.get_column(Layer::Ground, 0, 0).unwrap();
    assert_eq!(mid.visual, VisualState::Path);
}

#[test]
fn npc_can_walk_under_the_platform() {
    let mut controller = generated(ramp_scene());
    let config = controller.config().clone();
    let start = standing(4.0, 0.0, 2.0, config.start_pivot_height);
    let dest = standing(7.0, 0.0, 0.0, config.dest_pivot_height);
    let path = controller.get_path(start, dest).unwrap().expect("floor is open");
    assert_eq!(path.columns.last(), Some(&ground(7, 0)));
    assert!(path.columns.iter().all(|c| c.layer == Layer::Ground));
}

#[test]
fn swapping_finds_the_way_back_down() {
    let mut controller = generated(ramp_scene());
    controller
        .reset_start_dest(ground(-6, 0), elevated(7, 0))
        .unwrap();
    assert_eq!(controller.until_found(), SearchStatus::Found);
    let up = controller.current_path().unwrap();

    controller.swap_start_dest().unwrap();
    assert_eq!(controller.until_found(), SearchStatus::Found);
    let down = controller.current_path().unwrap();
    assert_eq!(down.columns.first(), Some(&elevated(7, 0)));
    assert_eq!(down.columns.last(), Some(&ground(-6, 0)));
    assert_eq!(down.hop_count(), up.hop_count());
}

#[test]
fn scanning_is_deterministic() {
    let mut a = generated(ramp_scene());
    let mut b = generated(ramp_scene());
    let start = [-6.0, 1.6, -3.0];
    let dest = [7.0, 4.0, 1.0];
    assert_eq!(a.get_path(start, dest).unwrap(), b.get_path(start, dest).unwrap());
    for (ca, cb) in a.grid().columns().iter().zip(b.grid().columns()) {
        assert_eq!(ca.y, cb.y);
        assert_eq!(ca.links, cb.links);
    }
}

#[test]
fn request_is_served_once_the_tick_loop_generates_the_map() {
    let config = PathFinderConfig {
        width: 7,
        height: 7,
        highest_y: 3.0,
        highest_y2: 6.0,
        steps_per_tick: 3,
        ..PathFinderConfig::default()
    };
    let scene = StaticScene::new().with_floor(0.0, 10.0);
    let mut controller = PathFinderController::new(config, scene).unwrap();
    let pivot = controller.config().start_pivot_height;
    let id = controller.request_path(standing(-3.0, 0.0, -3.0, pivot), standing(3.0, 0.0, 3.0, pivot));

    controller.rise();
    let mut frames = 0;
    let path = loop {
        controller.tick().unwrap();
        frames += 1;
        assert!(frames < 1000, "request never resolved");
        if let PathPoll::Ready(path) = controller.poll_path(id).unwrap() {
            break path;
        }
    };
    assert!(controller.is_generated());
    assert_eq!(path.unwrap().hop_count(), 12);
}

#[test]
fn step_before_generation_warns_and_does_nothing() {
    let mut controller =
        PathFinderController::new(PathFinderConfig::default(), ramp_scene()).unwrap();
    controller.rise();
    controller.tick().unwrap();
    assert_eq!(controller.step(), SearchStatus::Idle);
    assert_eq!(controller.ten_step(), SearchStatus::Idle);
    assert!(matches!(
        controller.reset_start_dest(ground(0, 0), ground(1, 0)),
        Err(PathFinderError::NotGenerated)
    ));
    assert!(controller.grid().columns().iter().all(|c| !c.is_reached));
}

/// Oracle that goes offline after a fixed number of queries.
struct Unreliable {
    inner: StaticScene,
    remaining: Cell<u32>,
}

impl CollisionOracle for Unreliable {
    fn overlap_box(
        &self,
        half_extents: [f32; 3],
        position: WorldPos,
        orientation: [f32; 4],
    ) -> Result<bool, OracleError> {
        if self.remaining.get() == 0 {
            return Err(OracleError::new("scene unloaded"));
        }
        self.remaining.set(self.remaining.get() - 1);
        self.inner.overlap_box(half_extents, position, orientation)
    }
}

#[test]
fn oracle_failure_surfaces_from_tick() {
    let oracle = Unreliable {
        inner: ramp_scene(),
        remaining: Cell::new(500),
    };
    let mut controller = PathFinderController::new(PathFinderConfig::default(), oracle).unwrap();
    controller.rise();
    // 225 queries per tick: the third tick runs out.
    controller.tick().unwrap();
    controller.tick().unwrap();
    let err = controller.tick().unwrap_err();
    assert!(matches!(err, PathFinderError::Probe(_)));
    assert!(!controller.is_generated());

    let err = controller.generate_blocking().unwrap_err();
    assert!(matches!(err, PathFinderError::Probe(_)));
}
