// NPC pathfinder demo: CLI entry point.
//
// Builds a small static box scene (floor, a wall with a gap, a staircase and
// a raised platform), drives a `PathFinderController` frame by frame the way
// a game loop would, and prints the debug visualization of both layers as
// ASCII once an NPC's path onto the platform has been found. Then it walks
// the reverse search in ten-step bursts to show incremental stepping.
//
// Usage:
//   cargo run -p npc_pathfinder_demo -- [config.json] [--width N] [--height N]
//     [--steps-per-tick N] [--max-frames N]
//
// Logging goes through env_logger; set RUST_LOG=debug for per-step output.

use std::collections::BTreeMap;
use std::process::ExitCode;

use npc_pathfinder_core::config::PathFinderConfig;
use npc_pathfinder_core::controller::{PathFinderController, PathPoll};
use npc_pathfinder_core::error::PathFinderError;
use npc_pathfinder_core::scene::StaticScene;
use npc_pathfinder_core::search::SearchStatus;
use npc_pathfinder_core::types::{Layer, WorldPos};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), PathFinderError> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match args.get(1).filter(|s| !s.starts_with("--")) {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| {
                PathFinderError::InvalidConfig(format!("cannot read {path}: {e}"))
            })?;
            PathFinderConfig::from_json(&json)?
        }
        None => PathFinderConfig::default(),
    };
    if let Some(width) = parse_flag(&args, "--width") {
        config.width = width;
    }
    if let Some(height) = parse_flag(&args, "--height") {
        config.height = height;
    }
    if let Some(steps) = parse_flag(&args, "--steps-per-tick") {
        config.steps_per_tick = steps;
    }
    let max_frames: u32 = parse_flag(&args, "--max-frames").unwrap_or(2000);

    let scene = demo_scene();
    let npc_surface = scene.top_at(-6.0, 0.0).unwrap_or(0.0);
    let player_surface = scene.top_at(5.0, 0.0).unwrap_or(0.0);
    println!("=== NPC Voxel Pathfinder Demo ===");
    println!("Footprint: {}x{}", config.width, config.height);
    println!("Solids: {}", scene.solids.len());
    println!();

    let mut controller = PathFinderController::new(config, scene)?;
    controller.toggle_debug_visualization();

    let npc = standing(-6.0, npc_surface, 0.0, controller.config().start_pivot_height);
    let player = standing(5.0, player_surface, 0.0, controller.config().dest_pivot_height);

    // The request can be made before the map exists; ticks build the map
    // first and then work on the search.
    let request = controller.request_path(npc, player);
    controller.rise();

    let mut frames = 0;
    let mut phase = controller.build_phase();
    let path = loop {
        if frames >= max_frames {
            println!("Gave up after {frames} frames.");
            return Ok(());
        }
        controller.tick()?;
        frames += 1;
        if controller.build_phase() != phase {
            phase = controller.build_phase();
            log::info!("frame {frames}: {phase:?}");
        }
        if let PathPoll::Ready(path) = controller.poll_path(request)? {
            break path;
        }
    };

    println!("Resolved after {frames} frames.");
    match &path {
        Some(path) => {
            println!("Path: {} hops", path.hop_count());
            for (coord, point) in path.columns.iter().zip(&path.waypoints) {
                println!(
                    "  {:<18} ({:.1}, {:.2}, {:.1})",
                    coord.to_string(),
                    point[0],
                    point[1],
                    point[2]
                );
            }
        }
        None => println!("No path."),
    }
    println!();
    print_layers(&controller);

    // Walk back down, ten steps per "frame".
    controller.swap_start_dest()?;
    let mut bursts = 0;
    let status = loop {
        let status = controller.ten_step();
        bursts += 1;
        if !status.is_active() {
            break status;
        }
    };
    match (status, controller.current_path()) {
        (SearchStatus::Found, Some(back)) => println!(
            "Return path: {} hops in {} bursts ({} steps).",
            back.hop_count(),
            bursts,
            controller.search().steps_taken()
        ),
        _ => println!("No return path ({bursts} bursts)."),
    }
    Ok(())
}

/// Floor, a wall at x = -4 with a gap for z > 3, six stairs along z = 0
/// climbing 0.4 each from x = -3 to x = 2, and a platform (top 2.8) over
/// x in [2.5, 6.5], z in [-2.5, 2.5] with walking room beneath it.
fn demo_scene() -> StaticScene {
    let mut scene = StaticScene::new()
        .with_floor(0.0, 20.0)
        .with_box([-4.5, 0.0, -7.5], [-3.5, 4.0, 3.5])
        .with_box([2.5, 2.4, -2.5], [6.5, 2.8, 2.5]);
    for (i, x) in (-3..=2).enumerate() {
        let x = x as f32;
        let top = 0.4 * (i as f32 + 1.0);
        scene = scene.with_box([x - 0.5, 0.0, -0.5], [x + 0.5, top, 0.5]);
    }
    scene
}

fn standing(x: f32, surface_y: f32, z: f32, pivot: f32) -> WorldPos {
    [x, surface_y + pivot, z]
}

/// Print each visible layer as a grid of visual-state glyphs, +Z at the top.
/// Unresolved columns are blank.
fn print_layers(controller: &PathFinderController<StaticScene>) {
    let hw = controller.config().half_width();
    let hh = controller.config().half_height();
    let mut cells: BTreeMap<(Layer, i32, i32), char> = BTreeMap::new();
    for visual in controller.debug_view() {
        let glyph = if visual.resolved {
            visual.state.glyph()
        } else {
            ' '
        };
        cells.insert((visual.coord.layer, visual.coord.x, visual.coord.z), glyph);
    }

    for layer in Layer::ALL {
        if !controller.is_layer_visible(layer) {
            continue;
        }
        let top = controller
            .highest_y(layer)
            .map(|y| format!("{y:.2}"))
            .unwrap_or_else(|| "-".to_string());
        println!("Layer {} ({layer}), highest y {top}:", layer.number());
        for z in (-hh..=hh).rev() {
            let row: String = (-hw..=hw)
                .map(|x| cells.get(&(layer, x, z)).copied().unwrap_or(' '))
                .collect();
            println!("  |{row}|");
        }
        println!();
    }
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
