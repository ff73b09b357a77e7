// npc_pathfinder_core: voxel pathfinding library for NPCs.
//
// This crate discovers walkable surfaces in a 3D scene by probing a grid of
// vertical columns with a collision box, links neighboring columns whose
// heights are close enough to step between, and runs an incremental
// best-first search over that graph. It never talks to a physics engine
// directly (`CollisionOracle` is the only boundary), never renders, and has
// no notion of frame timing beyond the host calling `tick()`.
//
// Module overview:
// - `controller.rs`: PathFinderController, the host façade (frame loop, path requests, debug view).
// - `builder.rs`:    VoxelMapBuilder, the incremental rise scan that finds surface heights.
// - `grid.rs`:       VoxelGrid, dense two-layer column storage and neighbor linking.
// - `search.rs`:     PathSearch, resumable frontier search with a deterministic min-heap.
// - `probe.rs`:      CollisionOracle trait + VoxelProbe, the fixed-shape box query.
// - `scene.rs`:      StaticScene, an axis-aligned box oracle for tests, benches and the demo.
// - `config.rs`:     PathFinderConfig, all tunable parameters, JSON loadable.
// - `error.rs`:      PathFinderError / OracleError.
// - `types.rs`:      Layer, ColumnCoord, ColumnId, Direction, per-column state enums.
//
// **Determinism.** Given the same oracle answers, the map and every search
// are reproducible: dense `Vec` storage, a fixed neighbor order, and a
// frontier tie-broken by insertion sequence. No `HashMap`, no randomness.

pub mod builder;
pub mod config;
pub mod controller;
pub mod error;
pub mod grid;
pub mod probe;
pub mod scene;
pub mod search;
pub mod types;
