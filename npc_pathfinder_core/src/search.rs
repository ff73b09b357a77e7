// Incremental best-first frontier search over the voxel grid.
//
// The search is resumable: `reset_start_dest()` seeds it, and each `step()`
// expands exactly one column, so a host can spread a search over frames
// (`ten_step()`) or finish it at once (`until_found()`).
//
// The frontier is a `BinaryHeap` turned into a min-heap by reversed
// ordering, keyed on `(priority, insertion sequence)`. The sequence number
// makes ties pop in insertion order, so the expansion order is fully
// deterministic.
//
// Priority is `cost_so_far + planar Euclidean distance to the destination`,
// with unit cost per hop. A column is reached at most once: the first
// discovery fixes its cost and back-pointer, and it is never re-opened. The
// destination counts as found the moment it is discovered as a neighbor,
// not when it is popped.
//
// All per-column search state (`is_reached`, `cost_so_far`, `prev`,
// `visual`, ...) lives on the grid's columns; this struct only holds the
// frontier and the run's bookkeeping.
//
// See also: `grid.rs` for the links being followed, `controller.rs` for the
// not-generated guard and the request queue built on top of this.

use crate::error::PathFinderError;
use crate::grid::VoxelGrid;
use crate::types::{ColumnCoord, ColumnId, Direction, VisualState};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Steps run by `ten_step()`.
pub const BURST_STEPS: u32 = 10;

/// Lifecycle of one search run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SearchStatus {
    /// Never seeded, or invalidated by a rebuilt grid.
    #[default]
    Idle,
    /// Seeded, no step taken yet.
    Seeded,
    /// At least one step taken, still going.
    Stepping,
    /// Destination reached; the path is available.
    Found,
    /// Frontier ran dry without reaching the destination.
    Exhausted,
}

impl SearchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SearchStatus::Found | SearchStatus::Exhausted)
    }

    /// Whether `step()` would do any work.
    pub fn is_active(self) -> bool {
        matches!(self, SearchStatus::Seeded | SearchStatus::Stepping)
    }
}

/// Entry in the frontier (min-heap via reversed ordering).
#[derive(Clone, Copy, Debug)]
struct FrontierEntry {
    priority: f32,
    sequence: u64,
    column: ColumnId,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: lowest priority, then earliest insertion, is "greatest".
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
pub struct PathSearch {
    frontier: BinaryHeap<FrontierEntry>,
    next_sequence: u64,
    status: SearchStatus,
    start: Option<ColumnId>,
    dest: Option<ColumnId>,
    dest_coord: Option<ColumnCoord>,
    path: Vec<ColumnId>,
    last_expanded: Option<(ColumnId, f32)>,
    steps: u64,
}

impl PathSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn is_found(&self) -> bool {
        self.status == SearchStatus::Found
    }

    pub fn start(&self) -> Option<ColumnId> {
        self.start
    }

    pub fn dest(&self) -> Option<ColumnId> {
        self.dest
    }

    /// Columns from start to destination inclusive. Empty unless found.
    pub fn path(&self) -> &[ColumnId] {
        &self.path
    }

    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Frontier contents in the order they would be popped.
    pub fn frontier_in_order(&self) -> Vec<(ColumnId, f32)> {
        let mut entries: Vec<FrontierEntry> = self.frontier.iter().copied().collect();
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|e| (e.column, e.priority)).collect()
    }

    /// Column and priority popped by the most recent `step()`.
    pub fn last_expanded(&self) -> Option<(ColumnId, f32)> {
        self.last_expanded
    }

    /// Expansions performed since the last reset.
    pub fn steps_taken(&self) -> u64 {
        self.steps
    }

    /// Forget the current run without touching the grid. Used when the grid
    /// is rebuilt and the stored ids go stale.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Clear all search state and seed a new run from `start` to `dest`.
    ///
    /// Both coordinates are validated before anything is mutated. When
    /// `start == dest` the run is immediately `Found` with a one-column path.
    pub fn reset_start_dest(
        &mut self,
        grid: &mut VoxelGrid,
        start: ColumnCoord,
        dest: ColumnCoord,
    ) -> Result<(), PathFinderError> {
        let start_id = lookup(grid, start)?;
        let dest_id = lookup(grid, dest)?;

        grid.clear_search_state();
        self.clear();
        self.start = Some(start_id);
        self.dest = Some(dest_id);
        self.dest_coord = Some(dest);

        let priority = start.planar_distance(dest);
        {
            let column = grid.column_mut(start_id);
            column.is_start = true;
            column.is_reached = true;
            column.cost_so_far = 0;
            column.priority = priority;
            column.visual = VisualState::Start;
        }

        if start_id == dest_id {
            self.path.push(start_id);
            self.status = SearchStatus::Found;
            log::debug!("search {start} -> {dest}: start is the destination");
            return Ok(());
        }

        {
            let column = grid.column_mut(dest_id);
            column.is_dest = true;
            column.visual = VisualState::Dest;
        }
        self.push(start_id, priority);
        self.status = SearchStatus::Seeded;
        Ok(())
    }

    /// Expand the lowest-priority frontier column. A no-op unless the run is
    /// seeded and not yet terminal. Returns the status afterwards.
    pub fn step(&mut self, grid: &mut VoxelGrid) -> SearchStatus {
        if !self.status.is_active() {
            return self.status;
        }
        let Some(entry) = self.frontier.pop() else {
            self.exhaust();
            return self.status;
        };
        self.status = SearchStatus::Stepping;
        self.steps += 1;
        self.last_expanded = Some((entry.column, entry.priority));

        let current = grid.column_mut(entry.column);
        if !current.is_start {
            current.visual = VisualState::Reached;
        }
        let links = current.links;

        for dir in Direction::ALL {
            if let Some(neighbor) = links[dir.index()] {
                self.visit(grid, neighbor, entry.column);
                if self.status == SearchStatus::Found {
                    return self.status;
                }
            }
        }

        if self.frontier.is_empty() {
            self.exhaust();
        }
        self.status
    }

    /// Up to `n` steps, stopping early at a terminal status.
    pub fn run_steps(&mut self, grid: &mut VoxelGrid, n: u32) -> SearchStatus {
        for _ in 0..n {
            if !self.status.is_active() {
                break;
            }
            self.step(grid);
        }
        self.status
    }

    pub fn ten_step(&mut self, grid: &mut VoxelGrid) -> SearchStatus {
        self.run_steps(grid, BURST_STEPS)
    }

    /// Step until found or exhausted.
    pub fn until_found(&mut self, grid: &mut VoxelGrid) -> SearchStatus {
        while self.status.is_active() {
            self.step(grid);
        }
        self.status
    }

    fn push(&mut self, column: ColumnId, priority: f32) {
        self.frontier.push(FrontierEntry {
            priority,
            sequence: self.next_sequence,
            column,
        });
        self.next_sequence += 1;
    }

    fn exhaust(&mut self) {
        self.status = SearchStatus::Exhausted;
        log::debug!("finish: frontier exhausted after {} steps", self.steps);
    }

    fn visit(&mut self, grid: &mut VoxelGrid, id: ColumnId, from: ColumnId) {
        let from_cost = grid.column(from).cost_so_far;
        let Some(dest) = self.dest_coord else {
            return;
        };
        let column = grid.column_mut(id);
        if column.is_obstacle {
            return;
        }
        if !column.is_reached {
            column.is_reached = true;
            column.cost_so_far = from_cost + 1;
            column.priority = column.coord.planar_distance(dest) + column.cost_so_far as f32;
            column.prev = Some(from);
            if !column.is_start && !column.is_dest {
                column.visual = VisualState::Frontier;
            }
            let priority = column.priority;
            self.push(id, priority);
        }
        if grid.column(id).is_dest {
            self.status = SearchStatus::Found;
            self.materialize_path(grid, id);
        }
    }

    fn materialize_path(&mut self, grid: &mut VoxelGrid, dest: ColumnId) {
        self.path.clear();
        let mut cursor = Some(dest);
        while let Some(id) = cursor {
            self.path.push(id);
            let column = grid.column_mut(id);
            if !column.is_start && !column.is_dest {
                column.visual = VisualState::Path;
            }
            cursor = column.prev;
        }
        self.path.reverse();
        log::debug!(
            "found path of {} hops after {} steps",
            self.path.len().saturating_sub(1),
            self.steps
        );
    }
}

fn lookup(grid: &VoxelGrid, coord: ColumnCoord) -> Result<ColumnId, PathFinderError> {
    grid.column_id_at(coord)
        .ok_or(PathFinderError::OutOfBounds {
            layer: coord.layer,
            x: coord.x,
            z: coord.z,
        })
}
