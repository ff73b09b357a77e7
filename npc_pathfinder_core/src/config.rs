// Data-driven pathfinder configuration.
//
// All tunable parameters live in `PathFinderConfig`, loadable from JSON. The
// builder, grid and search never use magic numbers; they read from the
// config. Missing JSON fields fall back to `Default` (`#[serde(default)]`),
// so a host can override a single value with `{"width": 71}`.
//
// The footprint must have a center column, so `normalized()` bumps even
// `width`/`height` to the next odd number. Every constructor that takes a
// config goes through `normalized()`.
//
// See also: `controller.rs` which owns the config, `builder.rs` for the rise
// scan parameters, `grid.rs` for the linking tolerances.

use crate::error::PathFinderError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathFinderConfig {
    /// Footprint size along X, in columns. Forced odd.
    pub width: u32,

    /// Footprint size along Z, in columns. Forced odd.
    pub height: u32,

    /// Height of the probe box, and the vertical spacing assumed between the
    /// ground and elevated layers.
    pub voxel_height: f32,

    /// Starting height of every ground column and of both scan counters.
    pub lowest_y: f32,

    /// Ceiling of the ground-layer scan.
    pub highest_y: f32,

    /// Ceiling of the elevated-layer scan.
    pub highest_y2: f32,

    /// Height added to each rising column per tick.
    pub rise_step: f32,

    /// Maximum vertical offset between two linked columns.
    pub height_tolerance: f32,

    /// Half extent of the probe box along X and Z.
    pub probe_half_width: f32,

    /// Resolved columns above this height are impassable. `None` disables
    /// the cutoff.
    pub obstacle_height: Option<f32>,

    /// Distance from the NPC's origin down to its feet. Subtracted from the
    /// start position when snapping to a column.
    pub start_pivot_height: f32,

    /// Distance from the target player's origin down to its feet.
    pub dest_pivot_height: f32,

    /// Extra downward bias applied when snapping, so a position resting
    /// exactly on an integer boundary resolves the same on both sides.
    pub ground_bias: f32,

    /// Search steps spent per `tick()` on queued path requests.
    pub steps_per_tick: u32,

    /// Start with the debug visualization enabled.
    pub debug_render: bool,
}

impl Default for PathFinderConfig {
    fn default() -> Self {
        Self {
            width: 15,
            height: 15,
            voxel_height: 2.0,
            lowest_y: 0.1,
            highest_y: 15.0,
            highest_y2: 30.0,
            rise_step: 0.1,
            height_tolerance: 0.6,
            probe_half_width: 0.5,
            obstacle_height: None,
            start_pivot_height: 1.518_240_1,
            dest_pivot_height: 1.257_643_1,
            ground_bias: 0.05,
            steps_per_tick: 10,
            debug_render: false,
        }
    }
}

impl PathFinderConfig {
    /// Parse a config from JSON. Absent fields take their default values.
    /// The result is not yet normalized.
    pub fn from_json(json: &str) -> Result<Self, PathFinderError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, PathFinderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and return a copy with even footprint dimensions bumped to
    /// the next odd number.
    pub fn normalized(&self) -> Result<Self, PathFinderError> {
        let mut config = self.clone();
        if config.width == 0 || config.height == 0 {
            return Err(PathFinderError::InvalidConfig(format!(
                "footprint must be non-empty, got {}x{}",
                config.width, config.height
            )));
        }
        if config.width % 2 == 0 {
            config.width += 1;
        }
        if config.height % 2 == 0 {
            config.height += 1;
        }

        let positive = [
            ("voxel_height", config.voxel_height),
            ("rise_step", config.rise_step),
            ("height_tolerance", config.height_tolerance),
            ("probe_half_width", config.probe_half_width),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(PathFinderError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let heights = [
            ("lowest_y", config.lowest_y),
            ("highest_y", config.highest_y),
            ("highest_y2", config.highest_y2),
        ];
        for (name, value) in heights {
            if !value.is_finite() {
                return Err(PathFinderError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
            // The scan counters must actually move at every height they pass.
            if value + config.rise_step == value {
                return Err(PathFinderError::InvalidConfig(format!(
                    "rise_step ({}) is below f32 precision at {name} ({value})",
                    config.rise_step
                )));
            }
        }
        if config.highest_y <= config.lowest_y {
            return Err(PathFinderError::InvalidConfig(format!(
                "highest_y ({}) must be above lowest_y ({})",
                config.highest_y, config.lowest_y
            )));
        }
        if config.highest_y2 <= config.lowest_y {
            return Err(PathFinderError::InvalidConfig(format!(
                "highest_y2 ({}) must be above lowest_y ({})",
                config.highest_y2, config.lowest_y
            )));
        }
        if config.steps_per_tick == 0 {
            return Err(PathFinderError::InvalidConfig(
                "steps_per_tick must be at least 1".into(),
            ));
        }
        Ok(config)
    }

    /// Half extents of the probe box.
    pub fn probe_half_extents(&self) -> [f32; 3] {
        [
            self.probe_half_width,
            self.voxel_height / 2.0,
            self.probe_half_width,
        ]
    }

    /// Largest centered X coordinate, `(width - 1) / 2`.
    pub fn half_width(&self) -> i32 {
        (self.width as i32 - 1) / 2
    }

    /// Largest centered Z coordinate, `(height - 1) / 2`.
    pub fn half_height(&self) -> i32 {
        (self.height as i32 - 1) / 2
    }
}
