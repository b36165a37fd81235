//! Editor configuration loaded from JSON.

use crate::constraints::{DrawConstraints, LockMode};
use crate::snap::{MAX_GRID_SIZE, MIN_ANGLE_INCREMENT, MIN_GRID_SIZE, SnapSettings};
use crate::tools::{DrawMode, MAX_POLYGON_SIDES, MIN_POLYGON_SIDES, ToolOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Everything a drawing session is set up from. Missing fields fall back to
/// their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub mode: DrawMode,
    pub snap: SnapSettings,
    pub tool: ToolOptions,
    pub constraints: DrawConstraints,
    pub lock: LockMode,
}

impl EditorConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> ConfigResult<()> {
        let grid = self.snap.grid_size();
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&grid) {
            return Err(invalid(
                "snap.grid_size",
                format!("{grid} outside {MIN_GRID_SIZE}..={MAX_GRID_SIZE}"),
            ));
        }
        non_negative("snap.activation_distance", self.snap.activation_distance)?;
        let increment = self.snap.angle_increment;
        if !(increment.is_finite() && (MIN_ANGLE_INCREMENT..=360.0).contains(&increment)) {
            return Err(invalid(
                "snap.angle_increment",
                format!("{increment} outside {MIN_ANGLE_INCREMENT}..=360"),
            ));
        }
        non_negative("snap.angle_tolerance", self.snap.angle_tolerance)?;

        non_negative("tool.min_segment_length", self.tool.min_segment_length)?;
        non_negative("tool.point_tolerance", self.tool.point_tolerance)?;
        non_negative("tool.radius_tolerance", self.tool.radius_tolerance)?;
        positive("tool.min_radius", self.tool.min_radius)?;
        non_negative("tool.close_tolerance", self.tool.close_tolerance)?;
        if !(MIN_POLYGON_SIDES..=MAX_POLYGON_SIDES).contains(&self.tool.polygon_sides) {
            return Err(invalid(
                "tool.polygon_sides",
                format!(
                    "{} outside {MIN_POLYGON_SIDES}..={MAX_POLYGON_SIDES}",
                    self.tool.polygon_sides
                ),
            ));
        }

        let c = &self.constraints;
        if let Some(min) = c.min_distance {
            non_negative("constraints.min_distance", min)?;
        }
        if let Some(max) = c.max_distance {
            positive("constraints.max_distance", max)?;
        }
        if let (Some(min), Some(max)) = (c.min_distance, c.max_distance) {
            if min > max {
                return Err(invalid(
                    "constraints",
                    format!("min_distance {min} exceeds max_distance {max}"),
                ));
            }
        }
        if c.allowed_angles.iter().any(|a| !a.is_finite()) {
            return Err(invalid("constraints.allowed_angles", "non-finite angle".into()));
        }
        if c.elevation.is_some_and(|z| !z.is_finite()) {
            return Err(invalid("constraints.elevation", "not finite".into()));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn non_negative(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is not a non-negative number")))
    }
}

fn positive(field: &'static str, value: f64) -> ConfigResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("{value} is not a positive number")))
    }
}
