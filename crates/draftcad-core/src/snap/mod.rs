//! Snapping: candidate collection and resolution.
//!
//! Collectors turn one placed object (or the grid, or a reference bearing)
//! into ranked [`SnapCandidate`]s; the [`SnapResolver`] merges them and picks
//! a single winner per pointer event.

mod collectors;
mod grid;
mod intersection;
mod resolver;

pub use collectors::collect;
pub use grid::{angular_difference, bearing_degrees, collect_angle, collect_grid, snap_angle, snap_to_grid};
pub use intersection::{collect_intersections, collect_parallel};
pub use resolver::{SnapQuery, SnapResolver};

use crate::geometry::ObjectId;
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default grid spacing in world units.
pub const DEFAULT_GRID_SIZE: f64 = 1.0;
/// Smallest accepted grid spacing.
pub const MIN_GRID_SIZE: f64 = 0.001;
/// Largest accepted grid spacing.
pub const MAX_GRID_SIZE: f64 = 1000.0;
/// Default distance within which a candidate may win.
pub const DEFAULT_ACTIVATION_DISTANCE: f64 = 0.5;
/// Angle snap increment in degrees.
pub const ANGLE_SNAP_INCREMENT: f64 = 15.0;
/// Smallest accepted angle snap increment in degrees.
pub const MIN_ANGLE_INCREMENT: f64 = 0.1;
/// Maximum bearing deviation (degrees) for the angle and parallel collectors.
pub const ANGLE_SNAP_TOLERANCE: f64 = 3.0;
/// Lifetime of cached resolve results.
pub const SNAP_CACHE_TTL_MS: u64 = 100;

/// Kind of geometric feature a snap candidate lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapType {
    Grid,
    Endpoint,
    Midpoint,
    Center,
    Intersection,
    Perpendicular,
    Tangent,
    Nearest,
    Quadrant,
    Node,
    Extension,
    Parallel,
    Angle,
}

impl SnapType {
    /// Every snap type, in declaration order.
    pub const ALL: [SnapType; 13] = [
        SnapType::Grid,
        SnapType::Endpoint,
        SnapType::Midpoint,
        SnapType::Center,
        SnapType::Intersection,
        SnapType::Perpendicular,
        SnapType::Tangent,
        SnapType::Nearest,
        SnapType::Quadrant,
        SnapType::Node,
        SnapType::Extension,
        SnapType::Parallel,
        SnapType::Angle,
    ];

    /// Ranking weight; higher wins over lower at any distance inside the
    /// activation radius.
    pub fn base_priority(self) -> u8 {
        match self {
            SnapType::Endpoint | SnapType::Node | SnapType::Center => 10,
            SnapType::Intersection => 9,
            SnapType::Quadrant | SnapType::Midpoint => 8,
            SnapType::Tangent | SnapType::Perpendicular => 7,
            SnapType::Angle => 6,
            SnapType::Nearest => 5,
            SnapType::Parallel => 4,
            SnapType::Extension => 3,
            SnapType::Grid => 1,
        }
    }

    /// Short label for status display.
    pub fn label(self) -> &'static str {
        match self {
            SnapType::Grid => "Grid",
            SnapType::Endpoint => "Endpoint",
            SnapType::Midpoint => "Midpoint",
            SnapType::Center => "Center",
            SnapType::Intersection => "Intersection",
            SnapType::Perpendicular => "Perpendicular",
            SnapType::Tangent => "Tangent",
            SnapType::Nearest => "Nearest",
            SnapType::Quadrant => "Quadrant",
            SnapType::Node => "Node",
            SnapType::Extension => "Extension",
            SnapType::Parallel => "Parallel",
            SnapType::Angle => "Angle",
        }
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of enabled snap types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapMask {
    bits: u16,
}

impl SnapMask {
    pub const NONE: SnapMask = SnapMask { bits: 0 };

    /// Mask containing exactly `types`.
    pub fn of(types: &[SnapType]) -> Self {
        let mut mask = Self::NONE;
        for t in types {
            mask.set(*t, true);
        }
        mask
    }

    /// Mask with every type enabled.
    pub fn all() -> Self {
        Self::of(&SnapType::ALL)
    }

    /// Check if a snap type is enabled.
    pub fn is_enabled(&self, snap_type: SnapType) -> bool {
        self.bits & snap_type.bit() != 0
    }

    /// Enable or disable a snap type.
    pub fn set(&mut self, snap_type: SnapType, enabled: bool) {
        if enabled {
            self.bits |= snap_type.bit();
        } else {
            self.bits &= !snap_type.bit();
        }
    }

    /// Flip a snap type on or off.
    pub fn toggle(&mut self, snap_type: SnapType) {
        let enabled = self.is_enabled(snap_type);
        self.set(snap_type, !enabled);
    }
}

impl Default for SnapMask {
    /// Everything except extension and parallel, which need explicit opt-in.
    fn default() -> Self {
        let mut mask = Self::all();
        mask.set(SnapType::Extension, false);
        mask.set(SnapType::Parallel, false);
        mask
    }
}

/// Which part of the target produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "feature", content = "index", rename_all = "snake_case")]
pub enum SnapFeature {
    Start,
    End,
    Midpoint,
    Center,
    Quadrant(u8),
    Tangent(u8),
    Nearest,
    Extension,
    Vertex(usize),
    EdgeMidpoint(usize),
    Centroid,
    Node,
    Intersection,
    Perpendicular,
    Parallel,
    GridNode,
    /// Snapped bearing in degrees.
    Bearing(f64),
}

impl fmt::Display for SnapFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapFeature::Start => write!(f, "start"),
            SnapFeature::End => write!(f, "end"),
            SnapFeature::Midpoint => write!(f, "midpoint"),
            SnapFeature::Center => write!(f, "center"),
            SnapFeature::Quadrant(i) => write!(f, "quadrant {}", u16::from(*i) * 90),
            SnapFeature::Tangent(i) => write!(f, "tangent {}", i + 1),
            SnapFeature::Nearest => write!(f, "nearest"),
            SnapFeature::Extension => write!(f, "extension"),
            SnapFeature::Vertex(i) => write!(f, "vertex {i}"),
            SnapFeature::EdgeMidpoint(i) => write!(f, "edge {i} midpoint"),
            SnapFeature::Centroid => write!(f, "centroid"),
            SnapFeature::Node => write!(f, "node"),
            SnapFeature::Intersection => write!(f, "intersection"),
            SnapFeature::Perpendicular => write!(f, "perpendicular"),
            SnapFeature::Parallel => write!(f, "parallel"),
            SnapFeature::GridNode => write!(f, "grid"),
            SnapFeature::Bearing(deg) => write!(f, "{deg:.0}°"),
        }
    }
}

/// A proposed snap point, before ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapCandidate {
    /// Where the cursor would land.
    pub point: DVec3,
    pub snap_type: SnapType,
    /// Object that produced the candidate (lookup only).
    pub target: Option<ObjectId>,
    pub feature: SnapFeature,
    /// Distance from the cursor to `point`.
    pub distance: f64,
    pub priority: u8,
}

impl SnapCandidate {
    /// Candidate with the snap type's base priority.
    pub fn new(
        cursor: DVec3,
        point: DVec3,
        snap_type: SnapType,
        feature: SnapFeature,
        target: Option<ObjectId>,
    ) -> Self {
        Self {
            point,
            snap_type,
            target,
            feature,
            distance: cursor.distance(point),
            priority: snap_type.base_priority(),
        }
    }

    /// Override the priority (e.g. polygon centroids rank below true centers).
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }
}

/// Outcome of resolving one cursor position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapResult {
    /// The point to use; the raw input when `snapped` is false.
    pub point: DVec3,
    pub snapped: bool,
    pub snap_type: Option<SnapType>,
    pub target: Option<ObjectId>,
    pub feature: Option<SnapFeature>,
    pub distance: Option<f64>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: DVec3) -> Self {
        Self {
            point,
            snapped: false,
            snap_type: None,
            target: None,
            feature: None,
            distance: None,
        }
    }

    /// Create a snapped result from a winning candidate.
    pub fn from_candidate(candidate: &SnapCandidate) -> Self {
        Self {
            point: candidate.point,
            snapped: true,
            snap_type: Some(candidate.snap_type),
            target: candidate.target,
            feature: Some(candidate.feature),
            distance: Some(candidate.distance),
        }
    }
}

/// Per-session snapping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapSettings {
    /// Master switch; when off, every point passes through unchanged.
    pub enabled: bool,
    grid_size: f64,
    /// Enabled snap types.
    pub types: SnapMask,
    /// Candidates farther than this from the cursor never win.
    pub activation_distance: f64,
    /// Angle collector step in degrees.
    pub angle_increment: f64,
    /// Allowed bearing deviation in degrees.
    pub angle_tolerance: f64,
    /// Resolver cache lifetime; zero disables caching.
    pub cache_ttl_ms: u64,
}

impl Default for SnapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_size: DEFAULT_GRID_SIZE,
            types: SnapMask::default(),
            activation_distance: DEFAULT_ACTIVATION_DISTANCE,
            angle_increment: ANGLE_SNAP_INCREMENT,
            angle_tolerance: ANGLE_SNAP_TOLERANCE,
            cache_ttl_ms: SNAP_CACHE_TTL_MS,
        }
    }
}

impl SnapSettings {
    /// Get the grid spacing.
    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Set the grid size, clamped to `[MIN_GRID_SIZE, MAX_GRID_SIZE]`.
    /// Returns the size actually applied.
    pub fn set_grid_size(&mut self, size: f64) -> f64 {
        let clamped = if size.is_finite() {
            size.clamp(MIN_GRID_SIZE, MAX_GRID_SIZE)
        } else {
            DEFAULT_GRID_SIZE
        };
        if clamped != size {
            log::warn!("Grid size {} out of range, using {}", size, clamped);
        }
        self.grid_size = clamped;
        clamped
    }

    /// Builder form of [`SnapSettings::set_grid_size`].
    pub fn with_grid_size(mut self, size: f64) -> Self {
        self.set_grid_size(size);
        self
    }

    /// Check if a snap type is enabled in the mask.
    pub fn is_enabled(&self, snap_type: SnapType) -> bool {
        self.types.is_enabled(snap_type)
    }
}
