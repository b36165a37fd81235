//! Positional and directional constraints applied before snapping.

use crate::geometry::DrawingPlane;
use crate::snap::{angular_difference, bearing_degrees, snap_angle};
use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Polar lock step in degrees.
pub const POLAR_LOCK_INCREMENT: f64 = 15.0;

/// Below this distance from the previous point there is no direction to
/// push, clamp or lock along.
const DIRECTION_EPSILON: f64 = 1e-9;

/// Optional per-tool constraints. Read-only to the input pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConstraints {
    /// Minimum distance from the previous point.
    pub min_distance: Option<f64>,
    /// Maximum distance from the previous point.
    pub max_distance: Option<f64>,
    /// Bearings (degrees) the next point may lie on, relative to the previous point.
    pub allowed_angles: Vec<f64>,
    /// Only the grid may snap.
    pub grid_only: bool,
    /// Fixed Z coordinate.
    pub elevation: Option<f64>,
    /// Plane every point is projected onto.
    pub plane: Option<DrawingPlane>,
}

/// Directional lock. A single value, so ortho and polar never combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    #[default]
    None,
    /// Axis lock: keep only the dominant axis of the offset.
    Ortho,
    /// Bearing lock to multiples of [`POLAR_LOCK_INCREMENT`].
    Polar,
}

impl LockMode {
    /// Cycle to the next lock mode.
    pub fn next(self) -> Self {
        match self {
            LockMode::None => LockMode::Ortho,
            LockMode::Ortho => LockMode::Polar,
            LockMode::Polar => LockMode::None,
        }
    }

    /// Check if a directional lock is on.
    pub fn is_locked(self) -> bool {
        self != LockMode::None
    }
}

/// Applies [`DrawConstraints`] and the current [`LockMode`] to raw input.
#[derive(Debug, Clone, Default)]
pub struct ConstraintEngine {
    constraints: DrawConstraints,
    lock: LockMode,
}

impl ConstraintEngine {
    /// Create an engine with the given constraints and lock.
    pub fn new(constraints: DrawConstraints, lock: LockMode) -> Self {
        Self { constraints, lock }
    }

    /// Get the active constraints.
    pub fn constraints(&self) -> &DrawConstraints {
        &self.constraints
    }

    /// Replace the active constraints.
    pub fn set_constraints(&mut self, constraints: DrawConstraints) {
        self.constraints = constraints;
    }

    /// Get the current lock mode.
    pub fn lock(&self) -> LockMode {
        self.lock
    }

    /// Set the lock mode.
    pub fn set_lock(&mut self, lock: LockMode) {
        self.lock = lock;
    }

    /// Whether the bearing snap collector may run. Any directional
    /// constraint takes precedence over it.
    pub fn angle_snap_allowed(&self) -> bool {
        !self.lock.is_locked() && self.constraints.allowed_angles.is_empty()
    }

    /// Constrain a raw point. Steps run in a fixed order: plane projection,
    /// elevation, minimum then maximum distance, then one directional rule
    /// (ortho, polar, or allowed angles).
    pub fn apply(&self, point: DVec3, previous: Option<DVec3>) -> DVec3 {
        let c = &self.constraints;
        let mut p = point;

        if let Some(plane) = &c.plane {
            p = plane.project(p);
        }
        if let Some(z) = c.elevation {
            p.z = z;
        }

        let Some(prev) = previous else {
            return p;
        };

        if let Some(min) = c.min_distance {
            p = push_to_min(prev, p, min);
        }
        if let Some(max) = c.max_distance {
            p = pull_to_max(prev, p, max);
        }

        match self.lock {
            LockMode::Ortho => ortho(prev, p),
            LockMode::Polar => with_bearing(prev, p, snap_angle(bearing_degrees(prev, p), POLAR_LOCK_INCREMENT)),
            LockMode::None => match nearest_allowed(&c.allowed_angles, prev, p) {
                Some(bearing) => with_bearing(prev, p, bearing),
                None => p,
            },
        }
    }
}

fn push_to_min(prev: DVec3, p: DVec3, min: f64) -> DVec3 {
    let offset = p - prev;
    let len = offset.length();
    if len < min && len > DIRECTION_EPSILON {
        prev + offset * (min / len)
    } else {
        p
    }
}

fn pull_to_max(prev: DVec3, p: DVec3, max: f64) -> DVec3 {
    let offset = p - prev;
    let len = offset.length();
    if len > max {
        prev + offset * (max / len)
    } else {
        p
    }
}

/// Keep the largest-magnitude component of the offset, zero the others.
fn ortho(prev: DVec3, p: DVec3) -> DVec3 {
    let d = p - prev;
    let a = d.abs();
    let axis = if a.x >= a.y && a.x >= a.z {
        DVec3::new(d.x, 0.0, 0.0)
    } else if a.y >= a.z {
        DVec3::new(0.0, d.y, 0.0)
    } else {
        DVec3::new(0.0, 0.0, d.z)
    };
    prev + axis
}

/// Rotate `p` about `prev` to the given planar bearing, keeping planar
/// distance and elevation.
fn with_bearing(prev: DVec3, p: DVec3, bearing_degrees: f64) -> DVec3 {
    let d = p - prev;
    let dist = d.x.hypot(d.y);
    if dist < DIRECTION_EPSILON {
        return p;
    }
    let (sin, cos) = bearing_degrees.to_radians().sin_cos();
    DVec3::new(prev.x + dist * cos, prev.y + dist * sin, p.z)
}

fn nearest_allowed(allowed: &[f64], prev: DVec3, p: DVec3) -> Option<f64> {
    let d = p - prev;
    if d.x.hypot(d.y) < DIRECTION_EPSILON {
        return None;
    }
    let bearing = bearing_degrees(prev, p);
    allowed
        .iter()
        .copied()
        .filter(|a| a.is_finite())
        .min_by(|a, b| angular_difference(*a, bearing).total_cmp(&angular_difference(*b, bearing)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn engine(constraints: DrawConstraints, lock: LockMode) -> ConstraintEngine {
        ConstraintEngine::new(constraints, lock)
    }

    #[test]
    fn test_no_constraints_is_identity() {
        let e = ConstraintEngine::default();
        let p = DVec3::new(1.5, -2.0, 3.0);
        assert_eq!(e.apply(p, Some(DVec3::ZERO)), p);
        assert_eq!(e.apply(p, None), p);
    }

    #[test]
    fn test_plane_projection_then_elevation() {
        let plane = DrawingPlane::xy().with_origin(DVec3::new(0.0, 0.0, 2.0));
        let e = engine(
            DrawConstraints {
                plane: Some(plane),
                ..Default::default()
            },
            LockMode::None,
        );
        assert_relative_eq!(e.apply(DVec3::new(1.0, 1.0, 9.0), None).z, 2.0);

        let e = engine(
            DrawConstraints {
                plane: Some(plane),
                elevation: Some(5.0),
                ..Default::default()
            },
            LockMode::None,
        );
        assert_relative_eq!(e.apply(DVec3::new(1.0, 1.0, 9.0), None).z, 5.0);
    }

    #[test]
    fn test_min_distance_pushes_outward() {
        let e = engine(
            DrawConstraints {
                min_distance: Some(2.0),
                ..Default::default()
            },
            LockMode::None,
        );
        let p = e.apply(DVec3::new(0.5, 0.0, 0.0), Some(DVec3::ZERO));
        assert_relative_eq!(p.x, 2.0);
        assert_relative_eq!(p.y, 0.0);
        // Coincident input has no direction and is left alone.
        assert_eq!(e.apply(DVec3::ZERO, Some(DVec3::ZERO)), DVec3::ZERO);
    }

    #[test]
    fn test_max_distance_pulls_inward() {
        let e = engine(
            DrawConstraints {
                max_distance: Some(5.0),
                ..Default::default()
            },
            LockMode::None,
        );
        let p = e.apply(DVec3::new(6.0, 8.0, 0.0), Some(DVec3::ZERO));
        assert_relative_eq!(p.length(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(p.x, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ortho_keeps_dominant_axis() {
        let e = engine(DrawConstraints::default(), LockMode::Ortho);
        let prev = DVec3::new(1.0, 1.0, 0.0);
        assert_eq!(e.apply(DVec3::new(5.0, 2.0, 0.5), Some(prev)), DVec3::new(5.0, 1.0, 0.0));
        assert_eq!(e.apply(DVec3::new(0.0, -4.0, 0.5), Some(prev)), DVec3::new(1.0, -4.0, 0.0));
        assert_eq!(e.apply(DVec3::new(1.1, 1.2, 7.0), Some(prev)), DVec3::new(1.0, 1.0, 7.0));
    }

    #[test]
    fn test_polar_snaps_bearing_preserving_distance() {
        let e = engine(DrawConstraints::default(), LockMode::Polar);
        let angle = 37.0_f64.to_radians();
        let p = e.apply(DVec3::new(10.0 * angle.cos(), 10.0 * angle.sin(), 0.0), Some(DVec3::ZERO));
        assert_relative_eq!(p.truncate().length(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(bearing_degrees(DVec3::ZERO, p), 30.0, epsilon = 1e-9);
    }

    #[test]
    fn test_allowed_angles() {
        let e = engine(
            DrawConstraints {
                allowed_angles: vec![0.0, 60.0],
                ..Default::default()
            },
            LockMode::None,
        );
        assert!(!e.angle_snap_allowed());
        let angle = 50.0_f64.to_radians();
        let p = e.apply(DVec3::new(2.0 * angle.cos(), 2.0 * angle.sin(), 0.0), Some(DVec3::ZERO));
        assert_relative_eq!(bearing_degrees(DVec3::ZERO, p), 60.0, epsilon = 1e-9);
    }

    #[test]
    fn test_locks_disable_angle_snap() {
        assert!(ConstraintEngine::default().angle_snap_allowed());
        assert!(!engine(DrawConstraints::default(), LockMode::Ortho).angle_snap_allowed());
        assert!(!engine(DrawConstraints::default(), LockMode::Polar).angle_snap_allowed());
    }

    #[test]
    fn test_lock_mode_cycle() {
        assert_eq!(LockMode::None.next(), LockMode::Ortho);
        assert_eq!(LockMode::Ortho.next(), LockMode::Polar);
        assert_eq!(LockMode::Polar.next(), LockMode::None);
    }
}
