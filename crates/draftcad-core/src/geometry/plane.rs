//! Drawing planes and plane-local coordinates.

use glam::DVec3;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// A plane in world space with a derived in-plane basis.
///
/// Bearings, grid rounding and circle frames are all computed in the plane's
/// local 2D coordinates; [`DrawingPlane::to_local`] and
/// [`DrawingPlane::to_world`] convert between the two spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingPlane {
    /// A point on the plane; local (0, 0).
    pub origin: DVec3,
    /// Unit normal.
    pub normal: DVec3,
}

impl Default for DrawingPlane {
    fn default() -> Self {
        Self::xy()
    }
}

impl DrawingPlane {
    /// Create a plane, normalizing the normal. A degenerate normal falls back to +Z.
    pub fn new(origin: DVec3, normal: DVec3) -> Self {
        let normal = if normal.is_finite() && normal.length_squared() > f64::EPSILON {
            normal.normalize()
        } else {
            DVec3::Z
        };
        Self { origin, normal }
    }

    /// The world XY plane through the origin.
    pub fn xy() -> Self {
        Self {
            origin: DVec3::ZERO,
            normal: DVec3::Z,
        }
    }

    /// Same orientation, moved to a new origin.
    pub fn with_origin(self, origin: DVec3) -> Self {
        Self { origin, ..self }
    }

    /// In-plane unit axes `(u, v)` with `u × v == normal`.
    pub fn basis(&self) -> (DVec3, DVec3) {
        let n = self.normal;
        let u = if n.z.abs() > 0.9 {
            DVec3::Y.cross(n).normalize()
        } else {
            DVec3::Z.cross(n).normalize()
        };
        (u, n.cross(u))
    }

    /// Signed distance of `point` from the plane along the normal.
    pub fn signed_distance(&self, point: DVec3) -> f64 {
        (point - self.origin).dot(self.normal)
    }

    /// Orthogonal projection of `point` onto the plane.
    pub fn project(&self, point: DVec3) -> DVec3 {
        point - self.normal * self.signed_distance(point)
    }

    /// Express a world point in plane-local coordinates (the normal component is dropped).
    pub fn to_local(&self, point: DVec3) -> Point {
        let (u, v) = self.basis();
        let d = point - self.origin;
        Point::new(d.dot(u), d.dot(v))
    }

    /// Map plane-local coordinates back to world space.
    pub fn to_world(&self, point: Point) -> DVec3 {
        let (u, v) = self.basis();
        self.origin + u * point.x + v * point.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_xy_basis_is_world_axes() {
        let (u, v) = DrawingPlane::xy().basis();
        assert_relative_eq!(u.x, 1.0);
        assert_relative_eq!(v.y, 1.0);
    }

    #[test]
    fn test_local_world_round_trip_on_tilted_plane() {
        let plane = DrawingPlane::new(DVec3::new(1.0, 2.0, 3.0), DVec3::new(1.0, 0.0, 1.0));
        let world = plane.project(DVec3::new(4.0, -1.0, 7.0));
        let back = plane.to_world(plane.to_local(world));
        assert_relative_eq!(back.distance(world), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_project_removes_normal_component() {
        let plane = DrawingPlane::xy().with_origin(DVec3::new(0.0, 0.0, 2.0));
        let p = plane.project(DVec3::new(3.0, 4.0, 9.0));
        assert_relative_eq!(p.z, 2.0);
        assert_relative_eq!(plane.signed_distance(p), 0.0);
    }

    #[test]
    fn test_degenerate_normal_falls_back_to_z() {
        let plane = DrawingPlane::new(DVec3::ZERO, DVec3::ZERO);
        assert_eq!(plane.normal, DVec3::Z);
    }
}
