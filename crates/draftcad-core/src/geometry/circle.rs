//! Full circle.

use super::{
    DrawingPlane, GeometryError, GeometryResult, ObjectId, ObjectKind, PlacedObject, ensure_finite,
};
use glam::DVec3;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A circle lying in the plane through `center` with the given normal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub(crate) id: ObjectId,
    /// Center point.
    pub center: DVec3,
    /// Radius.
    pub radius: f64,
    /// Unit normal of the circle's plane.
    pub normal: DVec3,
}

impl Circle {
    /// Create a circle in the world XY orientation.
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self::with_normal(center, radius, DVec3::Z)
    }

    /// Create a circle in an arbitrary plane orientation.
    pub fn with_normal(center: DVec3, radius: f64, normal: DVec3) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius,
            normal: DrawingPlane::new(center, normal).normal,
        }
    }

    /// The circle's own frame, centered on the circle.
    pub fn frame(&self) -> DrawingPlane {
        DrawingPlane::new(self.center, self.normal)
    }

    /// World point at a frame-local angle (radians).
    pub fn point_at_angle(&self, angle: f64) -> DVec3 {
        self.frame()
            .to_world(Point::ORIGIN + Vec2::from_angle(angle) * self.radius)
    }
}

impl PlacedObject for Circle {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Circle
    }

    fn closest_point(&self, point: DVec3) -> Option<DVec3> {
        let local = self.frame().to_local(point).to_vec2();
        let d = local.hypot();
        if d < f64::EPSILON {
            return None;
        }
        Some(self.frame().to_world(Point::ORIGIN + local * (self.radius / d)))
    }

    fn is_closed(&self) -> bool {
        true
    }

    fn center(&self) -> Option<DVec3> {
        Some(self.center)
    }

    fn radius(&self) -> Option<f64> {
        Some(self.radius)
    }

    fn plane(&self) -> DrawingPlane {
        self.frame()
    }

    fn validate(&self) -> GeometryResult<()> {
        ensure_finite(&[self.center, self.normal], "circle")?;
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(GeometryError::DegenerateRadius(self.radius));
        }
        Ok(())
    }
}
