//! Circular arc.

use super::{
    DrawingPlane, GeometryError, GeometryResult, ObjectId, ObjectKind, PlacedObject, ensure_finite,
    normalize_angle,
};
use glam::DVec3;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use uuid::Uuid;

/// Angular slack when testing containment (radians).
const ANGLE_EPSILON: f64 = 1e-9;

/// A counter-clockwise arc in the plane through `center`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub(crate) id: ObjectId,
    /// Center point.
    pub center: DVec3,
    /// Radius.
    pub radius: f64,
    /// Unit normal of the arc's plane.
    pub normal: DVec3,
    /// Start angle in the arc frame (radians).
    pub start_angle: f64,
    /// Counter-clockwise sweep (radians, in `(0, TAU]`).
    pub sweep: f64,
}

impl Arc {
    /// Create a counter-clockwise arc of `sweep` radians from `start_angle`.
    pub fn new(center: DVec3, radius: f64, normal: DVec3, start_angle: f64, sweep: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            center,
            radius,
            normal: DrawingPlane::new(center, normal).normal,
            start_angle: normalize_angle(start_angle),
            sweep,
        }
    }

    /// Arc from a center, a start point (defines the radius) and a point
    /// giving the end direction. Sweeps counter-clockwise.
    pub fn from_center_points(center: DVec3, start: DVec3, end: DVec3, normal: DVec3) -> GeometryResult<Self> {
        let frame = DrawingPlane::new(center, normal);
        let s = frame.to_local(start).to_vec2();
        let e = frame.to_local(end).to_vec2();
        let radius = s.hypot();
        if radius < f64::EPSILON || e.hypot() < f64::EPSILON {
            return Err(GeometryError::DegenerateRadius(radius));
        }
        let start_angle = s.atan2();
        let mut sweep = normalize_angle(e.atan2() - start_angle);
        if sweep < ANGLE_EPSILON {
            sweep = TAU;
        }
        Ok(Self::new(center, radius, frame.normal, start_angle, sweep))
    }

    /// The arc's own frame, centered on the arc center.
    pub fn frame(&self) -> DrawingPlane {
        DrawingPlane::new(self.center, self.normal)
    }

    /// End angle (radians, not normalized).
    pub fn end_angle(&self) -> f64 {
        self.start_angle + self.sweep
    }

    /// World point at a frame-local angle.
    pub fn point_at_angle(&self, angle: f64) -> DVec3 {
        self.frame()
            .to_world(Point::ORIGIN + Vec2::from_angle(angle) * self.radius)
    }
}

impl PlacedObject for Arc {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Arc
    }

    fn endpoints(&self) -> Option<(DVec3, DVec3)> {
        Some((
            self.point_at_angle(self.start_angle),
            self.point_at_angle(self.end_angle()),
        ))
    }

    fn midpoint(&self) -> Option<DVec3> {
        Some(self.point_at_angle(self.start_angle + self.sweep / 2.0))
    }

    fn closest_point(&self, point: DVec3) -> Option<DVec3> {
        let local = self.frame().to_local(point).to_vec2();
        if local.hypot() < f64::EPSILON {
            return None;
        }
        let angle = local.atan2();
        if self.contains_angle(angle) {
            return Some(self.point_at_angle(angle));
        }
        let (a, b) = self.endpoints()?;
        Some(if a.distance(point) <= b.distance(point) { a } else { b })
    }

    fn is_closed(&self) -> bool {
        self.sweep >= TAU - ANGLE_EPSILON
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

    fn contains_angle(&self, angle: f64) -> bool {
        let rel = normalize_angle(angle - self.start_angle);
        rel <= self.sweep + ANGLE_EPSILON || rel >= TAU - ANGLE_EPSILON
    }

    fn validate(&self) -> GeometryResult<()> {
        ensure_finite(&[self.center, self.normal], "arc")?;
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(GeometryError::DegenerateRadius(self.radius));
        }
        if !(self.sweep > 0.0 && self.sweep <= TAU + ANGLE_EPSILON) {
            return Err(GeometryError::Malformed(format!("arc sweep {} out of range", self.sweep)));
        }
        Ok(())
    }
}
