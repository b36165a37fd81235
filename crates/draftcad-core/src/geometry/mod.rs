//! Geometry model for placed drafting objects.
//!
//! Placed objects are owned by the document; the snapping pipeline only reads
//! them through the [`PlacedObject`] capability trait.

mod arc;
mod circle;
mod fit;
mod plane;
mod point;
mod polyline;
mod segment;

pub use arc::Arc;
pub use circle::Circle;
pub use fit::{FIT_TOLERANCE, circle_through, ensure_equal_radius};
pub use plane::DrawingPlane;
pub use point::PointMark;
pub use polyline::Polyline;
pub use segment::Segment;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for placed objects.
pub type ObjectId = Uuid;

/// Geometry validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("Points too close: {distance} < {min}")]
    TooClose { distance: f64, min: f64 },
    #[error("Length {length} is below the minimum {min}")]
    TooShort { length: f64, min: f64 },
    #[error("Points are collinear, no circle passes through them")]
    Collinear,
    #[error("Degenerate radius: {0}")]
    DegenerateRadius(f64),
    #[error("Start radius {start} and end radius {end} differ")]
    UnequalRadius { start: f64, end: f64 },
    #[error("Rectangle has zero width or height")]
    DegenerateRectangle,
    #[error("Malformed geometry: {0}")]
    Malformed(String),
    #[error("Need {required} points, got {got}")]
    NotEnoughPoints { required: usize, got: usize },
}

/// Result type for geometry operations.
pub type GeometryResult<T> = Result<T, GeometryError>;

/// Primitive family of a placed object; selects the snap rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Point,
    Segment,
    Circle,
    Arc,
    Polyline,
}

/// Read-only queries the snapping pipeline may run against a placed object.
///
/// Capabilities that do not apply to a primitive return `None` or an empty
/// list. Implementations never mutate themselves in response to a query.
pub trait PlacedObject {
    /// Get the unique identifier.
    fn id(&self) -> ObjectId;

    /// Primitive family.
    fn kind(&self) -> ObjectKind;

    /// Start and end point (angular endpoints for arcs).
    fn endpoints(&self) -> Option<(DVec3, DVec3)> {
        None
    }

    /// Midpoint (angular midpoint for arcs).
    fn midpoint(&self) -> Option<DVec3> {
        None
    }

    /// Closest point on the object to `point`.
    fn closest_point(&self, point: DVec3) -> Option<DVec3>;

    /// Whether the object forms a closed loop.
    fn is_closed(&self) -> bool {
        false
    }

    /// Ordered vertices for polyline-like objects.
    fn vertices(&self) -> Vec<DVec3> {
        Vec::new()
    }

    fn center(&self) -> Option<DVec3> {
        None
    }

    fn radius(&self) -> Option<f64> {
        None
    }

    /// The object's own frame; circles and arcs measure angles in it.
    fn plane(&self) -> DrawingPlane {
        DrawingPlane::xy()
    }

    /// Whether a plane-local angle (radians) lies on the object.
    fn contains_angle(&self, _angle: f64) -> bool {
        true
    }

    /// Reject malformed geometry (non-finite coordinates, negative radius, ...).
    fn validate(&self) -> GeometryResult<()>;
}

/// Enum wrapper for all placed object types (for storage and events).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneObject {
    Point(PointMark),
    Segment(Segment),
    Circle(Circle),
    Arc(Arc),
    Polyline(Polyline),
}

impl SceneObject {
    /// Borrow as a capability trait object.
    pub fn as_placed(&self) -> &dyn PlacedObject {
        match self {
            SceneObject::Point(s) => s,
            SceneObject::Segment(s) => s,
            SceneObject::Circle(s) => s,
            SceneObject::Arc(s) => s,
            SceneObject::Polyline(s) => s,
        }
    }

    /// Get the type name of this object.
    pub fn type_name(&self) -> &'static str {
        match self {
            SceneObject::Point(_) => "Point",
            SceneObject::Segment(_) => "Segment",
            SceneObject::Circle(_) => "Circle",
            SceneObject::Arc(_) => "Arc",
            SceneObject::Polyline(_) => "Polyline",
        }
    }
}

impl PlacedObject for SceneObject {
    fn id(&self) -> ObjectId {
        self.as_placed().id()
    }

    fn kind(&self) -> ObjectKind {
        self.as_placed().kind()
    }

    fn endpoints(&self) -> Option<(DVec3, DVec3)> {
        self.as_placed().endpoints()
    }

    fn midpoint(&self) -> Option<DVec3> {
        self.as_placed().midpoint()
    }

    fn closest_point(&self, point: DVec3) -> Option<DVec3> {
        self.as_placed().closest_point(point)
    }

    fn is_closed(&self) -> bool {
        self.as_placed().is_closed()
    }

    fn vertices(&self) -> Vec<DVec3> {
        self.as_placed().vertices()
    }

    fn center(&self) -> Option<DVec3> {
        self.as_placed().center()
    }

    fn radius(&self) -> Option<f64> {
        self.as_placed().radius()
    }

    fn plane(&self) -> DrawingPlane {
        self.as_placed().plane()
    }

    fn contains_angle(&self, angle: f64) -> bool {
        self.as_placed().contains_angle(angle)
    }

    fn validate(&self) -> GeometryResult<()> {
        self.as_placed().validate()
    }
}

/// Fail with [`GeometryError::Malformed`] if any coordinate is NaN or infinite.
pub(crate) fn ensure_finite(points: &[DVec3], what: &str) -> GeometryResult<()> {
    if points.iter().all(|p| p.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::Malformed(format!("{what} has non-finite coordinates")))
    }
}

/// Wrap an angle into `[0, TAU)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU { 0.0 } else { a }
}

/// Parameter of the projection of `point` onto the infinite line through
/// `a`→`b`: 0 at `a`, 1 at `b`. `None` for a zero-length segment.
pub(crate) fn line_parameter(point: DVec3, a: DVec3, b: DVec3) -> Option<f64> {
    let seg = b - a;
    let len_sq = seg.length_squared();
    if len_sq < f64::EPSILON {
        return None;
    }
    Some((point - a).dot(seg) / len_sq)
}

/// Closest point to `point` on segment `a`→`b` and its clamped parameter.
pub(crate) fn closest_on_segment(point: DVec3, a: DVec3, b: DVec3) -> (DVec3, f64) {
    match line_parameter(point, a, b) {
        Some(t) => {
            let t = t.clamp(0.0, 1.0);
            (a.lerp(b, t), t)
        }
        None => (a, 0.0),
    }
}

/// Edges `(index, start, end)` of a vertex chain, with the closing edge when
/// `closed`.
pub(crate) fn chain_edges(
    vertices: &[DVec3],
    closed: bool,
) -> impl Iterator<Item = (usize, DVec3, DVec3)> + '_ {
    let n = vertices.len();
    let count = match (n, closed) {
        (0 | 1, _) => 0,
        (2, _) => 1,
        (_, true) => n,
        (_, false) => n - 1,
    };
    (0..count).map(move |i| (i, vertices[i], vertices[(i + 1) % n]))
}
