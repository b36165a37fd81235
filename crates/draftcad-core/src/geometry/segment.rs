//! Line segment.

use super::{GeometryResult, ObjectId, ObjectKind, PlacedObject, closest_on_segment, ensure_finite};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A straight segment between two world points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub(crate) id: ObjectId,
    /// Start point.
    pub start: DVec3,
    /// End point.
    pub end: DVec3,
}

impl Segment {
    /// Create a new segment.
    pub fn new(start: DVec3, end: DVec3) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
        }
    }

    /// Get the length of the segment.
    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Get the midpoint of the segment.
    pub fn midpoint(&self) -> DVec3 {
        (self.start + self.end) * 0.5
    }
}

impl PlacedObject for Segment {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Segment
    }

    fn endpoints(&self) -> Option<(DVec3, DVec3)> {
        Some((self.start, self.end))
    }

    fn midpoint(&self) -> Option<DVec3> {
        Some(Segment::midpoint(self))
    }

    fn closest_point(&self, point: DVec3) -> Option<DVec3> {
        Some(closest_on_segment(point, self.start, self.end).0)
    }

    fn vertices(&self) -> Vec<DVec3> {
        vec![self.start, self.end]
    }

    fn validate(&self) -> GeometryResult<()> {
        ensure_finite(&[self.start, self.end], "segment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_length_and_midpoint() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        assert_relative_eq!(seg.length(), 10.0);
        assert_relative_eq!(seg.midpoint().x, 5.0);
        assert_eq!(seg.endpoints(), Some((DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0))));
    }
}
