//! Standalone point marks (snap nodes).

use super::{GeometryResult, ObjectId, ObjectKind, PlacedObject, ensure_finite};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single placed point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMark {
    pub(crate) id: ObjectId,
    pub position: DVec3,
}

impl PointMark {
    /// Create a new point mark.
    pub fn new(position: DVec3) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
        }
    }
}

impl PlacedObject for PointMark {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Point
    }

    fn closest_point(&self, _point: DVec3) -> Option<DVec3> {
        Some(self.position)
    }

    fn vertices(&self) -> Vec<DVec3> {
        vec![self.position]
    }

    fn validate(&self) -> GeometryResult<()> {
        ensure_finite(&[self.position], "point")
    }
}
