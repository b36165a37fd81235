//! Polylines and closed polygons.

use super::{
    GeometryError, GeometryResult, ObjectId, ObjectKind, PlacedObject, chain_edges,
    closest_on_segment, ensure_finite,
};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chain of straight edges; closed polylines add an edge from the last
/// vertex back to the first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    pub(crate) id: ObjectId,
    pub vertices: Vec<DVec3>,
    pub closed: bool,
}

impl Polyline {
    /// Create a new polyline.
    pub fn new(vertices: Vec<DVec3>, closed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            vertices,
            closed,
        }
    }

    /// Edges as `(index, start, end)`, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (usize, DVec3, DVec3)> + '_ {
        chain_edges(&self.vertices, self.closed)
    }

    /// Vertex mean.
    pub fn centroid(&self) -> Option<DVec3> {
        if self.vertices.is_empty() {
            return None;
        }
        let sum = self.vertices.iter().fold(DVec3::ZERO, |acc, v| acc + *v);
        Some(sum / self.vertices.len() as f64)
    }

    /// Closest point over all edges and the index of the edge it lies on.
    pub fn closest_edge_point(&self, point: DVec3) -> Option<(usize, DVec3)> {
        self.edges()
            .map(|(i, a, b)| (i, closest_on_segment(point, a, b).0))
            .min_by(|(_, p), (_, q)| point.distance(*p).total_cmp(&point.distance(*q)))
    }
}

impl PlacedObject for Polyline {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn kind(&self) -> ObjectKind {
        ObjectKind::Polyline
    }

    fn endpoints(&self) -> Option<(DVec3, DVec3)> {
        Some((*self.vertices.first()?, *self.vertices.last()?))
    }

    fn closest_point(&self, point: DVec3) -> Option<DVec3> {
        match self.vertices.as_slice() {
            [only] => Some(*only),
            _ => self.closest_edge_point(point).map(|(_, p)| p),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn vertices(&self) -> Vec<DVec3> {
        self.vertices.clone()
    }

    fn center(&self) -> Option<DVec3> {
        if self.closed { self.centroid() } else { None }
    }

    fn validate(&self) -> GeometryResult<()> {
        if self.vertices.is_empty() {
            return Err(GeometryError::Malformed("polyline has no vertices".into()));
        }
        ensure_finite(&self.vertices, "polyline")
    }
}
