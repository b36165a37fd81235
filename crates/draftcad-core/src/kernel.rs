//! Geometry kernel interface.
//!
//! The drafting core never does boundary-representation math itself; finished
//! shapes are handed to a [`GeometryKernel`] which returns opaque handles.

use crate::geometry::{DrawingPlane, SceneObject};
use glam::DVec3;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Error type for kernel operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Unknown handle: {0}")]
    UnknownHandle(KernelHandle),

    #[error("Tessellation failed: {0}")]
    TessellationFailed(String),
}

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Opaque reference to a kernel-owned shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KernelHandle(Uuid);

impl KernelHandle {
    /// Create a fresh random handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for KernelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KernelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tessellation output: polyline wires as index pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TessellatedMesh {
    /// Vertex positions
    pub vertices: Vec<[f32; 3]>,
    /// Vertex normals (the shape's plane normal)
    pub normals: Vec<[f32; 3]>,
    /// Line indices (2 indices per segment)
    pub indices: Vec<u32>,
}

impl TessellatedMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Get the number of line segments
    pub fn segment_count(&self) -> usize {
        self.indices.len() / 2
    }
}

/// Tessellation quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TessellationParams {
    /// Maximum distance between a chord and the true curve.
    pub tolerance: f64,
    /// Upper bound on segments per full circle.
    pub max_segments: u32,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            tolerance: 0.01,
            max_segments: 128,
        }
    }
}

/// Minimum segments per full circle.
const MIN_CIRCLE_SEGMENTS: u32 = 8;

/// The geometry kernel seam.
pub trait GeometryKernel {
    /// Get the name of this kernel
    fn name(&self) -> &str;

    fn create_point(&mut self, position: DVec3) -> KernelResult<KernelHandle>;

    fn create_line(&mut self, start: DVec3, end: DVec3) -> KernelResult<KernelHandle>;

    fn create_circle(&mut self, center: DVec3, radius: f64, normal: DVec3) -> KernelResult<KernelHandle>;

    /// Counter-clockwise arc; angles are measured in the frame of `normal`.
    fn create_arc(
        &mut self,
        center: DVec3,
        radius: f64,
        normal: DVec3,
        start_angle: f64,
        sweep: f64,
    ) -> KernelResult<KernelHandle>;

    fn tessellate(&self, handle: KernelHandle, params: &TessellationParams) -> KernelResult<TessellatedMesh>;

    /// Drop a shape. Unknown handles are an error.
    fn release(&mut self, handle: KernelHandle) -> KernelResult<()>;
}

/// Build kernel shapes for a finished object.
///
/// Polylines become one line per edge. If any call fails, handles created so
/// far are released before the error is returned.
pub fn construct(kernel: &mut dyn GeometryKernel, object: &SceneObject) -> KernelResult<Vec<KernelHandle>> {
    let mut handles = Vec::new();
    if let Err(e) = build(kernel, object, &mut handles) {
        release_all(kernel, &handles);
        return Err(e);
    }
    Ok(handles)
}

/// Release every handle, logging (not propagating) failures.
pub fn release_all(kernel: &mut dyn GeometryKernel, handles: &[KernelHandle]) {
    for handle in handles {
        if let Err(e) = kernel.release(*handle) {
            log::warn!("Failed to release handle {}: {}", handle, e);
        }
    }
}

fn build(kernel: &mut dyn GeometryKernel, object: &SceneObject, handles: &mut Vec<KernelHandle>) -> KernelResult<()> {
    match object {
        SceneObject::Point(p) => handles.push(kernel.create_point(p.position)?),
        SceneObject::Segment(s) => handles.push(kernel.create_line(s.start, s.end)?),
        SceneObject::Circle(c) => handles.push(kernel.create_circle(c.center, c.radius, c.normal)?),
        SceneObject::Arc(a) => {
            handles.push(kernel.create_arc(a.center, a.radius, a.normal, a.start_angle, a.sweep)?)
        }
        SceneObject::Polyline(poly) => {
            for (_, a, b) in poly.edges() {
                handles.push(kernel.create_line(a, b)?);
            }
        }
    }
    Ok(())
}

/// Shapes held by [`InMemoryKernel`].
#[derive(Debug, Clone, PartialEq)]
enum KernelShape {
    Point(DVec3),
    Line(DVec3, DVec3),
    Arc {
        center: DVec3,
        radius: f64,
        normal: DVec3,
        start_angle: f64,
        sweep: f64,
    },
}

/// Kernel that keeps shapes in a map and tessellates curves into chords.
///
/// Used by tests and the replay harness. A failure can be scripted with
/// [`InMemoryKernel::fail_after`].
#[derive(Debug, Default)]
pub struct InMemoryKernel {
    shapes: HashMap<KernelHandle, KernelShape>,
    fail_after: Option<usize>,
    created: usize,
}

impl InMemoryKernel {
    /// Create an empty kernel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more create calls succeed, then fail every create call until
    /// [`InMemoryKernel::clear_failure`].
    pub fn fail_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// Stop failing create calls.
    pub fn clear_failure(&mut self) {
        self.fail_after = None;
    }

    /// Number of live shapes.
    pub fn live_count(&self) -> usize {
        self.shapes.len()
    }

    /// Total successful create calls.
    pub fn created_count(&self) -> usize {
        self.created
    }

    /// Check if a handle is live.
    pub fn contains(&self, handle: KernelHandle) -> bool {
        self.shapes.contains_key(&handle)
    }

    fn insert(&mut self, shape: KernelShape) -> KernelResult<KernelHandle> {
        match self.fail_after {
            Some(0) => {
                return Err(KernelError::OperationFailed("scripted kernel failure".into()));
            }
            Some(n) => self.fail_after = Some(n - 1),
            None => {}
        }
        let handle = KernelHandle::new();
        self.shapes.insert(handle, shape);
        self.created += 1;
        Ok(handle)
    }
}

fn check_finite(points: &[DVec3]) -> KernelResult<()> {
    if points.iter().all(|p| p.is_finite()) {
        Ok(())
    } else {
        Err(KernelError::InvalidInput("non-finite coordinates".into()))
    }
}

fn check_radius(radius: f64) -> KernelResult<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(KernelError::InvalidInput(format!("radius {radius}")))
    }
}

fn to_f32(p: DVec3) -> [f32; 3] {
    p.as_vec3().to_array()
}

impl GeometryKernel for InMemoryKernel {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn create_point(&mut self, position: DVec3) -> KernelResult<KernelHandle> {
        check_finite(&[position])?;
        self.insert(KernelShape::Point(position))
    }

    fn create_line(&mut self, start: DVec3, end: DVec3) -> KernelResult<KernelHandle> {
        check_finite(&[start, end])?;
        if start.distance(end) < f64::EPSILON {
            return Err(KernelError::InvalidInput("zero-length line".into()));
        }
        self.insert(KernelShape::Line(start, end))
    }

    fn create_circle(&mut self, center: DVec3, radius: f64, normal: DVec3) -> KernelResult<KernelHandle> {
        self.create_arc(center, radius, normal, 0.0, TAU)
    }

    fn create_arc(
        &mut self,
        center: DVec3,
        radius: f64,
        normal: DVec3,
        start_angle: f64,
        sweep: f64,
    ) -> KernelResult<KernelHandle> {
        check_finite(&[center, normal])?;
        check_radius(radius)?;
        if !(sweep > 0.0 && sweep <= TAU + 1e-9) {
            return Err(KernelError::InvalidInput(format!("sweep {sweep}")));
        }
        self.insert(KernelShape::Arc {
            center,
            radius,
            normal,
            start_angle,
            sweep,
        })
    }

    fn tessellate(&self, handle: KernelHandle, params: &TessellationParams) -> KernelResult<TessellatedMesh> {
        let shape = self
            .shapes
            .get(&handle)
            .ok_or(KernelError::UnknownHandle(handle))?;
        let mut mesh = TessellatedMesh::new();
        match shape {
            KernelShape::Point(p) => {
                mesh.vertices.push(to_f32(*p));
                mesh.normals.push(to_f32(DVec3::Z));
            }
            KernelShape::Line(a, b) => {
                mesh.vertices.extend([to_f32(*a), to_f32(*b)]);
                mesh.normals.extend([to_f32(DVec3::Z); 2]);
                mesh.indices.extend([0, 1]);
            }
            KernelShape::Arc {
                center,
                radius,
                normal,
                start_angle,
                sweep,
            } => {
                if !params.tolerance.is_finite() || params.tolerance <= 0.0 {
                    return Err(KernelError::TessellationFailed(format!(
                        "tolerance {}",
                        params.tolerance
                    )));
                }
                let frame = DrawingPlane::new(*center, *normal);
                let full = circle_segments(*radius, params);
                let count = ((full as f64 * sweep / TAU).ceil() as u32).max(1);
                let closed = *sweep >= TAU - 1e-9;
                let points = if closed { count } else { count + 1 };
                for i in 0..points {
                    let angle = start_angle + sweep * i as f64 / count as f64;
                    let p = frame.to_world(Point::ORIGIN + Vec2::from_angle(angle) * *radius);
                    mesh.vertices.push(to_f32(p));
                    mesh.normals.push(to_f32(frame.normal));
                }
                for i in 0..count {
                    mesh.indices.extend([i, (i + 1) % points]);
                }
            }
        }
        Ok(mesh)
    }

    fn release(&mut self, handle: KernelHandle) -> KernelResult<()> {
        self.shapes
            .remove(&handle)
            .map(|_| ())
            .ok_or(KernelError::UnknownHandle(handle))
    }
}

/// Segments per full circle so every chord stays within `tolerance`.
fn circle_segments(radius: f64, params: &TessellationParams) -> u32 {
    let max = params.max_segments.max(MIN_CIRCLE_SEGMENTS);
    if params.tolerance >= radius {
        return MIN_CIRCLE_SEGMENTS;
    }
    let half_angle = (1.0 - params.tolerance / radius).acos();
    let n = (TAU / (2.0 * half_angle)).ceil();
    (n as u32).clamp(MIN_CIRCLE_SEGMENTS, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Circle, Polyline, Segment};

    #[test]
    fn test_create_and_release() {
        let mut kernel = InMemoryKernel::new();
        let h = kernel.create_line(DVec3::ZERO, DVec3::X).unwrap();
        assert!(kernel.contains(h));
        kernel.release(h).unwrap();
        assert_eq!(kernel.live_count(), 0);
        assert_eq!(kernel.release(h), Err(KernelError::UnknownHandle(h)));
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut kernel = InMemoryKernel::new();
        assert!(kernel.create_line(DVec3::X, DVec3::X).is_err());
        assert!(kernel.create_circle(DVec3::ZERO, 0.0, DVec3::Z).is_err());
        assert!(kernel.create_point(DVec3::splat(f64::NAN)).is_err());
    }

    #[test]
    fn test_scripted_failure() {
        let mut kernel = InMemoryKernel::new();
        kernel.fail_after(1);
        assert!(kernel.create_point(DVec3::ZERO).is_ok());
        assert!(kernel.create_point(DVec3::ZERO).is_err());
        assert!(kernel.create_point(DVec3::ZERO).is_err());
        kernel.clear_failure();
        assert!(kernel.create_point(DVec3::ZERO).is_ok());
    }

    #[test]
    fn test_construct_polygon_one_line_per_edge() {
        let mut kernel = InMemoryKernel::new();
        let square = SceneObject::Polyline(Polyline::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y],
            true,
        ));
        let handles = construct(&mut kernel, &square).unwrap();
        assert_eq!(handles.len(), 4);
        assert_eq!(kernel.live_count(), 4);
    }

    #[test]
    fn test_construct_releases_on_partial_failure() {
        let mut kernel = InMemoryKernel::new();
        kernel.fail_after(2);
        let square = SceneObject::Polyline(Polyline::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y],
            true,
        ));
        assert!(construct(&mut kernel, &square).is_err());
        assert_eq!(kernel.live_count(), 0);
    }

    #[test]
    fn test_release_all_skips_unknown_handles() {
        let mut kernel = InMemoryKernel::new();
        let a = kernel.create_point(DVec3::ZERO).unwrap();
        let b = kernel.create_point(DVec3::X).unwrap();
        release_all(&mut kernel, &[a, KernelHandle::new(), b]);
        assert_eq!(kernel.live_count(), 0);
    }

    #[test]
    fn test_tessellate_circle_closes() {
        let mut kernel = InMemoryKernel::new();
        let circle = SceneObject::Circle(Circle::new(DVec3::ZERO, 10.0));
        let handles = construct(&mut kernel, &circle).unwrap();
        let mesh = kernel.tessellate(handles[0], &TessellationParams::default()).unwrap();
        assert!(mesh.segment_count() >= MIN_CIRCLE_SEGMENTS as usize);
        assert_eq!(mesh.vertices.len(), mesh.segment_count());
        assert_eq!(mesh.indices.last(), Some(&0));
    }

    #[test]
    fn test_tessellate_rejects_bad_tolerance() {
        let mut kernel = InMemoryKernel::new();
        let h = kernel.create_circle(DVec3::ZERO, 1.0, DVec3::Z).unwrap();
        for tolerance in [0.0, -1.0, f64::NAN] {
            let params = TessellationParams {
                tolerance,
                ..TessellationParams::default()
            };
            assert!(matches!(
                kernel.tessellate(h, &params),
                Err(KernelError::TessellationFailed(_))
            ));
        }
    }

    #[test]
    fn test_tessellate_line() {
        let mut kernel = InMemoryKernel::new();
        let seg = SceneObject::Segment(Segment::new(DVec3::ZERO, DVec3::new(3.0, 4.0, 0.0)));
        let handles = construct(&mut kernel, &seg).unwrap();
        let mesh = kernel.tessellate(handles[0], &TessellationParams::default()).unwrap();
        assert_eq!(mesh.segment_count(), 1);
        assert_eq!(mesh.vertices[1], [3.0, 4.0, 0.0]);
    }
}
