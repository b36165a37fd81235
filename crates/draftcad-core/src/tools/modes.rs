//! Per-mode drawing strategies.

use super::{DrawMode, ToolOptions};
use crate::geometry::{
    Arc, Circle, GeometryError, GeometryResult, PointMark, Polyline, SceneObject, Segment,
    circle_through, ensure_equal_radius,
};
use glam::DVec3;
use kurbo::{Point, Vec2};
use std::f64::consts::TAU;
use std::fmt;

/// How many points a mode consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCount {
    /// Completes automatically on the n-th point.
    Exactly(usize),
    /// Needs at least n points; completes on `finish()` or by closing.
    AtLeast(usize),
}

impl PointCount {
    /// Get the minimum point count.
    pub fn min(self) -> usize {
        match self {
            PointCount::Exactly(n) | PointCount::AtLeast(n) => n,
        }
    }

    /// Whether `count` points complete the shape without an explicit finish.
    pub fn is_reached(self, count: usize) -> bool {
        matches!(self, PointCount::Exactly(n) if count >= n)
    }
}

/// Mode-specific rules plugged into the [`DrawTool`](super::DrawTool) driver.
pub trait ToolStrategy: fmt::Debug {
    fn mode(&self) -> DrawMode;

    fn required_points(&self) -> PointCount;

    /// Check the accepted points so far, newest last. Called after every
    /// point and again before construction.
    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()>;

    /// Build the finished object from a validated point list.
    fn build_geometry(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<SceneObject>;

    fn can_complete(&self, points: &[DVec3]) -> bool {
        match self.required_points() {
            PointCount::Exactly(n) => points.len() == n,
            PointCount::AtLeast(n) => points.len() >= n,
        }
    }

    /// Rubber-band shape for the accepted points plus the cursor.
    fn preview(&self, points: &[DVec3], cursor: DVec3, options: &ToolOptions) -> Option<SceneObject> {
        if points.is_empty() {
            return None;
        }
        let mut all = points.to_vec();
        all.push(cursor);
        if !self.can_complete(&all) {
            return None;
        }
        self.validate(&all, options).ok()?;
        self.build_geometry(&all, options).ok()
    }

    /// Where a click at `point` closes the shape, if it does.
    fn close_target(&self, _points: &[DVec3], _point: DVec3, _options: &ToolOptions) -> Option<DVec3> {
        None
    }

    /// Prompt shown after `count` accepted points.
    fn prompt(&self, count: usize) -> String;
}

/// Fail if the newest point repeats the previous one.
fn check_distinct(points: &[DVec3], tolerance: f64) -> GeometryResult<()> {
    if let [.., prev, last] = points {
        let distance = prev.distance(*last);
        if distance < tolerance {
            return Err(GeometryError::TooClose { distance, min: tolerance });
        }
    }
    Ok(())
}

fn check_finite(points: &[DVec3]) -> GeometryResult<()> {
    if points.iter().all(|p| p.is_finite()) {
        Ok(())
    } else {
        Err(GeometryError::Malformed("non-finite input point".into()))
    }
}

fn check_radius(radius: f64, options: &ToolOptions) -> GeometryResult<()> {
    if radius < options.min_radius {
        return Err(GeometryError::DegenerateRadius(radius));
    }
    Ok(())
}

fn need(points: &[DVec3], required: usize) -> GeometryResult<()> {
    if points.len() < required {
        return Err(GeometryError::NotEnoughPoints {
            required,
            got: points.len(),
        });
    }
    Ok(())
}

#[derive(Debug)]
pub struct PointStrategy;

impl ToolStrategy for PointStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::Point
    }

    fn required_points(&self) -> PointCount {
        PointCount::Exactly(1)
    }

    fn validate(&self, points: &[DVec3], _options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)
    }

    fn build_geometry(&self, points: &[DVec3], _options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 1)?;
        Ok(SceneObject::Point(PointMark::new(points[0])))
    }

    fn prompt(&self, _count: usize) -> String {
        "Specify point".into()
    }
}

#[derive(Debug)]
pub struct SegmentStrategy;

impl ToolStrategy for SegmentStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::Segment
    }

    fn required_points(&self) -> PointCount {
        PointCount::Exactly(2)
    }

    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)?;
        check_distinct(points, options.point_tolerance)?;
        if let [start, end] = points {
            let length = start.distance(*end);
            if length < options.min_segment_length {
                return Err(GeometryError::TooShort {
                    length,
                    min: options.min_segment_length,
                });
            }
        }
        Ok(())
    }

    fn build_geometry(&self, points: &[DVec3], _options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 2)?;
        Ok(SceneObject::Segment(Segment::new(points[0], points[1])))
    }

    fn prompt(&self, count: usize) -> String {
        match count {
            0 => "Specify start point".into(),
            _ => "Specify end point".into(),
        }
    }
}

#[derive(Debug)]
pub struct CircleCenterRadiusStrategy;

impl ToolStrategy for CircleCenterRadiusStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::CircleCenterRadius
    }

    fn required_points(&self) -> PointCount {
        PointCount::Exactly(2)
    }

    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)?;
        if let [center, edge] = points {
            check_radius(center.distance(*edge), options)?;
        }
        Ok(())
    }

    fn build_geometry(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 2)?;
        let radius = points[0].distance(points[1]);
        Ok(SceneObject::Circle(Circle::with_normal(points[0], radius, options.plane.normal)))
    }

    fn prompt(&self, count: usize) -> String {
        match count {
            0 => "Specify center".into(),
            _ => "Specify radius".into(),
        }
    }
}

#[derive(Debug)]
pub struct Circle3PointStrategy;

impl ToolStrategy for Circle3PointStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::Circle3Point
    }

    fn required_points(&self) -> PointCount {
        PointCount::Exactly(3)
    }

    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)?;
        check_distinct(points, options.point_tolerance)?;
        if let [a, b, c] = points {
            let (_, radius) = circle_through(*a, *b, *c, &options.plane)?;
            check_radius(radius, options)?;
        }
        Ok(())
    }

    fn build_geometry(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 3)?;
        let (center, radius) = circle_through(points[0], points[1], points[2], &options.plane)?;
        Ok(SceneObject::Circle(Circle::with_normal(center, radius, options.plane.normal)))
    }

    fn prompt(&self, count: usize) -> String {
        format!("Specify point {} on circle", count + 1)
    }
}

#[derive(Debug)]
pub struct RectangleStrategy;

impl RectangleStrategy {
    /// Plane-local extent of the rectangle spanned by two opposite corners.
    fn extent(points: &[DVec3], options: &ToolOptions) -> Vec2 {
        let frame = options.plane.with_origin(points[0]);
        frame.to_local(points[1]).to_vec2()
    }
}

impl ToolStrategy for RectangleStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::Rectangle
    }

    fn required_points(&self) -> PointCount {
        PointCount::Exactly(2)
    }

    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)?;
        if points.len() == 2 {
            let size = Self::extent(points, options);
            if size.x.abs() < options.point_tolerance || size.y.abs() < options.point_tolerance {
                return Err(GeometryError::DegenerateRectangle);
            }
        }
        Ok(())
    }

    fn build_geometry(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 2)?;
        let frame = options.plane.with_origin(points[0]);
        let size = Self::extent(points, options);
        let corners = [
            Point::ORIGIN,
            Point::new(size.x, 0.0),
            Point::new(size.x, size.y),
            Point::new(0.0, size.y),
        ];
        let vertices = corners.into_iter().map(|c| frame.to_world(c)).collect();
        Ok(SceneObject::Polyline(Polyline::new(vertices, true)))
    }

    fn prompt(&self, count: usize) -> String {
        match count {
            0 => "Specify first corner".into(),
            _ => "Specify opposite corner".into(),
        }
    }
}

#[derive(Debug)]
pub struct RegularPolygonStrategy;

impl ToolStrategy for RegularPolygonStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::RegularPolygon
    }

    fn required_points(&self) -> PointCount {
        PointCount::Exactly(2)
    }

    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)?;
        if let [center, corner] = points {
            check_radius(center.distance(*corner), options)?;
        }
        Ok(())
    }

    fn build_geometry(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 2)?;
        let frame = options.plane.with_origin(points[0]);
        let first = frame.to_local(points[1]).to_vec2();
        let radius = first.hypot();
        let start = first.atan2();
        let sides = options.sides();
        let vertices = (0..sides)
            .map(|i| {
                let angle = start + TAU * i as f64 / sides as f64;
                frame.to_world(Point::ORIGIN + Vec2::from_angle(angle) * radius)
            })
            .collect();
        Ok(SceneObject::Polyline(Polyline::new(vertices, true)))
    }

    fn prompt(&self, count: usize) -> String {
        match count {
            0 => "Specify polygon center".into(),
            _ => "Specify corner".into(),
        }
    }
}

#[derive(Debug)]
pub struct ArcFromCenterStrategy;

impl ToolStrategy for ArcFromCenterStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::ArcFromCenter
    }

    fn required_points(&self) -> PointCount {
        PointCount::Exactly(3)
    }

    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)?;
        check_distinct(points, options.point_tolerance)?;
        match points {
            [center, start] => check_radius(center.distance(*start), options),
            [center, start, end] => {
                check_radius(center.distance(*start), options)?;
                ensure_equal_radius(*center, *start, *end, options.radius_tolerance).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    fn build_geometry(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 3)?;
        let arc = Arc::from_center_points(points[0], points[1], points[2], options.plane.normal)?;
        Ok(SceneObject::Arc(arc))
    }

    /// The end point only sets the direction while rubber-banding.
    fn preview(&self, points: &[DVec3], cursor: DVec3, options: &ToolOptions) -> Option<SceneObject> {
        match points {
            [center] => {
                let radius = center.distance(cursor);
                (radius >= options.min_radius)
                    .then(|| SceneObject::Circle(Circle::with_normal(*center, radius, options.plane.normal)))
            }
            [center, start] => Arc::from_center_points(*center, *start, cursor, options.plane.normal)
                .ok()
                .map(SceneObject::Arc),
            _ => None,
        }
    }

    fn prompt(&self, count: usize) -> String {
        match count {
            0 => "Specify arc center".into(),
            1 => "Specify start point".into(),
            _ => "Specify end point".into(),
        }
    }
}

#[derive(Debug)]
pub struct PolylineStrategy;

impl ToolStrategy for PolylineStrategy {
    fn mode(&self) -> DrawMode {
        DrawMode::Polyline
    }

    fn required_points(&self) -> PointCount {
        PointCount::AtLeast(2)
    }

    fn validate(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<()> {
        check_finite(points)?;
        check_distinct(points, options.point_tolerance)
    }

    /// A last point equal to the first closes the polyline.
    fn build_geometry(&self, points: &[DVec3], options: &ToolOptions) -> GeometryResult<SceneObject> {
        need(points, 2)?;
        if let [first, .., last] = points {
            if points.len() >= 4 && first.distance(*last) < options.point_tolerance {
                let vertices = points[..points.len() - 1].to_vec();
                return Ok(SceneObject::Polyline(Polyline::new(vertices, true)));
            }
        }
        Ok(SceneObject::Polyline(Polyline::new(points.to_vec(), false)))
    }

    fn preview(&self, points: &[DVec3], cursor: DVec3, _options: &ToolOptions) -> Option<SceneObject> {
        if points.is_empty() {
            return None;
        }
        let mut vertices = points.to_vec();
        vertices.push(cursor);
        Some(SceneObject::Polyline(Polyline::new(vertices, false)))
    }

    fn close_target(&self, points: &[DVec3], point: DVec3, options: &ToolOptions) -> Option<DVec3> {
        let first = *points.first()?;
        (points.len() >= 3 && first.distance(point) <= options.close_tolerance).then_some(first)
    }

    fn prompt(&self, count: usize) -> String {
        match count {
            0 => "Specify first point".into(),
            1 => "Specify next point".into(),
            _ => "Specify next point, click the first point to close, or finish".into(),
        }
    }
}
