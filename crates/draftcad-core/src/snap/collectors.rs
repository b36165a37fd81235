//! Per-primitive snap collectors.

use super::{SnapCandidate, SnapFeature, SnapSettings, SnapType};
use crate::geometry::{
    GeometryError, GeometryResult, ObjectId, ObjectKind, PlacedObject, chain_edges,
    closest_on_segment, line_parameter,
};
use glam::DVec3;
use kurbo::{Point, Vec2};
use std::f64::consts::{FRAC_PI_2, PI};

/// Priority of a closed polygon's centroid (below a true center).
const CENTROID_PRIORITY: u8 = 7;

/// Lengths and radii below this are treated as degenerate.
const EPSILON: f64 = 1e-9;

/// Gathers candidates for one object, skipping disabled snap types.
struct Sink<'a> {
    cursor: DVec3,
    target: ObjectId,
    settings: &'a SnapSettings,
    out: Vec<SnapCandidate>,
}

impl Sink<'_> {
    fn push(&mut self, snap_type: SnapType, feature: SnapFeature, point: DVec3) {
        if self.settings.is_enabled(snap_type) {
            self.out.push(SnapCandidate::new(
                self.cursor,
                point,
                snap_type,
                feature,
                Some(self.target),
            ));
        }
    }

    fn push_ranked(&mut self, snap_type: SnapType, feature: SnapFeature, point: DVec3, priority: u8) {
        if self.settings.is_enabled(snap_type) {
            self.out.push(
                SnapCandidate::new(self.cursor, point, snap_type, feature, Some(self.target))
                    .with_priority(priority),
            );
        }
    }

    /// Whether `point` is within activation distance of any of `features`.
    fn near_any(&self, point: DVec3, features: &[DVec3]) -> bool {
        features
            .iter()
            .any(|f| f.distance(point) <= self.settings.activation_distance)
    }
}

/// Collect snap candidates for the cursor against one placed object.
///
/// `reference` is the previously accepted point, used for perpendicular feet.
/// Malformed objects are reported as an error so the caller can skip them.
pub fn collect(
    cursor: DVec3,
    object: &dyn PlacedObject,
    settings: &SnapSettings,
    reference: Option<DVec3>,
) -> GeometryResult<Vec<SnapCandidate>> {
    object.validate()?;
    let mut sink = Sink {
        cursor,
        target: object.id(),
        settings,
        out: Vec::new(),
    };
    match object.kind() {
        ObjectKind::Point => collect_node(object, &mut sink)?,
        ObjectKind::Segment => collect_segment(object, reference, &mut sink)?,
        ObjectKind::Circle | ObjectKind::Arc => collect_circular(object, &mut sink)?,
        ObjectKind::Polyline => collect_polyline(object, reference, &mut sink),
    }
    Ok(sink.out)
}

fn missing(what: &str) -> GeometryError {
    GeometryError::Malformed(format!("missing {what}"))
}

fn collect_node(object: &dyn PlacedObject, sink: &mut Sink<'_>) -> GeometryResult<()> {
    let position = object
        .vertices()
        .first()
        .copied()
        .or_else(|| object.endpoints().map(|(a, _)| a))
        .ok_or_else(|| missing("point position"))?;
    sink.push(SnapType::Node, SnapFeature::Node, position);
    Ok(())
}

fn collect_segment(
    object: &dyn PlacedObject,
    reference: Option<DVec3>,
    sink: &mut Sink<'_>,
) -> GeometryResult<()> {
    let (start, end) = object.endpoints().ok_or_else(|| missing("segment endpoints"))?;
    let mid = object.midpoint().unwrap_or((start + end) * 0.5);
    sink.push(SnapType::Endpoint, SnapFeature::Start, start);
    sink.push(SnapType::Endpoint, SnapFeature::End, end);
    sink.push(SnapType::Midpoint, SnapFeature::Midpoint, mid);

    let Some(t) = line_parameter(sink.cursor, start, end) else {
        return Ok(());
    };
    let on_line = start.lerp(end, t);
    if (0.0..=1.0).contains(&t) {
        if !sink.near_any(on_line, &[start, end, mid]) {
            sink.push(SnapType::Nearest, SnapFeature::Nearest, on_line);
        }
    } else {
        sink.push(SnapType::Extension, SnapFeature::Extension, on_line);
    }

    if let Some(foot) = reference.and_then(|r| perpendicular_foot(r, start, end)) {
        sink.push(SnapType::Perpendicular, SnapFeature::Perpendicular, foot);
    }
    Ok(())
}

/// Foot of the perpendicular from `reference` onto segment `a`→`b`, if it
/// lies on the segment and differs from the reference.
fn perpendicular_foot(reference: DVec3, a: DVec3, b: DVec3) -> Option<DVec3> {
    let t = line_parameter(reference, a, b).filter(|t| (0.0..=1.0).contains(t))?;
    let foot = a.lerp(b, t);
    (foot.distance(reference) > EPSILON).then_some(foot)
}

fn collect_circular(object: &dyn PlacedObject, sink: &mut Sink<'_>) -> GeometryResult<()> {
    let center = object.center().ok_or_else(|| missing("center"))?;
    let radius = object.radius().ok_or_else(|| missing("radius"))?;
    let frame = object.plane().with_origin(center);
    let on_circle = |angle: f64| frame.to_world(Point::ORIGIN + Vec2::from_angle(angle) * radius);

    sink.push(SnapType::Center, SnapFeature::Center, center);

    if object.kind() == ObjectKind::Arc {
        let (start, end) = object.endpoints().ok_or_else(|| missing("arc endpoints"))?;
        sink.push(SnapType::Endpoint, SnapFeature::Start, start);
        sink.push(SnapType::Endpoint, SnapFeature::End, end);
        if let Some(mid) = object.midpoint() {
            sink.push(SnapType::Midpoint, SnapFeature::Midpoint, mid);
        }
    }

    for (i, angle) in [0.0, FRAC_PI_2, PI, 3.0 * FRAC_PI_2].into_iter().enumerate() {
        if object.contains_angle(angle) {
            sink.push(SnapType::Quadrant, SnapFeature::Quadrant(i as u8), on_circle(angle));
        }
    }

    let local = frame.to_local(sink.cursor).to_vec2();
    let d = local.hypot();
    if d < EPSILON {
        // Cursor on the center: no radius direction, no tangents.
        return Ok(());
    }

    let cursor_angle = local.atan2();
    if object.contains_angle(cursor_angle) {
        sink.push(SnapType::Nearest, SnapFeature::Nearest, on_circle(cursor_angle));
    }

    if d > radius {
        let theta = (radius / d).asin();
        let toward_center = (-local).atan2();
        let reach = (d * d - radius * radius).sqrt();
        for (i, side) in [1.0, -1.0].into_iter().enumerate() {
            let touch = Point::ORIGIN + local + Vec2::from_angle(toward_center + side * theta) * reach;
            if object.contains_angle(touch.to_vec2().atan2()) {
                sink.push(SnapType::Tangent, SnapFeature::Tangent(i as u8), frame.to_world(touch));
            }
        }
    }
    Ok(())
}

fn collect_polyline(object: &dyn PlacedObject, reference: Option<DVec3>, sink: &mut Sink<'_>) {
    let vertices = object.vertices();
    let closed = object.is_closed();

    for (i, v) in vertices.iter().enumerate() {
        sink.push(SnapType::Endpoint, SnapFeature::Vertex(i), *v);
    }

    let edges: Vec<_> = chain_edges(&vertices, closed).collect();
    let mut features = vertices.clone();
    for (i, a, b) in &edges {
        let mid = (*a + *b) * 0.5;
        features.push(mid);
        sink.push(SnapType::Midpoint, SnapFeature::EdgeMidpoint(*i), mid);
    }

    if closed && vertices.len() >= 3 {
        if let Some(centroid) = object.center() {
            sink.push_ranked(SnapType::Center, SnapFeature::Centroid, centroid, CENTROID_PRIORITY);
        }
    }

    let closest = edges
        .iter()
        .map(|(_, a, b)| (*a, *b, closest_on_segment(sink.cursor, *a, *b).0))
        .min_by(|(_, _, p), (_, _, q)| sink.cursor.distance(*p).total_cmp(&sink.cursor.distance(*q)));
    if let Some((a, b, nearest)) = closest {
        if !sink.near_any(nearest, &features) {
            sink.push(SnapType::Nearest, SnapFeature::Nearest, nearest);
        }
        if let Some(foot) = reference.and_then(|r| perpendicular_foot(r, a, b)) {
            sink.push(SnapType::Perpendicular, SnapFeature::Perpendicular, foot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Arc, Circle, PointMark, Polyline, Segment};
    use approx::assert_relative_eq;

    fn settings() -> SnapSettings {
        SnapSettings::default()
    }

    fn find(cands: &[SnapCandidate], feature: SnapFeature) -> Option<&SnapCandidate> {
        cands.iter().find(|c| c.feature == feature)
    }

    #[test]
    fn test_segment_endpoints_and_midpoint() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let cands = collect(DVec3::new(0.1, 0.1, 0.0), &seg, &settings(), None).unwrap();

        let start = find(&cands, SnapFeature::Start).unwrap();
        assert_eq!(start.snap_type, SnapType::Endpoint);
        assert_eq!(start.priority, 10);
        assert_eq!(start.target, Some(seg.id()));
        let mid = find(&cands, SnapFeature::Midpoint).unwrap();
        assert_relative_eq!(mid.point.x, 5.0);
        assert_eq!(mid.priority, 8);
        // Closest point is within activation of the start, so no nearest.
        assert!(find(&cands, SnapFeature::Nearest).is_none());
    }

    #[test]
    fn test_segment_nearest_away_from_features() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let cands = collect(DVec3::new(2.5, 0.3, 0.0), &seg, &settings(), None).unwrap();
        let nearest = find(&cands, SnapFeature::Nearest).unwrap();
        assert_relative_eq!(nearest.point.x, 2.5);
        assert_relative_eq!(nearest.point.y, 0.0);
        assert_relative_eq!(nearest.distance, 0.3);
    }

    #[test]
    fn test_segment_extension_only_when_enabled() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let cursor = DVec3::new(12.0, 0.2, 0.0);
        let cands = collect(cursor, &seg, &settings(), None).unwrap();
        assert!(find(&cands, SnapFeature::Extension).is_none());

        let mut s = settings();
        s.types.set(SnapType::Extension, true);
        let cands = collect(cursor, &seg, &s, None).unwrap();
        let ext = find(&cands, SnapFeature::Extension).unwrap();
        assert_relative_eq!(ext.point.x, 12.0);
        assert_eq!(ext.priority, 3);
    }

    #[test]
    fn test_segment_perpendicular_foot() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let reference = DVec3::new(4.0, 6.0, 0.0);
        let cands = collect(DVec3::new(4.1, 0.2, 0.0), &seg, &settings(), Some(reference)).unwrap();
        let perp = find(&cands, SnapFeature::Perpendicular).unwrap();
        assert_relative_eq!(perp.point.x, 4.0);
        assert_relative_eq!(perp.point.y, 0.0);
    }

    #[test]
    fn test_circle_quadrants_and_center() {
        let circle = Circle::new(DVec3::new(1.0, 1.0, 0.0), 2.0);
        let cands = collect(DVec3::new(3.0, 1.1, 0.0), &circle, &settings(), None).unwrap();
        assert_eq!(cands.iter().filter(|c| c.snap_type == SnapType::Quadrant).count(), 4);
        let q0 = find(&cands, SnapFeature::Quadrant(0)).unwrap();
        assert_relative_eq!(q0.point.x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(q0.point.y, 1.0, epsilon = 1e-9);
        assert!(find(&cands, SnapFeature::Center).is_some());
    }

    #[test]
    fn test_circle_tangents_from_external_point() {
        let circle = Circle::new(DVec3::ZERO, 5.0);
        let cursor = DVec3::new(10.0, 0.0, 0.0);
        let cands = collect(cursor, &circle, &settings(), None).unwrap();
        let tangents: Vec<_> = cands.iter().filter(|c| c.snap_type == SnapType::Tangent).collect();
        assert_eq!(tangents.len(), 2);
        for t in tangents {
            assert_relative_eq!(t.point.length(), 5.0, epsilon = 1e-9);
            assert_relative_eq!(t.point.distance(cursor), 75.0_f64.sqrt(), epsilon = 1e-9);
            assert_eq!(t.priority, 7);
        }
    }

    #[test]
    fn test_no_tangents_inside_or_on_circle() {
        let circle = Circle::new(DVec3::ZERO, 5.0);
        for cursor in [DVec3::new(3.0, 0.0, 0.0), DVec3::new(5.0, 0.0, 0.0)] {
            let cands = collect(cursor, &circle, &settings(), None).unwrap();
            assert!(cands.iter().all(|c| c.snap_type != SnapType::Tangent));
        }
    }

    #[test]
    fn test_arc_suppresses_outside_sweep() {
        // Quarter arc from 0 to 90 degrees.
        let arc = Arc::new(DVec3::ZERO, 5.0, DVec3::Z, 0.0, FRAC_PI_2);
        let cands = collect(DVec3::new(-5.0, -0.2, 0.0), &arc, &settings(), None).unwrap();
        assert!(find(&cands, SnapFeature::Quadrant(2)).is_none());
        assert!(find(&cands, SnapFeature::Quadrant(3)).is_none());
        assert!(find(&cands, SnapFeature::Quadrant(0)).is_some());
        assert!(find(&cands, SnapFeature::Nearest).is_none());
        assert!(find(&cands, SnapFeature::Start).is_some());
        assert!(find(&cands, SnapFeature::End).is_some());
        let mid = find(&cands, SnapFeature::Midpoint).unwrap();
        assert_relative_eq!(mid.point.x, mid.point.y, epsilon = 1e-9);
    }

    #[test]
    fn test_polygon_vertices_edges_and_centroid() {
        let square = Polyline::new(
            vec![
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(4.0, 0.0, 0.0),
                DVec3::new(4.0, 4.0, 0.0),
                DVec3::new(0.0, 4.0, 0.0),
            ],
            true,
        );
        let cands = collect(DVec3::new(2.0, 2.0, 0.0), &square, &settings(), None).unwrap();
        assert!(find(&cands, SnapFeature::Vertex(3)).is_some());
        // Closing edge midpoint
        let closing = find(&cands, SnapFeature::EdgeMidpoint(3)).unwrap();
        assert_relative_eq!(closing.point.y, 2.0);
        assert_relative_eq!(closing.point.x, 0.0);
        let centroid = find(&cands, SnapFeature::Centroid).unwrap();
        assert_eq!(centroid.priority, CENTROID_PRIORITY);
        assert_relative_eq!(centroid.distance, 0.0);
    }

    #[test]
    fn test_open_polyline_has_no_centroid() {
        let line = Polyline::new(vec![DVec3::ZERO, DVec3::X * 3.0, DVec3::new(3.0, 3.0, 0.0)], false);
        let cands = collect(DVec3::new(1.0, 1.0, 0.0), &line, &settings(), None).unwrap();
        assert!(find(&cands, SnapFeature::Centroid).is_none());
        assert!(find(&cands, SnapFeature::EdgeMidpoint(2)).is_none());
    }

    #[test]
    fn test_point_node() {
        let mark = PointMark::new(DVec3::new(1.0, 2.0, 0.0));
        let cands = collect(DVec3::new(1.1, 2.0, 0.0), &mark, &settings(), None).unwrap();
        assert_eq!(cands.len(), 1);
        assert_eq!(cands[0].snap_type, SnapType::Node);
        assert_eq!(cands[0].priority, 10);
    }

    #[test]
    fn test_malformed_object_is_error() {
        let circle = Circle::new(DVec3::ZERO, -1.0);
        assert!(collect(DVec3::ZERO, &circle, &settings(), None).is_err());
    }

    #[test]
    fn test_disabled_types_are_skipped() {
        let mut s = settings();
        s.types.set(SnapType::Endpoint, false);
        let seg = Segment::new(DVec3::ZERO, DVec3::X);
        let cands = collect(DVec3::ZERO, &seg, &s, None).unwrap();
        assert!(cands.iter().all(|c| c.snap_type != SnapType::Endpoint));
    }
}
