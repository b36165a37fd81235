//! Cross-object snapping: intersections and parallels.
//!
//! Both collectors work in world XY; circles and arcs take part only when
//! their plane is parallel to it.

use super::grid::{angular_difference, bearing_degrees};
use super::{SnapCandidate, SnapFeature, SnapSettings, SnapType};
use crate::geometry::{ObjectKind, PlacedObject, chain_edges};
use glam::{DVec2, DVec3};

const EPSILON: f64 = 1e-9;

/// Straight or circular piece of a placed object.
#[derive(Debug, Clone, Copy)]
enum Curve {
    Line { a: DVec3, b: DVec3 },
    Circle { center: DVec3, radius: f64 },
}

struct Piece<'a> {
    owner: &'a dyn PlacedObject,
    curve: Curve,
}

impl Piece<'_> {
    /// Whether a point already known to lie on the full curve lies on the
    /// owner (arcs reject points outside their sweep).
    fn accepts(&self, point: DVec3) -> bool {
        match self.curve {
            Curve::Line { .. } => true,
            Curve::Circle { .. } => {
                let local = self.owner.plane().to_local(point).to_vec2();
                self.owner.contains_angle(local.atan2())
            }
        }
    }
}

fn lines_of(object: &dyn PlacedObject) -> Vec<(DVec3, DVec3)> {
    match object.kind() {
        ObjectKind::Segment => object.endpoints().into_iter().collect(),
        ObjectKind::Polyline => chain_edges(&object.vertices(), object.is_closed())
            .map(|(_, a, b)| (a, b))
            .collect(),
        _ => Vec::new(),
    }
}

fn pieces_of(object: &dyn PlacedObject) -> Vec<Curve> {
    match object.kind() {
        ObjectKind::Circle | ObjectKind::Arc => {
            let flat = object.plane().normal.z.abs() > 1.0 - EPSILON;
            match (object.center(), object.radius()) {
                (Some(center), Some(radius)) if flat => vec![Curve::Circle { center, radius }],
                _ => Vec::new(),
            }
        }
        _ => lines_of(object)
            .into_iter()
            .map(|(a, b)| Curve::Line { a, b })
            .collect(),
    }
}

fn cross(a: DVec2, b: DVec2) -> f64 {
    a.x * b.y - a.y * b.x
}

fn line_line(a1: DVec3, b1: DVec3, a2: DVec3, b2: DVec3) -> Vec<DVec3> {
    let r = (b1 - a1).truncate();
    let s = (b2 - a2).truncate();
    let denom = cross(r, s);
    if denom.abs() < EPSILON {
        return Vec::new();
    }
    let qp = (a2 - a1).truncate();
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    let range = -EPSILON..=1.0 + EPSILON;
    if range.contains(&t) && range.contains(&u) {
        vec![a1.lerp(b1, t)]
    } else {
        Vec::new()
    }
}

fn line_circle(a: DVec3, b: DVec3, center: DVec3, radius: f64) -> Vec<DVec3> {
    let d = (b - a).truncate();
    let f = (a - center).truncate();
    let qa = d.dot(d);
    if qa < EPSILON {
        return Vec::new();
    }
    let qb = 2.0 * f.dot(d);
    let qc = f.dot(f) - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return Vec::new();
    }
    let root = disc.sqrt();
    [(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
        .into_iter()
        .filter(|t| (-EPSILON..=1.0 + EPSILON).contains(t))
        .map(|t| a.lerp(b, t))
        .collect()
}

fn circle_circle(c1: DVec3, r1: f64, c2: DVec3, r2: f64) -> Vec<DVec3> {
    let delta = (c2 - c1).truncate();
    let d = delta.length();
    if d < EPSILON || d > r1 + r2 + EPSILON || d < (r1 - r2).abs() - EPSILON {
        return Vec::new();
    }
    let a = (r1 * r1 - r2 * r2 + d * d) / (2.0 * d);
    let h = (r1 * r1 - a * a).max(0.0).sqrt();
    let dir = delta / d;
    let base = c1.truncate() + dir * a;
    let perp = dir.perp() * h;
    [base + perp, base - perp]
        .into_iter()
        .map(|p| p.extend(c1.z))
        .collect()
}

fn intersect(p: &Piece<'_>, q: &Piece<'_>) -> Vec<DVec3> {
    let points = match (p.curve, q.curve) {
        (Curve::Line { a: a1, b: b1 }, Curve::Line { a: a2, b: b2 }) => line_line(a1, b1, a2, b2),
        (Curve::Line { a, b }, Curve::Circle { center, radius })
        | (Curve::Circle { center, radius }, Curve::Line { a, b }) => line_circle(a, b, center, radius),
        (Curve::Circle { center: c1, radius: r1 }, Curve::Circle { center: c2, radius: r2 }) => {
            circle_circle(c1, r1, c2, r2)
        }
    };
    points
        .into_iter()
        .filter(|pt| p.accepts(*pt) && q.accepts(*pt))
        .collect()
}

/// Intersection candidates among objects passing near the cursor.
///
/// Only objects whose closest point lies within the activation distance take
/// part; pieces of the same object are never intersected with each other.
pub fn collect_intersections(
    cursor: DVec3,
    objects: &[&dyn PlacedObject],
    settings: &SnapSettings,
) -> Vec<SnapCandidate> {
    let near = |o: &dyn PlacedObject| {
        o.closest_point(cursor)
            .is_some_and(|p| p.distance(cursor) <= settings.activation_distance)
    };
    let pieces: Vec<Piece<'_>> = objects
        .iter()
        .copied()
        .filter(|o| near(*o))
        .flat_map(|owner| pieces_of(owner).into_iter().map(move |curve| Piece { owner, curve }))
        .collect();

    let mut out = Vec::new();
    for (i, p) in pieces.iter().enumerate() {
        for q in &pieces[i + 1..] {
            if p.owner.id() == q.owner.id() {
                continue;
            }
            for point in intersect(p, q) {
                out.push(SnapCandidate::new(
                    cursor,
                    point,
                    SnapType::Intersection,
                    SnapFeature::Intersection,
                    Some(p.owner.id()),
                ));
            }
        }
    }
    out
}

/// Parallel candidates: when the reference→cursor bearing runs within the
/// angular tolerance of a straight edge, project the cursor onto the line
/// through the reference parallel to that edge.
pub fn collect_parallel(
    cursor: DVec3,
    reference: DVec3,
    objects: &[&dyn PlacedObject],
    settings: &SnapSettings,
) -> Vec<SnapCandidate> {
    let offset = cursor - reference;
    if offset.truncate().length() < EPSILON {
        return Vec::new();
    }
    let heading = bearing_degrees(reference, cursor);

    let mut out = Vec::new();
    for object in objects {
        for (a, b) in lines_of(*object) {
            let edge = b - a;
            if edge.truncate().length() < EPSILON {
                continue;
            }
            let diff = angular_difference(bearing_degrees(a, b), heading);
            if diff.min(180.0 - diff) > settings.angle_tolerance {
                continue;
            }
            let dir = edge.normalize();
            let point = reference + dir * offset.dot(dir);
            out.push(SnapCandidate::new(
                cursor,
                point,
                SnapType::Parallel,
                SnapFeature::Parallel,
                Some(object.id()),
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Arc, Circle, Segment};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_crossing_segments() {
        let a = Segment::new(DVec3::new(-2.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0));
        let b = Segment::new(DVec3::new(0.0, -2.0, 0.0), DVec3::new(0.0, 2.0, 0.0));
        let objects: Vec<&dyn PlacedObject> = vec![&a, &b];
        let cands = collect_intersections(DVec3::new(0.1, 0.1, 0.0), &objects, &SnapSettings::default());
        assert_eq!(cands.len(), 1);
        assert_relative_eq!(cands[0].point.length(), 0.0, epsilon = 1e-12);
        assert_eq!(cands[0].priority, 9);
    }

    #[test]
    fn test_far_objects_are_ignored() {
        let a = Segment::new(DVec3::new(-2.0, 0.0, 0.0), DVec3::new(2.0, 0.0, 0.0));
        let b = Segment::new(DVec3::new(0.0, -2.0, 0.0), DVec3::new(0.0, 2.0, 0.0));
        let objects: Vec<&dyn PlacedObject> = vec![&a, &b];
        let cands = collect_intersections(DVec3::new(1.5, 1.5, 0.0), &objects, &SnapSettings::default());
        assert!(cands.is_empty());
    }

    #[test]
    fn test_segment_through_circle() {
        let circle = Circle::new(DVec3::ZERO, 2.0);
        let seg = Segment::new(DVec3::new(-5.0, 0.0, 0.0), DVec3::new(5.0, 0.0, 0.0));
        let objects: Vec<&dyn PlacedObject> = vec![&circle, &seg];
        let cands = collect_intersections(DVec3::new(2.1, 0.1, 0.0), &objects, &SnapSettings::default());
        assert_eq!(cands.len(), 2);
        assert!(cands.iter().any(|c| (c.point.x - 2.0).abs() < 1e-9));
        assert!(cands.iter().any(|c| (c.point.x + 2.0).abs() < 1e-9));
    }

    #[test]
    fn test_arc_sweep_filters_intersections() {
        let arc = Arc::new(DVec3::ZERO, 2.0, DVec3::Z, 0.0, FRAC_PI_2);
        let seg = Segment::new(DVec3::new(-5.0, 0.0, 0.0), DVec3::new(5.0, 0.0, 0.0));
        let objects: Vec<&dyn PlacedObject> = vec![&arc, &seg];
        let cands = collect_intersections(DVec3::new(2.0, 0.2, 0.0), &objects, &SnapSettings::default());
        assert_eq!(cands.len(), 1);
        assert_relative_eq!(cands[0].point.x, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_two_circles() {
        let a = Circle::new(DVec3::ZERO, 5.0);
        let b = Circle::new(DVec3::new(8.0, 0.0, 0.0), 5.0);
        let objects: Vec<&dyn PlacedObject> = vec![&a, &b];
        let cands = collect_intersections(DVec3::new(4.0, 3.0, 0.0), &objects, &SnapSettings::default());
        assert_eq!(cands.len(), 2);
        for c in &cands {
            assert_relative_eq!(c.point.x, 4.0, epsilon = 1e-9);
            assert_relative_eq!(c.point.y.abs(), 3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_parallel_projection() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let objects: Vec<&dyn PlacedObject> = vec![&seg];
        let reference = DVec3::new(0.0, 5.0, 0.0);
        let cursor = DVec3::new(-6.0, 5.2, 0.0);
        let cands = collect_parallel(cursor, reference, &objects, &SnapSettings::default());
        assert_eq!(cands.len(), 1);
        assert_relative_eq!(cands[0].point.x, -6.0, epsilon = 1e-9);
        assert_relative_eq!(cands[0].point.y, 5.0, epsilon = 1e-9);
        assert_eq!(cands[0].snap_type, SnapType::Parallel);
    }

    #[test]
    fn test_no_parallel_off_bearing() {
        let seg = Segment::new(DVec3::ZERO, DVec3::new(10.0, 0.0, 0.0));
        let objects: Vec<&dyn PlacedObject> = vec![&seg];
        let cands = collect_parallel(DVec3::new(5.0, 10.0, 0.0), DVec3::new(0.0, 5.0, 0.0), &objects, &SnapSettings::default());
        assert!(cands.is_empty());
    }
}
