//! Circle fitting and radius checks used by the draw tools.

use super::{DrawingPlane, GeometryError, GeometryResult};
use glam::DVec3;
use kurbo::Point;

/// Relative tolerance on the fit determinant below which points count as collinear.
pub const FIT_TOLERANCE: f64 = 1e-9;

/// Circle through three points, computed in `plane` coordinates.
///
/// Returns the world-space center and the radius. Collinear input is an
/// error, never a default circle.
pub fn circle_through(a: DVec3, b: DVec3, c: DVec3, plane: &DrawingPlane) -> GeometryResult<(DVec3, f64)> {
    let (pa, pb, pc) = (plane.to_local(a), plane.to_local(b), plane.to_local(c));
    let d = 2.0 * (pa.x * (pb.y - pc.y) + pb.x * (pc.y - pa.y) + pc.x * (pa.y - pb.y));

    let scale = [pb - pa, pc - pa, pc - pb]
        .iter()
        .map(|v| v.hypot2())
        .fold(1.0_f64, f64::max);
    if !d.is_finite() || d.abs() < FIT_TOLERANCE * scale {
        return Err(GeometryError::Collinear);
    }

    let (sa, sb, sc) = (pa.to_vec2().hypot2(), pb.to_vec2().hypot2(), pc.to_vec2().hypot2());
    let ux = (sa * (pb.y - pc.y) + sb * (pc.y - pa.y) + sc * (pa.y - pb.y)) / d;
    let uy = (sa * (pc.x - pb.x) + sb * (pa.x - pc.x) + sc * (pb.x - pa.x)) / d;
    let center = Point::new(ux, uy);
    Ok((plane.to_world(center), center.distance(pa)))
}

/// Check that `start` and `end` are equally far from `center` within `tolerance`.
pub fn ensure_equal_radius(center: DVec3, start: DVec3, end: DVec3, tolerance: f64) -> GeometryResult<f64> {
    let r_start = center.distance(start);
    let r_end = center.distance(end);
    if (r_start - r_end).abs() > tolerance {
        return Err(GeometryError::UnequalRadius {
            start: r_start,
            end: r_end,
        });
    }
    Ok(r_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> DVec3 {
        DVec3::new(x, y, 0.0)
    }

    #[test]
    fn test_collinear_points_rejected() {
        let err = circle_through(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0), &DrawingPlane::xy());
        assert_eq!(err, Err(GeometryError::Collinear));
    }

    #[test]
    fn test_right_triangle_circumcircle() {
        let (center, radius) = circle_through(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), &DrawingPlane::xy()).unwrap();
        assert_relative_eq!(center.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(center.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(radius, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-4);
    }

    #[test]
    fn test_fit_on_raised_plane_keeps_elevation() {
        let plane = DrawingPlane::xy().with_origin(DVec3::new(0.0, 0.0, 3.0));
        let (center, radius) = circle_through(
            DVec3::new(2.0, 0.0, 3.0),
            DVec3::new(0.0, 2.0, 3.0),
            DVec3::new(-2.0, 0.0, 3.0),
            &plane,
        )
        .unwrap();
        assert_relative_eq!(center.z, 3.0);
        assert_relative_eq!(radius, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unequal_radius() {
        let err = ensure_equal_radius(p(0.0, 0.0), p(5.0, 0.0), p(0.0, 7.0), 1e-6);
        assert!(matches!(err, Err(GeometryError::UnequalRadius { .. })));
        assert_relative_eq!(ensure_equal_radius(p(0.0, 0.0), p(5.0, 0.0), p(0.0, 5.0), 1e-6).unwrap(), 5.0);
    }
}
