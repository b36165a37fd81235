//! Grid and bearing snapping.

use super::{MIN_ANGLE_INCREMENT, SnapCandidate, SnapFeature, SnapSettings, SnapType};
use glam::DVec3;

/// Below this planar distance from the reference no bearing is defined.
const BEARING_EPSILON: f64 = 1e-6;

/// Named bearings (degrees) always tested by the angle collector.
const NAMED_ANGLES: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

/// Snap a point to the nearest grid intersection. Elevation is preserved.
pub fn snap_to_grid(point: DVec3, grid_size: f64) -> DVec3 {
    DVec3::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
        point.z,
    )
}

/// Snap an angle to the nearest increment.
/// Returns the snapped angle in degrees (0-360).
pub fn snap_angle(angle_degrees: f64, increment: f64) -> f64 {
    let snapped = (angle_degrees / increment).round() * increment;
    snapped.rem_euclid(360.0)
}

/// Planar bearing from `from` to `to` in degrees (0-360).
pub fn bearing_degrees(from: DVec3, to: DVec3) -> f64 {
    let d = to - from;
    d.y.atan2(d.x).to_degrees().rem_euclid(360.0)
}

/// Grid candidate for the cursor. Always produced.
pub fn collect_grid(cursor: DVec3, settings: &SnapSettings) -> SnapCandidate {
    let point = snap_to_grid(cursor, settings.grid_size());
    SnapCandidate::new(cursor, point, SnapType::Grid, SnapFeature::GridNode, None)
}

/// Bearing candidate relative to `reference`.
///
/// Tests the named angles plus the nearest multiple of the configured
/// increment; the closest one within `angle_tolerance` keeps the cursor's
/// planar distance but corrects its bearing.
pub fn collect_angle(cursor: DVec3, reference: DVec3, settings: &SnapSettings) -> Option<SnapCandidate> {
    let delta = cursor - reference;
    let distance = delta.x.hypot(delta.y);
    if distance <= BEARING_EPSILON {
        return None;
    }
    let bearing = bearing_degrees(reference, cursor);

    let (best, deviation) = candidate_bearings(bearing, settings.angle_increment)
        .map(|a| (a, angular_difference(a, bearing)))
        .min_by(|(_, x), (_, y)| x.total_cmp(y))?;
    if deviation > settings.angle_tolerance {
        return None;
    }

    let (sin, cos) = best.to_radians().sin_cos();
    let point = DVec3::new(reference.x + distance * cos, reference.y + distance * sin, cursor.z);
    Some(SnapCandidate::new(cursor, point, SnapType::Angle, SnapFeature::Bearing(best), None))
}

fn candidate_bearings(bearing: f64, increment: f64) -> impl Iterator<Item = f64> {
    let stepped = (increment.is_finite() && increment >= MIN_ANGLE_INCREMENT)
        .then(|| snap_angle(bearing, increment));
    NAMED_ANGLES.into_iter().chain(stepped)
}

/// Smallest absolute difference between two bearings, in degrees.
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}
