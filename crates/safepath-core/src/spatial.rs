//! Spatial math shared by every routing component.
//!
//! All distances are meters, all coordinates decimal degrees, all
//! bearings radians (0 = north, pi/2 = east).

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points using the Haversine formula.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Bearing from point 1 to point 2 in radians.
pub fn bearing(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let x = delta_lambda.sin() * phi2.cos();
    let y = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();

    x.atan2(y)
}

/// Meters per degree of latitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lat(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_132.954 - 559.822 * (2.0 * lat_rad).cos() + 1.175 * (4.0 * lat_rad).cos()
        - 0.0023 * (6.0 * lat_rad).cos()
}

/// Meters per degree of longitude at a given latitude (WGS84 approximation).
pub fn meters_per_deg_lng(lat_deg: f64) -> f64 {
    let lat_rad = lat_deg.to_radians();
    111_412.84 * lat_rad.cos() - 93.5 * (3.0 * lat_rad).cos() + 0.118 * (5.0 * lat_rad).cos()
}

/// Convert degrees latitude to meters using local scaling.
pub fn lat_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lat(ref_lat_deg)
}

/// Convert degrees longitude to meters at a given latitude.
pub fn lng_to_meters(deg: f64, ref_lat_deg: f64) -> f64 {
    deg * meters_per_deg_lng(ref_lat_deg)
}

/// Offset a position by distance and bearing along a great circle.
pub fn offset_by_bearing(lat: f64, lng: f64, distance_m: f64, bearing_rad: f64) -> (f64, f64) {
    if distance_m.abs() <= f64::EPSILON {
        return (lat, lng);
    }

    let lat1 = lat.to_radians();
    let lng1 = lng.to_radians();
    let angular_distance = distance_m / EARTH_RADIUS_M;

    let sin_lat1 = lat1.sin();
    let cos_lat1 = lat1.cos();
    let sin_ad = angular_distance.sin();
    let cos_ad = angular_distance.cos();

    let sin_lat2 = sin_lat1 * cos_ad + cos_lat1 * sin_ad * bearing_rad.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();

    let y = bearing_rad.sin() * sin_ad * cos_lat1;
    let x = cos_ad - sin_lat1 * sin_lat2;
    let mut lng2 = lng1 + y.atan2(x);
    lng2 =
        (lng2 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI) - std::f64::consts::PI;

    (lat2.to_degrees(), lng2.to_degrees())
}

/// Linear interpolation between two coordinates.
///
/// Accurate enough at route scale (a few km); the search itself never
/// depends on sub-meter precision here.
pub fn interpolate(start: (f64, f64), end: (f64, f64), fraction: f64) -> (f64, f64) {
    let t = fraction.clamp(0.0, 1.0);
    (
        start.0 + (end.0 - start.0) * t,
        start.1 + (end.1 - start.1) * t,
    )
}

/// Midpoint of two coordinates.
pub fn midpoint(a: (f64, f64), b: (f64, f64)) -> (f64, f64) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

/// Fraction of progress a point has made along the start->end axis.
///
/// Projects the point onto the segment in a local ENU frame. 0.0 is at
/// `start`, 1.0 at `end`; values outside [0, 1] mean the point lies
/// behind the start or past the end. Returns `None` when start == end.
pub fn progress_along(start: (f64, f64), end: (f64, f64), point: (f64, f64)) -> Option<f64> {
    let ref_lat = (start.0 + end.0) / 2.0;

    let dx = lng_to_meters(end.1 - start.1, ref_lat);
    let dy = lat_to_meters(end.0 - start.0, ref_lat);
    let len_sq = dx * dx + dy * dy;
    if len_sq < 1e-6 {
        return None;
    }

    let px = lng_to_meters(point.1 - start.1, ref_lat);
    let py = lat_to_meters(point.0 - start.0, ref_lat);

    Some((px * dx + py * dy) / len_sq)
}

/// Minimum distance from a point to a segment, in meters.
pub fn distance_to_segment_m(
    point: (f64, f64),
    seg_start: (f64, f64),
    seg_end: (f64, f64),
) -> f64 {
    let ref_lat = seg_start.0;

    let px = lng_to_meters(point.1 - seg_start.1, ref_lat);
    let py = lat_to_meters(point.0 - seg_start.0, ref_lat);

    let sx = lng_to_meters(seg_end.1 - seg_start.1, ref_lat);
    let sy = lat_to_meters(seg_end.0 - seg_start.0, ref_lat);

    let seg_len_sq = sx * sx + sy * sy;
    if seg_len_sq < 0.0001 {
        return (px * px + py * py).sqrt();
    }

    let t = ((px * sx + py * sy) / seg_len_sq).clamp(0.0, 1.0);
    let dx = px - t * sx;
    let dy = py - t * sy;

    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn haversine_same_point() {
        let dist = haversine_distance(37.7694, -122.4862, 37.7694, -122.4862);
        assert!(dist < 0.001);
    }

    #[test]
    fn bearing_due_east() {
        let b = bearing(0.0, 0.0, 0.0, 1.0);
        assert!((b - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn offset_round_trip() {
        let (lat, lng) = (37.77, -122.44);
        let (lat2, lng2) = offset_by_bearing(lat, lng, 500.0, 1.1);
        let back = haversine_distance(lat, lng, lat2, lng2);
        assert!((back - 500.0).abs() < 1.0, "expected ~500m, got {back}");
    }

    #[test]
    fn progress_is_ordered_along_the_axis() {
        let start = (37.7694, -122.4862);
        let end = (37.8087, -122.4098);
        let quarter = interpolate(start, end, 0.25);
        let half = interpolate(start, end, 0.5);

        let p1 = progress_along(start, end, quarter).unwrap();
        let p2 = progress_along(start, end, half).unwrap();
        assert!(p1 < p2);
        assert!((p2 - 0.5).abs() < 0.05);
    }

    #[test]
    fn progress_undefined_for_degenerate_axis() {
        let p = (37.77, -122.44);
        assert!(progress_along(p, p, (37.78, -122.45)).is_none());
    }

    #[test]
    fn distance_to_segment_midpoint_offset() {
        let start = (37.77, -122.44);
        let end = (37.77, -122.43);
        let mid = midpoint(start, end);
        let off = offset_by_bearing(mid.0, mid.1, 200.0, 0.0);
        let d = distance_to_segment_m(off, start, end);
        assert!((d - 200.0).abs() < 5.0, "expected ~200m, got {d}");
    }
}
