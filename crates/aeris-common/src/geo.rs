//! Coordinate math shared by the routing and alert subsystems.
//!
//! Two approximations are used deliberately, matching the source system:
//! equirectangular degree-boxes for coarse severity-bucket queries, and
//! haversine/bearing trigonometry for edge resampling and wind-shift
//! detection. Do not collapse the two into one "more accurate" formula —
//! each call site preserves the approximation the original used.

/// Mean Earth radius in meters, used by the haversine formulas below.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Approximate degrees-per-km conversion at a given latitude, used for
/// short-leg equirectangular distance math (severity-bucket queries).
pub fn km_per_deg_lat() -> f64 {
    111.0
}

/// Approximate km-per-degree-longitude at the given latitude.
pub fn km_per_deg_lon(lat_deg: f64) -> f64 {
    111.0 * lat_deg.to_radians().cos()
}

/// Great-circle distance between two WGS84 points, in meters.
pub fn haversine_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_M * c
}

/// Initial bearing in degrees [0, 360) from point 1 to point 2.
pub fn bearing_deg(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dlambda = (lon2 - lon1).to_radians();
    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    let theta = y.atan2(x).to_degrees();
    (theta + 360.0) % 360.0
}

/// Smallest absolute angular difference between two bearings, in degrees,
/// in [0, 180].
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    if d > 180.0 {
        360.0 - d
    } else {
        d
    }
}

/// Walk a polyline and interpolate extra points so that no gap between
/// consecutive output points exceeds `step_m`. Always includes the first
/// and last original coordinate.
pub fn resample_line(coords: &[(f64, f64)], step_m: f64) -> Vec<(f64, f64)> {
    if coords.len() < 2 {
        return coords.to_vec();
    }
    let mut out = vec![coords[0]];
    for pair in coords.windows(2) {
        let (lon1, lat1) = pair[0];
        let (lon2, lat2) = pair[1];
        let seg_len = haversine_m(lon1, lat1, lon2, lat2);
        if seg_len <= step_m || seg_len == 0.0 {
            out.push((lon2, lat2));
            continue;
        }
        let n_steps = (seg_len / step_m).floor() as usize;
        for i in 1..=n_steps {
            let t = (i as f64 * step_m) / seg_len;
            let t = t.min(1.0);
            out.push((lon1 + t * (lon2 - lon1), lat1 + t * (lat2 - lat1)));
        }
        if out.last() != Some(&(lon2, lat2)) {
            out.push((lon2, lat2));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_zero_distance() {
        assert_eq!(haversine_m(-118.0, 34.0, -118.0, 34.0), 0.0);
    }

    #[test]
    fn bearing_due_north_is_zero() {
        let b = bearing_deg(0.0, 0.0, 0.0, 1.0);
        assert!(b.abs() < 1e-6);
    }

    #[test]
    fn bearing_due_east_is_90() {
        let b = bearing_deg(0.0, 0.0, 1.0, 0.0);
        assert!((b - 90.0).abs() < 1e-6);
    }

    #[test]
    fn angle_diff_wraps_correctly() {
        assert!((angle_diff_deg(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((angle_diff_deg(10.0, 350.0) - 20.0).abs() < 1e-9);
        assert_eq!(angle_diff_deg(0.0, 180.0), 180.0);
    }

    #[test]
    fn resample_line_keeps_endpoints() {
        let coords = vec![(-118.0, 34.0), (-117.9, 34.1)];
        let resampled = resample_line(&coords, 50.0);
        assert_eq!(resampled.first(), coords.first());
        assert_eq!(resampled.last(), coords.last());
        assert!(resampled.len() > 2);
    }

    #[test]
    fn resample_line_short_segment_unchanged() {
        let coords = vec![(-118.0, 34.0), (-118.0, 34.0000001)];
        let resampled = resample_line(&coords, 50.0);
        assert_eq!(resampled, coords);
    }
}
