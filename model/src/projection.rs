//! Ellipsoidal transverse Mercator projection on WGS84, referenced to a
//! caller-chosen central meridian instead of a fixed 6-degree zone. All
//! angles are degrees, all planar coordinates meters.

/// WGS84 semi-major axis in meters
const EQUATORIAL_RADIUS: f64 = 6_378_137.0;
const FLATTENING: f64 = 1.0 / 298.257_223_563;
/// First eccentricity squared
const E2: f64 = 2.0 * FLATTENING - FLATTENING * FLATTENING;
/// Scale factor along the central meridian
const K0: f64 = 0.9996;

pub const FALSE_EASTING: f64 = 500_000.0;
/// Applied south of the equator to keep northings positive
pub const FALSE_NORTHING: f64 = 10_000_000.0;

/// Projects a geodetic position to planar (easting, northing) meters,
/// relative to the central meridian `lon0`. Pure and deterministic; any
/// finite input maps somewhere, though accuracy degrades far from `lon0`.
pub fn project(lat: f64, lon: f64, lon0: f64) -> (f64, f64) {
    let phi = lat.to_radians();
    let ep2 = E2 / (1.0 - E2);

    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let n = EQUATORIAL_RADIUS / (1.0 - E2 * sin_phi * sin_phi).sqrt();
    let t = tan_phi * tan_phi;
    let c = ep2 * cos_phi * cos_phi;
    let a = cos_phi * (lon - lon0).to_radians();

    let x = K0
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + FALSE_EASTING;

    let mut y = K0
        * (meridional_arc(phi)
            + n * tan_phi
                * (a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
    if lat < 0.0 {
        y += FALSE_NORTHING;
    }

    (x, y)
}

/// Inverse of `project`. The hemisphere can't be recovered from the
/// coordinates alone, so the caller states it.
pub fn unproject(x: f64, y: f64, lon0: f64, southern: bool) -> (f64, f64) {
    let ep2 = E2 / (1.0 - E2);
    let x = x - FALSE_EASTING;
    let y = if southern { y - FALSE_NORTHING } else { y };

    // Footpoint latitude from the rectified arc
    let m = y / K0;
    let mu = m / (EQUATORIAL_RADIUS * (1.0 - E2 / 4.0 - 3.0 * E2 * E2 / 64.0 - 5.0 * E2.powi(3) / 256.0));
    let e1 = (1.0 - (1.0 - E2).sqrt()) / (1.0 + (1.0 - E2).sqrt());
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let c1 = ep2 * cos_phi1 * cos_phi1;
    let t1 = tan_phi1 * tan_phi1;
    let n1 = EQUATORIAL_RADIUS / (1.0 - E2 * sin_phi1 * sin_phi1).sqrt();
    let r1 = EQUATORIAL_RADIUS * (1.0 - E2) / (1.0 - E2 * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
            * d.powi(5)
            / 120.0)
        / cos_phi1;

    (lat.to_degrees(), lon0 + lon.to_degrees())
}

fn meridional_arc(phi: f64) -> f64 {
    EQUATORIAL_RADIUS
        * ((1.0 - E2 / 4.0 - 3.0 * E2 * E2 / 64.0 - 5.0 * E2.powi(3) / 256.0) * phi
            - (3.0 * E2 / 8.0 + 3.0 * E2 * E2 / 32.0 + 45.0 * E2.powi(3) / 1024.0)
                * (2.0 * phi).sin()
            + (15.0 * E2 * E2 / 256.0 + 45.0 * E2.powi(3) / 1024.0) * (4.0 * phi).sin()
            - (35.0 * E2.powi(3) / 3072.0) * (6.0 * phi).sin())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn central_meridian_maps_to_false_easting() {
        let (x, y) = project(47.5, 9.0, 9.0);
        assert_relative_eq!(x, FALSE_EASTING, epsilon = 1e-6);
        assert!(y > 0.0);
    }

    #[test]
    fn equator_maps_to_zero_northing() {
        let (_, y) = project(0.0, 13.7, 12.0);
        assert_relative_eq!(y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn southern_hemisphere_mirrors_against_false_northing() {
        let (xn, yn) = project(35.2, 10.1, 9.0);
        let (xs, ys) = project(-35.2, 10.1, 9.0);
        assert_relative_eq!(xs, xn, epsilon = 1e-6);
        assert_relative_eq!(ys, FALSE_NORTHING - yn, epsilon = 1e-6);
    }

    #[test]
    fn easting_increases_east_of_the_meridian() {
        let (west, _) = project(48.0, 8.2, 9.0);
        let (center, _) = project(48.0, 9.0, 9.0);
        let (east, _) = project(48.0, 9.8, 9.0);
        assert!(west < center);
        assert!(center < east);
    }

    #[test]
    fn deterministic() {
        let a = project(52.52, 13.405, 15.0);
        let b = project(52.52, 13.405, 15.0);
        assert_eq!(a, b);
    }

    #[test]
    fn roundtrip_recovers_geodetic_position() {
        for (lat, lon, lon0) in [
            (47.9941, 7.8509, 9.0),
            (52.52, 13.405, 15.0),
            (-33.92, 18.42, 21.0),
            (60.17, 24.94, 27.0),
            (1.29, 103.85, 105.0),
        ] {
            let (x, y) = project(lat, lon, lon0);
            let (lat2, lon2) = unproject(x, y, lon0, lat < 0.0);
            assert_relative_eq!(lat2, lat, epsilon = 1e-6);
            assert_relative_eq!(lon2, lon, epsilon = 1e-6);
        }
    }
}
