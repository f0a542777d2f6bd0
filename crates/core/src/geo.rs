//! Great-circle helpers shared by the spatial pre-filter and the scorer.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Haversine distance between two WGS84 points, in meters.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Lat/lon box that contains every point within `radius_m`.
///
/// When the box crosses the antimeridian `min_lon > max_lon` and the
/// longitude span wraps through +/-180.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box around a center point. Longitude span widens toward the poles and
    /// collapses to the full range when the box would reach one.
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        let d_lat = (radius_m / EARTH_RADIUS_M).to_degrees();
        let min_lat = (lat - d_lat).max(-90.0);
        let max_lat = (lat + d_lat).min(90.0);

        let cos_lat = lat.to_radians().cos();
        let d_lon = (radius_m / (EARTH_RADIUS_M * cos_lat.max(f64::EPSILON))).to_degrees();
        let (min_lon, max_lon) = if min_lat <= -90.0 || max_lat >= 90.0 || d_lon >= 180.0 {
            (-180.0, 180.0)
        } else {
            (wrap_lon(lon - d_lon), wrap_lon(lon + d_lon))
        };

        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.min_lon > self.max_lon
    }

    /// Longitude intervals covered by the box. Both entries are the same
    /// interval unless the box crosses the antimeridian.
    pub fn lon_ranges(&self) -> [(f64, f64); 2] {
        if self.crosses_antimeridian() {
            [(self.min_lon, 180.0), (-180.0, self.max_lon)]
        } else {
            [(self.min_lon, self.max_lon); 2]
        }
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if lat < self.min_lat || lat > self.max_lat {
            return false;
        }
        self.lon_ranges()
            .iter()
            .any(|&(min, max)| lon >= min && lon <= max)
    }
}

/// Bring a longitude that overshot by less than a full turn back into [-180, 180].
fn wrap_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}
