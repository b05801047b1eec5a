//! Forward transverse-Mercator projection onto State Plane Illinois East.
//!
//! Chicago's open-data portals deliver WGS84 longitude/latitude, but the
//! grid, distance, and density computations all need a planar CRS with a
//! linear unit. This module projects onto NAD83 State Plane Illinois
//! East (SPCS zone 1201), expressed in US survey feet, using the
//! standard transverse-Mercator series on the GRS80 ellipsoid.
//!
//! Only the forward direction is needed; artifacts keep planar
//! coordinates.

use geo::{Coord, MapCoords, MultiPolygon};

/// GRS80 semi-major axis in meters.
const GRS80_A: f64 = 6_378_137.0;

/// GRS80 flattening.
const GRS80_F: f64 = 1.0 / 298.257_222_101;

/// Meters per US survey foot is 1200/3937; this is the inverse.
const METERS_TO_US_FT: f64 = 3937.0 / 1200.0;

/// A transverse-Mercator zone definition on the GRS80 ellipsoid.
///
/// Outputs are in US survey feet.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// First eccentricity squared.
    e2: f64,
    /// Second eccentricity squared.
    ep2: f64,
    /// Scale factor on the central meridian.
    k0: f64,
    /// Latitude of origin, radians.
    lat0: f64,
    /// Central meridian, radians.
    lon0: f64,
    /// False easting, meters.
    false_easting_m: f64,
    /// False northing, meters.
    false_northing_m: f64,
    /// Meridional arc length at the latitude of origin, meters.
    m0: f64,
}

impl TransverseMercator {
    /// State Plane Illinois East (SPCS83 zone 1201): origin 36°40'N,
    /// central meridian 88°20'W, scale 0.999975, false easting 300 km.
    #[must_use]
    pub fn illinois_east() -> Self {
        Self::new(
            36.0 + 40.0 / 60.0,
            -(88.0 + 20.0 / 60.0),
            0.999_975,
            300_000.0,
            0.0,
        )
    }

    /// Builds a zone from origin latitude/central meridian (degrees),
    /// central-meridian scale factor, and false easting/northing (meters).
    #[must_use]
    pub fn new(
        lat0_deg: f64,
        lon0_deg: f64,
        k0: f64,
        false_easting_m: f64,
        false_northing_m: f64,
    ) -> Self {
        let e2 = GRS80_F * (2.0 - GRS80_F);
        let ep2 = e2 / (1.0 - e2);
        let lat0 = lat0_deg.to_radians();

        let mut zone = Self {
            e2,
            ep2,
            k0,
            lat0,
            lon0: lon0_deg.to_radians(),
            false_easting_m,
            false_northing_m,
            m0: 0.0,
        };
        zone.m0 = zone.meridional_arc(lat0);
        zone
    }

    /// Meridional arc length from the equator to latitude `lat` (radians),
    /// in meters. Snyder eq. 3-21.
    fn meridional_arc(&self, lat: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        GRS80_A
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }

    /// Projects a WGS84 longitude/latitude (decimal degrees) to planar
    /// easting/northing in US survey feet. Snyder eqs. 8-9 and 8-10.
    #[must_use]
    pub fn project(&self, longitude: f64, latitude: f64) -> Coord<f64> {
        let lat = latitude.to_radians();
        let lon = longitude.to_radians();

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan_lat = lat.tan();

        let n = GRS80_A / (1.0 - self.e2 * sin_lat * sin_lat).sqrt();
        let t = tan_lat * tan_lat;
        let c = self.ep2 * cos_lat * cos_lat;
        let a = (lon - self.lon0) * cos_lat;

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let m = self.meridional_arc(lat);

        let easting_m = self.false_easting_m
            + self.k0
                * n
                * (a + (1.0 - t + c) * a3 / 6.0
                    + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * self.ep2) * a5 / 120.0);

        let northing_m = self.false_northing_m
            + self.k0
                * (m - self.m0
                    + n * tan_lat
                        * (a2 / 2.0
                            + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                            + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * self.ep2) * a6
                                / 720.0));

        Coord {
            x: easting_m * METERS_TO_US_FT,
            y: northing_m * METERS_TO_US_FT,
        }
    }

    /// Projects a set of longitude/latitude points.
    #[must_use]
    pub fn project_points(&self, points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points
            .iter()
            .map(|&(lon, lat)| self.project(lon, lat))
            .collect()
    }

    /// Projects every vertex of a longitude/latitude multipolygon.
    #[must_use]
    pub fn project_multipolygon(&self, polygon: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        polygon.map_coords(|coord| self.project(coord.x, coord.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Great-circle distance between two lon/lat points, in feet, used
    /// as the reference for projection distance checks.
    fn haversine_ft(a: (f64, f64), b: (f64, f64)) -> f64 {
        let earth_radius_m = 6_371_008.8;
        let (lon1, lat1) = (a.0.to_radians(), a.1.to_radians());
        let (lon2, lat2) = (b.0.to_radians(), b.1.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let h = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * earth_radius_m * h.sqrt().asin() * METERS_TO_US_FT
    }

    #[test]
    fn origin_maps_to_false_easting() {
        let zone = TransverseMercator::illinois_east();
        let origin = zone.project(-(88.0 + 20.0 / 60.0), 36.0 + 40.0 / 60.0);

        assert!(
            (origin.x - 984_250.0).abs() < 0.01,
            "central meridian easting {} should equal the false easting",
            origin.x
        );
        assert!(
            origin.y.abs() < 0.01,
            "origin northing {} should be zero",
            origin.y
        );
    }

    #[test]
    fn chicago_lands_in_plausible_state_plane_range() {
        let zone = TransverseMercator::illinois_east();
        // Chicago City Hall.
        let coord = zone.project(-87.6320, 41.8837);

        assert!(
            (1_100_000.0..1_250_000.0).contains(&coord.x),
            "easting {} outside Chicago State Plane range",
            coord.x
        );
        assert!(
            (1_850_000.0..1_950_000.0).contains(&coord.y),
            "northing {} outside Chicago State Plane range",
            coord.y
        );
    }

    #[test]
    fn easting_increases_with_longitude() {
        let zone = TransverseMercator::illinois_east();
        let west = zone.project(-87.80, 41.85);
        let east = zone.project(-87.60, 41.85);
        assert!(east.x > west.x);
    }

    #[test]
    fn projected_distances_match_great_circle() {
        let zone = TransverseMercator::illinois_east();
        // Two points roughly 5 miles apart across Chicago.
        let a = (-87.6320, 41.8837);
        let b = (-87.7050, 41.8200);

        let pa = zone.project(a.0, a.1);
        let pb = zone.project(b.0, b.1);
        let planar = ((pa.x - pb.x).powi(2) + (pa.y - pb.y).powi(2)).sqrt();
        let reference = haversine_ft(a, b);

        let relative_error = (planar - reference).abs() / reference;
        assert!(
            relative_error < 0.003,
            "planar {planar} vs great-circle {reference}: relative error {relative_error}"
        );
    }
}
