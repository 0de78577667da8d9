// skyfuse_core/src/frames.rs

use nalgebra::Vector3;
use serde::Deserialize;

/// WGS-84 semi-major axis (meters).
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 first eccentricity squared.
pub const WGS84_E2: f64 = 6.694_379_990_14e-3;

/// A geodetic position: latitude/longitude in degrees, altitude in meters (MSL).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_m: f64,
}

impl GeoPoint {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_m,
        }
    }

    /// Checks that the point is a usable reference.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.altitude_m.is_finite())
        {
            return Err("coordinates must be finite".to_string());
        }
        if self.latitude_deg.abs() >= 90.0 {
            return Err(format!(
                "latitude {} is outside (-90, 90)",
                self.latitude_deg
            ));
        }
        if self.longitude_deg.abs() > 180.0 {
            return Err(format!(
                "longitude {} is outside [-180, 180]",
                self.longitude_deg
            ));
        }
        Ok(())
    }

    /// Meridian (north-south) and prime vertical (east-west) radii of curvature
    /// at this latitude.
    fn radii(&self) -> (f64, f64) {
        let sin_lat = self.latitude_deg.to_radians().sin();
        let denom = 1.0 - WGS84_E2 * sin_lat * sin_lat;
        let meridian = WGS84_A * (1.0 - WGS84_E2) / denom.powf(1.5);
        let prime_vertical = WGS84_A / denom.sqrt();
        (meridian, prime_vertical)
    }

    /// Position of `self` in the local NED frame anchored at `home`.
    ///
    /// Flat-earth approximation around `home`: accurate to centimeters over the
    /// few kilometers a vehicle typically travels from its home location.
    pub fn to_ned(&self, home: &GeoPoint) -> Vector3<f64> {
        let (meridian, prime_vertical) = home.radii();
        let d_lat = (self.latitude_deg - home.latitude_deg).to_radians();
        let d_lon = (self.longitude_deg - home.longitude_deg).to_radians();

        let north = d_lat * (meridian + home.altitude_m);
        let east =
            d_lon * (prime_vertical + home.altitude_m) * home.latitude_deg.to_radians().cos();
        let down = -(self.altitude_m - home.altitude_m);
        Vector3::new(north, east, down)
    }

    /// Inverse of [`GeoPoint::to_ned`]: the geodetic point at `ned` from `self`.
    pub fn offset_by_ned(&self, ned: &Vector3<f64>) -> GeoPoint {
        let (meridian, prime_vertical) = self.radii();
        let d_lat = ned.x / (meridian + self.altitude_m);
        let d_lon =
            ned.y / ((prime_vertical + self.altitude_m) * self.latitude_deg.to_radians().cos());
        GeoPoint {
            latitude_deg: self.latitude_deg + d_lat.to_degrees(),
            longitude_deg: self.longitude_deg + d_lon.to_degrees(),
            altitude_m: self.altitude_m - ned.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn zurich() -> GeoPoint {
        GeoPoint::new(47.3769, 8.5417, 408.0)
    }

    #[test]
    fn home_maps_to_origin() {
        let home = zurich();
        let ned = home.to_ned(&home);
        assert_abs_diff_eq!(ned.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn one_arcsecond_north_is_about_thirty_meters() {
        let home = zurich();
        let north = GeoPoint::new(home.latitude_deg + 1.0 / 3600.0, home.longitude_deg, 408.0);
        let ned = north.to_ned(&home);
        assert_abs_diff_eq!(ned.x, 30.87, epsilon = 0.05);
        assert_abs_diff_eq!(ned.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn climbing_is_negative_down() {
        let home = zurich();
        let above = GeoPoint::new(home.latitude_deg, home.longitude_deg, 418.0);
        assert_abs_diff_eq!(above.to_ned(&home).z, -10.0, epsilon = 1e-9);
    }

    #[test]
    fn offset_is_inverse_of_to_ned() {
        let home = zurich();
        let ned = Vector3::new(120.0, -75.5, -30.0);
        let point = home.offset_by_ned(&ned);
        let back = point.to_ned(&home);
        assert_abs_diff_eq!(back.x, ned.x, epsilon = 1e-6);
        assert_abs_diff_eq!(back.y, ned.y, epsilon = 1e-6);
        assert_abs_diff_eq!(back.z, ned.z, epsilon = 1e-9);
    }

    #[test]
    fn rejects_pole_and_nan() {
        assert!(GeoPoint::new(90.0, 0.0, 0.0).validate().is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0, 0.0).validate().is_err());
        assert!(zurich().validate().is_ok());
    }
}
