//! Geographic coordinates and the great-circle bearing toward the Kaaba.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CompassError;

/// A point on the Earth's surface in decimal degrees.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// The Kaaba in Mecca, target of every bearing.
pub const KAABA: GeoCoordinate = GeoCoordinate {
    latitude: 21.4225,
    longitude: 39.8264,
};

/// London. Used whenever the device location is not available.
pub const FALLBACK_LOCATION: GeoCoordinate = GeoCoordinate {
    latitude: 51.5074,
    longitude: -0.1278,
};

impl GeoCoordinate {
    /// Creates a coordinate, rejecting values outside `[-90, 90]` / `[-180, 180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CompassError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(CompassError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Initial great-circle course from `origin` to `target` on a spherical Earth.
///
/// The result is in degrees within `(-180, 180]` and is deliberately not
/// wrapped into `[0, 360)`; see [`normalize_degrees`] for that.
///
/// The formula never divides, so identical points and poles need no special
/// handling and the function is total over the valid coordinate domain.
///
/// # Example
/// ```
/// use qibla_compass::{compute_bearing, GeoCoordinate};
///
/// let origin = GeoCoordinate::new(0.0, 0.0).unwrap();
/// let target = GeoCoordinate::new(0.0, 90.0).unwrap();
/// assert!((compute_bearing(origin, target) - 90.0).abs() < 1e-9);
/// ```
pub fn compute_bearing(origin: GeoCoordinate, target: GeoCoordinate) -> f64 {
    let phi = origin.latitude.to_radians();
    let lambda = origin.longitude.to_radians();
    let phi_k = target.latitude.to_radians();
    let lambda_k = target.longitude.to_radians();

    let delta_lambda = lambda_k - lambda;
    let y = delta_lambda.sin();
    let x = phi.cos() * phi_k.tan() - phi.sin() * delta_lambda.cos();

    let bearing = y.atan2(x).to_degrees();
    // atan2(-0.0, x < 0) yields -180, which is the same course as 180
    if bearing <= -180.0 {
        bearing + 360.0
    } else {
        bearing
    }
}

/// Bearing from `origin` toward the Kaaba.
pub fn qibla_bearing(origin: GeoCoordinate) -> f64 {
    compute_bearing(origin, KAABA)
}

/// Wraps any angle in degrees into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid may round tiny negative inputs up to exactly 360
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}
