use thiserror::Error;

/// Failures the compass engine can run into.
///
/// None of these escape [`QiblaCompass::initialize`](crate::QiblaCompass::initialize);
/// they end up as the `error` text of the [`CompassView`](crate::CompassView).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompassError {
    /// The device has no usable magnetometer. Nothing is ever computed.
    #[error("Compass is not available on this device")]
    SensorUnavailable,

    /// The user refused location access; the fallback location is used.
    #[error("Location permission not granted, using default location (London)")]
    LocationPermissionDenied,

    /// Permission was granted but the one-shot fix failed.
    #[error("Could not determine the current location: {0}")]
    LocationFetchFailure(String),

    #[error("Coordinate ({latitude}, {longitude}) is outside the valid range")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}
