//! Display rotations for the heading dial and the Qibla indicator

use serde::Serialize;

use crate::geo::normalize_degrees;

/// How far to rotate the two compass images, in degrees within `[0, 360)`.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayRotation {
    pub compass_rotate: f64,
    pub target_rotate: f64,
}

impl DisplayRotation {
    /// Fuses a screen-aligned heading with the signed Qibla bearing.
    pub fn new(adjusted_heading: f64, qibla_bearing: f64) -> Self {
        Self {
            compass_rotate: compass_rotation(adjusted_heading),
            target_rotate: target_rotation(adjusted_heading, qibla_bearing),
        }
    }
}

/// `360 - heading`, so north on the dial stays put while the device turns.
pub fn compass_rotation(adjusted_heading: f64) -> f64 {
    normalize_degrees(360.0 - adjusted_heading)
}

/// `360 - heading + bearing`. The bearing may be negative, so the sum is
/// wrapped as a true modulo-360 angle.
pub fn target_rotation(adjusted_heading: f64, qibla_bearing: f64) -> f64 {
    normalize_degrees(360.0 - adjusted_heading + qibla_bearing)
}
