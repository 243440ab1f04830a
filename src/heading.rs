//! Compass heading derived from raw magnetometer samples

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::geo::normalize_degrees;

/// Raw device-frame magnetic field reading. Only `x` and `y` feed the heading.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct MagneticSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MagneticSample {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[cfg(feature = "hardware")]
impl From<mint::Vector3<f32>> for MagneticSample {
    fn from(value: mint::Vector3<f32>) -> Self {
        Self::new(value.x.into(), value.y.into(), value.z.into())
    }
}

/// Heading of a sample in whole degrees within `[0, 360)`.
///
/// Negative `atan2` results are shifted by a full turn rather than reduced
/// with a modulo.
pub fn heading_from_magnetometer(sample: MagneticSample) -> f64 {
    let raw = sample.y.atan2(sample.x);
    let angle = if raw >= 0.0 {
        raw.to_degrees()
    } else {
        (raw + TAU).to_degrees()
    };
    wrap_rounded(angle.round())
}

/// Rotates the zero reference by -90° so the sensor axis matches screen up.
pub fn adjusted_heading(angle: f64) -> f64 {
    normalize_degrees(angle - 90.0)
}

/// The historical adjustment: `angle - 90`, or `angle + 271` below 90°.
///
/// Off by one degree from [`adjusted_heading`] for inputs under 90°.
pub fn legacy_adjusted_heading(angle: f64) -> f64 {
    if angle - 90.0 >= 0.0 {
        angle - 90.0
    } else {
        angle + 271.0
    }
}

/// Shifts a magnetic heading by the local declination to get true north.
pub fn apply_declination(heading: f64, declination: f64) -> f64 {
    wrap_rounded(normalize_degrees(heading + declination).round())
}

fn wrap_rounded(degrees: f64) -> f64 {
    if degrees >= 360.0 {
        degrees - 360.0
    } else {
        degrees
    }
}

/// How the heading is rotated into the screen frame.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HeadingAdjustment {
    /// True modulo-360 rotation.
    #[default]
    Modulo,
    /// Bit-exact with the historical `+271` formula.
    Legacy,
}

impl HeadingAdjustment {
    pub fn apply(self, angle: f64) -> f64 {
        match self {
            HeadingAdjustment::Modulo => adjusted_heading(angle),
            HeadingAdjustment::Legacy => legacy_adjusted_heading(angle),
        }
    }
}

/// The eight principal and intermediate compass points.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompassPoint {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassPoint {
    const ALL: [CompassPoint; 8] = [
        CompassPoint::North,
        CompassPoint::NorthEast,
        CompassPoint::East,
        CompassPoint::SouthEast,
        CompassPoint::South,
        CompassPoint::SouthWest,
        CompassPoint::West,
        CompassPoint::NorthWest,
    ];

    /// Sector containing `degrees`.
    ///
    /// Sectors are 45° wide and half-open, with boundaries at odd multiples of
    /// 22.5°; a boundary belongs to the sector clockwise of it.
    pub fn from_degrees(degrees: f64) -> Self {
        let index = ((normalize_degrees(degrees) + 22.5) / 45.0).floor() as usize % 8;
        Self::ALL[index]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
        }
    }
}

/// Short label ("N", "NE", ...) for a heading in degrees.
pub fn compass_direction_label(degrees: f64) -> &'static str {
    CompassPoint::from_degrees(degrees).label()
}
