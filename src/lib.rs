//! Qibla compass engine.
//!
//! Computes the great-circle bearing from the device location to the Kaaba and
//! fuses it with a live magnetometer stream into the two rotations a compass
//! screen needs: one for the heading dial and one for the Qibla indicator.
//!
//! The pure math lives in [`geo`], [`heading`] and [`fusion`]; [`QiblaCompass`]
//! owns the sensor subscription and the lifecycle around it.

use serde::Serialize;

pub mod config;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod geo;
pub mod heading;
pub mod magnetic;
pub mod providers;
pub mod sensor;
mod shared;
pub mod view;

pub use engine::{CompassSettings, Phase, QiblaCompass};
pub use error::CompassError;
pub use fusion::DisplayRotation;
pub use geo::{
    compute_bearing, normalize_degrees, qibla_bearing, GeoCoordinate, FALLBACK_LOCATION, KAABA,
};
pub use heading::{
    adjusted_heading, compass_direction_label, heading_from_magnetometer, legacy_adjusted_heading,
    CompassPoint, HeadingAdjustment, MagneticSample,
};
pub use sensor::{LocationProvider, MagnetometerSource, Permission, SampleCallback, Subscription};
pub use view::CompassView;

pub const BROADCAST_PORT: u16 = 12961;
pub const MAGIC_NUMBER: u32 = 0x5142_4c41;

/// One UDP datagram published by the binary.
#[derive(Serialize, Debug, Clone)]
pub struct Broadcast {
    pub magic_number: u32,
    pub view: CompassView,
}

impl Broadcast {
    pub fn new(view: CompassView) -> Self {
        Self {
            magic_number: MAGIC_NUMBER,
            view,
        }
    }
}
