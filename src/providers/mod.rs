//! Concrete location and magnetometer collaborators.

mod fixed;
mod gnss;
#[cfg(feature = "hardware")]
mod imu;
mod simulated;

pub use fixed::FixedLocation;
pub use gnss::{parse_fix, GpsdLocation};
#[cfg(feature = "hardware")]
pub use imu::Bno055Magnetometer;
pub use simulated::SimulatedMagnetometer;
