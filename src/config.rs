//! TOML configuration for the compass binary.

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use serde::{Deserialize, Serialize};

use crate::heading::HeadingAdjustment;
use crate::BROADCAST_PORT;

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub compass: CompassConfig,
    pub magnetometer: MagnetometerConfig,
    pub broadcast: BroadcastConfig,
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    #[default]
    Gpsd,
    Fixed,
    /// Behaves like a user who refused location access.
    Denied,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub source: LocationSource,
    pub gpsd_address: String,
    pub fix_timeout_ms: u64,
    /// used by `source = "fixed"`
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSource::default(),
            gpsd_address: "127.0.0.1:2947".to_owned(),
            fix_timeout_ms: 10_000,
            latitude: 51.5074,
            longitude: -0.1278,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CompassConfig {
    pub sample_period_ms: u64,
    pub adjustment: HeadingAdjustment,
    pub declination_correction: bool,
    /// Longest wait for a location fix before falling back
    pub location_timeout_ms: u64,
}

impl Default for CompassConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: 100,
            adjustment: HeadingAdjustment::default(),
            declination_correction: false,
            location_timeout_ms: 15_000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MagnetometerKind {
    #[default]
    Simulated,
    Bno055,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MagnetometerConfig {
    pub source: MagnetometerKind,
    /// Simulated device spin, degrees per second
    pub rotation_deg_per_sec: f64,
    pub i2c_bus: u8,
}

impl Default for MagnetometerConfig {
    fn default() -> Self {
        Self {
            source: MagnetometerKind::default(),
            rotation_deg_per_sec: 30.0,
            i2c_bus: 1,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct BroadcastConfig {
    pub enabled: bool,
    pub target: String,
    pub interval_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target: format!("255.255.255.255:{BROADCAST_PORT}"),
            interval_ms: 1000,
        }
    }
}

impl Config {
    /// `<config dir>/qibla-compass/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qibla-compass").join("config.toml"))
    }

    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml_edit::de::from_str(text).context("invalid configuration")
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml_edit::ser::to_string_pretty(self).context("could not serialize configuration")
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub async fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path).await
    }
}
