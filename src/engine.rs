//! The Qibla compass lifecycle: location resolution, sensor subscription and
//! per-sample recomputation of the display state.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use log::{debug, info, trace, warn};
use serde::Serialize;

use crate::config::CompassConfig;
use crate::error::CompassError;
use crate::fusion::{compass_rotation, target_rotation};
use crate::geo::{qibla_bearing, GeoCoordinate, FALLBACK_LOCATION};
use crate::heading::{
    apply_declination, compass_direction_label, heading_from_magnetometer, HeadingAdjustment,
    MagneticSample,
};
use crate::magnetic::MagneticData;
use crate::sensor::{LocationProvider, MagnetometerSource, Permission, Subscription};
use crate::shared::SharedState;
use crate::view::CompassView;

/// Where the compass is in its lifecycle.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Uninitialized,
    Initializing,
    /// Streaming with a real (or last known) location.
    Active,
    /// No magnetometer; terminal until the next reinitialize.
    Unavailable,
    /// Streaming against the fallback location.
    PermissionDenied,
    Unsubscribed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompassSettings {
    pub sample_period: Duration,
    pub adjustment: HeadingAdjustment,
    /// Correct magnetic north to true north with the World Magnetic Model.
    pub declination_correction: bool,
    /// A fix that takes longer counts as a failed fetch.
    pub location_timeout: Duration,
}

impl Default for CompassSettings {
    fn default() -> Self {
        Self {
            sample_period: Duration::from_millis(100),
            adjustment: HeadingAdjustment::default(),
            declination_correction: false,
            location_timeout: Duration::from_secs(15),
        }
    }
}

impl From<&CompassConfig> for CompassSettings {
    fn from(config: &CompassConfig) -> Self {
        Self {
            sample_period: Duration::from_millis(config.sample_period_ms),
            adjustment: config.adjustment,
            declination_correction: config.declination_correction,
            location_timeout: Duration::from_millis(config.location_timeout_ms),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct CompassState {
    phase: Phase,
    /// Bumped whenever a subscription is released; stale callbacks compare
    /// against it and drop their samples.
    generation: u64,
    adjustment: HeadingAdjustment,
    location: Option<GeoCoordinate>,
    bearing: Option<f64>,
    declination: f64,
    heading: f64,
    adjusted_heading: f64,
    compass_rotate: f64,
    target_rotate: Option<f64>,
    error: Option<String>,
    is_loading: bool,
    using_fallback_location: bool,
    samples: u64,
}

impl CompassState {
    fn new(adjustment: HeadingAdjustment) -> Self {
        let mut state = Self {
            adjustment,
            ..Default::default()
        };
        state.refresh();
        state
    }

    fn resolve_location(&mut self, location: GeoCoordinate, fallback: bool, declination: f64) {
        self.location = Some(location);
        self.bearing = Some(qibla_bearing(location));
        self.using_fallback_location = fallback;
        self.declination = declination;
        self.refresh();
    }

    fn apply_sample(&mut self, sample: MagneticSample) {
        let heading = heading_from_magnetometer(sample);
        self.heading = if self.declination == 0.0 {
            heading
        } else {
            apply_declination(heading, self.declination)
        };
        self.samples += 1;
        self.refresh();
    }

    /// Re-derives everything downstream of heading and bearing.
    fn refresh(&mut self) {
        self.adjusted_heading = self.adjustment.apply(self.heading);
        self.compass_rotate = compass_rotation(self.adjusted_heading);
        self.target_rotate = self
            .bearing
            .map(|bearing| target_rotation(self.adjusted_heading, bearing));
    }

    fn view(&self) -> CompassView {
        CompassView {
            phase: self.phase,
            qibla_bearing: self.bearing,
            location: self.location,
            compass_direction_label: compass_direction_label(self.adjusted_heading),
            heading_degrees: self.adjusted_heading,
            compass_rotate: self.compass_rotate,
            target_rotate: self.target_rotate,
            error: self.error.clone(),
            is_loading: self.is_loading,
            using_fallback_location: self.using_fallback_location,
        }
    }
}

/// Fuses a one-shot Qibla bearing with a live magnetometer stream.
///
/// Owns at most one sensor subscription at a time. Dropping the compass
/// releases it.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use qibla_compass::{CompassSettings, QiblaCompass};
/// # use qibla_compass::providers::{FixedLocation, SimulatedMagnetometer};
/// # async fn run() {
/// let mut compass = QiblaCompass::new(
///     Arc::new(FixedLocation::denied()),
///     Arc::new(SimulatedMagnetometer::new(30.0)),
///     CompassSettings::default(),
/// );
/// compass.initialize().await;
/// println!("{:?}", compass.view().render_lines());
/// compass.dispose();
/// # }
/// ```
pub struct QiblaCompass {
    location: Arc<dyn LocationProvider>,
    magnetometer: Arc<dyn MagnetometerSource>,
    settings: CompassSettings,
    state: SharedState<CompassState>,
    subscription: Option<Subscription>,
}

impl QiblaCompass {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        magnetometer: Arc<dyn MagnetometerSource>,
        settings: CompassSettings,
    ) -> Self {
        Self {
            location,
            magnetometer,
            settings,
            state: SharedState::new(CompassState::new(settings.adjustment)),
            subscription: None,
        }
    }

    /// Checks the sensor, resolves a location and starts the sample stream.
    ///
    /// Never fails: problems are reported through [`CompassView::error`].
    pub async fn initialize(&mut self) {
        self.release_subscription();
        self.state.open(|state| {
            state.phase = Phase::Initializing;
            state.is_loading = true;
            state.error = None;
        });
        info!("Initializing qibla compass");

        if !self.magnetometer.is_available().await {
            let error = CompassError::SensorUnavailable;
            warn!("{error}");
            self.state.open(|state| {
                state.phase = Phase::Unavailable;
                state.is_loading = false;
                state.error = Some(error.to_string());
            });
            return;
        }

        let phase = match self.location.request_permission().await {
            Permission::Denied => {
                let error = CompassError::LocationPermissionDenied;
                warn!("{error}");
                let declination = self.declination_at(FALLBACK_LOCATION);
                self.state.open(|state| {
                    state.error = Some(error.to_string());
                    state.resolve_location(FALLBACK_LOCATION, true, declination);
                });
                Phase::PermissionDenied
            }
            Permission::Granted => {
                match self.fetch_location().await {
                    Ok(location) => {
                        info!("Location resolved to {location}");
                        let declination = self.declination_at(location);
                        self.state
                            .open(|state| state.resolve_location(location, false, declination));
                    }
                    Err(e) => self.recover_from_fetch_failure(e),
                }
                Phase::Active
            }
        };

        self.subscribe(phase);
    }

    /// Tears down the current subscription and runs [`initialize`](Self::initialize) again.
    pub async fn reinitialize(&mut self) {
        info!("Reinitializing qibla compass");
        self.initialize().await;
    }

    /// Stops the sample stream. No recomputation happens afterwards.
    pub fn dispose(&mut self) {
        if self.release_subscription() {
            info!("Qibla compass disposed");
        }
    }

    pub fn view(&self) -> CompassView {
        self.state.open(|state| state.view())
    }

    pub fn phase(&self) -> Phase {
        self.state.open(|state| state.phase)
    }

    /// Samples applied since construction.
    pub fn samples_processed(&self) -> u64 {
        self.state.open(|state| state.samples)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn settings(&self) -> &CompassSettings {
        &self.settings
    }

    async fn fetch_location(&self) -> anyhow::Result<GeoCoordinate> {
        let timeout = self.settings.location_timeout;
        tokio::time::timeout(timeout, self.location.current_location())
            .await
            .unwrap_or_else(|_| Err(anyhow!("no location within {timeout:?}")))
    }

    fn recover_from_fetch_failure(&self, e: anyhow::Error) {
        let error = CompassError::LocationFetchFailure(format!("{e:#}"));
        warn!("{error}");
        let known = self.state.open(|state| state.location);
        match known {
            Some(location) => debug!("Keeping last known location {location}"),
            None => {
                warn!("No location known yet, using fallback location {FALLBACK_LOCATION}");
                let declination = self.declination_at(FALLBACK_LOCATION);
                self.state
                    .open(|state| state.resolve_location(FALLBACK_LOCATION, true, declination));
            }
        }
    }

    fn declination_at(&self, location: GeoCoordinate) -> f64 {
        if !self.settings.declination_correction {
            return 0.0;
        }
        match MagneticData::today(location) {
            Some(data) => {
                debug!("Magnetic declination at {location}: {:.2}°", data.declination);
                data.declination
            }
            None => {
                warn!("Magnetic model has no data for today, heading stays magnetic");
                0.0
            }
        }
    }

    fn subscribe(&mut self, phase: Phase) {
        let generation = self.state.open(|state| {
            state.phase = phase;
            state.is_loading = false;
            state.generation
        });

        let shared = self.state.clone_handle();
        let on_sample = Box::new(move |sample: MagneticSample| {
            shared.open(|state| {
                if state.generation != generation {
                    return;
                }
                state.apply_sample(sample);
                trace!(
                    "Heading {}° (screen {}°)",
                    state.heading,
                    state.adjusted_heading
                );
            });
        });

        self.subscription = Some(
            self.magnetometer
                .subscribe(self.settings.sample_period, on_sample),
        );
        info!(
            "Magnetometer subscribed every {:?} ({phase:?})",
            self.settings.sample_period
        );
    }

    /// Returns whether a subscription was live.
    fn release_subscription(&mut self) -> bool {
        let Some(mut subscription) = self.subscription.take() else {
            return false;
        };
        subscription.cancel();
        self.state.open(|state| {
            state.generation += 1;
            state.phase = Phase::Unsubscribed;
        });
        true
    }
}

impl Drop for QiblaCompass {
    fn drop(&mut self) {
        self.release_subscription();
    }
}
