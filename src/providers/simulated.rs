use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};

use crate::heading::MagneticSample;
use crate::sensor::{MagnetometerSource, SampleCallback, Subscription};

/// Horizontal field strength of the generated samples, in µT.
const FIELD_STRENGTH: f64 = 20.0;
/// Vertical component, roughly what a mid-latitude device lying flat sees.
const FIELD_VERTICAL: f64 = -44.0;

/// Magnetometer of a device spinning at a constant rate.
///
/// Useful on machines without a sensor; the heading sweeps through all
/// compass points at `rotation_deg_per_sec`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedMagnetometer {
    rotation_deg_per_sec: f64,
    start_heading: f64,
}

impl SimulatedMagnetometer {
    pub fn new(rotation_deg_per_sec: f64) -> Self {
        Self {
            rotation_deg_per_sec,
            start_heading: 0.0,
        }
    }

    pub fn starting_at(mut self, heading: f64) -> Self {
        self.start_heading = heading;
        self
    }

    /// Sample after `elapsed` of rotation.
    pub fn sample_at(&self, elapsed: Duration) -> MagneticSample {
        let heading = self.start_heading + self.rotation_deg_per_sec * elapsed.as_secs_f64();
        let (sin, cos) = heading.to_radians().sin_cos();
        MagneticSample::new(FIELD_STRENGTH * cos, FIELD_STRENGTH * sin, FIELD_VERTICAL)
    }
}

#[async_trait]
impl MagnetometerSource for SimulatedMagnetometer {
    async fn is_available(&self) -> bool {
        true
    }

    fn subscribe(&self, period: Duration, mut on_sample: SampleCallback) -> Subscription {
        let simulation = *self;
        let period = period.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let start = Instant::now();
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                let tick = interval.tick().await;
                on_sample(simulation.sample_at(tick.saturating_duration_since(start)));
            }
        });
        Subscription::from_task(task)
    }
}
