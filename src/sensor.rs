//! Interfaces to the device collaborators: location and magnetometer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::warn;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::geo::GeoCoordinate;
use crate::heading::MagneticSample;

/// Outcome of a location permission request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

/// Supplies the device position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> Permission;

    /// One-shot position fix. Only called after permission was granted.
    ///
    /// Implementations should give up on their own within a bounded time.
    /// The compass also abandons the call after
    /// [`CompassSettings::location_timeout`](crate::CompassSettings::location_timeout)
    /// and treats it as a failed fetch, so the sensor stream is never held up.
    async fn current_location(&self) -> anyhow::Result<GeoCoordinate>;
}

/// Callback invoked with every magnetometer sample.
pub type SampleCallback = Box<dyn FnMut(MagneticSample) + Send + 'static>;

/// A stream of raw magnetometer samples.
#[async_trait]
pub trait MagnetometerSource: Send + Sync {
    async fn is_available(&self) -> bool;

    /// Starts delivering samples to `on_sample` roughly every `period`.
    ///
    /// Delivery must stop once the returned [`Subscription`] is cancelled or
    /// dropped.
    fn subscribe(&self, period: Duration, on_sample: SampleCallback) -> Subscription;
}

/// Handle to a live sample listener. Cancels the listener when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps the action that removes the listener.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription driven by a spawned task; cancelling aborts the task.
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self::new(move || task.abort())
    }

    /// Calls the blocking `read` every `period` on tokio's blocking pool and
    /// forwards each sample. Failed reads are logged and skipped.
    pub fn polling<F>(period: Duration, read: F, mut on_sample: SampleCallback) -> Self
    where
        F: Fn() -> anyhow::Result<MagneticSample> + Send + Sync + 'static,
    {
        let read = Arc::new(read);
        let period = period.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let read = Arc::clone(&read);
                match tokio::task::spawn_blocking(move || read()).await {
                    Ok(Ok(sample)) => on_sample(sample),
                    Ok(Err(e)) => warn!("Magnetometer read failed: {e:#}"),
                    Err(e) => warn!("Magnetometer read task failed: {e}"),
                }
            }
        });
        Self::from_task(task)
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    /// Removes the listener. Calling it again is a no-op.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
