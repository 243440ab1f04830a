//! Fake collaborators for driving the compass by hand.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use qibla_compass::{
    GeoCoordinate, LocationProvider, MagneticSample, MagnetometerSource, Permission,
    SampleCallback, Subscription,
};

type Listeners = Arc<Mutex<Vec<(u64, SampleCallback)>>>;

/// Magnetometer whose samples are pushed by the test with [`emit`](Self::emit).
pub struct FakeMagnetometer {
    available: bool,
    /// When set, cancelling a subscription does not remove its listener.
    leaky: bool,
    listeners: Listeners,
    next_id: AtomicU64,
    subscribe_calls: AtomicUsize,
    last_period: Mutex<Option<Duration>>,
}

impl FakeMagnetometer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(true, false))
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self::build(false, false))
    }

    /// A source that keeps calling listeners after they were cancelled.
    pub fn leaky() -> Arc<Self> {
        Arc::new(Self::build(true, true))
    }

    fn build(available: bool, leaky: bool) -> Self {
        Self {
            available,
            leaky,
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
            subscribe_calls: AtomicUsize::new(0),
            last_period: Mutex::new(None),
        }
    }

    pub fn emit(&self, sample: MagneticSample) {
        let mut listeners = self.listeners.lock().unwrap();
        for (_, listener) in listeners.iter_mut() {
            listener(sample);
        }
    }

    pub fn emit_xy(&self, x: f64, y: f64) {
        self.emit(MagneticSample::new(x, y, 0.0));
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn last_period(&self) -> Option<Duration> {
        *self.last_period.lock().unwrap()
    }
}

#[async_trait]
impl MagnetometerSource for FakeMagnetometer {
    async fn is_available(&self) -> bool {
        self.available
    }

    fn subscribe(&self, period: Duration, on_sample: SampleCallback) -> Subscription {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_period.lock().unwrap() = Some(period);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, on_sample));

        if self.leaky {
            return Subscription::new(|| {});
        }
        let listeners = Arc::clone(&self.listeners);
        Subscription::new(move || {
            listeners
                .lock()
                .unwrap()
                .retain(|(listener, _)| *listener != id);
        })
    }
}

/// Location provider with a scripted permission answer and fix.
pub struct FakeLocation {
    permission: Permission,
    /// When set, `current_location` never completes.
    hangs: bool,
    fix: Mutex<Result<GeoCoordinate, String>>,
    fetches: AtomicUsize,
}

impl FakeLocation {
    pub fn granted(fix: GeoCoordinate) -> Arc<Self> {
        Arc::new(Self::build(Permission::Granted, Ok(fix)))
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self::build(
            Permission::Denied,
            Err("permission denied".to_owned()),
        ))
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self::build(Permission::Granted, Err(reason.to_owned())))
    }

    /// Permission is granted but the fix never arrives.
    pub fn hanging() -> Arc<Self> {
        let mut location = Self::build(Permission::Granted, Err("unreachable".to_owned()));
        location.hangs = true;
        Arc::new(location)
    }

    fn build(permission: Permission, fix: Result<GeoCoordinate, String>) -> Self {
        Self {
            permission,
            hangs: false,
            fix: Mutex::new(fix),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn set_fix(&self, fix: Result<GeoCoordinate, String>) {
        *self.fix.lock().unwrap() = fix;
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn request_permission(&self) -> Permission {
        self.permission
    }

    async fn current_location(&self) -> anyhow::Result<GeoCoordinate> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.hangs {
            std::future::pending::<()>().await;
        }
        self.fix.lock().unwrap().clone().map_err(|e| anyhow!(e))
    }
}
