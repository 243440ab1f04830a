mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeLocation, FakeMagnetometer};
use qibla_compass::{
    compute_bearing, fusion::target_rotation, heading::apply_declination, magnetic::MagneticData,
    qibla_bearing, CompassSettings, GeoCoordinate, HeadingAdjustment, Phase, QiblaCompass,
    FALLBACK_LOCATION, KAABA,
};

const EPSILON: f64 = 1e-9;

fn new_york() -> GeoCoordinate {
    GeoCoordinate::new(40.7128, -74.006).unwrap()
}

fn compass(location: Arc<FakeLocation>, magnetometer: Arc<FakeMagnetometer>) -> QiblaCompass {
    QiblaCompass::new(location, magnetometer, CompassSettings::default())
}

#[tokio::test]
async fn test_granted_location_resolves_bearing_and_subscribes() {
    let location = FakeLocation::granted(new_york());
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(location.clone(), magnetometer.clone());

    assert_eq!(compass.phase(), Phase::Uninitialized);
    compass.initialize().await;

    let view = compass.view();
    assert_eq!(view.phase, Phase::Active);
    assert!(!view.is_loading);
    assert!(!view.using_fallback_location);
    assert_eq!(view.error, None);
    assert_eq!(view.location, Some(new_york()));
    assert_eq!(view.qibla_bearing, Some(qibla_bearing(new_york())));
    assert!((view.qibla_bearing.unwrap() - 58.4816).abs() < 1e-3);

    assert_eq!(location.fetches(), 1);
    assert_eq!(magnetometer.listener_count(), 1);
    assert_eq!(magnetometer.last_period(), Some(Duration::from_millis(100)));
    assert!(compass.is_subscribed());
}

#[tokio::test]
async fn test_denied_permission_uses_fallback_location() {
    let location = FakeLocation::denied();
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(location.clone(), magnetometer.clone());

    compass.initialize().await;

    let view = compass.view();
    assert_eq!(view.phase, Phase::PermissionDenied);
    assert!(view.using_fallback_location);
    assert!(!view.is_loading);
    assert_eq!(
        view.qibla_bearing,
        Some(compute_bearing(FALLBACK_LOCATION, KAABA))
    );
    assert_eq!(
        view.error.as_deref(),
        Some("Location permission not granted, using default location (London)")
    );

    // the heading stream still runs without a real location
    assert_eq!(location.fetches(), 0);
    assert_eq!(magnetometer.listener_count(), 1);
    magnetometer.emit_xy(0.0, 1.0);
    assert_eq!(compass.samples_processed(), 1);
}

#[tokio::test]
async fn test_unavailable_sensor_never_subscribes() {
    let location = FakeLocation::granted(new_york());
    let magnetometer = FakeMagnetometer::unavailable();
    let mut compass = compass(location.clone(), magnetometer.clone());

    compass.initialize().await;

    let view = compass.view();
    assert_eq!(view.phase, Phase::Unavailable);
    assert_eq!(
        view.error.as_deref(),
        Some("Compass is not available on this device")
    );
    assert!(!view.is_loading);
    assert_eq!(view.qibla_bearing, None);
    assert_eq!(view.target_rotate, None);
    assert_eq!(location.fetches(), 0);
    assert_eq!(magnetometer.subscribe_calls(), 0);
    assert!(!compass.is_subscribed());
}

#[tokio::test]
async fn test_fetch_failure_recovers_silently() {
    let location = FakeLocation::failing("no satellites in view");
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(location, magnetometer.clone());

    compass.initialize().await;

    let view = compass.view();
    assert_eq!(view.phase, Phase::Active);
    assert!(!view.is_loading);
    assert_eq!(view.error, None);
    assert!(view.using_fallback_location);
    assert_eq!(view.qibla_bearing, Some(qibla_bearing(FALLBACK_LOCATION)));
    assert_eq!(magnetometer.listener_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hung_fetch_falls_back_and_subscribes() {
    let location = FakeLocation::hanging();
    let magnetometer = FakeMagnetometer::new();
    let settings = CompassSettings {
        location_timeout: Duration::from_secs(2),
        ..Default::default()
    };
    let mut compass = QiblaCompass::new(location.clone(), magnetometer.clone(), settings);

    compass.initialize().await;

    let view = compass.view();
    assert_eq!(view.phase, Phase::Active);
    assert!(!view.is_loading);
    assert_eq!(view.error, None);
    assert!(view.using_fallback_location);
    assert_eq!(view.qibla_bearing, Some(qibla_bearing(FALLBACK_LOCATION)));
    assert_eq!(location.fetches(), 1);
    assert_eq!(magnetometer.listener_count(), 1);
}

#[tokio::test]
async fn test_fetch_failure_keeps_last_known_location() {
    let location = FakeLocation::granted(new_york());
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(location.clone(), magnetometer.clone());

    compass.initialize().await;
    location.set_fix(Err("timeout".to_owned()));
    compass.reinitialize().await;

    let view = compass.view();
    assert_eq!(view.location, Some(new_york()));
    assert_eq!(view.qibla_bearing, Some(qibla_bearing(new_york())));
    assert!(!view.using_fallback_location);
    assert_eq!(location.fetches(), 2);
}

#[tokio::test]
async fn test_samples_drive_heading_and_rotations() {
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(FakeLocation::granted(new_york()), magnetometer.clone());
    compass.initialize().await;
    let bearing = qibla_bearing(new_york());

    // raw 90° lines up with screen up
    magnetometer.emit_xy(0.0, 1.0);
    let view = compass.view();
    assert_eq!(view.heading_degrees, 0.0);
    assert_eq!(view.compass_direction_label, "N");
    assert_eq!(view.compass_rotate, 0.0);
    assert!((view.target_rotate.unwrap() - bearing).abs() < EPSILON);

    // raw 180°
    magnetometer.emit_xy(-1.0, 0.0);
    let view = compass.view();
    assert_eq!(view.heading_degrees, 90.0);
    assert_eq!(view.compass_direction_label, "E");
    assert_eq!(view.compass_rotate, 270.0);
    assert_eq!(view.target_rotate, Some(target_rotation(90.0, bearing)));

    // raw 0°, last sample wins
    magnetometer.emit_xy(1.0, 0.0);
    let view = compass.view();
    assert_eq!(view.heading_degrees, 270.0);
    assert_eq!(view.compass_direction_label, "W");
    assert_eq!(view.compass_rotate, 90.0);
    assert_eq!(compass.samples_processed(), 3);
}

#[tokio::test]
async fn test_negative_bearing_renders_in_range() {
    // east of Mecca on the same parallel, so the Kaaba lies to the west
    let origin = GeoCoordinate::new(21.4225, 120.0).unwrap();
    let bearing = qibla_bearing(origin);
    assert!(bearing < 0.0);

    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(FakeLocation::granted(origin), magnetometer.clone());
    compass.initialize().await;
    magnetometer.emit_xy(0.0, 1.0);

    let target = compass.view().target_rotate.unwrap();
    assert!((0.0..360.0).contains(&target));
    assert!((target - (360.0 + bearing)).abs() < EPSILON);
}

#[tokio::test]
async fn test_legacy_adjustment_is_selectable() {
    let magnetometer = FakeMagnetometer::new();
    let settings = CompassSettings {
        adjustment: HeadingAdjustment::Legacy,
        ..Default::default()
    };
    let mut compass = QiblaCompass::new(
        FakeLocation::granted(new_york()),
        magnetometer.clone(),
        settings,
    );
    compass.initialize().await;

    magnetometer.emit_xy(1.0, 0.0);
    assert_eq!(compass.view().heading_degrees, 271.0);
}

#[tokio::test]
async fn test_declination_correction_uses_magnetic_model() {
    let magnetometer = FakeMagnetometer::new();
    let settings = CompassSettings {
        declination_correction: true,
        ..Default::default()
    };
    let mut corrected = QiblaCompass::new(
        FakeLocation::granted(FALLBACK_LOCATION),
        magnetometer.clone(),
        settings,
    );
    corrected.initialize().await;
    magnetometer.emit_xy(0.0, 1.0);
    let view = corrected.view();

    let uncorrected = FakeMagnetometer::new();
    let mut plain = compass(FakeLocation::granted(FALLBACK_LOCATION), uncorrected.clone());
    plain.initialize().await;
    uncorrected.emit_xy(0.0, 1.0);
    assert_eq!(plain.view().heading_degrees, 0.0);

    match MagneticData::today(FALLBACK_LOCATION) {
        Some(field) => {
            // London sits about one degree east of magnetic north
            let expected =
                HeadingAdjustment::Modulo.apply(apply_declination(90.0, field.declination));
            assert_ne!(view.heading_degrees, 0.0);
            assert_eq!(view.heading_degrees, expected);
            assert_eq!(view.compass_rotate, 360.0 - expected);
        }
        // outside the model's validity window the heading stays magnetic
        None => assert_eq!(view.heading_degrees, 0.0),
    }
}

#[tokio::test]
async fn test_sample_period_comes_from_settings() {
    let magnetometer = FakeMagnetometer::new();
    let settings = CompassSettings {
        sample_period: Duration::from_millis(250),
        ..Default::default()
    };
    let mut compass = QiblaCompass::new(
        FakeLocation::granted(new_york()),
        magnetometer.clone(),
        settings,
    );
    compass.initialize().await;
    assert_eq!(magnetometer.last_period(), Some(Duration::from_millis(250)));
}

#[tokio::test]
async fn test_dispose_stops_recomputation() {
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(FakeLocation::granted(new_york()), magnetometer.clone());
    compass.initialize().await;

    magnetometer.emit_xy(0.0, 1.0);
    magnetometer.emit_xy(0.0, 1.0);
    assert_eq!(compass.samples_processed(), 2);

    compass.dispose();
    assert_eq!(compass.phase(), Phase::Unsubscribed);
    assert_eq!(magnetometer.listener_count(), 0);
    assert!(!compass.is_subscribed());

    magnetometer.emit_xy(-1.0, 0.0);
    assert_eq!(compass.samples_processed(), 2);
    assert_eq!(compass.view().heading_degrees, 0.0);
}

#[tokio::test]
async fn test_stale_listener_is_ignored() {
    let magnetometer = FakeMagnetometer::leaky();
    let mut compass = compass(FakeLocation::granted(new_york()), magnetometer.clone());
    compass.initialize().await;

    magnetometer.emit_xy(0.0, 1.0);
    compass.dispose();

    // the source never removed the listener and keeps emitting
    assert_eq!(magnetometer.listener_count(), 1);
    for _ in 0..5 {
        magnetometer.emit_xy(-1.0, 0.0);
    }
    assert_eq!(compass.samples_processed(), 1);
    assert_eq!(compass.view().heading_degrees, 0.0);
}

#[tokio::test]
async fn test_reinitialize_replaces_subscription() {
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(FakeLocation::granted(new_york()), magnetometer.clone());

    compass.initialize().await;
    compass.reinitialize().await;
    compass.reinitialize().await;

    assert_eq!(magnetometer.subscribe_calls(), 3);
    assert_eq!(magnetometer.listener_count(), 1);

    magnetometer.emit_xy(0.0, 1.0);
    assert_eq!(compass.samples_processed(), 1);
}

#[tokio::test]
async fn test_reinitialize_after_leaky_source_counts_once() {
    let magnetometer = FakeMagnetometer::leaky();
    let mut compass = compass(FakeLocation::granted(new_york()), magnetometer.clone());

    compass.initialize().await;
    compass.reinitialize().await;

    // two listeners are registered but only the current one is honoured
    assert_eq!(magnetometer.listener_count(), 2);
    magnetometer.emit_xy(0.0, 1.0);
    assert_eq!(compass.samples_processed(), 1);
}

#[tokio::test]
async fn test_drop_releases_listener() {
    let magnetometer = FakeMagnetometer::new();
    {
        let mut compass = compass(FakeLocation::granted(new_york()), magnetometer.clone());
        compass.initialize().await;
        assert_eq!(magnetometer.listener_count(), 1);
    }
    assert_eq!(magnetometer.listener_count(), 0);
}

#[tokio::test]
async fn test_bearing_stable_across_samples() {
    let magnetometer = FakeMagnetometer::new();
    let mut compass = compass(FakeLocation::granted(new_york()), magnetometer.clone());
    compass.initialize().await;

    let before = compass.view().qibla_bearing;
    for step in 0..36 {
        let angle = (step as f64 * 10.0).to_radians();
        magnetometer.emit_xy(angle.cos(), angle.sin());
        assert_eq!(compass.view().qibla_bearing, before);
    }
}
