use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use log::{info, warn};
use qibla_compass::{
    config::{
        BroadcastConfig, Config, LocationConfig, LocationSource, MagnetometerConfig,
        MagnetometerKind,
    },
    providers::{FixedLocation, GpsdLocation, SimulatedMagnetometer},
    Broadcast, CompassSettings, GeoCoordinate, LocationProvider, MagnetometerSource, QiblaCompass,
};
use tokio::net::UdpSocket;
use tokio_util::codec::{FramedRead, LinesCodec};

#[derive(Parser, Debug)]
#[command(version, about = "Points toward the Kaaba from a live magnetometer")]
struct Args {
    /// Configuration file, defaults to the user config directory
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use this position instead of the configured location source
    #[arg(long, requires = "longitude", allow_negative_numbers = true)]
    latitude: Option<f64>,

    #[arg(long, requires = "latitude", allow_negative_numbers = true)]
    longitude: Option<f64>,

    /// Behave as if location access was refused
    #[arg(long, conflicts_with_all = ["latitude", "longitude"])]
    deny_location: bool,

    /// Exit after publishing this many views
    #[arg(long)]
    updates: Option<u64>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) {
            config.location.source = LocationSource::Fixed;
            config.location.latitude = latitude;
            config.location.longitude = longitude;
        }
        if self.deny_location {
            config.location.source = LocationSource::Denied;
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match (&args.config, Config::default_path()) {
        (Some(path), _) => Config::load(path).await?,
        (None, Some(path)) => Config::load_or_default(&path).await?,
        (None, None) => Config::default(),
    };
    args.apply(&mut config);

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let mut compass = QiblaCompass::new(
        location_provider(&config.location)?,
        magnetometer_source(&config.magnetometer)?,
        CompassSettings::from(&config.compass),
    );
    compass.initialize().await;

    let result = run(&mut compass, &config.broadcast, args.updates).await;
    compass.dispose();
    result
}

fn location_provider(config: &LocationConfig) -> anyhow::Result<Arc<dyn LocationProvider>> {
    let provider: Arc<dyn LocationProvider> = match config.source {
        LocationSource::Gpsd => Arc::new(GpsdLocation::from_config(config)),
        LocationSource::Fixed => {
            let coordinate = GeoCoordinate::new(config.latitude, config.longitude)
                .context("invalid fixed location")?;
            Arc::new(FixedLocation::new(coordinate))
        }
        LocationSource::Denied => Arc::new(FixedLocation::denied()),
    };
    Ok(provider)
}

fn magnetometer_source(config: &MagnetometerConfig) -> anyhow::Result<Arc<dyn MagnetometerSource>> {
    let source: Arc<dyn MagnetometerSource> = match config.source {
        MagnetometerKind::Simulated => {
            Arc::new(SimulatedMagnetometer::new(config.rotation_deg_per_sec))
        }
        #[cfg(feature = "hardware")]
        MagnetometerKind::Bno055 => Arc::new(
            qibla_compass::providers::Bno055Magnetometer::open_or_unavailable(config.i2c_bus),
        ),
        #[cfg(not(feature = "hardware"))]
        MagnetometerKind::Bno055 => {
            anyhow::bail!("built without the `hardware` feature, the BNO055 is not supported")
        }
    };
    Ok(source)
}

/// Publishes the compass view until interrupted, `q` is entered or the
/// update limit is reached. `r` reinitializes the compass.
async fn run(
    compass: &mut QiblaCompass,
    broadcast: &BroadcastConfig,
    updates: Option<u64>,
) -> anyhow::Result<()> {
    let socket = if broadcast.enabled {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        info!("Broadcasting to {}", broadcast.target);
        Some(socket)
    } else {
        None
    };

    let mut commands = FramedRead::new(tokio::io::stdin(), LinesCodec::new());
    let mut stdin_open = true;
    let mut interval = tokio::time::interval(Duration::from_millis(broadcast.interval_ms.max(1)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut published = 0u64;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let view = compass.view();
                info!("{}", view.render_lines().join(" | "));
                if let Some(socket) = &socket {
                    let data = serde_json::to_vec(&Broadcast::new(view))?;
                    if let Err(e) = socket.send_to(&data, broadcast.target.as_str()).await {
                        warn!("Broadcast to {} failed: {e}", broadcast.target);
                    }
                }
                published += 1;
                if updates.is_some_and(|limit| published >= limit) {
                    break;
                }
            }
            line = commands.next(), if stdin_open => match line {
                Some(Ok(line)) => match line.trim() {
                    "r" => compass.reinitialize().await,
                    "q" => break,
                    "" => {}
                    other => warn!("Unknown command {other:?}, use `r` or `q`"),
                },
                Some(Err(e)) => {
                    warn!("Could not read commands: {e}");
                    stdin_open = false;
                }
                None => stdin_open = false,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}
