use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use futures::{SinkExt, TryStreamExt};
use gpsd_proto::{Mode, UnifiedResponse};
use log::{debug, info};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::config::LocationConfig;
use crate::geo::GeoCoordinate;
use crate::sensor::{LocationProvider, Permission};

/// One-shot position fix from a gpsd daemon.
#[derive(Debug, Clone)]
pub struct GpsdLocation {
    address: String,
    fix_timeout: Duration,
}

impl GpsdLocation {
    pub fn new(address: impl Into<String>, fix_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            fix_timeout,
        }
    }

    pub fn from_config(config: &LocationConfig) -> Self {
        Self::new(
            config.gpsd_address.clone(),
            Duration::from_millis(config.fix_timeout_ms),
        )
    }

    async fn read_fix(&self) -> anyhow::Result<GeoCoordinate> {
        let stream = TcpStream::connect(&self.address)
            .await
            .with_context(|| format!("could not connect to gpsd at {}", self.address))?;
        let mut framed = Framed::new(stream, LinesCodec::new());
        framed.send(gpsd_proto::ENABLE_WATCH_CMD).await?;

        while let Some(line) = framed.try_next().await? {
            if let Some(fix) = parse_fix(&line) {
                return Ok(fix);
            }
        }
        bail!("gpsd closed the connection before reporting a fix")
    }
}

#[async_trait]
impl LocationProvider for GpsdLocation {
    async fn request_permission(&self) -> Permission {
        // gpsd has no access control of its own
        Permission::Granted
    }

    async fn current_location(&self) -> anyhow::Result<GeoCoordinate> {
        info!("Waiting for a fix from gpsd at {}", self.address);
        tokio::time::timeout(self.fix_timeout, self.read_fix())
            .await
            .with_context(|| format!("no fix from gpsd within {:?}", self.fix_timeout))?
    }
}

/// Position of a gpsd TPV report with at least a 2D fix.
///
/// Any other line (other report classes, `NoFix`, garbage) yields `None`.
pub fn parse_fix(line: &str) -> Option<GeoCoordinate> {
    match serde_json::from_str(line) {
        Ok(UnifiedResponse::Tpv(tpv)) => match tpv.mode {
            Mode::NoFix => None,
            Mode::Fix2d | Mode::Fix3d => GeoCoordinate::new(tpv.lat?, tpv.lon?).ok(),
        },
        Ok(_) => None,
        Err(e) => {
            debug!("Error decoding gpsd line: {e}");
            None
        }
    }
}
