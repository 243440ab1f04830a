use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bno055::{BNO055OperationMode, Bno055};
use log::{info, warn};
use rppal::i2c::I2c;

use crate::heading::MagneticSample;
use crate::sensor::{MagnetometerSource, SampleCallback, Subscription};

/// Magnetometer of a BNO055 IMU on a Linux I2C bus.
pub struct Bno055Magnetometer {
    imu: Option<Arc<Mutex<Bno055<I2c>>>>,
}

impl Bno055Magnetometer {
    pub fn open(bus: u8) -> anyhow::Result<Self> {
        let i2c = I2c::with_bus(bus).with_context(|| format!("could not open I2C bus {bus}"))?;
        let mut imu = Bno055::new(i2c);
        let mut delay = linux_embedded_hal::Delay;

        imu.init(&mut delay)
            .map_err(|e| anyhow!("BNO055 init failed: {e:?}"))?;
        // fusion mode keeps the magnetometer calibrated in the background
        imu.set_mode(BNO055OperationMode::NDOF, &mut delay)
            .map_err(|e| anyhow!("BNO055 mode change failed: {e:?}"))?;

        info!("BNO055 ready on I2C bus {bus}");
        Ok(Self {
            imu: Some(Arc::new(Mutex::new(imu))),
        })
    }

    /// Opens the sensor, or reports it as unavailable when that fails.
    pub fn open_or_unavailable(bus: u8) -> Self {
        Self::open(bus).unwrap_or_else(|e| {
            warn!("{e:#}");
            Self { imu: None }
        })
    }
}

#[async_trait]
impl MagnetometerSource for Bno055Magnetometer {
    async fn is_available(&self) -> bool {
        self.imu.is_some()
    }

    fn subscribe(&self, period: Duration, on_sample: SampleCallback) -> Subscription {
        let Some(imu) = self.imu.clone() else {
            return Subscription::new(|| {});
        };
        // every read is a blocking I2C transfer
        let read = move || {
            imu.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .mag_data()
                .map(MagneticSample::from)
                .map_err(|e| anyhow!("BNO055 magnetometer read failed: {e:?}"))
        };
        Subscription::polling(period, read, on_sample)
    }
}
