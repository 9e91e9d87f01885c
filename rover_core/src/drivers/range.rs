//! Ranging sensor driver.

use async_trait::async_trait;
use rover_common::error::{ConnectError, ReadError};
use rover_common::reading::{DeviceReading, ReadingPayload};
use tracing::debug;

use crate::device::{Device, DeviceKind};

/// Transport seam for the ranging sensor.
#[async_trait]
pub trait RangeLink: Send {
    async fn open(&mut self) -> Result<(), ConnectError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;

    /// Latest distance array [cm], one entry per beam/zone.
    async fn poll_distances(&mut self) -> Result<Vec<f32>, ReadError>;
}

/// Driver for the ranging sensor. Owns exactly one endpoint.
pub struct RangeSensor<L: RangeLink> {
    link: L,
}

impl<L: RangeLink> RangeSensor<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }
}

#[async_trait]
impl<L: RangeLink> Device for RangeSensor<L> {
    fn id(&self) -> &str {
        DeviceKind::RangeSensor.id()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::RangeSensor
    }

    fn is_connected(&self) -> bool {
        self.link.is_open()
    }

    async fn connect(&mut self) -> Result<(), ConnectError> {
        if self.link.is_open() {
            return Ok(());
        }
        self.link.open().await
    }

    async fn disconnect(&mut self) {
        self.link.close();
    }

    async fn read(&mut self) -> Result<DeviceReading, ReadError> {
        if !self.link.is_open() {
            return Err(ReadError::NotConnected);
        }
        let distances_cm = self.link.poll_distances().await?;
        Ok(DeviceReading::ok(
            self.id(),
            ReadingPayload::Range { distances_cm },
        ))
    }

    async fn emergency_stop(&mut self) {
        // No actuator; the sensor's safe state is its idle state.
        debug!(device = self.id(), "emergency stop: sensor idle");
    }
}
