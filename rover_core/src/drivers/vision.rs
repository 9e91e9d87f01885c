//! Vision/AI sensor driver.

use async_trait::async_trait;
use rover_common::error::{ConnectError, ReadError};
use rover_common::reading::{DetectedObject, DeviceReading, ReadingPayload};
use tracing::debug;

use crate::device::{Device, DeviceKind};

/// Transport seam for the vision sensor.
#[async_trait]
pub trait VisionLink: Send {
    async fn open(&mut self) -> Result<(), ConnectError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;

    /// Objects detected in the current frame. An empty list is a valid
    /// reading (nothing in view), not an error.
    async fn poll_objects(&mut self) -> Result<Vec<DetectedObject>, ReadError>;
}

/// Driver for the vision/AI sensor. Owns exactly one endpoint.
pub struct VisionSensor<L: VisionLink> {
    link: L,
}

impl<L: VisionLink> VisionSensor<L> {
    pub fn new(link: L) -> Self {
        Self { link }
    }
}

#[async_trait]
impl<L: VisionLink> Device for VisionSensor<L> {
    fn id(&self) -> &str {
        DeviceKind::VisionSensor.id()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::VisionSensor
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
        let objects = self.link.poll_objects().await?;
        Ok(DeviceReading::ok(
            self.id(),
            ReadingPayload::Vision { objects },
        ))
    }

    async fn emergency_stop(&mut self) {
        // No actuator; the sensor's safe state is its idle state.
        debug!(device = self.id(), "emergency stop: sensor idle");
    }
}
