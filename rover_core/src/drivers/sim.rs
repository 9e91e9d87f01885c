//! Simulated device links.
//!
//! Software-emulated endpoints for development and testing without
//! physical hardware (`rover --simulate`). Each link implements the same
//! seam trait as its serial counterpart; drivers cannot tell them apart.

use async_trait::async_trait;
use rover_common::error::{ConnectError, ReadError};
use rover_common::reading::DetectedObject;

use crate::drivers::motor::MotorLink;
use crate::drivers::range::RangeLink;
use crate::drivers::vision::VisionLink;
use crate::motor::ActuatorSignal;

/// Simulated ranging sensor: three zones, center zone sweeping slowly so
/// dashboards show movement.
#[derive(Debug, Default)]
pub struct SimRangeLink {
    open: bool,
    tick: u32,
}

impl SimRangeLink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RangeLink for SimRangeLink {
    async fn open(&mut self) -> Result<(), ConnectError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn poll_distances(&mut self) -> Result<Vec<f32>, ReadError> {
        self.tick = self.tick.wrapping_add(1);
        let sweep = (self.tick % 40) as f32;
        Ok(vec![120.0, 60.0 + sweep, 120.0])
    }
}

/// Simulated vision sensor reporting a fixed object list.
#[derive(Debug)]
pub struct SimVisionLink {
    open: bool,
    objects: Vec<DetectedObject>,
}

impl SimVisionLink {
    pub fn new() -> Self {
        Self {
            open: false,
            objects: vec![DetectedObject {
                id: 1,
                x: 160,
                y: 120,
                width: 40,
                height: 40,
            }],
        }
    }

    /// Replace the reported object list.
    pub fn with_objects(mut self, objects: Vec<DetectedObject>) -> Self {
        self.objects = objects;
        self
    }
}

impl Default for SimVisionLink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionLink for SimVisionLink {
    async fn open(&mut self) -> Result<(), ConnectError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn poll_objects(&mut self) -> Result<Vec<DetectedObject>, ReadError> {
        Ok(self.objects.clone())
    }
}

/// Simulated motor endpoint: accepts any signal and remembers the last
/// one.
#[derive(Debug, Default)]
pub struct SimMotorLink {
    open: bool,
    last_signal: Option<ActuatorSignal>,
}

impl SimMotorLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last signal written, if any.
    pub fn last_signal(&self) -> Option<ActuatorSignal> {
        self.last_signal
    }
}

#[async_trait]
impl MotorLink for SimMotorLink {
    async fn open(&mut self) -> Result<(), ConnectError> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn apply(&mut self, signal: ActuatorSignal) -> Result<(), ReadError> {
        self.last_signal = Some(signal);
        Ok(())
    }
}
