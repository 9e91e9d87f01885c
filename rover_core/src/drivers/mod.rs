//! Device driver implementations.
//!
//! The driver set is closed — one module per peripheral:
//!
//! - [`range`] - ranging sensor (distance array)
//! - [`vision`] - vision/AI sensor (coarse object list)
//! - [`motor`] - motor controller (command state machine + watchdog)
//!
//! Each driver is generic over a small per-device link trait — the
//! transport seam. Two link families exist:
//!
//! - [`sim`] - software-emulated endpoints for development and testing
//! - [`serial`] - hardware endpoints over tokio-serial (`serial` feature)

pub mod motor;
pub mod range;
#[cfg(feature = "serial")]
pub mod serial;
pub mod sim;
pub mod vision;

use rover_common::config::RoverConfig;

use crate::device::Device;
use crate::drivers::motor::{MotorCommandHandle, MotorController};
use crate::drivers::range::RangeSensor;
use crate::drivers::vision::VisionSensor;

/// Build the full driver set over simulated links, in registration order
/// (range, vision, motor). Returns the drivers and the motor command
/// handle for the request-serving layer.
pub fn simulated_drivers(config: &RoverConfig) -> (Vec<Box<dyn Device>>, MotorCommandHandle) {
    let range = RangeSensor::new(sim::SimRangeLink::new());
    let vision = VisionSensor::new(sim::SimVisionLink::new());
    let (motor, handle) = MotorController::new(sim::SimMotorLink::new(), &config.motor);

    (
        vec![Box::new(range), Box::new(vision), Box::new(motor)],
        handle,
    )
}

/// Build the full driver set over the configured serial endpoints, in
/// registration order (range, vision, motor). Ports are opened later by
/// `connect()`, not here.
#[cfg(feature = "serial")]
pub fn serial_drivers(config: &RoverConfig) -> (Vec<Box<dyn Device>>, MotorCommandHandle) {
    use crate::drivers::serial::{SerialMotorLink, SerialRangeLink, SerialVisionLink};

    let d = &config.devices;
    let range = RangeSensor::new(SerialRangeLink::new(&d.range.port, d.range.baud));
    let vision = VisionSensor::new(SerialVisionLink::new(&d.vision.port, d.vision.baud));
    let (motor, handle) = MotorController::new(
        SerialMotorLink::new(&d.motor.port, d.motor.baud),
        &config.motor,
    );

    (
        vec![Box::new(range), Box::new(vision), Box::new(motor)],
        handle,
    )
}
