//! Rover Common Library
//!
//! Shared types for the rover workspace: configuration loading, the error
//! taxonomy, device readings and motor commands. This crate contains no
//! async code — it is consumed by both the control core and any external
//! request-serving layer.
//!
//! # Module Structure
//!
//! - [`config`] - TOML configuration loading and validation
//! - [`error`] - Driver and sink error types
//! - [`reading`] - Per-device reading types and payloads
//! - [`command`] - Motor command set

pub mod command;
pub mod config;
pub mod error;
pub mod reading;

// Re-export key types for convenience
pub use crate::command::MotorCommand;
pub use crate::config::{ConfigError, MotorConfig, RoverConfig};
pub use crate::error::{ConnectError, ReadError, SinkError};
pub use crate::reading::{DeviceReading, ReadingPayload, ReadingStatus};
