//! Configuration loading and validation.
//!
//! All applications load one TOML file (`rover.toml`), deserialize it into
//! [`RoverConfig`] and call [`RoverConfig::validate`] before launching any
//! task. Validation failure is the only startup-fatal error class —
//! per-device failures at runtime are contained by the orchestrator.
//!
//! # TOML Example
//!
//! ```toml
//! [rover]
//! name = "rover-01"
//! poll_rate_hz = 10
//! persist_interval_ms = 1000
//!
//! [devices.range]
//! port = "/dev/ttyUSB0"
//! baud = 115200
//!
//! [devices.vision]
//! port = "/dev/ttyUSB1"
//! baud = 9600
//!
//! [devices.motor]
//! port = "/dev/ttyACM0"
//! baud = 115200
//!
//! [motor]
//! keep_alive_timeout_ms = 1000
//! signal_neutral = 1500
//! signal_min = 1000
//! signal_max = 2000
//! dead_zone_offset = 60
//! initial_speed = 200
//! min_speed = 50
//! max_speed = 450
//!
//! [persistence]
//! path = "rover_state.jsonl"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Top-level section: identity and task rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoverSection {
    /// Instance identifier (logging only).
    #[serde(default = "default_name")]
    pub name: String,

    /// Device poll rate [Hz]. Valid range 1–100.
    #[serde(default = "default_poll_rate_hz")]
    pub poll_rate_hz: u32,

    /// Snapshot persistence interval [ms].
    #[serde(default = "default_persist_interval_ms")]
    pub persist_interval_ms: u64,
}

fn default_name() -> String {
    "rover".to_string()
}

fn default_poll_rate_hz() -> u32 {
    10
}

fn default_persist_interval_ms() -> u64 {
    1000
}

impl Default for RoverSection {
    fn default() -> Self {
        Self {
            name: default_name(),
            poll_rate_hz: default_poll_rate_hz(),
            persist_interval_ms: default_persist_interval_ms(),
        }
    }
}

/// Serial endpoint for one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Transport identifier (serial device path).
    pub port: String,

    /// Baud rate.
    #[serde(default = "default_baud")]
    pub baud: u32,
}

fn default_baud() -> u32 {
    115_200
}

/// One endpoint per device variant. The driver set is closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Ranging sensor endpoint.
    pub range: EndpointConfig,
    /// Vision/AI sensor endpoint.
    pub vision: EndpointConfig,
    /// Motor controller endpoint.
    pub motor: EndpointConfig,
}

/// Motor state machine settings.
///
/// Signals are servo-pulse style values around `signal_neutral`; a drive
/// command adds/subtracts an offset of `max(speed, dead_zone_offset)` per
/// side, clamped into `[signal_min, signal_max]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotorConfig {
    /// Watchdog: motion stops if no command or keep-alive arrives within
    /// this window [ms].
    #[serde(default = "default_keep_alive_timeout_ms")]
    pub keep_alive_timeout_ms: u64,

    /// Neutral (no motion) signal value.
    #[serde(default = "default_signal_neutral")]
    pub signal_neutral: u16,

    /// Lower safe signal bound.
    #[serde(default = "default_signal_min")]
    pub signal_min: u16,

    /// Upper safe signal bound.
    #[serde(default = "default_signal_max")]
    pub signal_max: u16,

    /// Minimum effective offset — signals below this magnitude command
    /// sub-threshold PWM that produces no motion.
    #[serde(default = "default_dead_zone_offset")]
    pub dead_zone_offset: u16,

    /// Speed used by drive commands that carry no explicit magnitude.
    #[serde(default = "default_initial_speed")]
    pub initial_speed: u16,

    /// Lower bound for speed settings.
    #[serde(default = "default_min_speed")]
    pub min_speed: u16,

    /// Upper bound for speed settings.
    #[serde(default = "default_max_speed")]
    pub max_speed: u16,
}

fn default_keep_alive_timeout_ms() -> u64 {
    1000
}

fn default_signal_neutral() -> u16 {
    1500
}

fn default_signal_min() -> u16 {
    1000
}

fn default_signal_max() -> u16 {
    2000
}

fn default_dead_zone_offset() -> u16 {
    60
}

fn default_initial_speed() -> u16 {
    200
}

fn default_min_speed() -> u16 {
    50
}

fn default_max_speed() -> u16 {
    450
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            keep_alive_timeout_ms: default_keep_alive_timeout_ms(),
            signal_neutral: default_signal_neutral(),
            signal_min: default_signal_min(),
            signal_max: default_signal_max(),
            dead_zone_offset: default_dead_zone_offset(),
            initial_speed: default_initial_speed(),
            min_speed: default_min_speed(),
            max_speed: default_max_speed(),
        }
    }
}

impl MotorConfig {
    /// Keep-alive timeout as a `Duration`.
    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_millis(self.keep_alive_timeout_ms)
    }
}

/// Persistence sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Snapshot log path (one JSON document per line).
    #[serde(default = "default_persist_path")]
    pub path: PathBuf,
}

fn default_persist_path() -> PathBuf {
    PathBuf::from("rover_state.jsonl")
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_persist_path(),
        }
    }
}

/// Complete rover configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoverConfig {
    /// Identity and task rates.
    #[serde(default)]
    pub rover: RoverSection,

    /// Device endpoints.
    pub devices: DevicesConfig,

    /// Motor state machine settings.
    #[serde(default)]
    pub motor: MotorConfig,

    /// Persistence sink settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl RoverConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic validation. Called by `load()`; fatal at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.rover.poll_rate_hz) {
            return Err(ConfigError::Validation(format!(
                "poll_rate_hz must be in 1..=100, got {}",
                self.rover.poll_rate_hz
            )));
        }
        if self.rover.persist_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "persist_interval_ms must be > 0".to_string(),
            ));
        }

        for (name, endpoint) in [
            ("range", &self.devices.range),
            ("vision", &self.devices.vision),
            ("motor", &self.devices.motor),
        ] {
            if endpoint.port.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "devices.{name}.port must not be empty"
                )));
            }
        }

        let m = &self.motor;
        if !(m.signal_min < m.signal_neutral && m.signal_neutral < m.signal_max) {
            return Err(ConfigError::Validation(format!(
                "motor signal bounds must satisfy min < neutral < max, \
                 got min={} neutral={} max={}",
                m.signal_min, m.signal_neutral, m.signal_max
            )));
        }
        if m.dead_zone_offset == 0 {
            return Err(ConfigError::Validation(
                "motor.dead_zone_offset must be > 0".to_string(),
            ));
        }
        if !(m.min_speed <= m.initial_speed && m.initial_speed <= m.max_speed) {
            return Err(ConfigError::Validation(format!(
                "motor speeds must satisfy min <= initial <= max, \
                 got min={} initial={} max={}",
                m.min_speed, m.initial_speed, m.max_speed
            )));
        }
        if m.dead_zone_offset > m.max_speed {
            return Err(ConfigError::Validation(format!(
                "motor.dead_zone_offset ({}) must not exceed max_speed ({})",
                m.dead_zone_offset, m.max_speed
            )));
        }

        // Watchdog expiry is detected by the poll task; the timeout must be
        // at least one poll period or it can never be honored on time.
        let poll_period_ms = 1000 / self.rover.poll_rate_hz as u64;
        if m.keep_alive_timeout_ms < poll_period_ms {
            return Err(ConfigError::Validation(format!(
                "motor.keep_alive_timeout_ms ({}) is below the poll period ({poll_period_ms} ms)",
                m.keep_alive_timeout_ms
            )));
        }

        Ok(())
    }

    /// Poll period derived from `poll_rate_hz`.
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rover.poll_rate_hz as f64)
    }

    /// Persistence interval as a `Duration`.
    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.rover.persist_interval_ms)
    }
}
