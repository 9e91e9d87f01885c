//! Device reading types.
//!
//! A [`DeviceReading`] is produced by a driver `read()` call and stored in
//! the state store keyed by device id. Readings are immutable once
//! produced — the next reading for the same device supersedes, never
//! mutates, the previous one.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in microseconds (timestamp convention for all
/// readings and log entries).
pub fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

/// Outcome of the `read()` that produced a reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    /// Device reported valid data.
    Ok,
    /// Read failed; the message describes why. External readers report
    /// the device as unavailable rather than silently omitting it.
    Error(String),
}

impl ReadingStatus {
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// One object detected by the vision/AI sensor (coarse bounding box,
/// sensor pixel coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Learned object id as reported by the sensor.
    pub id: u32,
    /// Box center X.
    pub x: i16,
    /// Box center Y.
    pub y: i16,
    /// Box width.
    pub width: u16,
    /// Box height.
    pub height: u16,
}

/// Motion state reported in a motor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorStateKind {
    Stopped,
    Moving,
}

/// Per-device payload. Closed set — one variant per driver kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadingPayload {
    /// Ranging sensor: distances in cm, one entry per beam/zone.
    Range { distances_cm: Vec<f32> },
    /// Vision sensor: objects detected in the current frame.
    Vision { objects: Vec<DetectedObject> },
    /// Motor controller: motion state and the last emitted drive signal.
    Motor {
        state: MotorStateKind,
        left: u16,
        right: u16,
    },
    /// No payload (error readings).
    None,
}

/// Latest reading for one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReading {
    /// Device identifier ("range", "vision", "motor").
    pub device_id: String,
    /// When the reading was produced [Unix µs].
    pub timestamp_us: u64,
    /// Device-specific payload.
    pub payload: ReadingPayload,
    /// Outcome of the read that produced this entry.
    pub status: ReadingStatus,
}

impl DeviceReading {
    /// Successful reading, timestamped now.
    pub fn ok(device_id: &str, payload: ReadingPayload) -> Self {
        Self {
            device_id: device_id.to_string(),
            timestamp_us: now_us(),
            payload,
            status: ReadingStatus::Ok,
        }
    }

    /// Error reading, timestamped now. Stored so external readers see the
    /// device as unavailable instead of a stale Ok entry.
    pub fn error(device_id: &str, message: impl Into<String>) -> Self {
        Self {
            device_id: device_id.to_string(),
            timestamp_us: now_us(),
            payload: ReadingPayload::None,
            status: ReadingStatus::Error(message.into()),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}
